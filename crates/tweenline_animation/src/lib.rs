//! Tweenline Animation
//!
//! Tweens, ownership arbitration, frame scheduling, and timelines.
//!
//! # Features
//!
//! - **Tweens**: numbers, numeric arrays, hex colors, and waypoint paths with
//!   delay, repeat, yoyo, and time scaling
//! - **Ownership**: a newer tween takes over properties an older one animates
//! - **Scheduling**: a frame-rate limited main clock, extra tickers, and a
//!   manual stepping mode for deterministic tests
//! - **Timelines**: labelled sequences and parallel blocks compiled into an
//!   absolute schedule
//!
//! # Example
//!
//! ```rust
//! use tweenline_animation::{Runtime, RuntimeConfig, TweenOptions};
//! use tweenline_core::{PropertyBag, Target};
//!
//! let runtime = Runtime::new(RuntimeConfig::manual());
//! let dot = Target::new(PropertyBag::new().with("x", 0.0).with("fill", "#000000"));
//!
//! runtime
//!     .to(
//!         &dot,
//!         2.0,
//!         PropertyBag::new().with("x", 10.0).with("fill", "#FFFFFF"),
//!         TweenOptions::new().ease("linear"),
//!     )
//!     .unwrap();
//!
//! runtime.update(Some(1.0));
//! assert_eq!(dot.number("x"), Some(5.0));
//! assert_eq!(dot.get("fill").unwrap().as_text(), Some("#7F7F7F"));
//! ```

pub mod binding;
pub mod config;
pub mod easing;
pub mod registry;
pub mod runtime;
pub mod schedule;
pub mod ticker;
pub mod timeline;
pub mod tween;

pub use binding::{Binding, BindingId, BindingKind, BindingSet};
pub use config::{
    RuntimeConfig, TimelineConfig, TweenCallback, TweenCallbacks, TweenConfig, TweenOptions,
    DEFAULT_FPS,
};
pub use easing::{EaseSpec, Easing};
pub use registry::{OwnerToken, OwnershipRegistry};
pub use runtime::Runtime;
pub use schedule::{
    compile, CompiledSchedule, Definition, ScheduledItem, TimelineCallback, TimelineItem,
};
pub use ticker::{Clock, FrameClock, ManualClock, SystemClock, Ticker, TickerId};
pub use timeline::Timeline;
pub use tween::{Direction, Tween};
