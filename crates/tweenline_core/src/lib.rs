//! Tweenline Core
//!
//! Leaf primitives shared by the animation engine:
//!
//! - **Values**: numbers, numeric arrays, and hex colors ([`Value`], [`Rgb`])
//! - **Targets**: the [`Animatable`] trait, the [`PropertyBag`] object, and
//!   shared [`Target`] handles with stable identities
//! - **Errors**: [`TweenError`]
//!
//! # Example
//!
//! ```rust
//! use tweenline_core::{PropertyBag, Target};
//!
//! let ball = Target::new(PropertyBag::new().with("x", 0.0).with("fill", "#FF0000"));
//! ball.set("x", 10.0);
//! assert_eq!(ball.number("x"), Some(10.0));
//! ```

pub mod error;
pub mod target;
pub mod value;

pub use error::{Result, TweenError};
pub use target::{Animatable, IntoTargets, PropertyBag, Target, TargetId, TargetList};
pub use value::{Rgb, Value};
