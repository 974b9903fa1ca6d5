//! Tween, runtime, and timeline configuration
//!
//! The serializable parts live in plain config structs so they can be loaded
//! from JSON; callbacks are attached separately through
//! [`TweenOptions`].

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tweenline_core::Target;

use crate::easing::{EaseSpec, Easing};

/// Default frame rate for the main clock and timeline tickers
pub const DEFAULT_FPS: f64 = 60.0;

/// Timing and easing options of a single tween
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TweenConfig {
    /// Seconds to wait before the first cycle
    pub delay: f64,
    /// Extra cycles after the first one; `-1` repeats forever.
    /// Defaults to `0`, or `-1` when `yoyo` is set.
    pub repeat: Option<i32>,
    /// Seconds to wait between cycles
    pub repeat_delay: f64,
    /// Reverse direction on every repeat instead of restarting
    pub yoyo: bool,
    pub ease: Option<EaseSpec>,
    /// Start ticking as soon as the tween is created
    pub auto_start: bool,
    pub time_scale: f64,
}

impl Default for TweenConfig {
    fn default() -> Self {
        Self {
            delay: 0.0,
            repeat: None,
            repeat_delay: 0.0,
            yoyo: false,
            ease: None,
            auto_start: true,
            time_scale: 1.0,
        }
    }
}

impl TweenConfig {
    /// Delay clamped to a non-negative finite value
    pub fn normalized_delay(&self) -> f64 {
        non_negative(self.delay)
    }

    pub fn normalized_repeat_delay(&self) -> f64 {
        non_negative(self.repeat_delay)
    }

    /// Repeat count with the yoyo default applied; anything below `-1` means forever
    pub fn normalized_repeat(&self) -> i32 {
        match self.repeat {
            Some(count) => count.max(-1),
            None if self.yoyo => -1,
            None => 0,
        }
    }

    pub fn normalized_time_scale(&self) -> f64 {
        if self.time_scale.is_finite() && self.time_scale > 0.0 {
            self.time_scale
        } else {
            1.0
        }
    }

    pub fn easing(&self) -> Easing {
        self.ease.as_ref().map(EaseSpec::resolve).unwrap_or_default()
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

/// Lifecycle callback, invoked with the tween's targets
pub type TweenCallback = Rc<dyn Fn(&[Target])>;

/// Lifecycle callbacks of a tween
#[derive(Clone, Default)]
pub struct TweenCallbacks {
    pub on_start: Option<TweenCallback>,
    pub on_update: Option<TweenCallback>,
    pub on_complete: Option<TweenCallback>,
    pub on_repeat: Option<TweenCallback>,
}

impl fmt::Debug for TweenCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TweenCallbacks")
            .field("on_start", &self.on_start.is_some())
            .field("on_update", &self.on_update.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .field("on_repeat", &self.on_repeat.is_some())
            .finish()
    }
}

/// Everything a tween constructor accepts besides targets and properties
///
/// ```rust
/// use tweenline_animation::TweenOptions;
///
/// let options = TweenOptions::new()
///     .delay(0.25)
///     .repeat(2)
///     .ease("QuadOut")
///     .on_complete(|targets| println!("done with {} targets", targets.len()));
/// assert_eq!(options.config.repeat, Some(2));
/// ```
#[derive(Clone, Debug, Default)]
pub struct TweenOptions {
    pub config: TweenConfig,
    pub callbacks: TweenCallbacks,
}

impl TweenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delay(mut self, seconds: f64) -> Self {
        self.config.delay = seconds;
        self
    }

    pub fn repeat(mut self, count: i32) -> Self {
        self.config.repeat = Some(count);
        self
    }

    pub fn repeat_delay(mut self, seconds: f64) -> Self {
        self.config.repeat_delay = seconds;
        self
    }

    pub fn yoyo(mut self, yoyo: bool) -> Self {
        self.config.yoyo = yoyo;
        self
    }

    pub fn ease(mut self, ease: impl Into<EaseSpec>) -> Self {
        self.config.ease = Some(ease.into());
        self
    }

    pub fn auto_start(mut self, auto_start: bool) -> Self {
        self.config.auto_start = auto_start;
        self
    }

    pub fn time_scale(mut self, scale: f64) -> Self {
        self.config.time_scale = scale;
        self
    }

    pub fn on_start<F: Fn(&[Target]) + 'static>(mut self, callback: F) -> Self {
        self.callbacks.on_start = Some(Rc::new(callback));
        self
    }

    pub fn on_update<F: Fn(&[Target]) + 'static>(mut self, callback: F) -> Self {
        self.callbacks.on_update = Some(Rc::new(callback));
        self
    }

    pub fn on_complete<F: Fn(&[Target]) + 'static>(mut self, callback: F) -> Self {
        self.callbacks.on_complete = Some(Rc::new(callback));
        self
    }

    pub fn on_repeat<F: Fn(&[Target]) + 'static>(mut self, callback: F) -> Self {
        self.callbacks.on_repeat = Some(Rc::new(callback));
        self
    }
}

impl From<TweenConfig> for TweenOptions {
    fn from(config: TweenConfig) -> Self {
        Self {
            config,
            callbacks: TweenCallbacks::default(),
        }
    }
}

/// Configuration of a [`Runtime`](crate::Runtime)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// Frame rate of the main clock
    pub fps: f64,
    /// Drive tweens from [`Runtime::frame`](crate::Runtime::frame); when
    /// disabled, time only advances through [`Runtime::update`](crate::Runtime::update)
    pub auto_update: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            auto_update: true,
        }
    }
}

impl RuntimeConfig {
    /// Configuration for deterministic, manually stepped runtimes
    pub fn manual() -> Self {
        Self {
            auto_update: false,
            ..Self::default()
        }
    }

    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_auto_update(mut self, enabled: bool) -> Self {
        self.auto_update = enabled;
        self
    }
}

/// Configuration of a [`Timeline`](crate::Timeline)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimelineConfig {
    pub time_scale: f64,
    /// Frame rate of the timeline's own ticker
    pub fps: f64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            time_scale: 1.0,
            fps: DEFAULT_FPS,
        }
    }
}

impl TimelineConfig {
    pub fn with_time_scale(mut self, scale: f64) -> Self {
        self.time_scale = scale;
        self
    }

    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = fps;
        self
    }
}
