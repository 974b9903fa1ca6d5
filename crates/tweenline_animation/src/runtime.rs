//! Tween runtime
//!
//! One [`Runtime`] owns everything a group of animations shares: the ordered
//! list of active tweens, the ownership registry, the main frame clock, and
//! every ticker created through it. Runtimes are independent of each other,
//! so tests can build as many as they like.
//!
//! # Driving time
//!
//! With `auto_update` enabled the host calls [`Runtime::frame`] once per
//! display frame. With it disabled, [`Runtime::update`] steps tweens by a
//! fixed amount, which makes playback fully deterministic.
//!
//! ```rust
//! use tweenline_animation::{Runtime, RuntimeConfig, TweenOptions};
//! use tweenline_core::{PropertyBag, Target};
//!
//! let runtime = Runtime::new(RuntimeConfig::manual());
//! let ball = Target::new(PropertyBag::new().with("x", 0.0));
//! runtime
//!     .to(&ball, 1.0, PropertyBag::from([("x", 100.0)]), TweenOptions::new())
//!     .unwrap();
//!
//! runtime.update(Some(0.5));
//! assert_eq!(ball.number("x"), Some(50.0));
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use slotmap::SlotMap;
use tracing::debug;
use tweenline_core::{IntoTargets, PropertyBag, Result, TweenError};

use crate::config::{RuntimeConfig, TimelineConfig, TweenOptions};
use crate::registry::OwnershipRegistry;
use crate::ticker::{
    self, Clock, FrameClock, SystemClock, TickCallback, Ticker, TickerId, TickerSlot,
};
use crate::timeline::Timeline;
use crate::tween::Tween;

pub(crate) struct RuntimeShared {
    pub(crate) clock: Rc<dyn Clock>,
    /// Active tweens in registration order
    pub(crate) tweens: RefCell<Vec<Tween>>,
    pub(crate) registry: RefCell<OwnershipRegistry>,
    pub(crate) main: RefCell<FrameClock>,
    pub(crate) tickers: Rc<ticker::TickerSlots>,
}

/// Shared animation context
///
/// Cloning is cheap; clones drive the same tweens.
#[derive(Clone)]
pub struct Runtime {
    shared: Rc<RuntimeShared>,
}

impl Runtime {
    /// Create a runtime measuring time with the system clock
    pub fn new(config: RuntimeConfig) -> Self {
        Self::with_clock(config, SystemClock::new())
    }

    /// Create a runtime measuring time with `clock`
    pub fn with_clock<C: Clock + 'static>(config: RuntimeConfig, clock: C) -> Self {
        let clock: Rc<dyn Clock> = Rc::new(clock);
        let mut main = FrameClock::new(config.fps, clock.now_ms());
        if !config.auto_update {
            main.pause();
        }

        Self {
            shared: Rc::new(RuntimeShared {
                clock,
                tweens: RefCell::new(Vec::new()),
                registry: RefCell::new(OwnershipRegistry::new()),
                main: RefCell::new(main),
                tickers: Rc::new(RefCell::new(SlotMap::with_key())),
            }),
        }
    }

    // =========================================================================
    // Construction
    // =========================================================================

    /// Apply `props` instantly on the next update
    pub fn set(
        &self,
        targets: impl IntoTargets,
        props: PropertyBag,
        options: impl Into<TweenOptions>,
    ) -> Result<Tween> {
        self.create(targets, 0.0, PropertyBag::new(), props, options.into())
    }

    /// Animate from the live values to `props`
    pub fn to(
        &self,
        targets: impl IntoTargets,
        duration: f64,
        props: PropertyBag,
        options: impl Into<TweenOptions>,
    ) -> Result<Tween> {
        self.create(targets, duration, PropertyBag::new(), props, options.into())
    }

    /// Animate from `props` to the live values
    pub fn from(
        &self,
        targets: impl IntoTargets,
        duration: f64,
        props: PropertyBag,
        options: impl Into<TweenOptions>,
    ) -> Result<Tween> {
        self.create(targets, duration, props, PropertyBag::new(), options.into())
    }

    /// Animate between two explicit states
    pub fn from_to(
        &self,
        targets: impl IntoTargets,
        duration: f64,
        from: PropertyBag,
        to: PropertyBag,
        options: impl Into<TweenOptions>,
    ) -> Result<Tween> {
        self.create(targets, duration, from, to, options.into())
    }

    fn create(
        &self,
        targets: impl IntoTargets,
        duration: f64,
        from: PropertyBag,
        to: PropertyBag,
        options: TweenOptions,
    ) -> Result<Tween> {
        let targets = targets.into_targets();
        if targets.is_empty() {
            return Err(TweenError::InvalidTarget("no targets given".to_string()));
        }
        if from.is_empty() && to.is_empty() {
            return Err(TweenError::InvalidTarget(
                "no properties to animate".to_string(),
            ));
        }

        let tween = Tween::new(&self.shared, targets, duration, from, to, options);
        tween.enqueue();
        Ok(tween)
    }

    // =========================================================================
    // Time
    // =========================================================================

    /// Host frame entry point
    ///
    /// Polls the main clock and every ticker against the runtime's clock.
    /// Returns whether anything is still running and another frame should
    /// be requested.
    pub fn frame(&self) -> bool {
        let now = self.shared.clock.now_ms();
        let mut request_next = false;

        let main_dt = {
            let mut main = self.shared.main.borrow_mut();
            if main.is_running() {
                request_next = true;
                main.poll(now)
            } else {
                None
            }
        };
        if let Some(dt) = main_dt {
            self.update_tweens(dt);
        }

        let ids: Vec<TickerId> = self.shared.tickers.borrow().keys().collect();
        for id in ids {
            request_next |= ticker::fire(&self.shared.tickers, id, now);
        }

        let mut tickers = self.shared.tickers.borrow_mut();
        let before = tickers.len();
        tickers.retain(|_, slot| slot.alive);
        if tickers.len() < before {
            debug!(pruned = before - tickers.len(), "removed killed tickers");
        }

        request_next
    }

    /// Step tweens manually by `step` seconds, or one frame if `None`
    ///
    /// Ignored while auto update is running.
    pub fn update(&self, step: Option<f64>) {
        let (running, frame) = {
            let main = self.shared.main.borrow();
            (main.is_running(), main.step_ms() / 1000.0)
        };
        if running {
            debug!("manual update ignored while auto update is running");
            return;
        }

        let step = step.unwrap_or(frame);
        let step = if step.is_finite() { step.max(0.0) } else { 0.0 };
        self.update_tweens(step);
    }

    /// One scheduler pass: prune dead tweens, then tick the rest in order
    fn update_tweens(&self, dt: f64) {
        let dead: Vec<Tween> = {
            let mut tweens = self.shared.tweens.borrow_mut();
            let (live, dead): (Vec<Tween>, Vec<Tween>) =
                tweens.drain(..).partition(Tween::is_alive);
            *tweens = live;
            dead
        };
        if !dead.is_empty() {
            debug!(count = dead.len(), "pruned dead tweens");
        }
        for tween in &dead {
            tween.detach();
        }

        let snapshot = self.shared.tweens.borrow().clone();
        for tween in snapshot {
            if tween.should_tick() {
                tween.tick(dt);
            }
        }
    }

    pub fn set_auto_update(&self, enabled: bool) {
        let now = self.shared.clock.now_ms();
        let mut main = self.shared.main.borrow_mut();
        if enabled {
            main.resume(now);
        } else {
            main.pause();
        }
    }

    pub fn is_auto_update(&self) -> bool {
        self.shared.main.borrow().is_running()
    }

    /// Frame rate of the main clock
    pub fn set_fps(&self, fps: f64) {
        self.shared.main.borrow_mut().set_fps(fps);
    }

    pub fn fps(&self) -> f64 {
        self.shared.main.borrow().fps()
    }

    // =========================================================================
    // Global controls
    // =========================================================================

    fn each_tween(&self, f: impl Fn(&Tween)) {
        let snapshot = self.shared.tweens.borrow().clone();
        for tween in snapshot.iter().rev() {
            f(tween);
        }
    }

    pub fn kill_all(&self) {
        self.each_tween(|tween| {
            tween.kill();
        });
    }

    pub fn pause_all(&self) {
        self.each_tween(|tween| {
            tween.pause();
        });
    }

    pub fn resume_all(&self) {
        self.each_tween(|tween| {
            tween.resume();
        });
    }

    /// Number of tweens in the active list, including ones awaiting pruning
    pub fn active_count(&self) -> usize {
        self.shared.tweens.borrow().len()
    }

    pub fn is_active(&self, tween: &Tween) -> bool {
        self.shared.tweens.borrow().contains(tween)
    }

    /// Number of target properties currently owned by some tween
    pub fn owned_properties(&self) -> usize {
        self.shared.registry.borrow().len()
    }

    // =========================================================================
    // Tickers and timelines
    // =========================================================================

    /// Register a running ticker that calls `on_tick` with elapsed seconds
    pub fn ticker<F: FnMut(f64) + 'static>(&self, fps: f64, on_tick: F) -> Ticker {
        self.insert_ticker(fps, Some(Box::new(on_tick)))
    }

    pub(crate) fn insert_ticker(&self, fps: f64, on_tick: Option<TickCallback>) -> Ticker {
        let clock = FrameClock::new(fps, self.shared.clock.now_ms());
        let id = self
            .shared
            .tickers
            .borrow_mut()
            .insert(TickerSlot::new(clock, on_tick));
        Ticker::new(
            id,
            Rc::downgrade(&self.shared.tickers),
            Rc::downgrade(&self.shared.clock),
        )
    }

    /// Number of tickers registered, including killed ones not yet pruned
    pub fn ticker_count(&self) -> usize {
        self.shared.tickers.borrow().len()
    }

    /// Create a paused timeline driven by its own ticker
    pub fn timeline(&self, config: TimelineConfig) -> Timeline {
        Timeline::new(self, config)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("tweens", &self.active_count())
            .field("tickers", &self.ticker_count())
            .field("auto_update", &self.is_auto_update())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticker::ManualClock;
    use std::cell::Cell;
    use tweenline_core::Target;

    #[test]
    fn test_empty_targets_are_rejected() {
        let runtime = Runtime::new(RuntimeConfig::manual());
        let err = runtime
            .to(Vec::<Target>::new(), 1.0, PropertyBag::from([("x", 1.0)]), TweenOptions::new())
            .unwrap_err();
        assert!(matches!(err, TweenError::InvalidTarget(_)));
        assert_eq!(runtime.active_count(), 0);
    }

    #[test]
    fn test_set_applies_on_next_update() {
        let runtime = Runtime::new(RuntimeConfig::manual());
        let target = Target::new(PropertyBag::new().with("x", 0.0));
        let tween = runtime
            .set(&target, PropertyBag::from([("x", 7.0)]), TweenOptions::new())
            .unwrap();

        assert_eq!(target.number("x"), Some(0.0));
        runtime.update(None);
        assert_eq!(target.number("x"), Some(7.0));
        assert!(!tween.is_alive());

        runtime.update(None);
        assert_eq!(runtime.active_count(), 0);
    }

    #[test]
    fn test_manual_update_ignored_while_auto() {
        let clock = ManualClock::new();
        let runtime = Runtime::with_clock(RuntimeConfig::default(), clock.clone());
        let target = Target::new(PropertyBag::new().with("x", 0.0));
        let tween = runtime
            .to(&target, 1.0, PropertyBag::from([("x", 10.0)]), TweenOptions::new())
            .unwrap();

        runtime.update(Some(0.5));
        assert_eq!(tween.elapsed(), 0.0);

        runtime.set_auto_update(false);
        runtime.update(Some(0.5));
        assert_eq!(tween.elapsed(), 0.5);
    }

    #[test]
    fn test_frame_drives_main_clock() {
        let clock = ManualClock::new();
        let runtime = Runtime::with_clock(RuntimeConfig::default().with_fps(10.0), clock.clone());
        let target = Target::new(PropertyBag::new().with("x", 0.0));
        runtime
            .to(&target, 1.0, PropertyBag::from([("x", 10.0)]), TweenOptions::new())
            .unwrap();

        clock.advance(50.0);
        assert!(runtime.frame());
        assert_eq!(target.number("x"), Some(0.0));

        clock.advance(100.0);
        runtime.frame();
        assert_eq!(target.number("x"), Some(1.0));
    }

    #[test]
    fn test_killed_tickers_are_pruned() {
        let clock = ManualClock::new();
        let runtime = Runtime::with_clock(RuntimeConfig::manual(), clock.clone());
        let fired = Rc::new(Cell::new(0));
        let counter = fired.clone();
        let ticker = runtime.ticker(10.0, move |_| counter.set(counter.get() + 1));

        clock.advance(150.0);
        assert!(runtime.frame());
        assert_eq!(fired.get(), 1);

        ticker.kill();
        clock.advance(150.0);
        assert!(!runtime.frame());
        assert_eq!(fired.get(), 1);
        assert_eq!(runtime.ticker_count(), 0);
        assert!(!ticker.is_alive());
    }

    #[test]
    fn test_ticker_handle_controls() {
        let clock = ManualClock::new();
        let runtime = Runtime::with_clock(RuntimeConfig::manual(), clock.clone());
        let fired = Rc::new(Cell::new(0));
        let counter = fired.clone();
        let ticker = runtime.ticker(10.0, move |_| counter.set(counter.get() + 1));

        ticker.pause();
        clock.advance(150.0);
        assert!(!runtime.frame());
        assert_eq!(fired.get(), 0);

        ticker.resume();
        clock.advance(150.0);
        assert!(runtime.frame());
        assert_eq!(fired.get(), 1);

        ticker.set_fps(20.0);
        assert_eq!(ticker.fps(), Some(20.0));
        ticker.tick(clock.now_ms() + 60.0);
        assert_eq!(fired.get(), 2);
    }

    #[test]
    fn test_pause_all_and_resume_all() {
        let runtime = Runtime::new(RuntimeConfig::manual());
        let target = Target::new(PropertyBag::new().with("x", 0.0).with("y", 0.0));
        let a = runtime
            .to(&target, 1.0, PropertyBag::from([("x", 10.0)]), TweenOptions::new())
            .unwrap();
        let b = runtime
            .to(&target, 1.0, PropertyBag::from([("y", 10.0)]), TweenOptions::new())
            .unwrap();

        runtime.pause_all();
        runtime.update(Some(0.5));
        assert_eq!(a.elapsed(), 0.0);
        assert_eq!(b.elapsed(), 0.0);

        runtime.resume_all();
        runtime.update(Some(0.5));
        assert_eq!(a.elapsed(), 0.5);
        assert_eq!(b.elapsed(), 0.5);
    }
}
