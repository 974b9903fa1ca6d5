//! Clocks and frame-rate limited tickers
//!
//! A [`FrameClock`] accumulates wall-clock time and fires once the
//! accumulated delta exceeds one frame step, carrying the remainder into the
//! next frame. [`Ticker`] handles pair a frame clock with a callback and are
//! polled by the [`Runtime`](crate::Runtime) on every host frame.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Instant;

use slotmap::{new_key_type, SlotMap};
use tracing::trace;

use crate::config::DEFAULT_FPS;

/// Monotonic millisecond time source
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Wall clock measured from its creation
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Deterministic clock advanced by hand
///
/// Clones share the same time, so a test can keep one clone and hand the
/// other to [`Runtime::with_clock`](crate::Runtime::with_clock).
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

/// Frame-rate limiter
#[derive(Clone, Debug, PartialEq)]
pub struct FrameClock {
    fps: f64,
    step_ms: f64,
    then_ms: f64,
    running: bool,
}

impl FrameClock {
    pub fn new(fps: f64, now_ms: f64) -> Self {
        let mut clock = Self {
            fps: DEFAULT_FPS,
            step_ms: 1000.0 / DEFAULT_FPS,
            then_ms: now_ms,
            running: true,
        };
        clock.set_fps(fps);
        clock
    }

    /// Set the frame rate; non-positive or non-finite values select 60 FPS
    pub fn set_fps(&mut self, fps: f64) {
        self.fps = if fps.is_finite() && fps > 0.0 {
            fps
        } else {
            DEFAULT_FPS
        };
        self.step_ms = 1000.0 / self.fps;
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Length of one frame in milliseconds
    pub fn step_ms(&self) -> f64 {
        self.step_ms
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Start running again, measuring from `now_ms`
    pub fn resume(&mut self, now_ms: f64) {
        self.then_ms = now_ms;
        self.running = true;
    }

    /// Seconds to report for this frame, if a full step has accumulated
    ///
    /// The reported delta is capped at two steps.
    pub fn poll(&mut self, now_ms: f64) -> Option<f64> {
        let delta = now_ms - self.then_ms;
        if delta <= self.step_ms {
            return None;
        }
        let drop = delta % self.step_ms;
        self.then_ms = now_ms - drop;
        Some((delta - drop).min(self.step_ms * 2.0) / 1000.0)
    }
}

new_key_type! {
    pub struct TickerId;
}

pub(crate) type TickCallback = Box<dyn FnMut(f64)>;

pub(crate) struct TickerSlot {
    pub(crate) clock: FrameClock,
    pub(crate) alive: bool,
    /// Taken out while the callback runs so it may re-enter the ticker
    pub(crate) on_tick: Option<TickCallback>,
}

impl TickerSlot {
    pub(crate) fn new(clock: FrameClock, on_tick: Option<TickCallback>) -> Self {
        Self {
            clock,
            alive: true,
            on_tick,
        }
    }
}

pub(crate) type TickerSlots = RefCell<SlotMap<TickerId, TickerSlot>>;

/// Poll one ticker and run its callback if a frame is due
///
/// Returns whether the ticker is still running.
pub(crate) fn fire(slots: &TickerSlots, id: TickerId, now_ms: f64) -> bool {
    let (dt, mut callback) = {
        let mut slots = slots.borrow_mut();
        let Some(slot) = slots.get_mut(id) else {
            return false;
        };
        if !slot.alive || !slot.clock.is_running() {
            return false;
        }
        match slot.clock.poll(now_ms) {
            Some(dt) => (dt, slot.on_tick.take()),
            None => return true,
        }
    };

    trace!(ticker = ?id, dt, "ticker fired");
    if let Some(on_tick) = callback.as_mut() {
        on_tick(dt);
    }

    let mut slots = slots.borrow_mut();
    match slots.get_mut(id) {
        Some(slot) => {
            if slot.on_tick.is_none() {
                slot.on_tick = callback;
            }
            slot.alive && slot.clock.is_running()
        }
        None => false,
    }
}

/// Handle to a ticker registered with a runtime
///
/// Operations on a handle whose runtime was dropped, or whose ticker was
/// pruned after [`Ticker::kill`], do nothing.
#[derive(Clone)]
pub struct Ticker {
    id: TickerId,
    slots: Weak<TickerSlots>,
    clock: Weak<dyn Clock>,
}

impl Ticker {
    pub(crate) fn new(id: TickerId, slots: Weak<TickerSlots>, clock: Weak<dyn Clock>) -> Self {
        Self { id, slots, clock }
    }

    pub fn id(&self) -> TickerId {
        self.id
    }

    fn with_slot<R>(&self, f: impl FnOnce(&mut TickerSlot) -> R) -> Option<R> {
        let slots = self.slots.upgrade()?;
        let mut slots = slots.borrow_mut();
        slots.get_mut(self.id).map(f)
    }

    fn now_ms(&self) -> f64 {
        self.clock.upgrade().map(|c| c.now_ms()).unwrap_or(0.0)
    }

    pub fn pause(&self) {
        self.with_slot(|slot| slot.clock.pause());
    }

    /// Resume, measuring the next frame from now
    pub fn resume(&self) {
        let now = self.now_ms();
        self.with_slot(|slot| slot.clock.resume(now));
    }

    /// Stop for good; the runtime prunes the ticker on its next frame
    pub fn kill(&self) {
        self.with_slot(|slot| {
            slot.alive = false;
            slot.clock.pause();
        });
    }

    pub fn set_fps(&self, fps: f64) {
        self.with_slot(|slot| slot.clock.set_fps(fps));
    }

    /// Poll this ticker against an explicit timestamp
    pub fn tick(&self, now_ms: f64) {
        if let Some(slots) = self.slots.upgrade() {
            fire(&slots, self.id, now_ms);
        }
    }

    pub fn is_running(&self) -> bool {
        self.with_slot(|slot| slot.alive && slot.clock.is_running())
            .unwrap_or(false)
    }

    pub fn is_alive(&self) -> bool {
        self.with_slot(|slot| slot.alive).unwrap_or(false)
    }

    pub fn fps(&self) -> Option<f64> {
        self.with_slot(|slot| slot.clock.fps())
    }

    pub(crate) fn set_callback(&self, on_tick: TickCallback) {
        self.with_slot(|slot| slot.on_tick = Some(on_tick));
    }
}

impl fmt::Debug for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ticker")
            .field("id", &self.id)
            .field("running", &self.is_running())
            .finish()
    }
}
