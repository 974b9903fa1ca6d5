//! Tween state machine
//!
//! A tween interpolates a set of properties on one or more targets over a
//! fixed duration, with optional delay, repeats, yoyo playback, and easing.
//!
//! # Lifecycle
//!
//! ```text
//! Pending -> Bound & Delayed -> Active -> (Repeating -> Active)* -> Completed | Killed
//! ```
//!
//! Tweens are created through a [`Runtime`](crate::Runtime) and are ticked by
//! it in registration order, or driven directly by a
//! [`Timeline`](crate::Timeline) once handed to one.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::debug;
use tweenline_core::{PropertyBag, Target, TargetList};

use crate::binding::BindingSet;
use crate::config::{TweenCallback, TweenCallbacks, TweenOptions};
use crate::easing::Easing;
use crate::runtime::RuntimeShared;

/// Progress is rounded to this many steps to suppress floating jitter
const PROGRESS_STEPS: f64 = 10_000.0;

/// Playback direction
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Backward => -1.0,
        }
    }

    pub fn reversed(self) -> Direction {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

#[derive(Clone, Copy)]
enum Event {
    Start,
    Update,
    Complete,
    Repeat,
}

pub(crate) struct TweenState {
    targets: TargetList,
    from: PropertyBag,
    to: PropertyBag,
    sets: Vec<BindingSet>,
    easing: Easing,
    callbacks: TweenCallbacks,

    duration: f64,
    delay: f64,
    delay_remaining: f64,
    elapsed: f64,
    progress: f64,
    direction: Direction,
    repeat: i32,
    repeat_remaining: i32,
    repeat_delay: f64,
    yoyo: bool,
    time_scale: f64,

    running: bool,
    alive: bool,
    queued: bool,
    started: bool,
    needs_sync: bool,
    /// Last timeline-local time this tween was driven at
    driven_at: Option<f64>,
}

impl TweenState {
    fn compute_progress(&self) -> f64 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        ((self.elapsed / self.duration) * PROGRESS_STEPS).round() / PROGRESS_STEPS
    }

    fn update_progress(&mut self) {
        self.progress = self.compute_progress().clamp(0.0, 1.0);
    }

    fn at_cycle_boundary(&self) -> bool {
        match self.direction {
            Direction::Forward => self.delay_remaining <= 0.0 && self.elapsed >= self.duration,
            Direction::Backward => self.elapsed <= 0.0,
        }
    }

    fn rebuild(&mut self) {
        self.sets = self
            .targets
            .iter()
            .map(|target| BindingSet::build(target, &self.from, &self.to))
            .collect();
    }

    fn refresh(&mut self) {
        for set in &mut self.sets {
            set.refresh(&self.from, &self.to);
        }
    }

    fn write(&mut self) -> usize {
        let (easing, progress) = (self.easing, self.progress);
        self.sets
            .iter_mut()
            .map(|set| set.write(&easing, progress))
            .sum()
    }

    fn callback(&self, event: Event) -> Option<TweenCallback> {
        let callbacks = &self.callbacks;
        match event {
            Event::Start => callbacks.on_start.clone(),
            Event::Update => callbacks.on_update.clone(),
            Event::Complete => callbacks.on_complete.clone(),
            Event::Repeat => callbacks.on_repeat.clone(),
        }
    }

    /// Wall-clock length of the tween including delay and repeats
    fn total_duration(&self) -> f64 {
        if self.repeat < 0 {
            return f64::INFINITY;
        }
        let cycles = self.repeat as f64;
        let active = self.duration * (cycles + 1.0) + self.repeat_delay * cycles;
        (active + self.delay) / self.time_scale
    }

    /// Length of the tween's slot in a timeline
    ///
    /// Unlimited repeats get a single cycle.
    fn slot_duration(&self) -> f64 {
        if self.repeat < 0 {
            return (self.duration + self.delay) / self.time_scale;
        }
        self.total_duration()
    }

    /// Map time since the start of the first cycle onto elapsed time in a cycle
    fn cycle_elapsed(&self, time: f64) -> f64 {
        let cycle = self.duration + self.repeat_delay;
        if self.repeat == 0 || cycle <= 0.0 {
            return time.clamp(0.0, self.duration);
        }

        let mut index = (time / cycle).floor().max(0.0);
        if self.repeat > 0 {
            index = index.min(self.repeat as f64);
        }
        let within = (time - index * cycle).clamp(0.0, self.duration);
        if self.yoyo && index as u64 % 2 == 1 {
            self.duration - within
        } else {
            within
        }
    }
}

/// Handle to a tween
///
/// Clones refer to the same tween. Equality is identity.
#[derive(Clone)]
pub struct Tween {
    state: Rc<RefCell<TweenState>>,
    runtime: Weak<RuntimeShared>,
}

impl Tween {
    pub(crate) fn new(
        runtime: &Rc<RuntimeShared>,
        targets: TargetList,
        duration: f64,
        from: PropertyBag,
        to: PropertyBag,
        options: TweenOptions,
    ) -> Self {
        let TweenOptions { config, callbacks } = options;
        let delay = config.normalized_delay();
        let repeat = config.normalized_repeat();

        let state = TweenState {
            targets,
            from,
            to,
            sets: Vec::new(),
            easing: config.easing(),
            callbacks,
            duration: if duration.is_finite() {
                duration.max(0.0)
            } else {
                0.0
            },
            delay,
            delay_remaining: delay,
            elapsed: 0.0,
            progress: 0.0,
            direction: Direction::Forward,
            repeat,
            repeat_remaining: repeat,
            repeat_delay: config.normalized_repeat_delay(),
            yoyo: config.yoyo,
            time_scale: config.normalized_time_scale(),
            running: config.auto_start,
            alive: true,
            queued: false,
            started: false,
            needs_sync: true,
            driven_at: None,
        };

        Self {
            state: Rc::new(RefCell::new(state)),
            runtime: Rc::downgrade(runtime),
        }
    }

    // =========================================================================
    // Frame update
    // =========================================================================

    /// Advance by `dt` seconds of wall time
    pub(crate) fn tick(&self, dt: f64) {
        // Delay
        let step = {
            let mut state = self.state.borrow_mut();
            let mut step = dt * state.time_scale;
            if state.delay_remaining > 0.0 {
                let consumed = step.clamp(0.0, state.delay_remaining);
                state.delay_remaining -= consumed;
                step -= consumed;
            }
            if state.delay_remaining > 0.0 {
                return;
            }
            step
        };

        // Activation
        let (sync, first) = {
            let mut state = self.state.borrow_mut();
            let sync = std::mem::take(&mut state.needs_sync);
            let first = !state.started;
            state.started = true;
            (sync, first)
        };
        if sync {
            self.sync_and_claim();
        }
        if first {
            self.emit(Event::Start);
        }

        // Advance and write
        let written = {
            let mut state = self.state.borrow_mut();
            if !state.alive {
                return;
            }
            state.elapsed = (state.elapsed + step * state.direction.sign()).max(0.0);
            state.update_progress();
            state.write()
        };

        if written == 0 {
            debug!("every property was taken over, killing tween");
            self.kill();
            return;
        }
        self.emit(Event::Update);

        self.finish_cycle();
    }

    fn finish_cycle(&self) {
        let event = {
            let mut state = self.state.borrow_mut();
            if !state.alive || !state.at_cycle_boundary() {
                return;
            }

            if state.repeat_remaining == 0 {
                state.alive = false;
                state.running = false;
                debug!(elapsed = state.elapsed, "tween completed");
                Event::Complete
            } else {
                if state.repeat_remaining > 0 {
                    state.repeat_remaining -= 1;
                }
                if state.yoyo {
                    state.elapsed = state.elapsed.clamp(0.0, state.duration);
                    state.direction = state.direction.reversed();
                } else {
                    state.elapsed = match state.direction {
                        Direction::Forward => 0.0,
                        Direction::Backward => state.duration,
                    };
                }
                state.delay_remaining = state.repeat_delay;
                Event::Repeat
            }
        };
        self.emit(event);
    }

    /// Drive to `local` seconds since the tween's slot in a timeline began
    ///
    /// Lifecycle callbacks fire only when `notify` is set.
    pub(crate) fn drive(&self, local: f64, notify: bool) {
        let (sync, first, completed) = {
            let mut state = self.state.borrow_mut();
            if !state.alive {
                return;
            }
            let time = local * state.time_scale - state.delay;
            state.elapsed = state.cycle_elapsed(time);
            state.direction = Direction::Forward;
            state.update_progress();

            let end = state.slot_duration();
            let previous = state.driven_at.replace(local);
            let completed = previous.map_or(local >= end, |prev| prev < end && local >= end);

            let sync = std::mem::take(&mut state.needs_sync);
            let first = !state.started;
            state.started = true;
            (sync, first, completed)
        };

        if sync {
            self.refresh_bindings();
        }
        self.claim();
        let written = self.state.borrow_mut().write();
        if !notify {
            return;
        }

        if first {
            self.emit(Event::Start);
        }
        if written > 0 {
            self.emit(Event::Update);
        }
        if completed {
            self.emit(Event::Complete);
        }
    }

    fn emit(&self, event: Event) {
        let (callback, targets) = {
            let state = self.state.borrow();
            match state.callback(event) {
                Some(callback) => (callback, state.targets.clone()),
                None => return,
            }
        };
        callback(&targets);
    }

    fn refresh_bindings(&self) {
        self.state.borrow_mut().refresh();
    }

    fn claim(&self) {
        let Some(runtime) = self.runtime.upgrade() else {
            return;
        };
        let state = self.state.borrow();
        let mut registry = runtime.registry.borrow_mut();
        for set in &state.sets {
            set.claim(&mut registry);
        }
    }

    /// Re-read live values, then take ownership of every bound property
    fn sync_and_claim(&self) {
        self.refresh_bindings();
        self.claim();
    }

    fn release(&self) {
        let Some(runtime) = self.runtime.upgrade() else {
            return;
        };
        let state = self.state.borrow();
        let mut registry = runtime.registry.borrow_mut();
        for set in &state.sets {
            set.release(&mut registry);
        }
    }

    /// Rebuild bindings and request a sync on the next activation
    fn rebind(&self) {
        self.release();
        let mut state = self.state.borrow_mut();
        state.rebuild();
        state.needs_sync = true;
        state.started = false;
    }

    /// Insert into the runtime's active list if not already there
    pub(crate) fn enqueue(&self) {
        if self.state.borrow().queued {
            return;
        }
        self.rebind();
        self.state.borrow_mut().queued = true;
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.tweens.borrow_mut().push(self.clone());
        }
    }

    /// Called by the runtime after removing a dead tween from its list
    pub(crate) fn detach(&self) {
        self.state.borrow_mut().queued = false;
        self.release();
    }

    pub(crate) fn should_tick(&self) -> bool {
        let state = self.state.borrow();
        state.running && state.queued
    }

    // =========================================================================
    // Playback control
    // =========================================================================

    pub fn pause(&self) -> &Self {
        self.state.borrow_mut().running = false;
        self
    }

    /// Resume ticking; a parked tween is re-queued and rebound
    pub fn resume(&self) -> &Self {
        self.state.borrow_mut().running = true;
        self.enqueue();
        self
    }

    /// Remove from the runtime's active list without killing
    pub fn stop(&self) -> &Self {
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.tweens.borrow_mut().retain(|tween| tween != self);
        }
        self.state.borrow_mut().queued = false;
        self
    }

    /// Mark the tween dead; the runtime drops it on its next pass
    pub fn kill(&self) -> &Self {
        let mut state = self.state.borrow_mut();
        state.alive = false;
        state.running = false;
        self
    }

    /// Stop animating the named properties; an empty list kills the tween
    pub fn kill_properties(&self, names: &[&str]) -> &Self {
        if names.is_empty() {
            return self.kill();
        }
        if let Some(runtime) = self.runtime.upgrade() {
            let state = self.state.borrow();
            let mut registry = runtime.registry.borrow_mut();
            for set in &state.sets {
                set.kill_properties(names, &mut registry);
            }
        } else {
            let state = self.state.borrow();
            for binding in state.sets.iter().flat_map(|set| set.bindings()) {
                if names.contains(&binding.name()) {
                    binding.disable();
                }
            }
        }
        self
    }

    /// Reset to the beginning and resume
    ///
    /// With `account_for_delay` the initial delay is waited out again. With
    /// `immediate_render`, or while a delay is pending, the start state is
    /// written right away.
    pub fn restart(&self, account_for_delay: bool, immediate_render: bool) -> &Self {
        let render = {
            let mut state = self.state.borrow_mut();
            state.elapsed = 0.0;
            state.progress = 0.0;
            state.delay_remaining = if account_for_delay { state.delay } else { 0.0 };
            state.alive = true;
            state.direction = Direction::Forward;
            state.repeat_remaining = state.repeat;
            state.running = true;
            state.driven_at = None;
            immediate_render || state.delay_remaining > 0.0
        };

        if self.state.borrow().queued {
            self.rebind();
        } else {
            self.enqueue();
        }
        if render {
            self.render();
        }
        self
    }

    pub fn reverse(&self) -> &Self {
        let mut state = self.state.borrow_mut();
        state.direction = state.direction.reversed();
        self
    }

    /// Set the time scale; non-positive or non-finite values are ignored
    pub fn set_time_scale(&self, scale: f64) -> &Self {
        if scale.is_finite() && scale > 0.0 {
            self.state.borrow_mut().time_scale = scale;
        }
        self
    }

    pub fn set_delay(&self, seconds: f64) -> &Self {
        if seconds.is_finite() {
            let mut state = self.state.borrow_mut();
            state.delay = seconds.max(0.0);
            state.delay_remaining = state.delay;
        }
        self
    }

    /// Seek to a fraction of the duration
    pub fn seek_progress(&self, progress: f64, account_for_delay: bool) -> &Self {
        self.seek(progress, account_for_delay, false)
    }

    /// Seek to a time in seconds
    pub fn seek_time(&self, seconds: f64, account_for_delay: bool) -> &Self {
        self.seek(seconds, account_for_delay, true)
    }

    fn seek(&self, position: f64, account_for_delay: bool, in_seconds: bool) -> &Self {
        if !position.is_finite() {
            return self;
        }
        let mut state = self.state.borrow_mut();
        let total = if account_for_delay {
            state.duration + state.delay
        } else {
            state.duration
        };
        let time = if in_seconds {
            position.clamp(0.0, total)
        } else {
            position.clamp(0.0, 1.0) * total
        };

        if account_for_delay {
            state.delay_remaining = (state.delay - time).max(0.0);
            state.elapsed = (time - state.delay).max(0.0);
        } else {
            state.elapsed = time;
        }
        state.update_progress();
        self
    }

    /// Write the current state synchronously without firing callbacks
    pub fn render(&self) -> &Self {
        if std::mem::take(&mut self.state.borrow_mut().needs_sync) {
            self.refresh_bindings();
        }
        self.claim();
        let mut state = self.state.borrow_mut();
        state.update_progress();
        state.write();
        self
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Total wall time including delay and repeats, scaled by the time scale
    ///
    /// Unlimited repeats report `f64::INFINITY`.
    pub fn duration(&self) -> f64 {
        self.state.borrow().total_duration()
    }

    /// Seconds the tween occupies when placed in a timeline
    pub(crate) fn slot_duration(&self) -> f64 {
        self.state.borrow().slot_duration()
    }

    /// Elapsed time within the current cycle
    pub fn elapsed(&self) -> f64 {
        self.state.borrow().elapsed
    }

    pub fn progress(&self) -> f64 {
        self.state.borrow().progress
    }

    pub fn direction(&self) -> Direction {
        self.state.borrow().direction
    }

    pub fn delay_remaining(&self) -> f64 {
        self.state.borrow().delay_remaining
    }

    pub fn time_scale(&self) -> f64 {
        self.state.borrow().time_scale
    }

    /// Remaining repeats; `-1` means unlimited
    pub fn repeat_remaining(&self) -> i32 {
        self.state.borrow().repeat_remaining
    }

    pub fn is_alive(&self) -> bool {
        self.state.borrow().alive
    }

    pub fn is_running(&self) -> bool {
        self.state.borrow().running
    }

    /// Whether the tween sits in its runtime's active list
    pub fn is_queued(&self) -> bool {
        self.state.borrow().queued
    }

    pub fn targets(&self) -> TargetList {
        self.state.borrow().targets.clone()
    }

    /// Number of bindings still eligible for writes
    pub fn active_bindings(&self) -> usize {
        self.state
            .borrow()
            .sets
            .iter()
            .flat_map(|set| set.bindings())
            .filter(|binding| binding.is_active())
            .count()
    }

    pub fn animates(&self, target: &Target) -> bool {
        self.state.borrow().targets.iter().any(|t| t == target)
    }
}

impl PartialEq for Tween {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl fmt::Debug for Tween {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Tween")
            .field("targets", &state.targets)
            .field("duration", &state.duration)
            .field("elapsed", &state.elapsed)
            .field("progress", &state.progress)
            .field("direction", &state.direction)
            .field("alive", &state.alive)
            .field("running", &state.running)
            .finish()
    }
}
