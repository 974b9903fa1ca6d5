//! Timeline player
//!
//! A timeline holds a set of labelled [`Definition`]s, compiles the line
//! starting at its play label into a [`CompiledSchedule`], and advances
//! through it on a dedicated [`Ticker`]. Tweens handed to a timeline leave
//! their runtime's active list and are driven by the timeline instead.
//!
//! ```rust
//! use tweenline_animation::{Definition, Runtime, RuntimeConfig, TimelineConfig, TweenOptions};
//! use tweenline_core::{PropertyBag, Target};
//!
//! let runtime = Runtime::new(RuntimeConfig::manual());
//! let ball = Target::new(PropertyBag::new().with("x", 0.0).with("y", 0.0));
//! let right = runtime.to(&ball, 1.0, PropertyBag::from([("x", 100.0)]), TweenOptions::new()).unwrap();
//! let down = runtime.to(&ball, 2.0, PropertyBag::from([("y", 50.0)]), TweenOptions::new()).unwrap();
//!
//! let timeline = runtime.timeline(TimelineConfig::default());
//! timeline.define("right", right).unwrap();
//! timeline.define("down", down).unwrap();
//! timeline.define("intro", Definition::sequence(["right", "down"])).unwrap();
//!
//! timeline.play("intro");
//! assert_eq!(timeline.duration(), 3.0);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, warn};
use tweenline_core::{Result, TweenError};

use crate::config::TimelineConfig;
use crate::runtime::Runtime;
use crate::schedule::{compile, CompiledSchedule, Cue, Definition, TimelineItem};
use crate::ticker::Ticker;
use crate::tween::Direction;

struct TimelineState {
    definitions: IndexMap<String, Definition>,
    schedule: CompiledSchedule,
    dirty: bool,
    start_label: String,
    elapsed: f64,
    direction: Direction,
    time_scale: f64,
    finished: bool,
}

impl TimelineState {
    /// Label to compile from; an empty play label means the first definition
    fn resolved_label(&self) -> Option<&str> {
        if self.start_label.is_empty() {
            self.definitions.keys().next().map(String::as_str)
        } else {
            Some(self.start_label.as_str())
        }
    }

    fn ensure_compiled(&mut self) {
        if !self.dirty {
            return;
        }
        self.dirty = false;
        self.schedule = match self.resolved_label() {
            Some(label) => compile(&self.definitions, label).unwrap_or_else(|err| {
                warn!(label, error = %err, "timeline failed to compile, playing nothing");
                CompiledSchedule::default()
            }),
            None => CompiledSchedule::default(),
        };
        debug!(
            items = self.schedule.items().len(),
            duration = self.schedule.duration(),
            "timeline compiled"
        );
    }

    fn at_bound(&self) -> bool {
        match self.direction {
            Direction::Forward => self.elapsed >= self.schedule.duration(),
            Direction::Backward => self.elapsed <= 0.0,
        }
    }

    fn validate(&self, label: &str, definition: &Definition) -> Result<()> {
        let invalid = |reason: String| TweenError::InvalidTimelineItem {
            label: label.to_string(),
            reason,
        };

        if label.is_empty() {
            return Err(invalid("label must not be empty".to_string()));
        }
        match definition {
            Definition::Delay(seconds) if !seconds.is_finite() => {
                Err(invalid(format!("delay {seconds} is not finite")))
            }
            Definition::Sequence(items) => self.validate_line(items).map_err(invalid),
            Definition::Parallel(branches) => validate_block(branches).map_err(invalid),
            _ => Ok(()),
        }
    }

    fn validate_line(&self, items: &[Definition]) -> std::result::Result<(), String> {
        for item in items {
            match item {
                Definition::Label(label) if !self.definitions.contains_key(label) => {
                    return Err(format!("unknown label `{label}` in sequence"));
                }
                Definition::Delay(seconds) if !seconds.is_finite() => {
                    return Err(format!("delay {seconds} is not finite"));
                }
                Definition::Sequence(nested) => self.validate_line(nested)?,
                Definition::Parallel(branches) => validate_block(branches)?,
                _ => {}
            }
        }
        Ok(())
    }
}

fn validate_block(branches: &IndexMap<String, f64>) -> std::result::Result<(), String> {
    match branches.iter().find(|(_, offset)| !offset.is_finite()) {
        Some((label, offset)) => Err(format!("offset {offset} of `{label}` is not a number")),
        None => Ok(()),
    }
}

/// Handle to a timeline
///
/// Clones control the same timeline.
#[derive(Clone)]
pub struct Timeline {
    state: Rc<RefCell<TimelineState>>,
    ticker: Ticker,
}

impl Timeline {
    pub(crate) fn new(runtime: &Runtime, config: TimelineConfig) -> Self {
        let time_scale = if config.time_scale.is_finite() && config.time_scale > 0.0 {
            config.time_scale
        } else {
            1.0
        };
        let state = Rc::new(RefCell::new(TimelineState {
            definitions: IndexMap::new(),
            schedule: CompiledSchedule::default(),
            dirty: true,
            start_label: String::new(),
            elapsed: 0.0,
            direction: Direction::Forward,
            time_scale,
            finished: false,
        }));

        let ticker = runtime.insert_ticker(config.fps, None);
        ticker.pause();

        let weak = Rc::downgrade(&state);
        let driver = ticker.clone();
        ticker.set_callback(Box::new(move |dt| {
            if let Some(state) = weak.upgrade() {
                let timeline = Timeline {
                    state,
                    ticker: driver.clone(),
                };
                timeline.tick(dt);
            }
        }));

        Self { state, ticker }
    }

    /// Register `definition` under `label`
    ///
    /// Rejected definitions are not registered. Tweens in the definition are
    /// removed from the runtime's active list.
    pub fn define(&self, label: impl Into<String>, definition: impl Into<Definition>) -> Result<()> {
        let label = label.into();
        let definition = definition.into();

        let mut state = self.state.borrow_mut();
        if let Err(err) = state.validate(&label, &definition) {
            warn!(label = %label, error = %err, "timeline definition rejected");
            return Err(err);
        }

        for tween in definition.tweens() {
            tween.stop();
        }
        state.definitions.insert(label, definition);
        state.dirty = true;
        Ok(())
    }

    /// Advance by `dt` seconds of wall time
    ///
    /// Called by the timeline's ticker; may be called directly for manual stepping.
    pub fn tick(&self, dt: f64) {
        let (cues, finished) = {
            let mut state = self.state.borrow_mut();
            if state.finished {
                (Vec::new(), true)
            } else {
                state.ensure_compiled();
                let duration = state.schedule.duration();
                let prev = state.elapsed;
                let step = dt * state.time_scale * state.direction.sign();
                let next = (prev + step).clamp(0.0, duration);
                state.elapsed = next;

                let cues = state.schedule.cues(prev, next, state.direction);
                state.finished = state.at_bound();
                (cues, state.finished)
            }
        };

        for cue in cues {
            match cue {
                Cue::Drive(tween, local) => tween.drive(local, true),
                Cue::Call(callback) => callback(self),
            }
        }

        if finished {
            self.ticker.pause();
        }
    }

    /// Play the line starting at `label`, rewinding if already at its end
    pub fn play(&self, label: &str) -> &Self {
        {
            let mut state = self.state.borrow_mut();
            if state.start_label != label {
                state.start_label = label.to_string();
                state.dirty = true;
            }
            state.ensure_compiled();
            if state.at_bound() {
                state.elapsed = match state.direction {
                    Direction::Forward => 0.0,
                    Direction::Backward => state.schedule.duration(),
                };
            }
            state.finished = false;
        }
        self.ticker.resume();
        self
    }

    pub fn pause(&self) -> &Self {
        self.ticker.pause();
        self
    }

    pub fn resume(&self) -> &Self {
        self.ticker.resume();
        self
    }

    /// Stop the timeline's ticker for good
    pub fn kill(&self) -> &Self {
        self.ticker.kill();
        self
    }

    pub fn reverse(&self) -> &Self {
        let mut state = self.state.borrow_mut();
        state.direction = state.direction.reversed();
        state.finished = false;
        self
    }

    /// Set the time scale; non-positive or non-finite values are ignored
    pub fn set_time_scale(&self, scale: f64) -> &Self {
        if scale.is_finite() && scale > 0.0 {
            self.state.borrow_mut().time_scale = scale;
        }
        self
    }

    /// Jump to a fraction of the total duration
    ///
    /// Tweens that have started by the new position are rendered there.
    /// Timeline callbacks are not fired.
    pub fn seek_progress(&self, progress: f64) -> &Self {
        if !progress.is_finite() {
            return self;
        }
        let renders = {
            let mut state = self.state.borrow_mut();
            state.ensure_compiled();
            let duration = state.schedule.duration();
            if !duration.is_finite() {
                return self;
            }
            state.elapsed = progress.clamp(0.0, 1.0) * duration;
            state.finished = false;
            state.schedule.renders_at(state.elapsed)
        };
        for (tween, local) in renders {
            tween.drive(local, false);
        }
        self
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn duration(&self) -> f64 {
        let mut state = self.state.borrow_mut();
        state.ensure_compiled();
        state.schedule.duration()
    }

    pub fn elapsed(&self) -> f64 {
        self.state.borrow().elapsed
    }

    /// Elapsed time as a fraction of the duration
    pub fn progress(&self) -> f64 {
        let duration = self.duration();
        if duration.is_finite() && duration > 0.0 {
            self.elapsed() / duration
        } else {
            1.0
        }
    }

    pub fn direction(&self) -> Direction {
        self.state.borrow().direction
    }

    pub fn time_scale(&self) -> f64 {
        self.state.borrow().time_scale
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_running()
    }

    /// Whether playback reached the end in the current direction
    pub fn is_finished(&self) -> bool {
        self.state.borrow().finished
    }

    /// The compiled schedule items, in start order
    pub fn items(&self) -> Vec<TimelineItem> {
        let mut state = self.state.borrow_mut();
        state.ensure_compiled();
        state.schedule.items().to_vec()
    }

    pub fn labels(&self) -> Vec<String> {
        self.state.borrow().definitions.keys().cloned().collect()
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }
}

impl fmt::Debug for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Timeline")
            .field("labels", &state.definitions.len())
            .field("start_label", &state.start_label)
            .field("elapsed", &state.elapsed)
            .field("direction", &state.direction)
            .field("finished", &state.finished)
            .finish()
    }
}
