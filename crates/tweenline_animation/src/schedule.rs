//! Timeline compiler
//!
//! Resolves a label graph of timeline [`Definition`]s into a flat list of
//! [`TimelineItem`]s with absolute start and end times.
//!
//! Walking a resolved line keeps a running offset:
//!
//! - a delay moves the offset forward (or back, if negative)
//! - a tween occupies `[offset, offset + duration]` and moves the offset to its end;
//!   a tween that repeats forever occupies a single cycle
//! - a callback occupies the instant at the offset
//! - a parallel block computes each branch at `offset + relative`, then moves
//!   the offset by the block's span, pulled back by the most negative branch offset
//!
//! The final schedule is shifted so that its earliest item starts at zero.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tweenline_core::{Result, TweenError};

use crate::timeline::Timeline;
use crate::tween::{Direction, Tween};

/// Callback fired when a timeline crosses its position
pub type TimelineCallback = Rc<dyn Fn(&Timeline)>;

/// One entry in a timeline's label graph
#[derive(Clone)]
pub enum Definition {
    Tween(Tween),
    Callback(TimelineCallback),
    /// Seconds to shift the following items by
    Delay(f64),
    /// Items played back to back
    Sequence(Vec<Definition>),
    /// Labels started together at relative offsets
    Parallel(IndexMap<String, f64>),
    /// Reference to another label
    Label(String),
}

impl Definition {
    pub fn callback<F: Fn(&Timeline) + 'static>(callback: F) -> Self {
        Definition::Callback(Rc::new(callback))
    }

    pub fn sequence<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Definition>,
    {
        Definition::Sequence(items.into_iter().map(Into::into).collect())
    }

    pub fn parallel<I, K>(branches: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        Definition::Parallel(
            branches
                .into_iter()
                .map(|(label, offset)| (label.into(), offset))
                .collect(),
        )
    }

    /// Every tween reachable without following labels
    pub(crate) fn tweens(&self) -> Vec<&Tween> {
        let mut found = Vec::new();
        self.collect_tweens(&mut found);
        found
    }

    fn collect_tweens<'a>(&'a self, found: &mut Vec<&'a Tween>) {
        match self {
            Definition::Tween(tween) => found.push(tween),
            Definition::Sequence(items) => {
                for item in items {
                    item.collect_tweens(found);
                }
            }
            _ => {}
        }
    }
}

impl From<Tween> for Definition {
    fn from(tween: Tween) -> Self {
        Definition::Tween(tween)
    }
}

impl From<&Tween> for Definition {
    fn from(tween: &Tween) -> Self {
        Definition::Tween(tween.clone())
    }
}

impl From<f64> for Definition {
    fn from(seconds: f64) -> Self {
        Definition::Delay(seconds)
    }
}

impl From<&str> for Definition {
    fn from(label: &str) -> Self {
        Definition::Label(label.to_string())
    }
}

impl From<String> for Definition {
    fn from(label: String) -> Self {
        Definition::Label(label)
    }
}

impl From<Vec<Definition>> for Definition {
    fn from(items: Vec<Definition>) -> Self {
        Definition::Sequence(items)
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Definition::Tween(tween) => f.debug_tuple("Tween").field(tween).finish(),
            Definition::Callback(_) => f.write_str("Callback"),
            Definition::Delay(seconds) => f.debug_tuple("Delay").field(seconds).finish(),
            Definition::Sequence(items) => f.debug_tuple("Sequence").field(items).finish(),
            Definition::Parallel(branches) => f.debug_tuple("Parallel").field(branches).finish(),
            Definition::Label(label) => f.debug_tuple("Label").field(label).finish(),
        }
    }
}

/// What a compiled item plays
#[derive(Clone)]
pub enum ScheduledItem {
    Tween(Tween),
    Callback(TimelineCallback),
}

impl fmt::Debug for ScheduledItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduledItem::Tween(tween) => f.debug_tuple("Tween").field(tween).finish(),
            ScheduledItem::Callback(_) => f.write_str("Callback"),
        }
    }
}

/// An item placed on the timeline at absolute times
#[derive(Clone, Debug)]
pub struct TimelineItem {
    pub item: ScheduledItem,
    pub start: f64,
    /// Equal to `start` for callbacks
    pub end: f64,
}

impl TimelineItem {
    pub fn is_tween(&self) -> bool {
        matches!(self.item, ScheduledItem::Tween(_))
    }

    pub fn tween(&self) -> Option<&Tween> {
        match &self.item {
            ScheduledItem::Tween(tween) => Some(tween),
            ScheduledItem::Callback(_) => None,
        }
    }

    fn local_time(&self, time: f64) -> f64 {
        (time - self.start).clamp(0.0, self.end - self.start)
    }
}

/// Work the player performs for one step
#[derive(Clone)]
pub(crate) enum Cue {
    Drive(Tween, f64),
    Call(TimelineCallback),
}

/// Flattened, time-ordered schedule
#[derive(Clone, Debug, Default)]
pub struct CompiledSchedule {
    items: Vec<TimelineItem>,
    duration: f64,
}

impl CompiledSchedule {
    pub fn items(&self) -> &[TimelineItem] {
        &self.items
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Work for a step from `prev` to `next`
    ///
    /// Tweens overlapping the stepped window are driven to their local time
    /// at `next`. Callbacks fire when their instant is crossed in the
    /// direction of travel, including an instant that coincides with the
    /// bound the step lands on.
    pub(crate) fn cues(&self, prev: f64, next: f64, direction: Direction) -> Vec<Cue> {
        let (lo, hi) = if prev <= next { (prev, next) } else { (next, prev) };

        self.items
            .iter()
            .filter_map(|item| match &item.item {
                ScheduledItem::Tween(tween) => (item.end >= lo && item.start <= hi)
                    .then(|| Cue::Drive(tween.clone(), item.local_time(next))),
                ScheduledItem::Callback(callback) => self
                    .crosses(item.start, prev, next, direction)
                    .then(|| Cue::Call(callback.clone())),
            })
            .collect()
    }

    fn crosses(&self, at: f64, prev: f64, next: f64, direction: Direction) -> bool {
        match direction {
            Direction::Forward => {
                at >= prev && (at < next || (next >= self.duration && at <= next))
            }
            Direction::Backward => at <= prev && (at > next || (next <= 0.0 && at >= next)),
        }
    }

    /// Tweens to render when jumping to `time`, in schedule order
    pub(crate) fn renders_at(&self, time: f64) -> Vec<(Tween, f64)> {
        self.items
            .iter()
            .filter(|item| item.start <= time)
            .filter_map(|item| item.tween().map(|t| (t.clone(), item.local_time(time))))
            .collect()
    }
}

/// Compile the line reachable from `label`
pub fn compile(definitions: &IndexMap<String, Definition>, label: &str) -> Result<CompiledSchedule> {
    let mut items = Vec::new();
    Resolver::new(definitions).compute(label, 0.0, &mut items)?;

    let duration = span(&items);
    let min_start = items.iter().map(|i| i.start).fold(f64::INFINITY, f64::min);
    if min_start.is_finite() && min_start != 0.0 {
        for item in &mut items {
            item.start -= min_start;
            item.end -= min_start;
        }
    }
    items.sort_by(|a, b| a.start.total_cmp(&b.start));

    Ok(CompiledSchedule { items, duration })
}

/// `max(end) - min(start)`, zero for no items
fn span(items: &[TimelineItem]) -> f64 {
    if items.is_empty() {
        return 0.0;
    }
    let min_start = items.iter().map(|i| i.start).fold(f64::INFINITY, f64::min);
    let max_end = items.iter().map(|i| i.end).fold(f64::NEG_INFINITY, f64::max);
    max_end - min_start
}

/// A resolved entry of a line
enum Step<'a> {
    Tween(&'a Tween),
    Callback(&'a TimelineCallback),
    Delay(f64),
    Parallel(&'a IndexMap<String, f64>),
}

struct Resolver<'a> {
    definitions: &'a IndexMap<String, Definition>,
    /// Labels being resolved, innermost last
    stack: Vec<&'a str>,
}

impl<'a> Resolver<'a> {
    fn new(definitions: &'a IndexMap<String, Definition>) -> Self {
        Self {
            definitions,
            stack: Vec::new(),
        }
    }

    fn enter(&mut self, label: &str) -> Result<&'a Definition> {
        let Some((key, definition)) = self.definitions.get_key_value(label) else {
            return Err(TweenError::UnknownLabel(label.to_string()));
        };
        if self.stack.iter().any(|entry| *entry == label) {
            return Err(TweenError::LabelCycle(label.to_string()));
        }
        self.stack.push(key.as_str());
        Ok(definition)
    }

    fn exit(&mut self) {
        self.stack.pop();
    }

    /// Inline labels and nested sequences into `line`
    fn flatten(&mut self, definition: &'a Definition, line: &mut Vec<Step<'a>>) -> Result<()> {
        match definition {
            Definition::Tween(tween) => line.push(Step::Tween(tween)),
            Definition::Callback(callback) => line.push(Step::Callback(callback)),
            Definition::Delay(seconds) => line.push(Step::Delay(*seconds)),
            Definition::Parallel(branches) => line.push(Step::Parallel(branches)),
            Definition::Sequence(items) => {
                for item in items {
                    self.flatten(item, line)?;
                }
            }
            Definition::Label(label) => {
                let target = self.enter(label)?;
                let flattened = self.flatten(target, line);
                self.exit();
                flattened?;
            }
        }
        Ok(())
    }

    fn compute(&mut self, label: &str, mut offset: f64, out: &mut Vec<TimelineItem>) -> Result<()> {
        let definition = self.enter(label)?;
        let result = self.walk(definition, &mut offset, out);
        self.exit();
        result
    }

    fn walk(
        &mut self,
        definition: &'a Definition,
        offset: &mut f64,
        out: &mut Vec<TimelineItem>,
    ) -> Result<()> {
        let mut line = Vec::new();
        self.flatten(definition, &mut line)?;

        for step in line {
            match step {
                Step::Delay(seconds) => *offset += seconds,
                Step::Tween(tween) => {
                    let start = *offset;
                    let end = start + tween.slot_duration();
                    out.push(TimelineItem {
                        item: ScheduledItem::Tween(tween.clone()),
                        start,
                        end,
                    });
                    *offset = end;
                }
                Step::Callback(callback) => out.push(TimelineItem {
                    item: ScheduledItem::Callback(callback.clone()),
                    start: *offset,
                    end: *offset,
                }),
                Step::Parallel(branches) => {
                    let mut block = Vec::new();
                    let mut min_relative = 0.0_f64;
                    for (branch, relative) in branches {
                        min_relative = min_relative.min(*relative);
                        self.compute(branch, *offset + relative, &mut block)?;
                    }
                    *offset += span(&block) + min_relative;
                    out.append(&mut block);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RuntimeConfig, TweenOptions};
    use crate::runtime::Runtime;
    use tweenline_core::{PropertyBag, Target};

    fn tween(runtime: &Runtime, duration: f64) -> Tween {
        let target = Target::new(PropertyBag::new().with("x", 0.0));
        runtime
            .to(&target, duration, PropertyBag::from([("x", 1.0)]), TweenOptions::new())
            .unwrap()
    }

    fn spans(schedule: &CompiledSchedule) -> Vec<(f64, f64)> {
        schedule.items().iter().map(|i| (i.start, i.end)).collect()
    }

    #[test]
    fn test_sequence_places_back_to_back() {
        let rt = Runtime::new(RuntimeConfig::manual());
        let mut defs = IndexMap::new();
        defs.insert(
            "main".to_string(),
            Definition::sequence([tween(&rt, 1.0), tween(&rt, 2.0)]),
        );

        let schedule = compile(&defs, "main").unwrap();
        assert_eq!(spans(&schedule), vec![(0.0, 1.0), (1.0, 3.0)]);
        assert_eq!(schedule.duration(), 3.0);
    }

    #[test]
    fn test_delays_and_callbacks() {
        let rt = Runtime::new(RuntimeConfig::manual());
        let mut defs = IndexMap::new();
        defs.insert(
            "main".to_string(),
            Definition::Sequence(vec![
                Definition::callback(|_| {}),
                Definition::Delay(0.5),
                tween(&rt, 1.0).into(),
                Definition::callback(|_| {}),
                Definition::Delay(2.0),
            ]),
        );

        let schedule = compile(&defs, "main").unwrap();
        assert_eq!(spans(&schedule), vec![(0.0, 0.0), (0.5, 1.5), (1.5, 1.5)]);
        // trailing delays place nothing
        assert_eq!(schedule.duration(), 1.5);
    }

    #[test]
    fn test_leading_delay_is_shifted_out() {
        let rt = Runtime::new(RuntimeConfig::manual());
        let mut defs = IndexMap::new();
        defs.insert(
            "main".to_string(),
            Definition::Sequence(vec![Definition::Delay(1.0), tween(&rt, 1.0).into()]),
        );

        let schedule = compile(&defs, "main").unwrap();
        assert_eq!(spans(&schedule), vec![(0.0, 1.0)]);
        assert_eq!(schedule.duration(), 1.0);
    }

    #[test]
    fn test_unlimited_repeat_occupies_one_cycle() {
        let rt = Runtime::new(RuntimeConfig::manual());
        let target = Target::new(PropertyBag::new().with("x", 0.0));
        let forever = rt
            .to(
                &target,
                1.0,
                PropertyBag::from([("x", 1.0)]),
                TweenOptions::new().yoyo(true),
            )
            .unwrap();
        let mut defs = IndexMap::new();
        defs.insert(
            "main".to_string(),
            Definition::sequence([forever, tween(&rt, 0.5)]),
        );

        let schedule = compile(&defs, "main").unwrap();
        assert_eq!(spans(&schedule), vec![(0.0, 1.0), (1.0, 1.5)]);
        assert_eq!(schedule.duration(), 1.5);
    }

    #[test]
    fn test_parallel_block_offsets() {
        let rt = Runtime::new(RuntimeConfig::manual());
        let mut defs = IndexMap::new();
        defs.insert("a".to_string(), Definition::Tween(tween(&rt, 1.0)));
        defs.insert("b".to_string(), Definition::Tween(tween(&rt, 1.0)));
        defs.insert(
            "block".to_string(),
            Definition::parallel([("a", 0.0), ("b", 0.5)]),
        );

        let schedule = compile(&defs, "block").unwrap();
        assert_eq!(spans(&schedule), vec![(0.0, 1.0), (0.5, 1.5)]);
        assert_eq!(schedule.duration(), 1.5);
    }

    #[test]
    fn test_negative_offsets_shift_schedule() {
        let rt = Runtime::new(RuntimeConfig::manual());
        let mut defs = IndexMap::new();
        defs.insert("a".to_string(), Definition::Tween(tween(&rt, 1.0)));
        defs.insert("b".to_string(), Definition::Tween(tween(&rt, 1.0)));
        defs.insert("c".to_string(), Definition::Tween(tween(&rt, 1.0)));
        defs.insert(
            "main".to_string(),
            Definition::Sequence(vec![
                Definition::parallel([("a", 0.0), ("b", -0.5)]),
                Definition::from("c"),
            ]),
        );

        let schedule = compile(&defs, "main").unwrap();
        // b [-0.5, 0.5], a [0, 1]; the block spans 1.5 and pulls back 0.5,
        // so c starts at 1.0 before the shift
        assert_eq!(spans(&schedule), vec![(0.0, 1.0), (0.5, 1.5), (1.5, 2.5)]);
        assert_eq!(schedule.duration(), 2.5);
    }

    #[test]
    fn test_nested_parallel_blocks() {
        let rt = Runtime::new(RuntimeConfig::manual());
        let mut defs = IndexMap::new();
        for label in ["a", "b", "c", "d", "e", "f"] {
            defs.insert(label.to_string(), Definition::Tween(tween(&rt, 1.0)));
        }
        defs.insert(
            "inner".to_string(),
            Definition::parallel([("a", 0.0), ("b", -0.5)]),
        );
        defs.insert(
            "branch".to_string(),
            Definition::sequence(["c", "inner", "d"]),
        );
        defs.insert(
            "outer".to_string(),
            Definition::parallel([("branch", 0.0), ("e", -0.25)]),
        );
        defs.insert("main".to_string(), Definition::sequence(["outer", "f"]));

        let schedule = compile(&defs, "main").unwrap();
        // before the shift: c [0, 1], a [1, 2], b [0.5, 1.5], d [2, 3], e [-0.25, 0.75].
        // inner spans 1.5 and pulls back 0.5, so d starts at 2; outer spans 3.25
        // and pulls back 0.25, so f starts at 3
        assert_eq!(
            spans(&schedule),
            vec![
                (0.0, 1.0),
                (0.25, 1.25),
                (0.75, 1.75),
                (1.25, 2.25),
                (2.25, 3.25),
                (3.25, 4.25),
            ]
        );
        assert_eq!(schedule.duration(), 4.25);

        let f = defs["f"].tweens()[0];
        assert_eq!(schedule.items().last().and_then(TimelineItem::tween), Some(f));
    }

    #[test]
    fn test_label_indirection() {
        let rt = Runtime::new(RuntimeConfig::manual());
        let mut defs = IndexMap::new();
        defs.insert("intro".to_string(), Definition::Tween(tween(&rt, 2.0)));
        defs.insert("alias".to_string(), Definition::from("intro"));
        defs.insert(
            "main".to_string(),
            Definition::Sequence(vec!["alias".into(), Definition::Delay(1.0), "intro".into()]),
        );

        let schedule = compile(&defs, "main").unwrap();
        assert_eq!(spans(&schedule), vec![(0.0, 2.0), (3.0, 5.0)]);
    }

    #[test]
    fn test_cycles_are_reported() {
        let mut defs = IndexMap::new();
        defs.insert("a".to_string(), Definition::from("b"));
        defs.insert("b".to_string(), Definition::Sequence(vec!["a".into()]));
        assert_eq!(
            compile(&defs, "a").unwrap_err(),
            TweenError::LabelCycle("a".to_string())
        );

        let mut defs = IndexMap::new();
        defs.insert("p".to_string(), Definition::parallel([("p", 0.0)]));
        assert_eq!(
            compile(&defs, "p").unwrap_err(),
            TweenError::LabelCycle("p".to_string())
        );
    }

    #[test]
    fn test_unknown_label() {
        let defs = IndexMap::new();
        assert_eq!(
            compile(&defs, "missing").unwrap_err(),
            TweenError::UnknownLabel("missing".to_string())
        );
    }

    #[test]
    fn test_repeated_label_is_not_a_cycle() {
        let rt = Runtime::new(RuntimeConfig::manual());
        let mut defs = IndexMap::new();
        defs.insert("step".to_string(), Definition::Tween(tween(&rt, 1.0)));
        defs.insert(
            "main".to_string(),
            Definition::sequence(["step", "step", "step"]),
        );
        let schedule = compile(&defs, "main").unwrap();
        assert_eq!(schedule.duration(), 3.0);
    }

    #[test]
    fn test_callback_crossing_fires_once_per_pass() {
        let mut defs = IndexMap::new();
        defs.insert(
            "main".to_string(),
            Definition::Sequence(vec![
                Definition::callback(|_| {}),
                Definition::Delay(1.0),
                Definition::callback(|_| {}),
                Definition::Delay(1.0),
                Definition::callback(|_| {}),
            ]),
        );
        let schedule = compile(&defs, "main").unwrap();
        assert_eq!(schedule.duration(), 2.0);

        let calls = |prev, next, dir| {
            schedule
                .cues(prev, next, dir)
                .iter()
                .filter(|cue| matches!(cue, Cue::Call(_)))
                .count()
        };
        assert_eq!(calls(0.0, 1.0, Direction::Forward), 1);
        assert_eq!(calls(1.0, 1.5, Direction::Forward), 1);
        assert_eq!(calls(1.25, 1.75, Direction::Forward), 0);
        // the last instant fires when the step lands on the end
        assert_eq!(calls(1.5, 2.0, Direction::Forward), 1);
        assert_eq!(calls(2.0, 1.5, Direction::Backward), 1);
        assert_eq!(calls(1.5, 0.0, Direction::Backward), 2);
    }
}
