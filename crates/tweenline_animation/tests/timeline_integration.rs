//! Integration tests for timelines
//!
//! These tests verify that:
//! - Sequences and parallel blocks compile to the expected absolute layout
//! - A timeline plays on its own ticker through `Runtime::frame`
//! - Time scale and reverse playback move through the same schedule
//! - Callbacks moved before zero by negative offsets still fire
//! - Tweens that repeat forever take one cycle of the schedule

use std::cell::Cell;
use std::rc::Rc;

use tweenline_animation::{
    Definition, ManualClock, Runtime, RuntimeConfig, ScheduledItem, TimelineConfig, Tween,
    TweenOptions,
};
use tweenline_core::{PropertyBag, Target};

fn slide(runtime: &Runtime, target: &Target, property: &str, duration: f64) -> Tween {
    runtime
        .to(
            target,
            duration,
            PropertyBag::new().with(property, 10.0),
            TweenOptions::new(),
        )
        .unwrap()
}

fn ball() -> Target {
    Target::new(PropertyBag::new().with("x", 0.0).with("y", 0.0))
}

/// A sequence places each item after the previous one
#[test]
fn test_sequence_layout() {
    let runtime = Runtime::new(RuntimeConfig::manual());
    let target = ball();
    let timeline = runtime.timeline(TimelineConfig::default());

    timeline.define("right", slide(&runtime, &target, "x", 1.0)).unwrap();
    timeline.define("down", slide(&runtime, &target, "y", 2.0)).unwrap();
    timeline
        .define("intro", Definition::sequence(["right", "down"]))
        .unwrap();
    timeline.play("intro").pause();

    let spans: Vec<(f64, f64)> = timeline.items().iter().map(|i| (i.start, i.end)).collect();
    assert_eq!(spans, vec![(0.0, 1.0), (1.0, 3.0)]);
    assert_eq!(timeline.duration(), 3.0);
    assert_eq!(runtime.active_count(), 0);
}

/// Parallel offsets are relative to the block start
#[test]
fn test_parallel_layout() {
    let runtime = Runtime::new(RuntimeConfig::manual());
    let target = ball();
    let timeline = runtime.timeline(TimelineConfig::default());

    timeline.define("a", slide(&runtime, &target, "x", 1.0)).unwrap();
    timeline.define("b", slide(&runtime, &target, "y", 1.0)).unwrap();
    timeline
        .define("both", Definition::parallel([("a", 0.0), ("b", 0.5)]))
        .unwrap();
    timeline.play("both").pause();

    let spans: Vec<(f64, f64)> = timeline.items().iter().map(|i| (i.start, i.end)).collect();
    assert_eq!(spans, vec![(0.0, 1.0), (0.5, 1.5)]);
    assert_eq!(timeline.duration(), 1.5);
}

/// The timeline's ticker runs from `Runtime::frame` until the end
#[test]
fn test_frames_drive_timeline_to_completion() {
    let clock = ManualClock::new();
    let runtime = Runtime::with_clock(RuntimeConfig::manual(), clock.clone());
    let target = ball();
    let timeline = runtime.timeline(TimelineConfig::default().with_fps(10.0));
    timeline.define("move", slide(&runtime, &target, "x", 0.5)).unwrap();

    assert!(!runtime.frame());
    timeline.play("move");

    // the first poll leaves a 50ms remainder, so every later frame reports 0.1s
    clock.advance(150.0);
    assert!(runtime.frame());
    assert!((target.number("x").unwrap() - 2.0).abs() < 1e-9);

    let mut frames = 1;
    loop {
        clock.advance(100.0);
        frames += 1;
        if !runtime.frame() {
            break;
        }
        assert!(frames < 20, "timeline never finished");
    }
    assert!(frames >= 5);

    assert_eq!(target.number("x"), Some(10.0));
    assert!(timeline.is_finished());
    assert!(!timeline.is_running());
    assert!(!runtime.frame());
}

/// A time scale of two plays the schedule at double speed
#[test]
fn test_time_scale() {
    let runtime = Runtime::new(RuntimeConfig::manual());
    let target = ball();
    let timeline = runtime.timeline(TimelineConfig::default().with_time_scale(2.0));
    timeline.define("move", slide(&runtime, &target, "x", 1.0)).unwrap();
    timeline.play("move");

    timeline.tick(0.25);
    assert_eq!(timeline.elapsed(), 0.5);
    assert_eq!(target.number("x"), Some(5.0));

    timeline.set_time_scale(4.0);
    timeline.tick(0.125);
    assert_eq!(target.number("x"), Some(10.0));
    assert!(timeline.is_finished());
}

/// Reversing mid-sequence rewinds both tweens back to their start values
#[test]
fn test_reverse_mid_sequence() {
    let runtime = Runtime::new(RuntimeConfig::manual());
    let target = ball();
    let timeline = runtime.timeline(TimelineConfig::default());
    timeline.define("a", slide(&runtime, &target, "x", 1.0)).unwrap();
    timeline.define("b", slide(&runtime, &target, "y", 1.0)).unwrap();
    timeline.define("ab", Definition::sequence(["a", "b"])).unwrap();
    timeline.play("ab");

    timeline.tick(1.5);
    assert_eq!(target.number("x"), Some(10.0));
    assert_eq!(target.number("y"), Some(5.0));

    timeline.reverse();
    timeline.tick(1.0);
    assert_eq!(timeline.elapsed(), 0.5);
    assert_eq!(target.number("x"), Some(5.0));
    assert_eq!(target.number("y"), Some(0.0));

    timeline.tick(1.0);
    assert_eq!(target.number("x"), Some(0.0));
    assert!(timeline.is_finished());

    // playing again from the start bound in reverse rewinds to the end
    timeline.play("ab");
    assert_eq!(timeline.elapsed(), 2.0);
}

/// A callback pulled before zero is shifted to the start and fires once
#[test]
fn test_negative_offset_callback() {
    let runtime = Runtime::new(RuntimeConfig::manual());
    let target = ball();
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();

    let timeline = runtime.timeline(TimelineConfig::default());
    timeline.define("move", slide(&runtime, &target, "x", 1.0)).unwrap();
    timeline
        .define("cue", Definition::callback(move |_| counter.set(counter.get() + 1)))
        .unwrap();
    timeline
        .define("block", Definition::parallel([("move", 0.0), ("cue", -0.5)]))
        .unwrap();
    timeline.play("block");

    let items = timeline.items();
    assert!(matches!(items[0].item, ScheduledItem::Callback(_)));
    assert_eq!(items[0].start, 0.0);
    assert_eq!((items[1].start, items[1].end), (0.5, 1.5));
    assert_eq!(timeline.duration(), 1.5);

    for _ in 0..8 {
        timeline.tick(0.25);
    }
    assert_eq!(calls.get(), 1);
    assert_eq!(target.number("x"), Some(10.0));
}

/// A yoyo tween without a repeat count leaves the rest of the line reachable
#[test]
fn test_unlimited_yoyo_in_sequence() {
    let runtime = Runtime::new(RuntimeConfig::manual());
    let target = ball();
    let pulse = runtime
        .to(
            &target,
            1.0,
            PropertyBag::from([("x", 10.0)]),
            TweenOptions::new().yoyo(true),
        )
        .unwrap();
    let timeline = runtime.timeline(TimelineConfig::default());
    timeline.define("a", pulse).unwrap();
    timeline.define("b", slide(&runtime, &target, "y", 1.0)).unwrap();
    timeline.define("ab", Definition::sequence(["a", "b"])).unwrap();
    timeline.play("ab");

    let spans: Vec<(f64, f64)> = timeline.items().iter().map(|i| (i.start, i.end)).collect();
    assert_eq!(spans, vec![(0.0, 1.0), (1.0, 2.0)]);
    assert_eq!(timeline.duration(), 2.0);

    timeline.seek_progress(0.0);
    timeline.tick(0.5);
    assert_eq!(timeline.elapsed(), 0.5);
    assert_eq!(timeline.progress(), 0.25);

    timeline.tick(1.0);
    assert_eq!(target.number("x"), Some(10.0));
    assert_eq!(target.number("y"), Some(5.0));
}

/// Timeline-driven tweens report their own lifecycle
#[test]
fn test_driven_tween_callbacks() {
    let runtime = Runtime::new(RuntimeConfig::manual());
    let target = ball();
    let starts = Rc::new(Cell::new(0));
    let completions = Rc::new(Cell::new(0));
    let (s, c) = (starts.clone(), completions.clone());

    let tween = runtime
        .to(
            &target,
            1.0,
            PropertyBag::from([("x", 10.0)]),
            TweenOptions::new()
                .on_start(move |_| s.set(s.get() + 1))
                .on_complete(move |_| c.set(c.get() + 1)),
        )
        .unwrap();
    let timeline = runtime.timeline(TimelineConfig::default());
    timeline.define("move", tween).unwrap();
    timeline.play("move");

    for _ in 0..6 {
        timeline.tick(0.25);
    }
    assert_eq!(starts.get(), 1);
    assert_eq!(completions.get(), 1);
}
