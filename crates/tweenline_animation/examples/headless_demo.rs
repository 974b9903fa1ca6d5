//! Headless Animation Demo
//!
//! Steps a runtime against a manual clock and logs property values:
//! - A yoyo tween on a color and a position
//! - A takeover where a newer tween claims a property mid-flight
//! - A labelled timeline with a sequence, a parallel block, and a callback
//!
//! Run with: cargo run -p tweenline_animation --example headless_demo

use anyhow::Result;
use tweenline_animation::{
    Definition, ManualClock, Runtime, RuntimeConfig, TimelineConfig, TweenOptions,
};
use tweenline_core::{PropertyBag, Target};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let clock = ManualClock::new();
    let runtime = Runtime::with_clock(RuntimeConfig::manual(), clock.clone());

    pulse(&runtime)?;
    takeover(&runtime)?;
    storyboard(&runtime, &clock)?;

    Ok(())
}

/// Color and position bouncing back and forth
fn pulse(runtime: &Runtime) -> Result<()> {
    let dot = Target::new(PropertyBag::new().with("x", 0.0).with("fill", "#1E90FF"));
    let tween = runtime.to(
        &dot,
        0.5,
        PropertyBag::new().with("x", 120.0).with("fill", "#FF4500"),
        TweenOptions::new().ease("SineInOut").repeat(3).yoyo(true),
    )?;

    while tween.is_alive() {
        runtime.update(Some(0.125));
        tracing::info!(
            x = dot.number("x").unwrap_or_default(),
            fill = ?dot.get("fill"),
            direction = ?tween.direction(),
            "pulse"
        );
    }
    Ok(())
}

/// A second tween on the same property wins
fn takeover(runtime: &Runtime) -> Result<()> {
    let card = Target::new(PropertyBag::new().with("opacity", 1.0).with("y", 0.0));
    let fade = runtime.to(
        &card,
        1.0,
        PropertyBag::new().with("opacity", 0.0).with("y", 40.0),
        TweenOptions::new().ease("QuadOut"),
    )?;
    runtime.update(Some(0.25));

    runtime.to(
        &card,
        0.5,
        PropertyBag::from([("opacity", 1.0)]),
        TweenOptions::new().on_complete(|_| tracing::info!("card restored")),
    )?;

    for _ in 0..8 {
        runtime.update(Some(0.125));
        tracing::info!(
            opacity = card.number("opacity").unwrap_or_default(),
            y = card.number("y").unwrap_or_default(),
            fade_bindings = fade.active_bindings(),
            "takeover"
        );
    }
    Ok(())
}

/// Labelled timeline played through `Runtime::frame`
fn storyboard(runtime: &Runtime, clock: &ManualClock) -> Result<()> {
    let ball = Target::new(PropertyBag::new().with("x", 0.0).with("y", 0.0).with("scale", 1.0));

    let right = runtime.to(&ball, 1.0, PropertyBag::from([("x", 200.0)]), TweenOptions::new())?;
    let fall = runtime.to(
        &ball,
        0.8,
        PropertyBag::from([("y", 100.0)]),
        TweenOptions::new().ease("BounceOut"),
    )?;
    let grow = runtime.to(&ball, 0.6, PropertyBag::from([("scale", 2.0)]), TweenOptions::new())?;

    let timeline = runtime.timeline(TimelineConfig::default().with_fps(30.0));
    timeline.define("right", right)?;
    timeline.define("fall", fall)?;
    timeline.define("grow", grow)?;
    timeline.define(
        "landed",
        Definition::callback(|timeline| {
            tracing::info!(elapsed = timeline.elapsed(), "ball landed")
        }),
    )?;
    timeline.define("finale", Definition::parallel([("fall", 0.0), ("grow", 0.2)]))?;
    timeline.define(
        "intro",
        Definition::sequence(["right", "finale", "landed"]),
    )?;

    tracing::info!(duration = timeline.duration(), "storyboard compiled");
    timeline.play("intro");

    let frame_ms = 1000.0 / 60.0;
    while runtime.frame() {
        clock.advance(frame_ms);
    }

    tracing::info!(
        x = ball.number("x").unwrap_or_default(),
        y = ball.number("y").unwrap_or_default(),
        scale = ball.number("scale").unwrap_or_default(),
        "storyboard finished"
    );
    Ok(())
}
