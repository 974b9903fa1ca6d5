//! Easing functions for tweens
//!
//! Curves map linear progress in `[0, 1]` to eased progress. Most curves are
//! registered under a name (`"QuadIn"`, `"BounceOut"`, ...) so configuration
//! can refer to them as strings; arbitrary curves are available through
//! [`Easing::CubicBezier`].

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use tracing::warn;
use tweenline_core::{Result, TweenError};

/// Easing function type
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Easing {
    #[default]
    Linear,
    QuadIn,
    QuadOut,
    QuadInOut,
    CubicIn,
    CubicOut,
    CubicInOut,
    QuartIn,
    QuartOut,
    QuartInOut,
    QuintIn,
    QuintOut,
    QuintInOut,
    SineIn,
    SineOut,
    SineInOut,
    ExpoIn,
    ExpoOut,
    ExpoInOut,
    CircIn,
    CircOut,
    CircInOut,
    BackIn,
    BackOut,
    BackInOut,
    ElasticIn,
    ElasticOut,
    ElasticInOut,
    BounceIn,
    BounceOut,
    BounceInOut,
    CubicBezier(f64, f64, f64, f64),
}

/// Registered easing names
const NAMED: &[(&str, Easing)] = &[
    ("linear", Easing::Linear),
    ("BackIn", Easing::BackIn),
    ("BackOut", Easing::BackOut),
    ("BackInOut", Easing::BackInOut),
    ("BounceIn", Easing::BounceIn),
    ("BounceOut", Easing::BounceOut),
    ("BounceInOut", Easing::BounceInOut),
    ("CircIn", Easing::CircIn),
    ("CircOut", Easing::CircOut),
    ("CircInOut", Easing::CircInOut),
    ("CubicIn", Easing::CubicIn),
    ("CubicOut", Easing::CubicOut),
    ("CubicInOut", Easing::CubicInOut),
    ("ElasticIn", Easing::ElasticIn),
    ("ElasticOut", Easing::ElasticOut),
    ("ElasticInOut", Easing::ElasticInOut),
    ("ExpoIn", Easing::ExpoIn),
    ("ExpoOut", Easing::ExpoOut),
    ("ExpoInOut", Easing::ExpoInOut),
    ("QuadIn", Easing::QuadIn),
    ("QuadOut", Easing::QuadOut),
    ("QuadInOut", Easing::QuadInOut),
    ("QuartIn", Easing::QuartIn),
    ("QuartOut", Easing::QuartOut),
    ("QuartInOut", Easing::QuartInOut),
    ("QuintIn", Easing::QuintIn),
    ("QuintOut", Easing::QuintOut),
    ("QuintInOut", Easing::QuintInOut),
    ("SineIn", Easing::SineIn),
    ("SineOut", Easing::SineOut),
    ("SineInOut", Easing::SineInOut),
];

impl Easing {
    /// Look up a registered easing by name (case-sensitive)
    pub fn from_name(name: &str) -> Result<Easing> {
        NAMED
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, easing)| *easing)
            .ok_or_else(|| TweenError::InvalidEasing(format!("unknown easing name `{name}`")))
    }

    /// Build a cubic bezier curve from `[x1, y1, x2, y2]`
    pub fn from_control_points(points: &[f64]) -> Result<Easing> {
        let [x1, y1, x2, y2] = points else {
            return Err(TweenError::InvalidEasing(format!(
                "expected 4 bezier control points, got {}",
                points.len()
            )));
        };
        if points.iter().any(|p| !p.is_finite()) {
            return Err(TweenError::InvalidEasing(
                "bezier control points must be finite".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(x1) || !(0.0..=1.0).contains(x2) {
            return Err(TweenError::InvalidEasing(format!(
                "bezier x control points must lie in [0, 1], got {x1} and {x2}"
            )));
        }
        Ok(Easing::CubicBezier(*x1, *y1, *x2, *y2))
    }

    /// All registered names, in registration order
    pub fn names() -> impl Iterator<Item = &'static str> {
        NAMED.iter().map(|(name, _)| *name)
    }

    /// Apply the easing function to a progress value (0.0 to 1.0)
    pub fn apply(&self, t: f64) -> f64 {
        match self {
            Easing::Linear => t,
            Easing::QuadIn => ease_in(t, 2),
            Easing::QuadOut => ease_out(t, 2),
            Easing::QuadInOut => ease_in_out(t, 2),
            Easing::CubicIn => ease_in(t, 3),
            Easing::CubicOut => ease_out(t, 3),
            Easing::CubicInOut => ease_in_out(t, 3),
            Easing::QuartIn => ease_in(t, 4),
            Easing::QuartOut => ease_out(t, 4),
            Easing::QuartInOut => ease_in_out(t, 4),
            Easing::QuintIn => ease_in(t, 5),
            Easing::QuintOut => ease_out(t, 5),
            Easing::QuintInOut => ease_in_out(t, 5),
            Easing::SineIn => 1.0 - (t * PI / 2.0).cos(),
            Easing::SineOut => (t * PI / 2.0).sin(),
            Easing::SineInOut => 0.5 * (1.0 - (PI * t).cos()),
            Easing::ExpoIn => {
                if t == 0.0 {
                    0.0
                } else {
                    1024.0_f64.powf(t - 1.0)
                }
            }
            Easing::ExpoOut => {
                if t == 1.0 {
                    1.0
                } else {
                    1.0 - 2.0_f64.powf(-10.0 * t)
                }
            }
            Easing::ExpoInOut => {
                if t == 0.0 || t == 1.0 {
                    return t;
                }
                let t = t * 2.0;
                if t < 1.0 {
                    0.5 * 1024.0_f64.powf(t - 1.0)
                } else {
                    0.5 * (2.0 - 2.0_f64.powf(-10.0 * (t - 1.0)))
                }
            }
            Easing::CircIn => 1.0 - (1.0 - t * t).sqrt(),
            Easing::CircOut => {
                let t = t - 1.0;
                (1.0 - t * t).sqrt()
            }
            Easing::CircInOut => {
                let t = t * 2.0;
                if t < 1.0 {
                    -0.5 * ((1.0 - t * t).sqrt() - 1.0)
                } else {
                    let t = t - 2.0;
                    0.5 * ((1.0 - t * t).sqrt() + 1.0)
                }
            }
            Easing::BackIn => {
                let s = BACK_OVERSHOOT;
                t * t * ((s + 1.0) * t - s)
            }
            Easing::BackOut => {
                let s = BACK_OVERSHOOT;
                let t = t - 1.0;
                t * t * ((s + 1.0) * t + s) + 1.0
            }
            Easing::BackInOut => {
                let s = BACK_OVERSHOOT * 1.525;
                let t = t * 2.0;
                if t < 1.0 {
                    0.5 * (t * t * ((s + 1.0) * t - s))
                } else {
                    let t = t - 2.0;
                    0.5 * (t * t * ((s + 1.0) * t + s) + 2.0)
                }
            }
            Easing::ElasticIn => {
                if t == 0.0 || t == 1.0 {
                    return t;
                }
                -(2.0_f64.powf(10.0 * (t - 1.0))) * ((t - 1.1) * 5.0 * PI).sin()
            }
            Easing::ElasticOut => {
                if t == 0.0 || t == 1.0 {
                    return t;
                }
                2.0_f64.powf(-10.0 * t) * ((t - 0.1) * 5.0 * PI).sin() + 1.0
            }
            Easing::ElasticInOut => {
                if t == 0.0 || t == 1.0 {
                    return t;
                }
                let t = t * 2.0;
                if t < 1.0 {
                    -0.5 * 2.0_f64.powf(10.0 * (t - 1.0)) * ((t - 1.1) * 5.0 * PI).sin()
                } else {
                    0.5 * 2.0_f64.powf(-10.0 * (t - 1.0)) * ((t - 1.1) * 5.0 * PI).sin() + 1.0
                }
            }
            Easing::BounceIn => 1.0 - bounce_out(1.0 - t),
            Easing::BounceOut => bounce_out(t),
            Easing::BounceInOut => {
                if t < 0.5 {
                    (1.0 - bounce_out(1.0 - t * 2.0)) * 0.5
                } else {
                    bounce_out(t * 2.0 - 1.0) * 0.5 + 0.5
                }
            }
            Easing::CubicBezier(x1, y1, x2, y2) => cubic_bezier_ease(t, *x1, *y1, *x2, *y2),
        }
    }

    /// Interpolate between `start` and `end` at eased progress `t`
    pub fn interpolate(&self, t: f64, start: f64, end: f64) -> f64 {
        start + self.apply(t) * (end - start)
    }
}

const BACK_OVERSHOOT: f64 = 1.70158;

fn ease_in(t: f64, power: i32) -> f64 {
    t.powi(power)
}

fn ease_out(t: f64, power: i32) -> f64 {
    1.0 - (t - 1.0).powi(power).abs()
}

fn ease_in_out(t: f64, power: i32) -> f64 {
    if t < 0.5 {
        ease_in(t * 2.0, power) / 2.0
    } else {
        ease_out(t * 2.0 - 1.0, power) / 2.0 + 0.5
    }
}

fn bounce_out(t: f64) -> f64 {
    const N: f64 = 7.5625;
    const D: f64 = 2.75;

    if t < 1.0 / D {
        N * t * t
    } else if t < 2.0 / D {
        let t = t - 1.5 / D;
        N * t * t + 0.75
    } else if t < 2.5 / D {
        let t = t - 2.25 / D;
        N * t * t + 0.9375
    } else {
        let t = t - 2.625 / D;
        N * t * t + 0.984375
    }
}

/// CSS `cubic-bezier()` timing: find the curve parameter whose x equals `t`,
/// then report y at that parameter
fn cubic_bezier_ease(t: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }
    let x = Polynomial::new(x1, x2);
    let y = Polynomial::new(y1, y2);
    y.at(x.solve(t))
}

const EPSILON: f64 = 1e-7;

/// One axis of a bezier anchored at 0 and 1, in Horner form
#[derive(Clone, Copy)]
struct Polynomial {
    a: f64,
    b: f64,
    c: f64,
}

impl Polynomial {
    fn new(p1: f64, p2: f64) -> Self {
        Self {
            a: 1.0 - 3.0 * p2 + 3.0 * p1,
            b: 3.0 * p2 - 6.0 * p1,
            c: 3.0 * p1,
        }
    }

    #[inline]
    fn at(self, s: f64) -> f64 {
        ((self.a * s + self.b) * s + self.c) * s
    }

    #[inline]
    fn slope(self, s: f64) -> f64 {
        (3.0 * self.a * s + 2.0 * self.b) * s + self.c
    }

    /// Parameter in `[0, 1]` where the curve reaches `target`
    fn solve(self, target: f64) -> f64 {
        let mut s = target;
        for _ in 0..8 {
            let error = self.at(s) - target;
            if error.abs() < EPSILON {
                return s;
            }
            let slope = self.slope(s);
            if slope.abs() < EPSILON {
                break;
            }
            s -= error / slope;
        }

        // Newton stalled on a flat stretch; bisect instead
        let (mut lo, mut hi) = (0.0_f64, 1.0_f64);
        s = target;
        for _ in 0..30 {
            let value = self.at(s);
            if (value - target).abs() < EPSILON {
                break;
            }
            if value < target {
                lo = s;
            } else {
                hi = s;
            }
            s = 0.5 * (lo + hi);
        }
        s
    }
}

/// How a tween configuration names its easing
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EaseSpec {
    /// A registered name such as `"QuadInOut"`
    Name(String),
    /// Cubic bezier control points `[x1, y1, x2, y2]`
    ControlPoints(Vec<f64>),
}

impl EaseSpec {
    pub fn try_resolve(&self) -> Result<Easing> {
        match self {
            EaseSpec::Name(name) => Easing::from_name(name),
            EaseSpec::ControlPoints(points) => Easing::from_control_points(points),
        }
    }

    /// Resolve to an easing, substituting [`Easing::Linear`] on failure
    pub fn resolve(&self) -> Easing {
        self.try_resolve().unwrap_or_else(|err| {
            let valid: Vec<&str> = Easing::names().collect();
            warn!(
                error = %err,
                available = %valid.join(" | "),
                "falling back to linear easing"
            );
            Easing::Linear
        })
    }
}

impl From<&str> for EaseSpec {
    fn from(name: &str) -> Self {
        EaseSpec::Name(name.to_string())
    }
}

impl From<String> for EaseSpec {
    fn from(name: String) -> Self {
        EaseSpec::Name(name)
    }
}

impl From<[f64; 4]> for EaseSpec {
    fn from(points: [f64; 4]) -> Self {
        EaseSpec::ControlPoints(points.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_named_curves_hit_endpoints() {
        for name in Easing::names() {
            let easing = Easing::from_name(name).unwrap();
            assert!(easing.apply(0.0).abs() < 1e-9, "{name} at 0");
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-9, "{name} at 1");
        }
    }

    #[test]
    fn test_power_curves() {
        assert_eq!(Easing::QuadIn.apply(0.5), 0.25);
        assert_eq!(Easing::QuadOut.apply(0.5), 0.75);
        assert_eq!(Easing::CubicInOut.apply(0.5), 0.5);
        assert!(Easing::QuintIn.apply(0.5) < Easing::QuadIn.apply(0.5));
    }

    #[test]
    fn test_interpolate_scales_range() {
        assert_eq!(Easing::Linear.interpolate(0.25, 10.0, 20.0), 12.5);
        assert_eq!(Easing::QuadIn.interpolate(0.5, 0.0, -8.0), -2.0);
    }

    #[test]
    fn test_unknown_name_is_an_error() {
        assert!(matches!(
            Easing::from_name("Wobble"),
            Err(TweenError::InvalidEasing(_))
        ));
        assert_eq!(EaseSpec::from("Wobble").resolve(), Easing::Linear);
    }

    #[test]
    fn test_control_points_validation() {
        assert!(Easing::from_control_points(&[0.25, 0.1, 0.25, 1.0]).is_ok());
        assert!(Easing::from_control_points(&[0.25, 0.1, 0.25]).is_err());
        assert!(Easing::from_control_points(&[1.5, 0.0, 0.5, 1.0]).is_err());
        assert!(Easing::from_control_points(&[f64::NAN, 0.0, 0.5, 1.0]).is_err());
        assert_eq!(EaseSpec::ControlPoints(vec![0.1]).resolve(), Easing::Linear);
    }

    #[test]
    fn test_linear_bezier_matches_linear() {
        let bezier = Easing::from_control_points(&[0.0, 0.0, 1.0, 1.0]).unwrap();
        for i in 0..=10 {
            let t = i as f64 / 10.0;
            assert!((bezier.apply(t) - t).abs() < 1e-5);
        }
    }

    #[test]
    fn test_ease_spec_deserializes_from_name_or_points() {
        let name: EaseSpec = serde_json::from_str(r#""SineOut""#).unwrap();
        let points: EaseSpec = serde_json::from_str("[0.42, 0, 0.58, 1]").unwrap();
        assert_eq!(name.resolve(), Easing::SineOut);
        assert_eq!(points.resolve(), Easing::CubicBezier(0.42, 0.0, 0.58, 1.0));
    }
}
