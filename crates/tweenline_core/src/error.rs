//! Tweenline error types

use thiserror::Error;

/// Errors raised while building tweens and timelines
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TweenError {
    /// The tween has nothing to animate
    #[error("Invalid tween target: {0}")]
    InvalidTarget(String),

    /// Unknown easing name or malformed bezier control points
    #[error("Invalid easing: {0}")]
    InvalidEasing(String),

    /// A timeline definition that cannot be registered
    #[error("Invalid timeline item `{label}`: {reason}")]
    InvalidTimelineItem { label: String, reason: String },

    /// A label that no definition resolves to
    #[error("Unknown timeline label `{0}`")]
    UnknownLabel(String),

    /// A label that (indirectly) refers to itself
    #[error("Timeline label `{0}` refers back to itself")]
    LabelCycle(String),

    /// A property whose start, end, and live values have incompatible shapes
    #[error("Property `{property}` has mismatched start/end/current value types")]
    PropertyTypeMismatch { property: String },
}

/// Result type for tween operations
pub type Result<T> = std::result::Result<T, TweenError>;
