//! Property bindings
//!
//! A binding ties one property of one target to the start and end values a
//! tween interpolates between. The interpolation shape is classified once
//! whenever the binding is refreshed and matched on every write.

use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;
use tracing::{debug, warn};
use tweenline_core::{PropertyBag, Rgb, Target, TargetId, TweenError, Value};

use crate::easing::Easing;
use crate::registry::{OwnerToken, OwnershipRegistry};

/// Registry key of a binding: target identity plus property name
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BindingId {
    target: TargetId,
    property: Rc<str>,
}

impl BindingId {
    pub fn new(target: TargetId, property: &str) -> Self {
        Self {
            target,
            property: Rc::from(property),
        }
    }

    pub fn target(&self) -> TargetId {
        self.target
    }

    pub fn property(&self) -> &str {
        &self.property
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.target, self.property)
    }
}

/// Interpolation shape of a binding
#[derive(Clone, Debug, PartialEq)]
pub enum BindingKind {
    Number { start: f64, end: f64 },
    /// Element-wise interpolation; both endpoints padded to the same length
    Array { start: Vec<f64>, end: Vec<f64> },
    /// Piecewise path `[start, end...]`
    Waypoints(Vec<f64>),
    Color { start: Rgb, end: Rgb },
    /// Start, end, and live value have no shape in common
    Invalid,
}

impl BindingKind {
    /// Classify a start/end/live triple
    pub fn classify(start: &Value, end: &Value, live: &Value) -> BindingKind {
        match (start, end, live) {
            (Value::Number(start), Value::Number(end), Value::Number(_)) => BindingKind::Number {
                start: *start,
                end: *end,
            },
            (Value::Text(_), Value::Text(_), Value::Text(_)) => {
                match (start.as_color(), end.as_color(), live.as_color()) {
                    (Some(start), Some(end), Some(_)) => BindingKind::Color { start, end },
                    _ => BindingKind::Invalid,
                }
            }
            (Value::Array(start), Value::Array(end), Value::Array(live)) => {
                let len = start.len().max(end.len());
                BindingKind::Array {
                    start: pad(start, end, live, len),
                    end: pad(end, start, live, len),
                }
            }
            (Value::Number(start), Value::Array(path), Value::Number(_)) => {
                let mut points = Vec::with_capacity(path.len() + 1);
                points.push(*start);
                points.extend_from_slice(path);
                BindingKind::Waypoints(points)
            }
            _ => BindingKind::Invalid,
        }
    }

    /// Interpolated value at `progress`, or `None` for invalid bindings
    pub fn value_at(&self, easing: &Easing, progress: f64) -> Option<Value> {
        match self {
            BindingKind::Number { start, end } => {
                Some(Value::Number(easing.interpolate(progress, *start, *end)))
            }
            BindingKind::Array { start, end } => Some(Value::Array(
                start
                    .iter()
                    .zip(end)
                    .map(|(s, e)| easing.interpolate(progress, *s, *e))
                    .collect(),
            )),
            BindingKind::Waypoints(points) => {
                let segments = points.len().saturating_sub(1);
                if segments == 0 {
                    return points.first().map(|p| Value::Number(*p));
                }
                let position = progress * segments as f64;
                let index = (position.floor().max(0.0) as usize).min(segments - 1);
                let local = position - index as f64;
                Some(Value::Number(easing.interpolate(
                    local,
                    points[index],
                    points[index + 1],
                )))
            }
            BindingKind::Color { start, end } => {
                let color = Rgb::new(
                    easing.interpolate(progress, start.r, end.r),
                    easing.interpolate(progress, start.g, end.g),
                    easing.interpolate(progress, start.b, end.b),
                );
                Some(Value::from(color))
            }
            BindingKind::Invalid => None,
        }
    }
}

/// Fill missing trailing elements from the live array, else from the other endpoint
fn pad(values: &[f64], other: &[f64], live: &[f64], len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| {
            values
                .get(i)
                .or_else(|| live.get(i))
                .or_else(|| other.get(i))
                .copied()
                .unwrap_or(0.0)
        })
        .collect()
}

/// One animated property of one target
#[derive(Clone, Debug)]
pub struct Binding {
    id: BindingId,
    kind: BindingKind,
    token: OwnerToken,
}

impl Binding {
    pub fn new(target: &Target, property: &str) -> Self {
        Self {
            id: BindingId::new(target.id(), property),
            kind: BindingKind::Invalid,
            token: OwnerToken::new(),
        }
    }

    pub fn id(&self) -> &BindingId {
        &self.id
    }

    pub fn name(&self) -> &str {
        self.id.property()
    }

    pub fn kind(&self) -> &BindingKind {
        &self.kind
    }

    pub fn token(&self) -> &OwnerToken {
        &self.token
    }

    pub fn is_enabled(&self) -> bool {
        self.token.is_enabled()
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self.kind, BindingKind::Invalid)
    }

    /// Eligible for writes and ownership claims
    pub fn is_active(&self) -> bool {
        self.is_enabled() && self.is_valid()
    }

    pub fn disable(&self) {
        self.token.disable();
    }

    /// Re-read endpoints from the target and reclassify
    ///
    /// `start` comes from `from`, `end` from `to`; either falls back to the
    /// live value when the bag does not name the property.
    pub fn refresh(&mut self, target: &Target, from: &PropertyBag, to: &PropertyBag) {
        let name = self.id.property();
        let Some(live) = target.get(name) else {
            self.kind = BindingKind::Invalid;
            return;
        };
        let start = from.get(name).unwrap_or(&live);
        let end = to.get(name).unwrap_or(&live);

        self.kind = BindingKind::classify(start, end, &live);
        if !self.is_valid() {
            let err = TweenError::PropertyTypeMismatch {
                property: name.to_string(),
            };
            debug!(binding = %self.id, error = %err, "binding excluded from updates");
        }
    }
}

/// The bindings a tween holds for one target
#[derive(Clone, Debug)]
pub struct BindingSet {
    target: Target,
    bindings: SmallVec<[Binding; 4]>,
}

impl BindingSet {
    /// Bind every property named in `to`, then those only in `from`
    ///
    /// Properties the target does not expose are skipped.
    pub fn build(target: &Target, from: &PropertyBag, to: &PropertyBag) -> Self {
        let names = to
            .names()
            .chain(from.names().filter(|name| !to.contains(name)));

        let bindings = names
            .filter(|name| target.has(name))
            .map(|name| Binding::new(target, name))
            .collect();

        Self {
            target: target.clone(),
            bindings,
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn refresh(&mut self, from: &PropertyBag, to: &PropertyBag) {
        for binding in &mut self.bindings {
            binding.refresh(&self.target, from, to);
        }
    }

    /// Claim every active binding in the registry
    pub fn claim(&self, registry: &mut OwnershipRegistry) {
        for binding in self.bindings.iter().filter(|b| b.is_active()) {
            registry.claim(binding.id(), binding.token());
        }
    }

    /// Release every binding this set still owns
    pub fn release(&self, registry: &mut OwnershipRegistry) {
        for binding in &self.bindings {
            registry.release(binding.id(), binding.token());
        }
    }

    /// Disable and release the named bindings
    pub fn kill_properties(&self, names: &[&str], registry: &mut OwnershipRegistry) {
        for binding in self.bindings.iter().filter(|b| names.contains(&b.name())) {
            binding.disable();
            registry.release(binding.id(), binding.token());
        }
    }

    /// Write interpolated values, dropping disabled and invalid bindings
    ///
    /// Returns the number of bindings written.
    pub fn write(&mut self, easing: &Easing, progress: f64) -> usize {
        self.bindings.retain(|binding| binding.is_active());
        if self.bindings.is_empty() {
            return 0;
        }

        let mut object = match self.target.try_borrow_mut() {
            Ok(object) => object,
            Err(_) => {
                warn!(target_id = %self.target.id(), "target is borrowed, skipping write");
                // Still counts as controlled so the tween is not killed
                return self.bindings.len();
            }
        };

        let mut written = 0;
        for binding in &self.bindings {
            if let Some(value) = binding.kind.value_at(easing, progress) {
                object.set(binding.name(), value);
                written += 1;
            }
        }
        written
    }
}
