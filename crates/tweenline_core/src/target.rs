//! Animation targets
//!
//! A target is a consumer-owned object whose named fields can be read and
//! written as [`Value`]s. The engine never owns targets outright; it holds
//! shared [`Target`] handles and borrows them only while writing.

use std::cell::{BorrowMutError, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::value::Value;

/// Anything whose named properties can be animated
pub trait Animatable {
    /// Read the current value of a property
    fn get(&self, name: &str) -> Option<Value>;

    /// Write a new value to a property
    fn set(&mut self, name: &str, value: Value);

    /// Check whether the property exists on this object
    fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// An ordered bag of named values
///
/// Used both as a ready-made [`Animatable`] target and as the property
/// description passed to tween constructors.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyBag {
    values: IndexMap<String, Value>,
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a property
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_number)
    }

    pub fn array(&self, name: &str) -> Option<&[f64]> {
        self.get(name).and_then(Value::as_array)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_text)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Animatable for PropertyBag {
    fn get(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }

    fn set(&mut self, name: &str, value: Value) {
        match self.values.get_mut(name) {
            Some(slot) => *slot = value,
            None => {
                self.values.insert(name.to_string(), value);
            }
        }
    }

    fn has(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for PropertyBag {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for PropertyBag {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

/// Process-unique identifier of a target
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(u64);

impl TargetId {
    fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        TargetId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Shared handle to an animatable object
///
/// Cloning the handle keeps the same [`TargetId`], so every clone refers to
/// the same property slots in the ownership registry.
#[derive(Clone)]
pub struct Target {
    id: TargetId,
    inner: Rc<RefCell<dyn Animatable>>,
}

impl Target {
    /// Wrap an owned object
    pub fn new<A: Animatable + 'static>(object: A) -> Self {
        Self::shared(Rc::new(RefCell::new(object)))
    }

    /// Wrap an object the caller keeps a typed handle to
    pub fn shared<A: Animatable + 'static>(object: Rc<RefCell<A>>) -> Self {
        Self {
            id: TargetId::next(),
            inner: object,
        }
    }

    pub fn id(&self) -> TargetId {
        self.id
    }

    /// Read a property; `None` if missing or the object is mutably borrowed
    pub fn get(&self, name: &str) -> Option<Value> {
        self.inner.try_borrow().ok().and_then(|object| object.get(name))
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(|v| v.as_number())
    }

    pub fn has(&self, name: &str) -> bool {
        self.inner
            .try_borrow()
            .map(|object| object.has(name))
            .unwrap_or(false)
    }

    /// Write a property, ignoring the write if the object is already borrowed
    pub fn set(&self, name: &str, value: impl Into<Value>) {
        if let Ok(mut object) = self.inner.try_borrow_mut() {
            object.set(name, value.into());
        }
    }

    pub fn try_borrow_mut(&self) -> Result<RefMut<'_, dyn Animatable + 'static>, BorrowMutError> {
        self.inner.try_borrow_mut()
    }

    /// Whether two handles point at the same object
    pub fn same_object(&self, other: &Target) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target").field("id", &self.id).finish()
    }
}

impl PartialEq for Target {
    fn eq(&self, other: &Self) -> bool {
        self.same_object(other)
    }
}

/// The targets of one tween
pub type TargetList = SmallVec<[Target; 2]>;

/// Conversion into the list of targets a tween animates
pub trait IntoTargets {
    fn into_targets(self) -> TargetList;
}

impl IntoTargets for Target {
    fn into_targets(self) -> TargetList {
        smallvec::smallvec![self]
    }
}

impl IntoTargets for &Target {
    fn into_targets(self) -> TargetList {
        smallvec::smallvec![self.clone()]
    }
}

impl IntoTargets for Vec<Target> {
    fn into_targets(self) -> TargetList {
        self.into_iter().collect()
    }
}

impl IntoTargets for &[Target] {
    fn into_targets(self) -> TargetList {
        self.iter().cloned().collect()
    }
}

impl<const N: usize> IntoTargets for [Target; N] {
    fn into_targets(self) -> TargetList {
        self.into_iter().collect()
    }
}

impl IntoTargets for TargetList {
    fn into_targets(self) -> TargetList {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_bag_preserves_insertion_order() {
        let bag = PropertyBag::new().with("y", 2.0).with("x", 1.0);
        let names: Vec<&str> = bag.names().collect();
        assert_eq!(names, vec!["y", "x"]);
    }

    #[test]
    fn test_target_clones_share_identity_and_state() {
        let target = Target::new(PropertyBag::from([("x", 0.0)]));
        let alias = target.clone();
        alias.set("x", 5.0);

        assert_eq!(target.number("x"), Some(5.0));
        assert_eq!(target.id(), alias.id());
    }

    #[test]
    fn test_distinct_targets_get_distinct_ids() {
        let a = Target::new(PropertyBag::new());
        let b = Target::new(PropertyBag::new());
        assert_ne!(a.id(), b.id());
        assert_ne!(a, b);
    }

    #[test]
    fn test_shared_target_is_visible_through_typed_handle() {
        let bag = Rc::new(RefCell::new(PropertyBag::from([("alpha", 1.0)])));
        let target = Target::shared(bag.clone());
        target.set("alpha", 0.25);
        assert_eq!(bag.borrow().number("alpha"), Some(0.25));
    }

    #[test]
    fn test_into_targets_from_array() {
        let a = Target::new(PropertyBag::new());
        let b = Target::new(PropertyBag::new());
        let targets = [a.clone(), b].into_targets();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0], a);
    }
}
