//! Ownership registry
//!
//! At most one enabled binding controls a given target property. When a tween
//! claims a property that another binding already owns, the previous owner is
//! disabled; its tween notices on the next update and drops the binding.

use std::cell::Cell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::binding::BindingId;

/// Shared enabled flag of one binding
///
/// The binding and the registry hold clones of the same token, so the
/// registry can disable a binding without reaching into its tween.
#[derive(Clone, Debug)]
pub struct OwnerToken(Rc<Cell<bool>>);

impl OwnerToken {
    pub fn new() -> Self {
        Self(Rc::new(Cell::new(true)))
    }

    pub fn is_enabled(&self) -> bool {
        self.0.get()
    }

    pub fn disable(&self) {
        self.0.set(false);
    }

    /// Whether both tokens belong to the same binding
    pub fn same_as(&self, other: &OwnerToken) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for OwnerToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Map from binding id to the binding currently in control
#[derive(Default, Debug)]
pub struct OwnershipRegistry {
    owners: FxHashMap<BindingId, OwnerToken>,
}

impl OwnershipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `token` as the sole owner of `id`
    ///
    /// Returns `true` if a different binding was evicted.
    pub fn claim(&mut self, id: &BindingId, token: &OwnerToken) -> bool {
        if let Some(previous) = self.owners.get(id) {
            if previous.same_as(token) {
                return false;
            }
            previous.disable();
            debug!(binding = %id, "property taken over by a newer binding");
            self.owners.insert(id.clone(), token.clone());
            return true;
        }
        self.owners.insert(id.clone(), token.clone());
        false
    }

    /// Remove `token` as owner of `id`; another binding's claim is left alone
    pub fn release(&mut self, id: &BindingId, token: &OwnerToken) -> bool {
        match self.owners.get(id) {
            Some(current) if current.same_as(token) => {
                self.owners.remove(id);
                true
            }
            _ => false,
        }
    }

    pub fn is_owned_by(&self, id: &BindingId, token: &OwnerToken) -> bool {
        self.owners
            .get(id)
            .is_some_and(|current| current.same_as(token))
    }

    pub fn contains(&self, id: &BindingId) -> bool {
        self.owners.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    pub fn clear(&mut self) {
        self.owners.clear();
    }
}
