//! Listener registration for the change bus.
//!
//! Listeners are keyed by `(target, key)`, where either half may be a
//! wildcard (`None`). An event on `(t, k)` reaches the listeners registered
//! on `(t, k)`, `(*, k)`, `(t, *)` and `(*, *)`, in that order.

use alloc::rc::Rc;
use alloc::vec::Vec;
use hashbrown::HashMap;
use quiver_core::{ChangeEvent, EventKey, ObjectId};

/// Callback type for change notifications.
pub type Listener = Rc<dyn Fn(&ChangeEvent)>;

/// A `(target, key)` pair; `None` on either side is a wildcard.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ListenerKey {
    pub target: Option<ObjectId>,
    pub key: Option<EventKey>,
}

impl ListenerKey {
    /// Creates a listener key.
    pub fn new(target: Option<ObjectId>, key: Option<EventKey>) -> Self {
        Self { target, key }
    }
}

/// Returns true if both handles point at the same listener.
pub fn same_listener(a: &Listener, b: &Listener) -> bool {
    core::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
}

/// Tracks the listeners of every `(target, key)` pair.
#[derive(Default)]
pub struct ListenerRegistry {
    entries: HashMap<ListenerKey, Vec<Listener>>,
}

impl ListenerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Adds a listener.
    ///
    /// Returns false if the same listener was already registered on the pair.
    pub fn add(&mut self, target: Option<ObjectId>, key: Option<EventKey>, listener: Listener) -> bool {
        let callbacks = self
            .entries
            .entry(ListenerKey::new(target, key))
            .or_default();
        if callbacks.iter().any(|l| same_listener(l, &listener)) {
            return false;
        }
        callbacks.push(listener);
        true
    }

    /// Removes a listener and hands it back.
    ///
    /// The caller drops the returned handle, so whatever the listener
    /// captured is released outside any borrow of the registry.
    pub fn remove(
        &mut self,
        target: Option<ObjectId>,
        key: Option<EventKey>,
        listener: &Listener,
    ) -> Option<Listener> {
        let entry_key = ListenerKey::new(target, key);
        let callbacks = self.entries.get_mut(&entry_key)?;
        let idx = callbacks.iter().position(|l| same_listener(l, listener))?;
        let removed = callbacks.remove(idx);
        if callbacks.is_empty() {
            self.entries.remove(&entry_key);
        }
        Some(removed)
    }

    fn lookup_keys(target: ObjectId, key: &EventKey) -> [ListenerKey; 4] {
        [
            ListenerKey::new(Some(target), Some(key.clone())),
            ListenerKey::new(None, Some(key.clone())),
            ListenerKey::new(Some(target), None),
            ListenerKey::new(None, None),
        ]
    }

    /// Returns true if any listener would receive an event on `(target, key)`.
    pub fn has_listeners(&self, target: ObjectId, key: &EventKey) -> bool {
        Self::lookup_keys(target, key)
            .iter()
            .any(|k| self.entries.contains_key(k))
    }

    /// Returns the listeners an event on `(target, key)` reaches, in dispatch order.
    pub fn matching(&self, target: ObjectId, key: &EventKey) -> Vec<Listener> {
        let mut result = Vec::new();
        for lookup in Self::lookup_keys(target, key).iter() {
            if let Some(callbacks) = self.entries.get(lookup) {
                result.extend(callbacks.iter().cloned());
            }
        }
        result
    }

    /// Returns the number of listeners registered on exactly this pair.
    pub fn count(&self, target: Option<ObjectId>, key: Option<EventKey>) -> usize {
        self.entries
            .get(&ListenerKey::new(target, key))
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Returns the total number of registrations.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
