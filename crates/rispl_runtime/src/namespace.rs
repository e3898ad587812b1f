//! Dynamic slot objects: module scopes and import targets.

use crate::value::Value;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

/// A namespace supports dynamic get/set of named slots by string. Lookup
/// is case-insensitive; the most recent spelling of each name is kept for
/// host-facing enumeration.
#[derive(Default)]
pub struct Namespace {
    slots: DashMap<String, (String, Value)>,
}

impl Namespace {
    pub fn new() -> Arc<Namespace> {
        Arc::new(Namespace::default())
    }

    /// Get a slot's value, case-insensitively.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.slots
            .get(&name.to_lowercase())
            .map(|entry| entry.value().1.clone())
    }

    /// Whether the namespace has a slot with the name.
    pub fn has(&self, name: &str) -> bool {
        self.slots.contains_key(&name.to_lowercase())
    }

    /// Set a slot's value, creating the slot if needed.
    pub fn set(&self, name: &str, value: Value) {
        self.slots
            .insert(name.to_lowercase(), (name.to_string(), value));
    }

    /// The slot names with their stored casing.
    pub fn names(&self) -> Vec<String> {
        self.slots.iter().map(|e| e.value().0.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("len", &self.len())
            .finish()
    }
}
