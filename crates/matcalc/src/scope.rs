//! Variable scope shared by every entry.

use crate::value::Outcome;
use indexmap::IndexMap;
use serde::Serialize;

/// Name → last known outcome.
///
/// Iteration follows insertion order only so listings are stable; evaluation
/// never depends on it. Equality is map equality and ignores order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Scope {
    bindings: IndexMap<String, Outcome>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Outcome> {
        self.bindings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Binds `name`, returning whether the binding changed.
    pub fn set(&mut self, name: impl Into<String>, outcome: Outcome) -> bool {
        let name = name.into();
        if self.bindings.get(&name) == Some(&outcome) {
            return false;
        }
        self.bindings.insert(name, outcome);
        true
    }

    pub fn remove(&mut self, name: &str) -> Option<Outcome> {
        self.bindings.shift_remove(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Outcome)> {
        self.bindings
            .iter()
            .map(|(name, outcome)| (name.as_str(), outcome))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }
}
