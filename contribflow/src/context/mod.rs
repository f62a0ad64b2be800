//! Runtime context consumed by the registry.
//!
//! This module provides:
//! - Immutable, cheaply cloned context snapshots with child scopes
//! - The subject through which the context provider pushes new snapshots

mod snapshot;

pub use snapshot::{is_truthy, ContextSnapshot};

use crate::reactive::Subject;

/// The stream of context snapshots the registry recomputes against.
pub type ContextSubject = Subject<ContextSnapshot>;

impl Subject<ContextSnapshot> {
    /// Publishes a new snapshot with one key changed.
    pub fn set_value(&self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        let key = key.into();
        let value = value.into();
        self.update(move |current| current.clone().with(key, value));
    }

    /// Publishes a new snapshot with one key removed.
    pub fn remove_value(&self, key: &str) {
        self.update(|current| {
            let mut next = current.clone();
            next.remove(key);
            next
        });
    }
}
