//! Immutable context snapshots consumed by evaluators.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A key/value view of the runtime context.
///
/// Snapshots share their published values behind an `Arc`. `child()` derives
/// a scope for one evaluation: values inserted into the child shadow the
/// parent's and never leak back into the shared snapshot.
#[derive(Debug, Clone, Default)]
pub struct ContextSnapshot {
    shared: Arc<BTreeMap<String, Value>>,
    local: BTreeMap<String, Value>,
}

impl ContextSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a snapshot from a map of values.
    #[must_use]
    pub fn from_map(values: BTreeMap<String, Value>) -> Self {
        Self {
            shared: Arc::new(values),
            local: BTreeMap::new(),
        }
    }

    /// Creates a snapshot from a JSON object. Non-object values yield an
    /// empty snapshot.
    #[must_use]
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::from_map(map.into_iter().collect()),
            _ => Self::new(),
        }
    }

    /// Returns a copy with `key` set.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Sets a published value. Other snapshots sharing the same values are
    /// unaffected.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        self.local.remove(&key);
        Arc::make_mut(&mut self.shared).insert(key, value.into());
    }

    /// Removes a value.
    pub fn remove(&mut self, key: &str) {
        self.local.remove(key);
        if self.shared.contains_key(key) {
            Arc::make_mut(&mut self.shared).remove(key);
        }
    }

    /// Derives a scope for one evaluation.
    #[must_use]
    pub fn child(&self) -> Self {
        if self.local.is_empty() {
            return Self {
                shared: Arc::clone(&self.shared),
                local: BTreeMap::new(),
            };
        }
        let mut flattened = (*self.shared).clone();
        flattened.extend(self.local.clone());
        Self::from_map(flattened)
    }

    /// Sets a value visible only in this scope.
    pub fn insert_local(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.local.insert(key.into(), value.into());
    }

    /// Looks up a top-level key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.local.get(key).or_else(|| self.shared.get(key))
    }

    /// Looks up a dotted path such as `resource.language`, descending into
    /// JSON objects. A top-level key containing dots wins over descent.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        if let Some(value) = self.get(path) {
            return Some(value);
        }
        let mut segments = path.split('.');
        let mut current = self.get(segments.next()?)?;
        for segment in segments {
            current = current.get(segment)?;
        }
        Some(current)
    }

    /// Returns true if the key is set in this scope or the parent.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of distinct visible keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.len()
            + self
                .local
                .keys()
                .filter(|key| !self.shared.contains_key(*key))
                .count()
    }

    /// Returns true if no keys are visible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.is_empty() && self.local.is_empty()
    }

    /// Returns all visible values as a JSON object.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut map: serde_json::Map<String, Value> = self
            .shared
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (k, v) in &self.local {
            map.insert(k.clone(), v.clone());
        }
        Value::Object(map)
    }
}

impl PartialEq for ContextSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.to_json() == other.to_json()
    }
}

/// Truthiness of an expression result.
///
/// `null`, `false`, `0`, NaN and the empty string are falsy; everything else,
/// including empty arrays and objects, is truthy.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
