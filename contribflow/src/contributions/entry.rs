//! Registered contribution entries and the handles that refer to them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use super::Contributions;

/// Identity of one registered entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(Uuid);

impl EntryId {
    /// Generates a fresh entry id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// One producer's declaration.
///
/// The contributions are shared behind an `Arc` and never mutated; an update
/// is a new entry passed to `replace`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContributionsEntry {
    id: EntryId,
    source: Option<String>,
    contributions: Arc<Contributions>,
}

#[derive(Deserialize)]
struct EntryManifest {
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    contributions: Contributions,
}

impl ContributionsEntry {
    /// Creates an entry with a fresh id.
    #[must_use]
    pub fn new(contributions: Contributions) -> Self {
        Self::from_shared(Arc::new(contributions))
    }

    /// Creates an entry around already-shared contributions.
    #[must_use]
    pub fn from_shared(contributions: Arc<Contributions>) -> Self {
        Self {
            id: EntryId::new(),
            source: None,
            contributions,
        }
    }

    /// Parses an entry from `{"source": ..., "contributions": {...}}`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let manifest: EntryManifest = serde_json::from_str(json)?;
        let mut entry = Self::new(manifest.contributions);
        entry.source = manifest.source;
        Ok(entry)
    }

    /// Labels the producer, used in failure reports.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// The entry id.
    #[must_use]
    pub const fn id(&self) -> EntryId {
        self.id
    }

    /// The producer label, if any.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// The declared (unevaluated) contributions.
    #[must_use]
    pub fn contributions(&self) -> &Arc<Contributions> {
        &self.contributions
    }
}

/// Back-reference to a registered entry.
///
/// Owns no data; pass it to `deregister` or `replace`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationHandle {
    entry_id: EntryId,
}

impl RegistrationHandle {
    pub(crate) const fn new(entry_id: EntryId) -> Self {
        Self { entry_id }
    }

    /// The id of the entry this handle refers to.
    #[must_use]
    pub const fn entry_id(&self) -> EntryId {
        self.entry_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_ids_are_unique() {
        let a = ContributionsEntry::new(Contributions::new());
        let b = ContributionsEntry::new(Contributions::new());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_clone_keeps_identity() {
        let entry = ContributionsEntry::new(Contributions::new()).with_source("ext.a");
        let copy = entry.clone();
        assert_eq!(entry.id(), copy.id());
        assert!(Arc::ptr_eq(entry.contributions(), copy.contributions()));
    }

    #[test]
    fn test_entry_from_json() {
        let entry = ContributionsEntry::from_json(
            r#"{"source": "ext.git", "contributions": {"commands": [{"id": "blame"}]}}"#,
        )
        .unwrap();
        assert_eq!(entry.source(), Some("ext.git"));
        assert_eq!(entry.contributions().commands()[0].id, "blame");
    }

    #[test]
    fn test_entry_from_json_rejects_malformed() {
        assert!(ContributionsEntry::from_json(r#"{"contributions": {"commands": 3}}"#).is_err());
    }
}
