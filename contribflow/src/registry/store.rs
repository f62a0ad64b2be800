//! The ordered store of registered entries.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::contributions::{ContributionsEntry, EntryId, RegistrationHandle};
use crate::errors::RegistryMisuseError;
use crate::events::{EventSink, REGISTRY_MISUSE};
use crate::reactive::{Subject, Subscription};

/// The raw, ordered list of registered entries.
pub type EntryList = Arc<Vec<Arc<ContributionsEntry>>>;

/// Holds registered entries in registration order.
///
/// Every successful operation is exactly one state transition: the list is
/// swapped for a new one and subscribers are notified once. Failed or no-op
/// operations leave the list and the revision untouched.
#[derive(Clone)]
pub struct EntryStore {
    entries: Subject<EntryList>,
    sink: Arc<dyn EventSink>,
}

impl EntryStore {
    /// Creates an empty store reporting misuse to `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            entries: Subject::new(Arc::new(Vec::new())),
            sink,
        }
    }

    /// Appends an entry.
    ///
    /// # Errors
    ///
    /// Returns `RegistryMisuseError::DuplicateEntry` if the entry is already
    /// registered.
    pub fn register(
        &self,
        entry: ContributionsEntry,
    ) -> Result<RegistrationHandle, RegistryMisuseError> {
        let id = entry.id();
        let mut duplicate = false;
        self.entries.try_update(|current| {
            if contains(current, id) {
                duplicate = true;
                return None;
            }
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Arc::new(entry));
            Some(Arc::new(next))
        });

        if duplicate {
            return Err(self.misuse(RegistryMisuseError::DuplicateEntry(id)));
        }
        debug!(entry_id = %id, revision = self.revision(), "Registered contribution entry");
        Ok(RegistrationHandle::new(id))
    }

    /// Removes the entry behind `old` and appends `entry` in one transition.
    ///
    /// An unknown `old` handle is reported but the new entry is still
    /// registered.
    ///
    /// # Errors
    ///
    /// Returns `RegistryMisuseError::DuplicateEntry` if `entry` is already
    /// registered under another handle; nothing changes in that case.
    pub fn replace(
        &self,
        old: RegistrationHandle,
        entry: ContributionsEntry,
    ) -> Result<RegistrationHandle, RegistryMisuseError> {
        let old_id = old.entry_id();
        let new_id = entry.id();
        let mut duplicate = false;
        let mut old_missing = false;
        self.entries.try_update(|current| {
            if new_id != old_id && contains(current, new_id) {
                duplicate = true;
                return None;
            }
            old_missing = !contains(current, old_id);
            let mut next: Vec<_> = current
                .iter()
                .filter(|existing| existing.id() != old_id)
                .cloned()
                .collect();
            next.push(Arc::new(entry));
            Some(Arc::new(next))
        });

        if duplicate {
            return Err(self.misuse(RegistryMisuseError::DuplicateEntry(new_id)));
        }
        if old_missing {
            self.misuse(RegistryMisuseError::UnknownHandle(old_id));
        }
        debug!(
            old_entry_id = %old_id,
            entry_id = %new_id,
            revision = self.revision(),
            "Replaced contribution entry"
        );
        Ok(RegistrationHandle::new(new_id))
    }

    /// Removes the entry behind `handle`. Returns false, without a state
    /// transition, if it is not registered.
    pub fn deregister(&self, handle: RegistrationHandle) -> bool {
        let id = handle.entry_id();
        let removed = self.entries.try_update(|current| {
            if !contains(current, id) {
                return None;
            }
            let next: Vec<_> = current
                .iter()
                .filter(|existing| existing.id() != id)
                .cloned()
                .collect();
            Some(Arc::new(next))
        });

        if removed {
            debug!(entry_id = %id, revision = self.revision(), "Deregistered contribution entry");
        } else {
            debug!(entry_id = %id, "Deregister ignored, entry not registered");
        }
        removed
    }

    /// The current entries, in registration order.
    #[must_use]
    pub fn entries(&self) -> EntryList {
        self.entries.value()
    }

    /// The current entries with the revision they belong to.
    #[must_use]
    pub fn snapshot(&self) -> (u64, EntryList) {
        self.entries.snapshot()
    }

    /// Number of state transitions so far.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.entries.sequence()
    }

    /// Returns true if the handle's entry is registered.
    #[must_use]
    pub fn contains(&self, handle: RegistrationHandle) -> bool {
        contains(&self.entries.value(), handle.entry_id())
    }

    /// Number of registered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.value().len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.value().is_empty()
    }

    /// Subscribes to the raw entry list. The listener is called immediately
    /// and after every state transition.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&EntryList) + Send + Sync + 'static,
    {
        self.entries.subscribe(listener)
    }

    fn misuse(&self, error: RegistryMisuseError) -> RegistryMisuseError {
        warn!(entry_id = %error.entry_id(), error = %error, "Registry misuse");
        self.sink.try_emit(
            REGISTRY_MISUSE,
            Some(serde_json::json!({
                "entry_id": error.entry_id().to_string(),
                "error": error.to_string(),
            })),
        );
        error
    }
}

impl std::fmt::Debug for EntryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryStore")
            .field("revision", &self.revision())
            .field("entries", &self.len())
            .finish()
    }
}

fn contains(entries: &[Arc<ContributionsEntry>], id: EntryId) -> bool {
    entries.iter().any(|entry| entry.id() == id)
}
