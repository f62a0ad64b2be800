//! The contribution registry.
//!
//! This module provides:
//! - `EntryStore`, the ordered list of registered entries
//! - `Publisher`, which recomputes and publishes the aggregate on change
//! - `Registry`, which wires both to a `ContextSubject`

#[allow(clippy::module_inception)]
mod registry;
#[cfg(test)]
mod registry_tests;
mod publisher;
mod store;
mod stream;

pub use publisher::{Publisher, PublisherStats, RecomputeOutcome, Stamp};
pub use registry::{Registry, RegistryBuilder};
pub use store::{EntryList, EntryStore};
pub use stream::AggregateStream;
