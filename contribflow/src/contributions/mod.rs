//! Contribution data model and merge engine.
//!
//! This module provides:
//! - Manifest types (`Contributions`, commands, menu items)
//! - Registered entries and their handles
//! - The order-preserving merge used to build the aggregate

mod entry;
mod merge;
mod model;

pub use entry::{ContributionsEntry, EntryId, RegistrationHandle};
pub use merge::merge_contributions;
pub use model::{
    ActionItem, CommandContribution, ContributableMenu, Contributions, MenuItemContribution,
    MenuMap,
};
