//! # Contribflow
//!
//! Aggregates contribution manifests from independently registered producers
//! into one context-resolved view.
//!
//! Contribflow provides:
//!
//! - **Entry registration**: register, atomically replace and deregister
//!   contribution entries
//! - **Context-driven evaluation**: menu items filtered by `when` expressions
//!   and command fields interpolated from the live context
//! - **Failure isolation**: a failing entry contributes nothing and is
//!   reported, the rest of the aggregate is unaffected
//! - **Change detection**: subscribers only see aggregates that differ from
//!   the previous one
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use contribflow::prelude::*;
//!
//! let context = ContextSubject::new(ContextSnapshot::new().with("user", "Bo"));
//! let registry = Registry::new(context.clone(), expressions, templates);
//!
//! let handle = registry.register(ContributionsEntry::from_json(manifest)?)?;
//! let _subscription = registry.subscribe(|aggregate| render(aggregate));
//!
//! context.set_value("user", "Zed");
//! registry.deregister(handle);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod contributions;
pub mod errors;
pub mod evaluation;
pub mod events;
pub mod observability;
pub mod reactive;
pub mod registry;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{LoggingConfig, RegistryConfig};
    pub use crate::context::{is_truthy, ContextSnapshot, ContextSubject};
    pub use crate::contributions::{
        merge_contributions, ActionItem, CommandContribution, ContributableMenu, Contributions,
        ContributionsEntry, EntryId, MenuItemContribution, RegistrationHandle,
    };
    pub use crate::errors::{
        ConfigError, ContribflowError, EvaluationError, ExpressionError, RegistryMisuseError,
        TemplateError,
    };
    pub use crate::evaluation::{ExpressionEvaluator, TemplateEvaluator};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::observability::init_logging;
    pub use crate::reactive::{Subject, Subscription};
    pub use crate::registry::{AggregateStream, Registry, RegistryBuilder};
}
