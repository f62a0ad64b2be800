//! Testing utilities for contribution registries.
//!
//! This module provides:
//! - Stand-in expression and template evaluators
//! - Fixture builders for entries and menu items
//! - A recording subscriber and a fully wired test registry

mod evaluators;
mod fixtures;

pub use evaluators::{
    CountingTemplateEvaluator, FailingExpressionEvaluator, LiteralExpressionEvaluator,
    PlaceholderTemplateEvaluator,
};
pub use fixtures::{
    command, entry_with_commands, entry_with_menu, menu_item, RecordingSubscriber, TestRegistry,
};
