//! Error types for the contribflow registry.
//!
//! Evaluator failures (`ExpressionError`, `TemplateError`) are contained at
//! entry granularity and never escape a recomputation. Misuse of the
//! registration API is reported, never fatal.

use serde::{Deserialize, Serialize};
use std::any::Any;
use thiserror::Error;

use crate::contributions::EntryId;

/// The main error type for contribflow operations.
#[derive(Debug, Error)]
pub enum ContribflowError {
    /// An entry failed to evaluate against the current context.
    #[error("{0}")]
    Evaluation(#[from] EvaluationError),

    /// The registration API was misused.
    #[error("{0}")]
    RegistryMisuse(#[from] RegistryMisuseError),

    /// Configuration could not be loaded.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Logging could not be initialized.
    #[error("Logging error: {0}")]
    Logging(String),
}

/// Raised by an expression evaluator on malformed input.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Failed to evaluate expression '{expression}': {message}")]
pub struct ExpressionError {
    /// The expression that failed.
    pub expression: String,
    /// What went wrong.
    pub message: String,
}

impl ExpressionError {
    /// Creates a new expression error.
    #[must_use]
    pub fn new(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            message: message.into(),
        }
    }
}

/// Raised by a template evaluator on malformed input.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Failed to evaluate template '{template}': {message}")]
pub struct TemplateError {
    /// The template that failed.
    pub template: String,
    /// What went wrong.
    pub message: String,
}

impl TemplateError {
    /// Creates a new template error.
    #[must_use]
    pub fn new(template: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            message: message.into(),
        }
    }
}

/// Why a single entry produced no output for a context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    /// A `when` expression failed.
    #[error("{0}")]
    Expression(#[from] ExpressionError),

    /// A templated field failed.
    #[error("{0}")]
    Template(#[from] TemplateError),

    /// An evaluator panicked.
    #[error("Evaluator panicked: {0}")]
    Panicked(String),
}

impl EvaluationError {
    /// Short machine-readable kind, used in failure reports.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Expression(_) => "expression",
            Self::Template(_) => "template",
            Self::Panicked(_) => "panic",
        }
    }
}

/// Misuse of the registration API. Never corrupts registry state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryMisuseError {
    /// The handle does not reference a registered entry.
    #[error("No registered entry for handle {0}")]
    UnknownHandle(EntryId),

    /// The entry is already registered.
    #[error("Entry {0} is already registered")]
    DuplicateEntry(EntryId),
}

impl RegistryMisuseError {
    /// The entry id the misuse refers to.
    #[must_use]
    pub const fn entry_id(&self) -> EntryId {
        match self {
            Self::UnknownHandle(id) | Self::DuplicateEntry(id) => *id,
        }
    }
}

/// Error raised when configuration cannot be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        /// Path of the file.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration could not be parsed.
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Extracts the message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message() {
        let literal = std::panic::catch_unwind(|| panic!("plain message")).unwrap_err();
        assert_eq!(panic_message(literal.as_ref()), "plain message");

        let formatted = std::panic::catch_unwind(|| panic!("value {}", 42)).unwrap_err();
        assert_eq!(panic_message(formatted.as_ref()), "value 42");

        let opaque: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(opaque.as_ref()), "unknown panic");
    }

    #[test]
    fn test_expression_error_display() {
        let err = ExpressionError::new("a &&", "unexpected end of input");
        assert_eq!(
            err.to_string(),
            "Failed to evaluate expression 'a &&': unexpected end of input"
        );
    }

    #[test]
    fn test_evaluation_error_kind() {
        let expr: EvaluationError = ExpressionError::new("x", "bad").into();
        let tmpl: EvaluationError = TemplateError::new("${", "unterminated").into();
        assert_eq!(expr.kind(), "expression");
        assert_eq!(tmpl.kind(), "template");
        assert_eq!(EvaluationError::Panicked("boom".into()).kind(), "panic");
    }

    #[test]
    fn test_misuse_error_entry_id() {
        let id = EntryId::new();
        assert_eq!(RegistryMisuseError::UnknownHandle(id).entry_id(), id);
        assert!(RegistryMisuseError::DuplicateEntry(id)
            .to_string()
            .contains("already registered"));
    }

    #[test]
    fn test_umbrella_conversion() {
        let err: ContribflowError = RegistryMisuseError::UnknownHandle(EntryId::new()).into();
        assert!(matches!(err, ContribflowError::RegistryMisuse(_)));
    }
}
