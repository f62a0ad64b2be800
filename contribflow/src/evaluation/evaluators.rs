//! Seams to the external expression and template languages.
//!
//! The registry never parses either language; it only calls these traits and
//! contains their failures.

use crate::context::ContextSnapshot;
use crate::errors::{ExpressionError, TemplateError};

/// Evaluates `when` expressions.
#[cfg_attr(test, mockall::automock)]
pub trait ExpressionEvaluator: Send + Sync {
    /// Evaluates `expression` against `context`. The result is interpreted
    /// with `is_truthy`.
    fn evaluate(
        &self,
        expression: &str,
        context: &ContextSnapshot,
    ) -> Result<serde_json::Value, ExpressionError>;
}

/// Interpolates template strings.
#[cfg_attr(test, mockall::automock)]
pub trait TemplateEvaluator: Send + Sync {
    /// Interpolates `template` against `context`.
    fn evaluate_template(
        &self,
        template: &str,
        context: &ContextSnapshot,
    ) -> Result<String, TemplateError>;

    /// Cheap pre-check for template syntax.
    ///
    /// Returning `false` must mean evaluating `text` would return it
    /// unchanged.
    fn needs_evaluation(&self, text: &str) -> bool {
        text.contains("${")
    }
}
