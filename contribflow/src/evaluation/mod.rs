//! Per-entry evaluation: `when` filtering, then template interpolation.
//!
//! This module provides:
//! - The evaluator seams (`ExpressionEvaluator`, `TemplateEvaluator`)
//! - Menu filtering and command interpolation, both identity-preserving
//! - `EntryEvaluator`, which isolates failures to a single entry

mod entry;
mod evaluators;
mod filter;
mod interpolate;

pub use entry::{EntryEvaluator, EntryOutcome, EvaluationFailure};
pub use evaluators::{ExpressionEvaluator, TemplateEvaluator};
pub use filter::filter_contributions;
pub use interpolate::Interpolator;

#[cfg(test)]
pub use evaluators::{MockExpressionEvaluator, MockTemplateEvaluator};
