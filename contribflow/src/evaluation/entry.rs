//! Per-entry evaluation with failure isolation.

use chrono::{DateTime, Utc};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::warn;

use super::{filter_contributions, ExpressionEvaluator, Interpolator, TemplateEvaluator};
use crate::config::RegistryConfig;
use crate::context::ContextSnapshot;
use crate::contributions::{Contributions, ContributionsEntry, EntryId};
use crate::errors::{panic_message, EvaluationError};
use crate::events::EventSink;

/// A failed evaluation of one entry against one context.
#[derive(Debug, Clone)]
pub struct EvaluationFailure {
    /// The failing entry.
    pub entry_id: EntryId,
    /// The producer label, if any.
    pub source: Option<String>,
    /// What went wrong.
    pub error: EvaluationError,
    /// The entry's declared contributions.
    pub contributions: Arc<Contributions>,
    /// When the failure happened.
    pub timestamp: DateTime<Utc>,
}

impl EvaluationFailure {
    /// Builds the event payload. `include_contributions` controls whether the
    /// declared contributions are attached.
    #[must_use]
    pub fn to_event_payload(&self, include_contributions: bool) -> serde_json::Value {
        let mut payload = serde_json::json!({
            "entry_id": self.entry_id.to_string(),
            "source": self.source,
            "error_kind": self.error.kind(),
            "error": self.error.to_string(),
            "timestamp": self.timestamp.to_rfc3339(),
        });
        if include_contributions {
            payload["contributions"] =
                serde_json::to_value(&*self.contributions).unwrap_or(serde_json::Value::Null);
        }
        payload
    }
}

/// Result of evaluating one entry.
#[derive(Debug, Clone)]
pub enum EntryOutcome {
    /// The entry evaluated; the contributions may be the entry's own `Arc`.
    Evaluated(Arc<Contributions>),
    /// The entry failed and contributes nothing.
    Failed(Box<EvaluationFailure>),
}

impl EntryOutcome {
    /// What this entry contributes to the aggregate.
    #[must_use]
    pub fn contributions(&self) -> Arc<Contributions> {
        match self {
            Self::Evaluated(contributions) => Arc::clone(contributions),
            Self::Failed(_) => Arc::new(Contributions::default()),
        }
    }

    /// Returns true if the entry failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Filters then interpolates one entry, containing any evaluator failure.
#[derive(Clone)]
pub struct EntryEvaluator {
    expressions: Arc<dyn ExpressionEvaluator>,
    templates: Arc<dyn TemplateEvaluator>,
    sink: Arc<dyn EventSink>,
    config: Arc<RegistryConfig>,
}

impl EntryEvaluator {
    /// Creates an entry evaluator.
    #[must_use]
    pub fn new(
        expressions: Arc<dyn ExpressionEvaluator>,
        templates: Arc<dyn TemplateEvaluator>,
        sink: Arc<dyn EventSink>,
        config: Arc<RegistryConfig>,
    ) -> Self {
        Self {
            expressions,
            templates,
            sink,
            config,
        }
    }

    /// Evaluates an entry. Failures are logged, reported to the event sink
    /// and turned into `EntryOutcome::Failed`.
    pub fn evaluate(&self, entry: &ContributionsEntry, context: &ContextSnapshot) -> EntryOutcome {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.try_evaluate(entry.contributions(), context)
        }))
        .unwrap_or_else(|payload| {
            Err(EvaluationError::Panicked(panic_message(payload.as_ref())))
        });

        match result {
            Ok(contributions) => EntryOutcome::Evaluated(contributions),
            Err(error) => {
                let failure = EvaluationFailure {
                    entry_id: entry.id(),
                    source: entry.source().map(str::to_string),
                    error,
                    contributions: Arc::clone(entry.contributions()),
                    timestamp: Utc::now(),
                };
                self.report(&failure);
                EntryOutcome::Failed(Box::new(failure))
            }
        }
    }

    /// Evaluates contributions without failure containment.
    ///
    /// Returns the same `Arc` when filtering and interpolation changed
    /// nothing.
    pub fn try_evaluate(
        &self,
        contributions: &Arc<Contributions>,
        context: &ContextSnapshot,
    ) -> Result<Arc<Contributions>, EvaluationError> {
        let filtered = filter_contributions(contributions, context, self.expressions.as_ref())?;

        let interpolated = match Interpolator::new(self.templates.as_ref(), context)
            .with_shortcut(self.config.interpolation_shortcut)
            .interpolate_contributions(&filtered)?
        {
            Cow::Borrowed(_) => None,
            Cow::Owned(owned) => Some(owned),
        };

        Ok(match (interpolated, filtered) {
            (Some(owned), _) | (None, Cow::Owned(owned)) => Arc::new(owned),
            (None, Cow::Borrowed(_)) => Arc::clone(contributions),
        })
    }

    fn report(&self, failure: &EvaluationFailure) {
        warn!(
            entry_id = %failure.entry_id,
            source = ?failure.source,
            error_kind = failure.error.kind(),
            error = %failure.error,
            "Contribution entry failed to evaluate; it contributes nothing for this context"
        );
        self.sink.try_emit(
            &self.config.failure_event_type,
            Some(failure.to_event_payload(self.config.report_failure_contributions)),
        );
    }
}

impl std::fmt::Debug for EntryEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryEvaluator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
