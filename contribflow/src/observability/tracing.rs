//! Span attributes and timing for registry recomputations.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;

use crate::registry::{RecomputeOutcome, Stamp};

/// Flat description of one recomputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecomputeAttributes {
    /// Entry store revision the recomputation used.
    pub entries_revision: u64,
    /// Context sequence the recomputation used.
    pub context_sequence: u64,
    /// Entries evaluated.
    pub entries: usize,
    /// Entries whose evaluation failed.
    pub failed_entries: usize,
    /// What happened to the result.
    pub outcome: RecomputeOutcome,
    /// Wall time in milliseconds.
    pub duration_ms: f64,
}

impl RecomputeAttributes {
    /// Creates attributes for a recomputation.
    #[must_use]
    pub fn new(stamp: Stamp, outcome: RecomputeOutcome) -> Self {
        Self {
            entries_revision: stamp.entries_revision,
            context_sequence: stamp.context_sequence,
            entries: 0,
            failed_entries: 0,
            outcome,
            duration_ms: 0.0,
        }
    }

    /// Sets the entry counts.
    #[must_use]
    pub fn with_entries(mut self, entries: usize, failed_entries: usize) -> Self {
        self.entries = entries;
        self.failed_entries = failed_entries;
        self
    }

    /// Sets the duration.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Converts to OpenTelemetry-style attributes.
    #[must_use]
    pub fn to_otel_attributes(&self) -> HashMap<String, String> {
        let mut attrs = HashMap::new();
        attrs.insert("registry.revision".to_string(), self.entries_revision.to_string());
        attrs.insert("registry.context_sequence".to_string(), self.context_sequence.to_string());
        attrs.insert("registry.entries".to_string(), self.entries.to_string());
        attrs.insert("registry.failed_entries".to_string(), self.failed_entries.to_string());
        attrs.insert("registry.outcome".to_string(), self.outcome.to_string());
        attrs.insert("registry.duration_ms".to_string(), self.duration_ms.to_string());
        attrs
    }
}

/// Simple span timing helper.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    name: String,
}

impl SpanTimer {
    /// Starts a new span timer.
    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Returns the span name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finishes the timer and returns the duration in milliseconds.
    #[must_use]
    pub fn finish(self) -> f64 {
        self.elapsed_ms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recompute_attributes() {
        let attrs = RecomputeAttributes::new(Stamp::new(3, 7), RecomputeOutcome::Published)
            .with_entries(4, 1)
            .with_duration_ms(1.5);

        let otel = attrs.to_otel_attributes();
        assert_eq!(otel.get("registry.revision"), Some(&"3".to_string()));
        assert_eq!(otel.get("registry.context_sequence"), Some(&"7".to_string()));
        assert_eq!(otel.get("registry.failed_entries"), Some(&"1".to_string()));
        assert_eq!(otel.get("registry.outcome"), Some(&"published".to_string()));
        assert_eq!(otel.get("registry.duration_ms"), Some(&"1.5".to_string()));
    }

    #[test]
    fn test_span_timer() {
        let timer = SpanTimer::start("test_span");
        assert_eq!(timer.name(), "test_span");
        std::thread::sleep(std::time::Duration::from_millis(10));
        let duration = timer.finish();
        assert!(duration >= 10.0);
    }
}
