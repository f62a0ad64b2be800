//! Registry configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::ConfigError;
use crate::events::EVALUATION_FAILED;

/// Configuration for a contribution registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Skip the template evaluator for text without template syntax.
    #[serde(default = "default_true")]
    pub interpolation_shortcut: bool,
    /// Include the failing entry's contributions in failure events.
    #[serde(default = "default_true")]
    pub report_failure_contributions: bool,
    /// Event type used for per-entry evaluation failures.
    #[serde(default = "default_failure_event_type")]
    pub failure_event_type: String,
    /// Emit an event for every published aggregate.
    #[serde(default)]
    pub emit_publish_events: bool,
    /// Logging setup.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_true() -> bool {
    true
}

fn default_failure_event_type() -> String {
    EVALUATION_FAILED.to_string()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            interpolation_shortcut: default_true(),
            report_failure_contributions: default_true(),
            failure_event_type: default_failure_event_type(),
            emit_publish_events: false,
            logging: LoggingConfig::default(),
        }
    }
}

impl RegistryConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Enables or disables the `needs_evaluation` shortcut.
    #[must_use]
    pub fn with_interpolation_shortcut(mut self, enabled: bool) -> Self {
        self.interpolation_shortcut = enabled;
        self
    }

    /// Controls whether failure events carry the entry's contributions.
    #[must_use]
    pub fn with_report_failure_contributions(mut self, enabled: bool) -> Self {
        self.report_failure_contributions = enabled;
        self
    }

    /// Sets the failure event type.
    #[must_use]
    pub fn with_failure_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.failure_event_type = event_type.into();
        self
    }

    /// Enables publish events.
    #[must_use]
    pub fn with_publish_events(mut self, enabled: bool) -> Self {
        self.emit_publish_events = enabled;
        self
    }

    /// Sets the logging configuration.
    #[must_use]
    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }
}

/// Logging configuration used by `observability::init_logging`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}
