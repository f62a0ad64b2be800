//! `tracing-subscriber` setup.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::errors::ContribflowError;

/// Installs a global `fmt` subscriber.
///
/// `RUST_LOG` takes precedence over `config.level`. Fails, rather than
/// panicking, if a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), ContribflowError> {
    let filter = build_filter(config)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| ContribflowError::Logging(e.to_string()))
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, ContribflowError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| {
            ContribflowError::Logging(format!("invalid log level '{}': {e}", config.level))
        })
}
