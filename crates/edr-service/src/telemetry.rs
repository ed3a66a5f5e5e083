//! Tracing subscriber installation

use crate::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Failure to install the global subscriber
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Filter directives could not be parsed
    #[error("Invalid log filter '{filter}': {message}")]
    InvalidFilter {
        /// Offending directives
        filter: String,
        /// Parser message
        message: String,
    },

    /// A global subscriber is already set
    #[error("Tracing subscriber already installed: {0}")]
    AlreadyInstalled(String),
}

/// Build the filter: `RUST_LOG` when set, the configured directives otherwise
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.filter).map_err(|e| TelemetryError::InvalidFilter {
        filter: config.filter.clone(),
        message: e.to_string(),
    })
}

/// Install a `fmt` subscriber as the global default
pub fn init_tracing(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let filter = env_filter(config)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target)
        .try_init()
        .map_err(|e| TelemetryError::AlreadyInstalled(e.to_string()))
}
