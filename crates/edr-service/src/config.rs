//! Service configuration
//!
//! Loaded from TOML, then overridden by `EDR_`-prefixed environment variables:
//!
//! ```toml
//! [negotiation]
//! queue_capacity = 256
//! max_concurrent = 16
//!
//! [query]
//! max_limit = 1000
//!
//! [logging]
//! filter = "info,edr_negotiation=debug"
//!
//! [[trust_contexts]]
//! url = "https://www.w3.org/ns/credentials/v2"
//! version = "2.0"
//! path = "contexts/credentials-v2.jsonld"
//! ```

use crate::service::DEFAULT_MAX_QUERY_LIMIT;
use edr_core::TrustContextError;
use edr_negotiation::NegotiationConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "EDR_";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A file could not be read
    #[error("Failed to read {path}: {message}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        message: String,
    },

    /// TOML did not match the schema
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// A value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// Trust-context documents could not be registered
    #[error(transparent)]
    TrustContext(#[from] TrustContextError),
}

/// Query limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Largest accepted page
    pub max_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_limit: DEFAULT_MAX_QUERY_LIMIT,
        }
    }
}

/// Log output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, overridden by `RUST_LOG`
    pub filter: String,
    /// Include the event target in each line
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            with_target: true,
        }
    }
}

/// Where to load a trust-context document from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustContextSource {
    /// URL the document is published under
    pub url: String,
    /// Declared version
    #[serde(default)]
    pub version: Option<String>,
    /// Local copy of the document
    pub path: PathBuf,
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdrConfig {
    /// Orchestrator limits
    pub negotiation: NegotiationConfig,
    /// Query limits
    pub query: QueryConfig,
    /// Log output
    pub logging: LoggingConfig,
    /// Trust-context documents to register at startup
    pub trust_contexts: Vec<TrustContextSource>,
}

impl EdrConfig {
    /// Load from a TOML file, apply environment overrides and validate
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut config = Self::from_toml_str(&content)?;
        config.merge_with_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML without applying overrides
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply `EDR_*` variables from the process environment
    pub fn merge_with_env(&mut self) -> Result<(), ConfigError> {
        self.merge_with_vars(std::env::vars())
    }

    /// Apply `EDR_*` overrides from an explicit set of variables
    pub fn merge_with_vars(
        &mut self,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<(), ConfigError> {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "NEGOTIATION_QUEUE_CAPACITY" => {
                    self.negotiation.queue_capacity = parse_number(&key, &value)?;
                }
                "NEGOTIATION_MAX_CONCURRENT" => {
                    self.negotiation.max_concurrent = parse_number(&key, &value)?;
                }
                "QUERY_MAX_LIMIT" => self.query.max_limit = parse_number(&key, &value)?,
                "LOG_FILTER" => self.logging.filter = value,
                "LOG_WITH_TARGET" => {
                    self.logging.with_target = value.parse().map_err(|_| {
                        ConfigError::Invalid(format!("{key} must be true or false, got {value}"))
                    })?;
                }
                _ => tracing::debug!(variable = %key, "Ignoring unknown EDR variable"),
            }
        }
        Ok(())
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.negotiation.validate().map_err(ConfigError::Invalid)?;
        if self.query.max_limit == 0 {
            return Err(ConfigError::Invalid(
                "query.max_limit must be greater than zero".to_string(),
            ));
        }
        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "logging.filter must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_number(key: &str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{key} must be a number, got {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    #[test]
    fn empty_document_yields_defaults() {
        let config = EdrConfig::from_toml_str("").unwrap();
        assert_eq!(config, EdrConfig::default());
        assert_eq!(config.negotiation.queue_capacity, 256);
        assert_eq!(config.query.max_limit, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let config = EdrConfig::from_toml_str(
            r#"
            [negotiation]
            max_concurrent = 4

            [[trust_contexts]]
            url = "https://www.w3.org/ns/credentials/v2"
            path = "ctx.jsonld"
            "#,
        )
        .unwrap();
        assert_eq!(config.negotiation.max_concurrent, 4);
        assert_eq!(config.negotiation.queue_capacity, 256);
        assert_eq!(config.trust_contexts.len(), 1);
        assert_eq!(config.trust_contexts[0].version, None);
    }

    #[test]
    fn unknown_types_fail_to_parse() {
        let result = EdrConfig::from_toml_str("[negotiation]\nqueue_capacity = \"many\"");
        assert_matches!(result, Err(ConfigError::Parse(_)));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = EdrConfig::default();
        config
            .merge_with_vars([
                ("EDR_NEGOTIATION_QUEUE_CAPACITY".to_string(), "8".to_string()),
                ("EDR_QUERY_MAX_LIMIT".to_string(), "20".to_string()),
                ("EDR_LOG_FILTER".to_string(), "debug".to_string()),
                ("EDR_LOG_WITH_TARGET".to_string(), "false".to_string()),
                ("HOME".to_string(), "/root".to_string()),
            ])
            .unwrap();

        assert_eq!(config.negotiation.queue_capacity, 8);
        assert_eq!(config.query.max_limit, 20);
        assert_eq!(config.logging.filter, "debug");
        assert!(!config.logging.with_target);
    }

    #[test]
    fn malformed_env_override_is_invalid() {
        let mut config = EdrConfig::default();
        let result = config.merge_with_vars([(
            "EDR_NEGOTIATION_MAX_CONCURRENT".to_string(),
            "lots".to_string(),
        )]);
        assert_matches!(result, Err(ConfigError::Invalid(_)));
    }

    #[test]
    fn zero_limits_are_invalid() {
        let mut config = EdrConfig::default();
        config.negotiation.queue_capacity = 0;
        assert_matches!(config.validate(), Err(ConfigError::Invalid(_)));

        let mut config = EdrConfig::default();
        config.query.max_limit = 0;
        assert_matches!(config.validate(), Err(ConfigError::Invalid(_)));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[query]\nmax_limit = 25").unwrap();

        let config = EdrConfig::load(file.path()).unwrap();
        assert_eq!(config.query.max_limit, 25);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = EdrConfig::load(&dir.path().join("absent.toml"));
        assert_matches!(result, Err(ConfigError::Io { .. }));
    }
}
