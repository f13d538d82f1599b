//! Session configuration
//!
//! Settings come from built-in defaults, optionally overlaid by a JSON file,
//! then by command-line flags.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::data::endpoints::{DEFAULT_BASE_URL, DEFAULT_DIAGNOSTICS_URL};
use crate::fetch::RetryPolicy;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid JSON or has unknown keys
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Tunables for one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Cache time-to-live in seconds; zero or negative disables reuse
    pub ttl_seconds: i64,
    /// Attempts per logical request, including the first
    pub retry_limit: u32,
    /// Backoff unit between attempts in milliseconds
    pub base_delay_millis: u64,
    /// Per-request transport timeout in seconds
    pub timeout_seconds: u64,
    /// Entry count above which the cache sweeps expired entries
    pub cache_sweep_threshold: usize,
    /// API root URL
    pub base_url: String,
    /// Root URL of the httpbin-style echo service used by `test-http`
    pub diagnostics_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ttl_seconds: 300,
            retry_limit: 3,
            base_delay_millis: 500,
            timeout_seconds: 10,
            cache_sweep_threshold: 100,
            base_url: DEFAULT_BASE_URL.to_string(),
            diagnostics_url: DEFAULT_DIAGNOSTICS_URL.to_string(),
        }
    }
}

impl Config {
    /// Reads a JSON config file; missing keys keep their defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Checks value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry_limit == 0 {
            return Err(ConfigError::Invalid(
                "retry_limit must be at least 1".to_string(),
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "timeout_seconds must be at least 1".to_string(),
            ));
        }

        validate_url("base_url", &self.base_url)?;
        validate_url("diagnostics_url", &self.diagnostics_url)?;

        Ok(())
    }

    /// Retry budget for the session fetcher
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_limit,
            Duration::from_millis(self.base_delay_millis),
        )
    }

    /// Per-request transport timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn validate_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = reqwest::Url::parse(value)
        .map_err(|e| ConfigError::Invalid(format!("{} '{}': {}", field, value, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }
    Ok(())
}
