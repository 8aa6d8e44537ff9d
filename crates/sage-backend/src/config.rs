//! Backend and polling configuration
//!
//! Loaded from TOML; every field has a default so a partial file (or none)
//! works. `SAGE_BACKEND_URL` overrides the configured base URL.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding `backend.base_url`
pub const BACKEND_URL_ENV: &str = "SAGE_BACKEND_URL";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Config path
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// File is not valid TOML for this schema
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Base URL does not parse
    #[error("invalid backend url {0:?}")]
    InvalidUrl(String),

    /// Polling interval must be at least one second
    #[error("polling.interval_secs must be at least 1")]
    ZeroPollInterval,
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SageConfig {
    /// Backend connection
    pub backend: BackendConfig,
    /// Experiment status polling
    pub polling: PollingConfig,
}

impl SageConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// Returns error if the text is not valid TOML for this schema, the
    /// base URL does not parse, or the polling interval is zero
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validated()
    }

    /// Load a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Apply environment overrides
    ///
    /// # Errors
    /// Returns error if the override URL does not parse
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        match std::env::var(BACKEND_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => self.with_base_url(url.trim()).validated(),
            _ => Ok(self),
        }
    }

    /// With backend base URL
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.backend.base_url = url.into();
        self
    }

    /// With polling interval
    #[inline]
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.polling.interval_secs = interval.as_secs().max(1);
        self
    }

    fn validated(self) -> Result<Self, ConfigError> {
        reqwest::Url::parse(&self.backend.base_url)
            .map_err(|_| ConfigError::InvalidUrl(self.backend.base_url.clone()))?;
        if self.polling.interval_secs == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(self)
    }
}

/// Backend connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL all endpoints are joined onto
    pub base_url: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl BackendConfig {
    /// Request timeout
    #[inline]
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            request_timeout_secs: 120,
        }
    }
}

/// Experiment status polling settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Seconds between status fetches
    pub interval_secs: u64,
    /// Failed fetches in a row before giving up
    pub max_consecutive_failures: u32,
}

impl PollingConfig {
    /// Interval between status fetches, never below one second
    #[inline]
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            max_consecutive_failures: 3,
        }
    }
}
