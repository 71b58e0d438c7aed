//! Configuration for the task-tracking client.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{DocragError, Result};

/// Backend address used when neither the config file, the environment, nor
/// the persisted endpoint name one.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Environment variable overriding [`ClientConfig::api_url`].
pub const API_URL_ENV: &str = "DOCRAG_API_URL";

/// Top-level client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Default backend base address. A persisted endpoint overrides it.
    pub api_url: String,
    /// Seconds between heartbeat health checks.
    pub heartbeat_interval_secs: u64,
    /// Seconds between keep-alive pings.
    pub keep_alive_interval_secs: u64,
    /// Milliseconds between status polls of an in-progress task.
    pub poll_interval_ms: u64,
    /// Maximum number of tasks kept in the recent-task history.
    pub cache_capacity: usize,
    /// Per-request HTTP timeout. `None` leaves requests unbounded.
    pub request_timeout_secs: Option<u64>,
    /// Directory for persisted client state. `None` uses the data dir.
    pub store_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            heartbeat_interval_secs: 30,
            keep_alive_interval_secs: 14 * 60,
            poll_interval_ms: 4_000,
            cache_capacity: 10,
            request_timeout_secs: None,
            store_dir: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| DocragError::Config(e.to_string()))
    }

    /// Load `path` if given, else the default path if it exists, else defaults.
    /// Environment overrides are applied last.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file cannot be loaded, or if a
    /// file found at the default path is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default_path = Self::default_config_path();
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };
        let config = config.with_api_url_override(std::env::var(API_URL_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| DocragError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `<config dir>/config.toml`.
    pub fn default_config_path() -> PathBuf {
        crate::docrag_dirs::config_dir().join("config.toml")
    }

    /// Replace `api_url` when `value` is a non-empty string.
    pub fn with_api_url_override(mut self, value: Option<String>) -> Self {
        if let Some(url) = value.filter(|v| !v.trim().is_empty()) {
            self.api_url = url;
        }
        self
    }

    /// Validates intervals and capacity.
    ///
    /// # Errors
    ///
    /// Returns [`DocragError::Config`] naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.heartbeat_interval_secs == 0 {
            return Err(DocragError::Config(
                "heartbeat_interval_secs must be greater than 0".into(),
            ));
        }
        if self.keep_alive_interval_secs == 0 {
            return Err(DocragError::Config(
                "keep_alive_interval_secs must be greater than 0".into(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(DocragError::Config(
                "poll_interval_ms must be greater than 0".into(),
            ));
        }
        if self.cache_capacity == 0 {
            return Err(DocragError::Config(
                "cache_capacity must be greater than 0".into(),
            ));
        }
        docrag_api::config::validate_base_url(self.api_url.trim_end_matches('/'))?;
        Ok(())
    }

    /// Heartbeat cadence.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// Keep-alive cadence.
    pub fn keep_alive_interval(&self) -> Duration {
        Duration::from_secs(self.keep_alive_interval_secs)
    }

    /// Status poll cadence.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Directory holding persisted client state.
    pub fn resolved_store_dir(&self) -> PathBuf {
        self.store_dir
            .clone()
            .unwrap_or_else(crate::docrag_dirs::store_dir)
    }

    /// HTTP client settings for `base_url`.
    pub fn api_config(&self, base_url: &str) -> docrag_api::ApiConfig {
        docrag_api::ApiConfig {
            timeout_seconds: self.request_timeout_secs,
            ..docrag_api::ApiConfig::new(base_url)
        }
    }
}
