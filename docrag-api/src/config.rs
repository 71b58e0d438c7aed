//! Client configuration.
//!
//! [`ApiConfig`] names the backend and tunes the HTTP client. Defaults
//! apply no request timeout beyond what the transport imposes.

use crate::error::ApiError;

/// Configuration for an [`ApiClient`](crate::ApiClient).
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Backend base address, e.g. `https://docrag.example.com`.
    pub base_url: String,
    /// Per-request timeout in seconds. `None` leaves requests unbounded.
    pub timeout_seconds: Option<u64>,
    /// Custom User-Agent string. `None` uses `docrag-api/<version>`.
    pub user_agent: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_owned(),
            timeout_seconds: None,
            user_agent: None,
        }
    }
}

impl ApiConfig {
    /// Configuration for a specific backend address.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(&base_url.into()),
            ..Default::default()
        }
    }

    /// Set the per-request timeout.
    pub fn with_timeout_seconds(mut self, secs: u64) -> Self {
        self.timeout_seconds = Some(secs);
        self
    }

    /// Validates this configuration.
    ///
    /// Checks:
    /// - `base_url` must be an absolute `http` or `https` URL
    /// - `timeout_seconds`, when set, must be greater than 0
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_base_url(&self.base_url)?;
        if self.timeout_seconds == Some(0) {
            return Err(ApiError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Trim whitespace and trailing slashes so paths can be appended with `/`.
pub fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_owned()
}

/// Reject anything that is not an absolute `http`/`https` URL.
pub fn validate_base_url(base_url: &str) -> Result<(), ApiError> {
    let parsed = url::Url::parse(base_url)
        .map_err(|e| ApiError::Config(format!("invalid base URL '{base_url}': {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ApiError::Config(format!(
            "unsupported URL scheme '{other}' in '{base_url}'"
        ))),
    }
}
