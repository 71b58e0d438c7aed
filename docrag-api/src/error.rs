//! Error types for the docrag-api crate.
//!
//! Messages are stable, human-readable strings. Callers that surface an
//! error to a user can print it verbatim.

/// Errors returned by [`ApiBoundary`](crate::ApiBoundary) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The backend could not be reached (connect failure, timeout, reset).
    #[error("{0}")]
    Transport(String),

    /// The backend answered with an application-level failure.
    #[error("{message}")]
    Backend {
        /// HTTP status code, or `None` when the body could not be decoded.
        status: Option<u16>,
        /// Message extracted from the response (`detail` field when present).
        message: String,
    },

    /// The requested resource (task, document) is unknown to the backend.
    #[error("not found: {0}")]
    NotFound(String),

    /// The client is misconfigured (bad base address, builder failure).
    #[error("config error: {0}")]
    Config(String),
}

impl ApiError {
    /// Build a [`ApiError::Backend`] from a status code and message.
    pub fn backend(status: u16, message: impl Into<String>) -> Self {
        Self::Backend {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Whether the failure means the backend was not reachable at all.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::Backend {
                status: err.status().map(|s| s.as_u16()),
                message: format!("invalid response body: {err}"),
            };
        }
        if err.is_builder() {
            return Self::Config(err.to_string());
        }
        Self::Transport(err.to_string())
    }
}

/// Convenience type alias for docrag-api results.
pub type Result<T> = std::result::Result<T, ApiError>;
