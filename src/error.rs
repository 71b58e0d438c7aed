//! Error types for the docrag client core.

use docrag_api::ApiError;

/// Top-level error type for the task-tracking client.
#[derive(Debug, thiserror::Error)]
pub enum DocragError {
    /// Backend request failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Persisted store could not be read or written.
    #[error("store error: {0}")]
    Store(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Task tracker rejected an operation.
    #[error(transparent)]
    Tracker(#[from] crate::tracker::TrackerError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, DocragError>;
