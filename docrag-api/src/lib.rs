//! # docrag-api
//!
//! HTTP boundary for the docrag document-ingestion backend.
//!
//! The crate exposes the [`ApiBoundary`] trait (the request surface the
//! client core is written against) and [`ApiClient`], its `reqwest`
//! implementation.
//!
//! ## Routes
//!
//! | Operation | Request |
//! |-----------|---------|
//! | health | `GET /api/v1/health` |
//! | task status | `GET /api/v1/status/{task_id}` |
//! | upload | `POST /api/v1/upload?force=true&ocr_mode=auto` (multipart `file`) |
//! | chat | `POST /api/v1/chat` |
//! | summary | `GET /api/v1/summary/{doc_id}` |
//!
//! ## Errors
//!
//! Failures are classified as transport (backend unreachable), backend
//! (non-2xx or undecodable body, with the `detail` message when present),
//! or not-found (HTTP 404).

pub mod boundary;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod types;

pub use boundary::ApiBoundary;
pub use client::ApiClient;
pub use config::ApiConfig;
pub use error::{ApiError, Result};
pub use types::{
    ChatRequest, ChatResponse, Citation, DocumentUpload, IngestionMode, OcrDetails, OcrMode,
    ProcessingInfo, SummaryResponse, TaskResult, TaskState, TaskStatusSnapshot, UploadOptions,
    UploadResponse,
};
