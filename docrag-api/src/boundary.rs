//! The request surface the client core depends on.
//!
//! [`ApiClient`](crate::ApiClient) is the HTTP implementation; tests and
//! embedders substitute their own.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    ChatRequest, ChatResponse, DocumentUpload, SummaryResponse, TaskStatusSnapshot,
    UploadResponse,
};

/// Operations offered by the document-ingestion backend.
///
/// Every method returns either a decoded success value or an
/// [`ApiError`](crate::ApiError). Implementations must be `Send + Sync` so
/// one instance can be shared behind an `Arc` by trackers and the health
/// monitor.
#[async_trait]
pub trait ApiBoundary: Send + Sync {
    /// Probe the health endpoint. Any 2xx response is success.
    async fn health(&self) -> Result<()>;

    /// Query the state of an ingestion task.
    async fn task_status(&self, task_id: &str) -> Result<TaskStatusSnapshot>;

    /// Upload a PDF for ingestion.
    async fn upload_document(&self, upload: DocumentUpload) -> Result<UploadResponse>;

    /// Ask a question against indexed documents.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse>;

    /// Fetch a generated summary of one document.
    async fn summary(&self, doc_id: &str) -> Result<SummaryResponse>;
}
