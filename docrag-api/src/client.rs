//! HTTP implementation of [`ApiBoundary`].

use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::boundary::ApiBoundary;
use crate::config::{normalize_base_url, validate_base_url, ApiConfig};
use crate::error::{ApiError, Result};
use crate::http::{build_client, error_from_response};
use crate::types::{
    ChatRequest, ChatResponse, DocumentUpload, SummaryResponse, TaskStatusSnapshot,
    UploadResponse,
};

/// Path prefix shared by every backend route.
const API_PREFIX: [&str; 2] = ["api", "v1"];

/// Talks to the backend over HTTP.
///
/// The base address can be swapped at runtime with
/// [`set_base_url`](Self::set_base_url); requests already in flight keep
/// the address they started with.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: RwLock<String>,
}

impl ApiClient {
    /// Create a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Config`] if the configuration is invalid.
    pub fn new(config: ApiConfig) -> Result<Self> {
        config.validate()?;
        let http = build_client(&config)?;
        Ok(Self {
            http,
            base_url: RwLock::new(normalize_base_url(&config.base_url)),
        })
    }

    /// Current base address.
    pub fn base_url(&self) -> String {
        self.base_url
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Point subsequent requests at a different backend.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Config`] if `url` is not an absolute http(s) URL;
    /// the previous address stays in effect.
    pub fn set_base_url(&self, url: &str) -> Result<()> {
        let clean = normalize_base_url(url);
        validate_base_url(&clean)?;
        *self.base_url.write().unwrap_or_else(|e| e.into_inner()) = clean;
        Ok(())
    }

    /// Build `{base}/api/v1/{segments...}` with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<url::Url> {
        let base = self.base_url();
        let mut url = url::Url::parse(&base)
            .map_err(|e| ApiError::Config(format!("invalid base URL '{base}': {e}")))?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| ApiError::Config(format!("base URL '{base}' cannot carry a path")))?;
            path.pop_if_empty();
            path.extend(API_PREFIX);
            path.extend(segments);
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str], resource: &str) -> Result<T> {
        let url = self.endpoint(segments)?;
        debug!(%url, "GET");
        let resp = self.http.get(url).send().await?;
        decode(resp, resource).await
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response, resource: &str) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(error_from_response(status, &body, resource));
    }
    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| ApiError::Backend {
        status: Some(status.as_u16()),
        message: format!("invalid {resource} response: {e}"),
    })
}

#[async_trait]
impl ApiBoundary for ApiClient {
    async fn health(&self) -> Result<()> {
        let url = self.endpoint(&["health"])?;
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(error_from_response(status, &body, "health"))
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskStatusSnapshot> {
        self.get_json(&["status", task_id], &format!("task {task_id}"))
            .await
    }

    async fn upload_document(&self, upload: DocumentUpload) -> Result<UploadResponse> {
        let mut url = self.endpoint(&["upload"])?;
        {
            let mut query = url.query_pairs_mut();
            if upload.options.force {
                query.append_pair("force", "true");
            }
            query.append_pair("ocr_mode", upload.options.ocr_mode.as_str());
        }

        let part = Part::bytes(upload.bytes)
            .file_name(upload.filename.clone())
            .mime_str("application/pdf")?;
        let form = Form::new().part("file", part);

        debug!(%url, filename = %upload.filename, "POST upload");
        let resp = self.http.post(url).multipart(form).send().await?;
        decode(resp, "upload").await
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let url = self.endpoint(&["chat"])?;
        debug!(%url, "POST chat");
        let resp = self.http.post(url).json(request).send().await?;
        decode(resp, "chat").await
    }

    async fn summary(&self, doc_id: &str) -> Result<SummaryResponse> {
        self.get_json(&["summary", doc_id], &format!("summary {doc_id}"))
            .await
    }
}
