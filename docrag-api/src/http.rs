//! Shared HTTP plumbing: client construction and error-body decoding.

use std::time::Duration;

use reqwest::StatusCode;

use crate::config::ApiConfig;
use crate::error::ApiError;

/// Build the [`reqwest::Client`] used for every backend request.
///
/// # Errors
///
/// Returns [`ApiError::Config`] if the client cannot be constructed.
pub fn build_client(config: &ApiConfig) -> Result<reqwest::Client, ApiError> {
    let ua = config
        .user_agent
        .clone()
        .unwrap_or_else(|| format!("docrag-api/{}", env!("CARGO_PKG_VERSION")));

    let mut builder = reqwest::Client::builder().user_agent(ua);
    if let Some(secs) = config.timeout_seconds {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder
        .build()
        .map_err(|e| ApiError::Config(format!("failed to build HTTP client: {e}")))
}

/// Turn a non-success response into an [`ApiError`].
///
/// 404 maps to [`ApiError::NotFound`]. Otherwise the message is the JSON
/// `detail` field when the body carries one, then the raw body (truncated),
/// then the status line.
pub fn error_from_response(status: StatusCode, body: &str, resource: &str) -> ApiError {
    let message = detail_message(status, body);
    if status == StatusCode::NOT_FOUND {
        return ApiError::NotFound(format!("{resource}: {message}"));
    }
    ApiError::backend(status.as_u16(), message)
}

fn detail_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        match value.get("detail") {
            Some(serde_json::Value::String(detail)) => return detail.clone(),
            // Validation errors arrive as a list of {loc, msg, type} objects.
            Some(serde_json::Value::Array(items)) => {
                let msgs: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                    .collect();
                if !msgs.is_empty() {
                    return msgs.join("; ");
                }
            }
            _ => {}
        }
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() && !trimmed.starts_with('{') && !trimmed.starts_with('<') {
        return trimmed.chars().take(500).collect();
    }

    match status.canonical_reason() {
        Some(reason) => format!("HTTP {} {reason}", status.as_u16()),
        None => format!("HTTP {}", status.as_u16()),
    }
}
