//! Contract tests for `ApiClient` against a mock backend.
//!
//! Each test mounts the exact route the backend serves and checks both the
//! request shape and the decoding of the reply.

use docrag_api::{
    ApiBoundary, ApiClient, ApiConfig, ApiError, ChatRequest, DocumentUpload, OcrMode,
    TaskState, UploadOptions,
};
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new(ApiConfig::new(server.uri()).with_timeout_seconds(5))
        .unwrap_or_else(|e| panic!("client: {e}"))
}

// ── Health ────────────────────────────────────────────────────────

#[tokio::test]
async fn health_ok() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(client_for(&server).health().await, Ok(()));
}

#[tokio::test]
async fn health_non_2xx_is_backend_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client_for(&server).health().await.unwrap_err();
    assert!(
        matches!(err, ApiError::Backend { status: Some(503), .. }),
        "Expected Backend 503, got: {err:?}"
    );
}

#[tokio::test]
async fn health_connection_refused_is_transport_error() {
    let client = ApiClient::new(ApiConfig::new("http://localhost:59999").with_timeout_seconds(1))
        .unwrap_or_else(|e| panic!("client: {e}"));
    let err = client.health().await.unwrap_err();
    assert!(err.is_transport(), "Expected Transport, got: {err:?}");
}

// ── Task status ───────────────────────────────────────────────────

#[tokio::test]
async fn task_status_processing_with_info() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/status/task-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task_id": "task-123",
            "status": "PROCESSING",
            "info": {"step": "EMBEDDING", "doc_id": "doc-9", "ocr_mode": "auto"}
        })))
        .mount(&server)
        .await;

    let snap = client_for(&server)
        .task_status("task-123")
        .await
        .unwrap_or_else(|e| panic!("status: {e}"));
    assert_eq!(snap.task_id, "task-123");
    assert_eq!(snap.status, TaskState::Processing);
    let info = snap.info.unwrap_or_else(|| panic!("missing info"));
    assert_eq!(info.step.as_deref(), Some("EMBEDDING"));
    assert_eq!(info.ocr.ocr_mode, Some(OcrMode::Auto));
}

#[tokio::test]
async fn task_status_success_with_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/status/task-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task_id": "task-123",
            "status": "SUCCESS",
            "result": {"status": "completed", "doc_id": "doc-9", "chunks_count": 12, "claims_count": 3}
        })))
        .mount(&server)
        .await;

    let snap = client_for(&server)
        .task_status("task-123")
        .await
        .unwrap_or_else(|e| panic!("status: {e}"));
    assert_eq!(snap.status, TaskState::Success);
    let result = snap.result.unwrap_or_else(|| panic!("missing result"));
    assert_eq!(result.chunks_count, Some(12));
    assert_eq!(result.claims_count, Some(3));
}

#[tokio::test]
async fn task_status_404_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/status/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Not Found"})))
        .mount(&server)
        .await;

    let err = client_for(&server).task_status("missing").await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)), "got: {err:?}");
}

#[tokio::test]
async fn task_status_garbage_body_is_backend_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/status/t"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client_for(&server).task_status("t").await.unwrap_err();
    assert!(
        matches!(err, ApiError::Backend { status: Some(200), .. }),
        "got: {err:?}"
    );
}

// ── Upload ────────────────────────────────────────────────────────

#[tokio::test]
async fn upload_sends_multipart_and_query() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/upload"))
        .and(query_param("force", "true"))
        .and(query_param("ocr_mode", "always"))
        .and(body_string_contains("filename=\"paper.pdf\""))
        .and(body_string_contains("application/pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "File uploaded and processing started.",
            "doc_id": "doc-1",
            "task_id": "task-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let upload = DocumentUpload::new("paper.pdf", b"%PDF-1.4 test".to_vec()).with_options(
        UploadOptions {
            force: true,
            ocr_mode: OcrMode::Always,
        },
    );
    let resp = client_for(&server)
        .upload_document(upload)
        .await
        .unwrap_or_else(|e| panic!("upload: {e}"));
    assert_eq!(resp.task_id.as_deref(), Some("task-1"));
    assert_eq!(resp.doc_id.as_deref(), Some("doc-1"));
}

#[tokio::test]
async fn upload_rejection_surfaces_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/upload"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"detail": "Only PDF files are accepted."})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .upload_document(DocumentUpload::new("notes.pdf", vec![1, 2, 3]))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Only PDF files are accepted.");
}

// ── Chat & summary ────────────────────────────────────────────────

#[tokio::test]
async fn chat_posts_json_and_decodes_citations() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/chat"))
        .and(body_json(json!({"query": "what is claimed?", "doc_id": "doc-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "answer": "It claims X [Page 2, Section Results].",
            "citations": [{
                "doc_id": "doc-1", "page": 2, "section": "Results",
                "filename": "paper.pdf", "is_table": false, "is_claim": true,
                "text_snippet": "X holds..."
            }]
        })))
        .mount(&server)
        .await;

    let request = ChatRequest {
        doc_id: Some("doc-1".into()),
        ..ChatRequest::new("what is claimed?")
    };
    let resp = client_for(&server)
        .chat(&request)
        .await
        .unwrap_or_else(|e| panic!("chat: {e}"));
    assert_eq!(resp.citations.len(), 1);
    assert_eq!(resp.citations[0].page, Some(2));
    assert_eq!(resp.citations[0].is_claim, Some(true));
}

#[tokio::test]
async fn summary_decodes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/summary/doc-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"summary": "A study of X."})))
        .mount(&server)
        .await;

    let resp = client_for(&server)
        .summary("doc-1")
        .await
        .unwrap_or_else(|e| panic!("summary: {e}"));
    assert_eq!(resp.summary, "A study of X.");
}
