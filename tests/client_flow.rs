//! End-to-end client flows against a mock backend.
//!
//! These tests run the real HTTP client, file-backed store, tracker, and
//! health monitor together and check what survives a restart.

use std::path::Path;
use std::time::Duration;

use docrag::{ClientConfig, DocragClient, SubmitOutcome, TrackerPhase};
use docrag_api::{DocumentUpload, TaskState};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer, store_dir: &Path) -> ClientConfig {
    ClientConfig {
        api_url: server.uri(),
        poll_interval_ms: 50,
        request_timeout_secs: Some(5),
        store_dir: Some(store_dir.to_path_buf()),
        ..Default::default()
    }
}

async fn mount_health(server: &MockServer, code: u16) {
    Mock::given(method("GET"))
        .and(path("/api/v1/health"))
        .respond_with(ResponseTemplate::new(code).set_body_json(json!({"status": "ok"})))
        .mount(server)
        .await;
}

// ── Upload and track ─────────────────────────────────────────────

#[tokio::test]
async fn upload_is_tracked_to_success_and_persisted() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));

    Mock::given(method("POST"))
        .and(path("/api/v1/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "File uploaded successfully",
            "task_id": "task-abc",
            "doc_id": "doc-1"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/status/task-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task_id": "task-abc",
            "status": "PROCESSING",
            "info": {"step": "EMBEDDING", "doc_id": "doc-1"}
        })))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/status/task-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task_id": "task-abc",
            "status": "SUCCESS",
            "result": {
                "status": "completed",
                "doc_id": "doc-1",
                "chunks_count": 42,
                "claims_count": 7,
                "ocr_used": false,
                "ocr_skipped": true,
                "ocr_skip_reason": "digital_pdf_detected",
                "ingestion_mode": "digital_text"
            }
        })))
        .mount(&server)
        .await;

    let client = DocragClient::open(config_for(&server, dir.path()))
        .unwrap_or_else(|e| panic!("client: {e}"));
    let tracker = client.tracker();
    let mut updates = tracker.subscribe();

    let outcome = client
        .upload(
            DocumentUpload::new("paper.pdf", b"%PDF-1.7".to_vec()),
            Some(&tracker),
        )
        .await
        .unwrap_or_else(|e| panic!("upload: {e}"));
    assert_eq!(outcome.task_id(), Some("task-abc"));

    let done = tokio::time::timeout(
        Duration::from_secs(5),
        updates.wait_for(|s| s.phase == TrackerPhase::Succeeded),
    )
    .await
    .unwrap_or_else(|_| panic!("task never succeeded"))
    .unwrap_or_else(|e| panic!("tracker closed: {e}"))
    .clone();
    assert_eq!(done.polls, 3);
    assert!(!done.is_live);
    let result = done.status.and_then(|s| s.result);
    assert_eq!(result.and_then(|r| r.chunks_count), Some(42));

    // A fresh client on the same store sees the final status.
    drop(tracker);
    drop(client);
    let reopened = DocragClient::open(config_for(&server, dir.path()))
        .unwrap_or_else(|e| panic!("reopen: {e}"));
    let tasks = reopened.recent_tasks();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].task_id, "task-abc");
    assert_eq!(tasks[0].doc_id.as_deref(), Some("doc-1"));
    assert_eq!(tasks[0].status, TaskState::Success);

    let raw = std::fs::read_to_string(dir.path().join("rag_recent_tasks"))
        .unwrap_or_else(|e| panic!("read store: {e}"));
    assert!(raw.contains("\"status\":\"success\""), "{raw}");
}

#[tokio::test]
async fn existing_document_starts_no_tracking() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
    Mock::given(method("POST"))
        .and(path("/api/v1/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Document already exists",
            "doc_id": "doc-1",
            "status": "existing"
        })))
        .mount(&server)
        .await;

    let client = DocragClient::open(config_for(&server, dir.path()))
        .unwrap_or_else(|e| panic!("client: {e}"));
    let tracker = client.tracker();
    let outcome = client
        .upload(DocumentUpload::new("paper.pdf", Vec::new()), Some(&tracker))
        .await
        .unwrap_or_else(|e| panic!("upload: {e}"));

    assert!(matches!(outcome, SubmitOutcome::Existing { .. }));
    assert!(client.recent_tasks().is_empty());
    assert_eq!(tracker.snapshot().phase, TrackerPhase::Idle);
}

#[tokio::test]
async fn missing_task_halts_with_message() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
    Mock::given(method("GET"))
        .and(path("/api/v1/status/ghost"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Task not found"})))
        .mount(&server)
        .await;

    let client = DocragClient::open(config_for(&server, dir.path()))
        .unwrap_or_else(|e| panic!("client: {e}"));
    let tracker = client.tracker();
    let mut updates = tracker.subscribe();
    tracker
        .set_task("ghost")
        .unwrap_or_else(|e| panic!("set_task: {e}"));

    let halted = tokio::time::timeout(
        Duration::from_secs(5),
        updates.wait_for(|s| s.phase == TrackerPhase::Halted),
    )
    .await
    .unwrap_or_else(|_| panic!("tracker never halted"))
    .unwrap_or_else(|e| panic!("tracker closed: {e}"))
    .clone();
    assert!(!halted.is_live);
    assert!(halted.error.is_some());
    assert_eq!(halted.polls, 1);
}

// ── Endpoint and health ──────────────────────────────────────────

#[tokio::test]
async fn changing_address_rechecks_health_and_persists() {
    let up = MockServer::start().await;
    let down = MockServer::start().await;
    mount_health(&up, 200).await;
    mount_health(&down, 503).await;
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));

    let mut client = DocragClient::open(config_for(&up, dir.path()))
        .unwrap_or_else(|e| panic!("client: {e}"));
    let mut health = client.start_health_monitor().subscribe();
    tokio::time::timeout(Duration::from_secs(5), health.wait_for(|s| s.online))
        .await
        .unwrap_or_else(|_| panic!("never online"))
        .unwrap_or_else(|e| panic!("monitor closed: {e}"));

    client
        .set_api_url(&format!("{}/", down.uri()))
        .unwrap_or_else(|e| panic!("set_api_url: {e}"));
    let offline = tokio::time::timeout(Duration::from_secs(5), health.wait_for(|s| !s.online))
        .await
        .unwrap_or_else(|_| panic!("never offline"))
        .unwrap_or_else(|e| panic!("monitor closed: {e}"))
        .clone();
    assert!(offline.message.is_some());
    client.shutdown();
    drop(client);

    // The new address wins over the configured one after a restart.
    let reopened = DocragClient::open(config_for(&up, dir.path()))
        .unwrap_or_else(|e| panic!("reopen: {e}"));
    assert_eq!(reopened.api_url(), down.uri());
    assert!(!reopened.check_health().await.online);
}

#[tokio::test]
async fn clear_recent_survives_restart() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
    Mock::given(method("POST"))
        .and(path("/api/v1/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"task_id": "t-1"})))
        .mount(&server)
        .await;

    let client = DocragClient::open(config_for(&server, dir.path()))
        .unwrap_or_else(|e| panic!("client: {e}"));
    client
        .upload(DocumentUpload::new("a.pdf", Vec::new()), None)
        .await
        .unwrap_or_else(|e| panic!("upload: {e}"));
    assert_eq!(client.recent_tasks().len(), 1);

    client
        .clear_recent_tasks()
        .unwrap_or_else(|e| panic!("clear: {e}"));
    drop(client);

    let reopened = DocragClient::open(config_for(&server, dir.path()))
        .unwrap_or_else(|e| panic!("reopen: {e}"));
    assert!(reopened.recent_tasks().is_empty());
}
