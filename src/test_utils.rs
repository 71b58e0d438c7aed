//! Shared test utilities used across multiple test modules.
//!
//! [`FakeBackend`] is a scripted in-process [`ApiBoundary`] so tracker,
//! health, and submission tests run on the paused tokio clock without a
//! server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use docrag_api::{
    ApiBoundary, ApiError, ChatRequest, ChatResponse, DocumentUpload, SummaryResponse,
    TaskState, TaskStatusSnapshot, UploadResponse,
};

type ApiResult<T> = docrag_api::Result<T>;

/// Scripted backend. Each task id has a queue of responses; the last one
/// repeats once the queue is down to a single entry.
#[derive(Default)]
pub struct FakeBackend {
    unhealthy: AtomicBool,
    health_calls: AtomicUsize,
    health_delay: Mutex<Duration>,
    statuses: Mutex<HashMap<String, VecDeque<ApiResult<TaskStatusSnapshot>>>>,
    status_delays: Mutex<HashMap<String, Duration>>,
    status_calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    upload_reply: Mutex<Option<ApiResult<UploadResponse>>>,
    uploads: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    // ── health ──

    pub fn set_healthy(&self, healthy: bool) {
        self.unhealthy.store(!healthy, Ordering::SeqCst);
    }

    pub fn set_health_delay(&self, delay: Duration) {
        *self.health_delay.lock().unwrap() = delay;
    }

    pub fn health_calls(&self) -> usize {
        self.health_calls.load(Ordering::SeqCst)
    }

    // ── status ──

    /// Queue a response for `task_id`.
    pub fn push_status(&self, task_id: &str, reply: ApiResult<TaskStatusSnapshot>) {
        self.statuses
            .lock()
            .unwrap()
            .entry(task_id.to_owned())
            .or_default()
            .push_back(reply);
    }

    /// Queue a bare status for `task_id`.
    pub fn push_state(&self, task_id: &str, state: TaskState) {
        self.push_status(task_id, Ok(TaskStatusSnapshot::new(task_id, state)));
    }

    /// Delay every status reply for `task_id`.
    pub fn set_status_delay(&self, task_id: &str, delay: Duration) {
        self.status_delays
            .lock()
            .unwrap()
            .insert(task_id.to_owned(), delay);
    }

    /// Status queries issued so far, in order.
    pub fn status_calls(&self) -> Vec<String> {
        self.status_calls.lock().unwrap().clone()
    }

    pub fn status_calls_for(&self, task_id: &str) -> usize {
        self.status_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|id| *id == task_id)
            .count()
    }

    /// Highest number of status queries ever running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    // ── upload ──

    pub fn set_upload_reply(&self, reply: ApiResult<UploadResponse>) {
        *self.upload_reply.lock().unwrap() = Some(reply);
    }

    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }
}

/// Decrements the in-flight counter even when the query future is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ApiBoundary for FakeBackend {
    async fn health(&self) -> ApiResult<()> {
        self.health_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.health_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.unhealthy.load(Ordering::SeqCst) {
            Err(ApiError::Transport("connection refused".into()))
        } else {
            Ok(())
        }
    }

    async fn task_status(&self, task_id: &str) -> ApiResult<TaskStatusSnapshot> {
        self.status_calls.lock().unwrap().push(task_id.to_owned());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let delay = self.status_delays.lock().unwrap().get(task_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut statuses = self.statuses.lock().unwrap();
        let Some(queue) = statuses.get_mut(task_id) else {
            return Err(ApiError::NotFound(format!("task {task_id}")));
        };
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(ApiError::NotFound(format!("task {task_id}"))))
        }
    }

    async fn upload_document(&self, upload: DocumentUpload) -> ApiResult<UploadResponse> {
        self.uploads.lock().unwrap().push(upload.filename.clone());
        self.upload_reply
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(ApiError::backend(500, "no upload reply scripted")))
    }

    async fn chat(&self, request: &ChatRequest) -> ApiResult<ChatResponse> {
        Ok(ChatResponse {
            answer: format!("echo: {}", request.query),
            citations: Vec::new(),
        })
    }

    async fn summary(&self, doc_id: &str) -> ApiResult<SummaryResponse> {
        Ok(SummaryResponse {
            summary: format!("summary of {doc_id}"),
        })
    }
}
