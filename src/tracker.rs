//! Per-task status polling.
//!
//! A [`TaskStatusTracker`] follows one backend task at a time from submission
//! to a terminal state:
//!
//! ```text
//! Idle ──set_task──▶ Checking ──in progress──▶ Waiting ──poll interval──▶ Checking
//!                       │
//!                       ├── SUCCESS ──▶ Succeeded
//!                       ├── FAILURE ──▶ Failed
//!                       ├── other   ──▶ Settled
//!                       └── error   ──▶ Halted
//! ```
//!
//! Each [`set_task`](TaskStatusTracker::set_task) starts a new *generation*:
//! one spawned driver owns the polling loop and its cancellation token.
//! Responses are only applied while their generation is still current, so a
//! reply for a previous task never reaches the snapshot or the recent-task
//! cache. Queries for one tracker never overlap.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use docrag_api::{ApiBoundary, TaskState, TaskStatusSnapshot};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::recent::RecentTaskCache;

/// Default delay between status queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(4_000);

/// Errors returned by [`TaskStatusTracker`] operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackerError {
    /// `set_task` was called with an empty id.
    #[error("task id must not be empty")]
    EmptyTaskId,
}

/// Where the tracker is in a task's lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrackerPhase {
    /// No task set.
    #[default]
    Idle,
    /// A status query is in flight.
    Checking,
    /// Task still in progress; the next query is scheduled.
    Waiting,
    /// Backend reported `SUCCESS`.
    Succeeded,
    /// Backend reported `FAILURE`.
    Failed,
    /// A status query failed; polling stopped.
    Halted,
    /// Backend reported a state outside the known vocabulary; polling stopped.
    Settled,
}

impl TrackerPhase {
    fn after(state: &TaskState) -> Self {
        match state {
            TaskState::Success => Self::Succeeded,
            TaskState::Failure => Self::Failed,
            s if s.is_in_progress() => Self::Waiting,
            _ => Self::Settled,
        }
    }
}

/// Observable tracker state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerSnapshot {
    /// Task being tracked.
    pub task_id: Option<String>,
    pub phase: TrackerPhase,
    /// A status query is in flight.
    pub is_loading: bool,
    /// Polling is active: the last response showed the task in progress.
    pub is_live: bool,
    /// Last successful status response for the current task.
    pub status: Option<TaskStatusSnapshot>,
    /// Human-readable failure, from a failed request or a `FAILURE` status.
    pub error: Option<String>,
    /// Status queries issued for the current task.
    pub polls: u32,
}

/// Polling lifecycle owned by the current generation.
struct Control {
    generation: u64,
    cancel: CancellationToken,
    /// `None` once the driver for this generation has stopped.
    refresh_tx: Option<mpsc::UnboundedSender<()>>,
}

struct Inner {
    api: Arc<dyn ApiBoundary>,
    cache: Arc<RecentTaskCache>,
    poll_interval: Duration,
    control: Mutex<Control>,
    state: watch::Sender<TrackerSnapshot>,
}

/// Follows one task at a time. Dropping the tracker stops its polling.
pub struct TaskStatusTracker {
    inner: Arc<Inner>,
}

impl TaskStatusTracker {
    /// Tracker polling `api` and writing statuses back into `cache`.
    pub fn new(api: Arc<dyn ApiBoundary>, cache: Arc<RecentTaskCache>) -> Self {
        let (state, _) = watch::channel(TrackerSnapshot::default());
        Self {
            inner: Arc::new(Inner {
                api,
                cache,
                poll_interval: DEFAULT_POLL_INTERVAL,
                control: Mutex::new(Control {
                    generation: 0,
                    cancel: CancellationToken::new(),
                    refresh_tx: None,
                }),
                state,
            }),
        }
    }

    /// Override the delay between status queries.
    ///
    /// Takes effect for tasks set after this call.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.poll_interval = interval;
        }
        self
    }

    /// Current state.
    pub fn snapshot(&self) -> TrackerSnapshot {
        self.inner.state.borrow().clone()
    }

    /// Receive the state after every change.
    pub fn subscribe(&self) -> watch::Receiver<TrackerSnapshot> {
        self.inner.state.subscribe()
    }

    /// Start tracking `task_id`, abandoning any previous task.
    ///
    /// Pending and in-flight work for the previous task is cancelled, error
    /// and status are cleared, and a status query is issued immediately.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::EmptyTaskId`] for an empty id; the current
    /// task keeps being tracked.
    pub fn set_task(&self, task_id: &str) -> Result<(), TrackerError> {
        let task_id = task_id.trim();
        if task_id.is_empty() {
            return Err(TrackerError::EmptyTaskId);
        }

        let mut control = self.inner.lock_control();
        self.inner.state.send_replace(TrackerSnapshot {
            task_id: Some(task_id.to_owned()),
            phase: TrackerPhase::Checking,
            is_loading: true,
            ..TrackerSnapshot::default()
        });
        Inner::start_driver(&self.inner, &mut control, task_id.to_owned());
        info!(task_id, "tracking task");
        Ok(())
    }

    /// Query the current task right away.
    ///
    /// Does nothing while a query is in flight or when no task is set. The
    /// regular cadence is not moved. If polling had stopped, it resumes for
    /// the same task.
    pub fn refresh_now(&self) {
        let mut control = self.inner.lock_control();
        let task_id = {
            let snapshot = self.inner.state.borrow();
            if snapshot.is_loading {
                debug!("refresh ignored, query in flight");
                return;
            }
            match &snapshot.task_id {
                Some(id) => id.clone(),
                None => return,
            }
        };

        if let Some(tx) = &control.refresh_tx {
            if tx.send(()).is_ok() {
                return;
            }
        }

        debug!(%task_id, "resuming polling");
        self.inner.state.send_modify(|s| {
            s.phase = TrackerPhase::Checking;
            s.is_loading = true;
        });
        Inner::start_driver(&self.inner, &mut control, task_id);
    }

    /// Stop all polling and return to [`TrackerPhase::Idle`]. Idempotent.
    pub fn teardown(&self) {
        let mut control = self.inner.lock_control();
        control.cancel.cancel();
        control.generation += 1;
        control.refresh_tx = None;
        self.inner.state.send_if_modified(|s| {
            if *s == TrackerSnapshot::default() {
                return false;
            }
            *s = TrackerSnapshot::default();
            true
        });
    }
}

impl Drop for TaskStatusTracker {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl Inner {
    fn lock_control(&self) -> std::sync::MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the current generation with a fresh driver for `task_id`.
    fn start_driver(this: &Arc<Self>, control: &mut Control, task_id: String) {
        control.cancel.cancel();
        control.generation += 1;
        control.cancel = CancellationToken::new();
        let (tx, rx) = mpsc::unbounded_channel();
        control.refresh_tx = Some(tx);

        let generation = control.generation;
        let cancel = control.cancel.clone();
        let inner = Arc::clone(this);
        tokio::spawn(async move {
            inner.drive(generation, task_id, cancel, rx).await;
        });
    }

    /// Polling loop for one generation.
    ///
    /// The first query runs immediately. Scheduled queries are spaced by the
    /// poll interval; refresh queries run in between without shifting it.
    async fn drive(
        self: Arc<Self>,
        generation: u64,
        task_id: String,
        cancel: CancellationToken,
        mut refresh_rx: mpsc::UnboundedReceiver<()>,
    ) {
        let next_poll = tokio::time::sleep(Duration::ZERO);
        tokio::pin!(next_poll);

        loop {
            let scheduled = tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                () = &mut next_poll => true,
                msg = refresh_rx.recv() => {
                    if msg.is_none() {
                        return;
                    }
                    false
                }
            };
            while refresh_rx.try_recv().is_ok() {}

            let Some(keep_polling) = self.query(generation, &task_id, &cancel).await else {
                return;
            };
            if !keep_polling {
                return;
            }
            if scheduled {
                next_poll.as_mut().reset(Instant::now() + self.poll_interval);
            }
        }
    }

    /// One status query.
    ///
    /// Returns `None` when the generation was cancelled or superseded,
    /// otherwise whether polling should continue.
    async fn query(
        &self,
        generation: u64,
        task_id: &str,
        cancel: &CancellationToken,
    ) -> Option<bool> {
        let poll = {
            let control = self.lock_control();
            if control.generation != generation {
                return None;
            }
            let mut poll = 0;
            self.state.send_modify(|s| {
                s.phase = TrackerPhase::Checking;
                s.is_loading = true;
                s.polls += 1;
                poll = s.polls;
            });
            poll
        };
        debug!(task_id, poll, "checking task status");

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return None,
            result = self.api.task_status(task_id) => result,
        };

        let mut control = self.lock_control();
        if control.generation != generation {
            debug!(task_id, "discarding stale status response");
            return None;
        }

        match result {
            Ok(status) => {
                let state = status.status.clone();
                let keep_polling = state.is_in_progress();

                if let Err(e) = self.cache.update_status(task_id, &state) {
                    warn!(task_id, "cannot record task status: {e}");
                }

                let failure = (state == TaskState::Failure).then(|| {
                    status
                        .error
                        .clone()
                        .unwrap_or_else(|| "task failed".to_owned())
                });
                self.state.send_modify(|s| {
                    s.phase = TrackerPhase::after(&state);
                    s.is_loading = false;
                    s.is_live = keep_polling;
                    s.error = failure;
                    s.status = Some(status);
                });

                if keep_polling {
                    debug!(task_id, status = %state, "task in progress");
                } else {
                    control.refresh_tx = None;
                    info!(task_id, status = %state, polls = poll, "task settled");
                }
                Some(keep_polling)
            }
            Err(e) => {
                control.refresh_tx = None;
                let message = e.to_string();
                warn!(task_id, error = %message, "status check failed, polling stopped");
                self.state.send_modify(|s| {
                    s.phase = TrackerPhase::Halted;
                    s.is_loading = false;
                    s.is_live = false;
                    s.error = Some(message);
                });
                Some(false)
            }
        }
    }
}
