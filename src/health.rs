//! Backend reachability monitoring.
//!
//! [`HealthMonitor`] runs three background loops:
//!
//! - **heartbeat**: a health check at start and every heartbeat interval;
//!   success marks the backend online, any failure marks it offline.
//! - **keep-alive**: a health request at start and every keep-alive
//!   interval, sent only so idle hosted backends are not suspended. The
//!   outcome is logged and never touches [`HealthState`].
//! - **endpoint watch**: one extra heartbeat whenever the backend address
//!   changes. The regular cadence is left alone.
//!
//! Checks are independent: each runs as its own task, so a hung request
//! never delays the next tick. A failed check is not retried; the next tick
//! simply tries again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Local;
use docrag_api::ApiBoundary;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::schedule::PeriodicTask;

/// Last known backend reachability.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthState {
    /// `true` after a successful heartbeat, `false` after a failed one.
    pub online: bool,
    /// Description of the last failure while offline.
    pub message: Option<String>,
}

impl HealthState {
    fn online() -> Self {
        Self {
            online: true,
            message: None,
        }
    }

    fn offline(message: String) -> Self {
        Self {
            online: false,
            message: Some(message),
        }
    }
}

/// Cadence of the two schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthSchedule {
    pub heartbeat: Duration,
    pub keep_alive: Duration,
}

impl Default for HealthSchedule {
    fn default() -> Self {
        Self {
            heartbeat: Duration::from_secs(30),
            keep_alive: Duration::from_secs(14 * 60),
        }
    }
}

impl From<&ClientConfig> for HealthSchedule {
    fn from(config: &ClientConfig) -> Self {
        Self {
            heartbeat: config.heartbeat_interval(),
            keep_alive: config.keep_alive_interval(),
        }
    }
}

// ── Heartbeat check ──────────────────────────────────────────────────────────

/// Runs a health check and folds the outcome into the shared state.
///
/// Checks may overlap (a scheduled tick and an endpoint-change check). Each
/// one takes a sequence number when it starts, and a result is dropped if a
/// later-started check has already been applied.
struct Checker {
    api: Arc<dyn ApiBoundary>,
    state: watch::Sender<HealthState>,
    issued: AtomicU64,
    applied: Mutex<u64>,
}

impl Checker {
    async fn check(&self, reason: &'static str) -> HealthState {
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let next = match self.api.health().await {
            Ok(()) => HealthState::online(),
            Err(e) => HealthState::offline(e.to_string()),
        };

        let mut applied = self.applied.lock().unwrap_or_else(|e| e.into_inner());
        if seq < *applied {
            debug!(seq, reason, "discarding superseded health result");
            return self.state.borrow().clone();
        }
        *applied = seq;

        let previous = self.state.send_replace(next.clone());
        if previous.online != next.online {
            if next.online {
                info!(reason, "backend online");
            } else {
                warn!(
                    reason,
                    error = next.message.as_deref().unwrap_or_default(),
                    "backend offline"
                );
            }
        } else {
            debug!(reason, online = next.online, "health check");
        }
        next
    }
}

// ── Monitor ──────────────────────────────────────────────────────────────────

/// Owns the heartbeat, keep-alive, and endpoint-watch loops.
///
/// Dropping the monitor stops all of them.
pub struct HealthMonitor {
    checker: Arc<Checker>,
    cancel: CancellationToken,
    loops: Mutex<Vec<PeriodicTask>>,
    endpoint_watch: Mutex<Option<JoinHandle<()>>>,
}

impl HealthMonitor {
    /// Start monitoring `api`.
    ///
    /// `endpoint` is the address feed from
    /// [`Endpoint::subscribe`](crate::endpoint::Endpoint::subscribe); every
    /// change after this call triggers one extra heartbeat.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        api: Arc<dyn ApiBoundary>,
        mut endpoint: watch::Receiver<String>,
        schedule: HealthSchedule,
    ) -> Self {
        let (state, _) = watch::channel(HealthState::default());
        let checker = Arc::new(Checker {
            api,
            state,
            issued: AtomicU64::new(0),
            applied: Mutex::new(0),
        });
        let cancel = CancellationToken::new();

        let heartbeat = {
            let checker = Arc::clone(&checker);
            PeriodicTask::spawn("heartbeat", schedule.heartbeat, &cancel, move || {
                let checker = Arc::clone(&checker);
                async move {
                    checker.check("heartbeat").await;
                }
            })
        };

        let keep_alive = {
            let api = Arc::clone(&checker.api);
            PeriodicTask::spawn("keep-alive", schedule.keep_alive, &cancel, move || {
                let api = Arc::clone(&api);
                async move { keep_alive_ping(api.as_ref()).await }
            })
        };

        endpoint.mark_unchanged();
        let endpoint_watch = {
            let checker = Arc::clone(&checker);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        changed = endpoint.changed() => {
                            if changed.is_err() {
                                break;
                            }
                            let url = endpoint.borrow_and_update().clone();
                            debug!(%url, "endpoint changed, checking health");
                            let checker = Arc::clone(&checker);
                            let cancel = cancel.clone();
                            tokio::spawn(async move {
                                tokio::select! {
                                    () = cancel.cancelled() => {}
                                    _ = checker.check("endpoint-change") => {}
                                }
                            });
                        }
                    }
                }
            })
        };

        info!(
            heartbeat_secs = schedule.heartbeat.as_secs(),
            keep_alive_secs = schedule.keep_alive.as_secs(),
            "health monitor started"
        );

        Self {
            checker,
            cancel,
            loops: Mutex::new(vec![heartbeat, keep_alive]),
            endpoint_watch: Mutex::new(Some(endpoint_watch)),
        }
    }

    /// Current belief about the backend.
    pub fn state(&self) -> HealthState {
        self.checker.state.borrow().clone()
    }

    /// `true` after the most recent applied heartbeat succeeded.
    pub fn is_online(&self) -> bool {
        self.checker.state.borrow().online
    }

    /// Receive the state after every check.
    pub fn subscribe(&self) -> watch::Receiver<HealthState> {
        self.checker.state.subscribe()
    }

    /// Run one heartbeat now and return the resulting state.
    pub async fn check_now(&self) -> HealthState {
        self.checker.check("manual").await
    }

    /// Stop every loop. Idempotent.
    pub fn shutdown(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        self.loops
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        if let Some(handle) = self
            .endpoint_watch
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            handle.abort();
        }
        info!("health monitor stopped");
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn keep_alive_ping(api: &dyn ApiBoundary) {
    let at = Local::now().format("%H:%M:%S");
    match api.health().await {
        Ok(()) => info!(%at, "keep-alive ping ok"),
        Err(e) => warn!(%at, error = %e, "keep-alive ping failed"),
    }
}
