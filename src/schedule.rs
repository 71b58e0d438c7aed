//! Cancellable periodic background work.
//!
//! A [`PeriodicTask`] runs an async tick at start and then on a fixed
//! cadence until it is cancelled or dropped. Every tick runs as its own
//! task, so a slow or hung tick never holds back the next one.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Handle to a spawned periodic loop. Dropping it stops the loop.
pub struct PeriodicTask {
    name: &'static str,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    /// Spawn `tick` immediately and then every `period`.
    ///
    /// Ticks may overlap. The loop also stops when `parent` is cancelled,
    /// and cancellation interrupts every tick that is still running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F, Fut>(
        name: &'static str,
        period: Duration,
        parent: &CancellationToken,
        mut tick: F,
    ) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = parent.child_token();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let fut = tick();
                let tick_token = token.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        () = tick_token.cancelled() => {}
                        () = fut => {}
                    }
                });
            }
            debug!(task = name, "periodic task stopped");
        });
        debug!(task = name, period_ms = period.as_millis() as u64, "periodic task started");
        Self {
            name,
            cancel,
            handle: Some(handle),
        }
    }

    /// Task name used in logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Request the loop to stop. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// `true` once the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Cancel and wait for the loop to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
