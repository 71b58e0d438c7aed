//! Wiring of the client services.
//!
//! [`DocragClient`] owns one of each shared service (store, endpoint, HTTP
//! client, recent-task cache, health monitor) and hands out trackers bound
//! to them.

use std::sync::Arc;

use docrag_api::{
    ApiBoundary, ApiClient, ChatRequest, ChatResponse, DocumentUpload, SummaryResponse,
    TaskStatusSnapshot,
};
use tracing::info;

use crate::config::ClientConfig;
use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::health::{HealthMonitor, HealthSchedule, HealthState};
use crate::recent::{RecentTaskCache, TaskRecord};
use crate::store::{FileStore, PersistedStore};
use crate::submit::{self, SubmitOutcome};
use crate::tracker::TaskStatusTracker;

/// Entry point for embedding the client.
pub struct DocragClient {
    config: ClientConfig,
    api: Arc<ApiClient>,
    endpoint: Endpoint,
    cache: Arc<RecentTaskCache>,
    health: Option<HealthMonitor>,
}

impl DocragClient {
    /// Build a client over `store`.
    ///
    /// The backend address is the persisted one if any, else
    /// `config.api_url`. No background work starts until
    /// [`start_health_monitor`](Self::start_health_monitor).
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: ClientConfig, store: Arc<dyn PersistedStore>) -> Result<Self> {
        config.validate()?;
        let endpoint = Endpoint::load(Arc::clone(&store), &config.api_url);
        let api = Arc::new(ApiClient::new(config.api_config(&endpoint.get()))?);
        let endpoint = endpoint.with_sink(api.clone());
        let cache = Arc::new(RecentTaskCache::load(store, config.cache_capacity));
        info!(api_url = %endpoint.get(), "client ready");
        Ok(Self {
            config,
            api,
            endpoint,
            cache,
            health: None,
        })
    }

    /// Build a client persisting to the configured store directory.
    ///
    /// # Errors
    ///
    /// As [`new`](Self::new).
    pub fn open(config: ClientConfig) -> Result<Self> {
        let store = Arc::new(FileStore::new(config.resolved_store_dir()));
        Self::new(config, store)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// HTTP boundary shared by every service.
    pub fn api(&self) -> Arc<dyn ApiBoundary> {
        self.api.clone()
    }

    /// Current backend address.
    pub fn api_url(&self) -> String {
        self.endpoint.get()
    }

    /// Change and persist the backend address. A running health monitor
    /// checks the new address right away.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid address or if it cannot be persisted.
    pub fn set_api_url(&self, url: &str) -> Result<String> {
        self.endpoint.set(url)
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Shared recent-task history.
    pub fn cache(&self) -> &Arc<RecentTaskCache> {
        &self.cache
    }

    pub fn recent_tasks(&self) -> Vec<TaskRecord> {
        self.cache.list()
    }

    /// Forget every recent task.
    ///
    /// # Errors
    ///
    /// Returns a store error if the persisted history cannot be removed.
    pub fn clear_recent_tasks(&self) -> Result<()> {
        self.cache.clear()
    }

    /// Start the heartbeat and keep-alive loops. Calling it again returns
    /// the running monitor.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_health_monitor(&mut self) -> &HealthMonitor {
        let api: Arc<dyn ApiBoundary> = self.api.clone();
        let endpoint = self.endpoint.subscribe();
        let schedule = HealthSchedule::from(&self.config);
        self.health
            .get_or_insert_with(|| HealthMonitor::start(api, endpoint, schedule))
    }

    /// The monitor, once started.
    pub fn health_monitor(&self) -> Option<&HealthMonitor> {
        self.health.as_ref()
    }

    /// Run one heartbeat. Without a running monitor the check is done
    /// directly against the backend.
    pub async fn check_health(&self) -> HealthState {
        match &self.health {
            Some(monitor) => monitor.check_now().await,
            None => match self.api.health().await {
                Ok(()) => HealthState {
                    online: true,
                    message: None,
                },
                Err(e) => HealthState {
                    online: false,
                    message: Some(e.to_string()),
                },
            },
        }
    }

    /// A tracker bound to this client's backend and history.
    pub fn tracker(&self) -> TaskStatusTracker {
        TaskStatusTracker::new(self.api(), Arc::clone(&self.cache))
            .with_poll_interval(self.config.poll_interval())
    }

    /// Upload a document; see [`submit::submit`].
    ///
    /// # Errors
    ///
    /// Returns the upload error.
    pub async fn upload(
        &self,
        upload: DocumentUpload,
        tracker: Option<&TaskStatusTracker>,
    ) -> Result<SubmitOutcome> {
        submit::submit(self.api.as_ref(), &self.cache, tracker, upload).await
    }

    /// One status query, without touching the history.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn task_status(&self, task_id: &str) -> Result<TaskStatusSnapshot> {
        Ok(self.api.task_status(task_id).await?)
    }

    /// Ask a question, optionally scoped to one document.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        Ok(self.api.chat(request).await?)
    }

    /// Fetch a document summary.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn summary(&self, doc_id: &str) -> Result<SummaryResponse> {
        Ok(self.api.summary(doc_id).await?)
    }

    /// Stop background work. Also happens on drop.
    pub fn shutdown(&self) {
        if let Some(monitor) = &self.health {
            monitor.shutdown();
        }
    }
}
