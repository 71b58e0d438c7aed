//! Persisted backend base address.
//!
//! The address lives under its own store key so it survives restarts
//! independently of the task history. Changes are pushed to subscribers
//! through a `watch` channel; the health monitor listens there to re-check
//! the new backend straight away.

use std::sync::{Arc, Mutex};

use docrag_api::ApiClient;
use docrag_api::config::{normalize_base_url, validate_base_url};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::Result;
use crate::store::{API_URL_KEY, PersistedStore};

/// Something that sends requests to the configured base address.
pub trait BaseUrlSink: Send + Sync {
    /// Point subsequent requests at `url`.
    fn set_base_url(&self, url: &str) -> docrag_api::Result<()>;
}

impl BaseUrlSink for ApiClient {
    fn set_base_url(&self, url: &str) -> docrag_api::Result<()> {
        ApiClient::set_base_url(self, url)
    }
}

/// Current backend address plus its persistence and change feed.
pub struct Endpoint {
    store: Arc<dyn PersistedStore>,
    sink: Option<Arc<dyn BaseUrlSink>>,
    write_lock: Mutex<()>,
    current: watch::Sender<String>,
}

impl Endpoint {
    /// Load the persisted address, falling back to `default_url` when the
    /// stored value is absent, empty, unreadable, or not an http(s) URL.
    pub fn load(store: Arc<dyn PersistedStore>, default_url: &str) -> Self {
        let stored = match store.read(API_URL_KEY) {
            Ok(value) => value
                .map(|v| normalize_base_url(&v))
                .filter(|v| !v.is_empty())
                .filter(|v| match validate_base_url(v) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("ignoring stored API address: {e}");
                        false
                    }
                }),
            Err(e) => {
                warn!("cannot read stored API address, using default: {e}");
                None
            }
        };
        let url = stored.unwrap_or_else(|| normalize_base_url(default_url));
        let (current, _) = watch::channel(url);
        Self {
            store,
            sink: None,
            write_lock: Mutex::new(()),
            current,
        }
    }

    /// Also apply every change to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn BaseUrlSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Current base address, without a trailing `/`.
    pub fn get(&self) -> String {
        self.current.borrow().clone()
    }

    /// Receive the address after every [`set`](Self::set).
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.current.subscribe()
    }

    /// Change the backend address.
    ///
    /// Trailing slashes are stripped. The new value is applied to the sink,
    /// persisted, and then announced to subscribers. Setting the current
    /// value again still notifies, so callers can use it to force a re-check.
    ///
    /// # Errors
    ///
    /// Returns an API config error for a non-http(s) address or one the sink
    /// rejects, or a store error if it cannot be persisted. Nothing changes
    /// in any of these cases; a failed store write points the sink back at
    /// the previous address.
    pub fn set(&self, url: &str) -> Result<String> {
        let clean = normalize_base_url(url);
        validate_base_url(&clean)?;

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(sink) = &self.sink {
            sink.set_base_url(&clean)?;
        }
        if let Err(e) = self.store.write(API_URL_KEY, &clean) {
            if let Some(sink) = &self.sink {
                let previous = self.current.borrow().clone();
                if let Err(restore) = sink.set_base_url(&previous) {
                    warn!(url = %previous, "cannot restore API address: {restore}");
                }
            }
            return Err(e);
        }
        self.current.send_replace(clean.clone());
        info!(url = %clean, "API address changed");
        Ok(clean)
    }
}
