//! Bounded, persisted history of recently submitted tasks.
//!
//! The list is newest-first, holds at most `capacity` entries, and never
//! contains two records with the same task id. Every mutation is a single
//! read-modify-write under one lock: the durable copy is written first and
//! the in-memory copy only changes once that write succeeds, so readers in
//! the same process never see the two disagree.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use docrag_api::TaskState;
use serde::{Deserialize, Serialize, Serializer};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::{DocragError, Result};
use crate::store::{PersistedStore, RECENT_TASKS_KEY};

/// Default number of tasks kept.
pub const DEFAULT_CAPACITY: usize = 10;

/// Summary of one submitted task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Backend task id; unique within the history.
    pub task_id: String,
    /// Document id, once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
    /// Uploaded file name.
    #[serde(default)]
    pub filename: String,
    /// When the task was submitted.
    pub timestamp: DateTime<Utc>,
    /// Last known status, persisted in lower case.
    #[serde(serialize_with = "serialize_state_lowercase")]
    pub status: TaskState,
}

impl TaskRecord {
    /// A freshly submitted task: `pending`, timestamped now.
    pub fn submitted(
        task_id: impl Into<String>,
        doc_id: Option<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            doc_id,
            filename: filename.into(),
            timestamp: Utc::now(),
            status: TaskState::Pending,
        }
    }
}

fn serialize_state_lowercase<S: Serializer>(
    state: &TaskState,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&state.to_lowercase())
}

/// Shared recent-task history.
///
/// Construct one per process and hand it to every consumer as an
/// `Arc<RecentTaskCache>`.
pub struct RecentTaskCache {
    store: Arc<dyn PersistedStore>,
    capacity: usize,
    tasks: Mutex<Vec<TaskRecord>>,
    changes: watch::Sender<Vec<TaskRecord>>,
}

impl RecentTaskCache {
    /// Load the history from `store`, keeping at most `capacity` entries.
    ///
    /// Absent or corrupt persisted data yields an empty history.
    pub fn load(store: Arc<dyn PersistedStore>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let tasks = read_durable(store.as_ref(), capacity).unwrap_or_else(|e| {
            warn!("cannot load recent tasks, starting empty: {e}");
            Vec::new()
        });
        debug!(count = tasks.len(), "loaded recent tasks");
        let (changes, _) = watch::channel(tasks.clone());
        Self {
            store,
            capacity,
            tasks: Mutex::new(tasks),
            changes,
        }
    }

    /// Load with the default capacity.
    pub fn with_default_capacity(store: Arc<dyn PersistedStore>) -> Self {
        Self::load(store, DEFAULT_CAPACITY)
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current history, newest first.
    pub fn list(&self) -> Vec<TaskRecord> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Look up one record by task id.
    pub fn get(&self, task_id: &str) -> Option<TaskRecord> {
        self.tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|t| t.task_id == task_id)
            .cloned()
    }

    /// Receive the full history after every change.
    pub fn subscribe(&self) -> watch::Receiver<Vec<TaskRecord>> {
        self.changes.subscribe()
    }

    /// Insert or replace a record.
    ///
    /// An existing id is replaced in place. A new id goes to the front and
    /// the oldest entries beyond capacity are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`DocragError::Store`] if the history cannot be persisted; the
    /// in-memory history is then left unchanged.
    pub fn record(&self, record: TaskRecord) -> Result<()> {
        self.mutate(|tasks| {
            match tasks.iter_mut().find(|t| t.task_id == record.task_id) {
                Some(existing) => *existing = record,
                None => tasks.insert(0, record),
            }
            true
        })
        .map(|_| ())
    }

    /// Change the status of an existing record without moving it.
    ///
    /// Returns `Ok(false)` when no record has `task_id`.
    ///
    /// # Errors
    ///
    /// Returns [`DocragError::Store`] if the history cannot be persisted.
    pub fn update_status(&self, task_id: &str, status: &TaskState) -> Result<bool> {
        self.mutate(|tasks| match tasks.iter_mut().find(|t| t.task_id == task_id) {
            Some(task) => {
                task.status = status.clone();
                true
            }
            None => false,
        })
    }

    /// Remove every record, in memory and on the durable side.
    ///
    /// # Errors
    ///
    /// Returns [`DocragError::Store`] if the durable copy cannot be removed.
    pub fn clear(&self) -> Result<()> {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        self.store.clear(RECENT_TASKS_KEY)?;
        tasks.clear();
        self.changes.send_replace(Vec::new());
        debug!("cleared recent tasks");
        Ok(())
    }

    /// Apply `f` to the current history and persist the result.
    ///
    /// The lock is held from the read until both copies are updated and no
    /// `.await` happens in between. `f` returns whether it changed anything;
    /// unchanged histories are not rewritten.
    fn mutate(&self, f: impl FnOnce(&mut Vec<TaskRecord>) -> bool) -> Result<bool> {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());

        let mut next = match read_durable(self.store.as_ref(), self.capacity) {
            Ok(durable) => durable,
            Err(e) => {
                warn!("cannot re-read recent tasks, using in-memory copy: {e}");
                tasks.clone()
            }
        };

        if !f(&mut next) {
            return Ok(false);
        }
        next.truncate(self.capacity);

        let json = serde_json::to_string(&next)
            .map_err(|e| DocragError::Store(format!("cannot serialize recent tasks: {e}")))?;
        self.store.write(RECENT_TASKS_KEY, &json)?;

        *tasks = next;
        self.changes.send_replace(tasks.clone());
        Ok(true)
    }
}

/// Read and sanitize the persisted history.
///
/// Non-array or unparseable content is treated as empty. Individual entries
/// that fail to decode are skipped, duplicate ids keep their first (newest)
/// occurrence, and the result is cut to `capacity`.
fn read_durable(store: &dyn PersistedStore, capacity: usize) -> Result<Vec<TaskRecord>> {
    let Some(raw) = store.read(RECENT_TASKS_KEY)? else {
        return Ok(Vec::new());
    };

    let entries: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("ignoring corrupt recent-task history: {e}");
            return Ok(Vec::new());
        }
    };

    let mut seen = HashSet::new();
    let mut tasks = Vec::with_capacity(entries.len().min(capacity));
    for entry in entries {
        let record: TaskRecord = match serde_json::from_value(entry) {
            Ok(record) => record,
            Err(e) => {
                warn!("skipping malformed recent-task entry: {e}");
                continue;
            }
        };
        if seen.insert(record.task_id.clone()) {
            tasks.push(record);
        }
        if tasks.len() == capacity {
            break;
        }
    }
    Ok(tasks)
}
