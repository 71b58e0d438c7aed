//! Durable key/value persistence.
//!
//! The client keeps two keys: the recent-task history and the configured
//! backend address. [`PersistedStore`] abstracts where they live so the
//! core runs against [`MemoryStore`] in tests and [`FileStore`] on disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::error::{DocragError, Result};

/// Key holding the JSON array of recent task records.
pub const RECENT_TASKS_KEY: &str = "rag_recent_tasks";

/// Key holding the backend base address.
pub const API_URL_KEY: &str = "apiUrl";

/// String key/value persistence.
///
/// Calls are synchronous and never suspend, so callers can make a
/// read-modify-write sequence atomic with an ordinary lock.
pub trait PersistedStore: Send + Sync {
    /// Stored value for `key`, or `None` when absent.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value for `key`.
    fn write(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing an absent key succeeds.
    fn clear(&self, key: &str) -> Result<()>;
}

// ── In-memory store ──────────────────────────────────────────────────────────

/// Process-local store. Contents vanish with the value.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistedStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(())
    }
}

// ── File-backed store ────────────────────────────────────────────────────────

/// One file per key inside a directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash never leaves a half-written value behind.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(DocragError::Store(format!("invalid store key '{key}'")));
        }
        Ok(self.dir.join(key))
    }
}

impl PersistedStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DocragError::Store(format!(
                "cannot read {}: {e}",
                path.display()
            ))),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        write_atomic(&path, value)
            .map_err(|e| DocragError::Store(format!("cannot write {}: {e}", path.display())))?;
        debug!(key, path = %path.display(), "persisted store value");
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DocragError::Store(format!(
                "cannot remove {}: {e}",
                path.display()
            ))),
        }
    }
}

fn write_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_name = format!(
        ".{}.tmp-{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("value"),
        std::process::id()
    );
    let tmp_path = path
        .parent()
        .map(|p| p.join(&tmp_name))
        .unwrap_or_else(|| PathBuf::from(&tmp_name));

    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)
}
