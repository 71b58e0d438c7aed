//! Centralized directory paths for the docrag client.
//!
//! Uses the [`dirs`] crate for platform-appropriate resolution.
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | Data | `~/Library/Application Support/docrag/` | `~/.local/share/docrag/` |
//! | Config | `~/Library/Application Support/docrag/` | `~/.config/docrag/` |
//!
//! # Environment Overrides
//!
//! - `DOCRAG_DATA_DIR` overrides [`data_dir`]
//! - `DOCRAG_CONFIG_DIR` overrides [`config_dir`]

use std::path::PathBuf;

/// Application data root directory.
///
/// Resolves to `dirs::data_dir()/docrag/` by default. Override with the
/// `DOCRAG_DATA_DIR` environment variable.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("DOCRAG_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("docrag"))
        .unwrap_or_else(|| PathBuf::from("/tmp/docrag-data"))
}

/// Application config directory (holds `config.toml`).
///
/// Resolves to `dirs::config_dir()/docrag/` by default. Override with the
/// `DOCRAG_CONFIG_DIR` environment variable.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("DOCRAG_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("docrag"))
        .unwrap_or_else(|| PathBuf::from("/tmp/docrag-config"))
}

/// Persisted key/value store directory (`data_dir()/store/`).
#[must_use]
pub fn store_dir() -> PathBuf {
    data_dir().join("store")
}
