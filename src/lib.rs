//! docrag: task tracking and connectivity client for a document-ingestion
//! RAG backend.
//!
//! Uploading a PDF queues an asynchronous ingestion job on the backend. This
//! crate follows those jobs and keeps an eye on the backend itself:
//!
//! - **Task tracking**: [`TaskStatusTracker`] polls a task until it succeeds,
//!   fails, or polling is stopped, publishing every step.
//! - **Recent tasks**: [`RecentTaskCache`] keeps a small, persisted,
//!   newest-first history of submitted tasks.
//! - **Connectivity**: [`HealthMonitor`] runs a heartbeat that decides
//!   whether the backend is online and a slower keep-alive ping that stops
//!   hosted backends from idling out.
//!
//! # Architecture
//!
//! All requests go through the [`docrag_api::ApiBoundary`] trait. State that
//! must survive restarts (the task history and the backend address) goes
//! through [`PersistedStore`]. Observers either pull a snapshot or subscribe
//! to a `tokio::sync::watch` channel.
//!
//! [`DocragClient`] wires one of each service together.

pub mod client;
pub mod config;
pub mod docrag_dirs;
pub mod endpoint;
pub mod error;
pub mod health;
pub mod presentation;
pub mod recent;
pub mod schedule;
pub mod store;
pub mod submit;
pub mod tracker;

#[cfg(test)]
pub(crate) mod test_utils;

pub use client::DocragClient;
pub use config::ClientConfig;
pub use endpoint::Endpoint;
pub use error::{DocragError, Result};
pub use health::{HealthMonitor, HealthSchedule, HealthState};
pub use recent::{RecentTaskCache, TaskRecord};
pub use store::{FileStore, MemoryStore, PersistedStore};
pub use submit::SubmitOutcome;
pub use tracker::{TaskStatusTracker, TrackerError, TrackerPhase, TrackerSnapshot};
