//! Document submission: upload, remember, start tracking.

use std::path::Path;

use docrag_api::{ApiBoundary, DocumentUpload, UploadOptions};
use tracing::{info, warn};

use crate::error::Result;
use crate::recent::{RecentTaskCache, TaskRecord};
use crate::tracker::TaskStatusTracker;

/// What the backend did with an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Ingestion was queued. The task is in the recent-task history and, if a
    /// tracker was given, being polled.
    Queued {
        task_id: String,
        record: TaskRecord,
        message: String,
    },
    /// The backend already holds this document and queued nothing.
    Existing {
        doc_id: Option<String>,
        message: String,
    },
}

impl SubmitOutcome {
    /// Task id for queued uploads.
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::Queued { task_id, .. } => Some(task_id),
            Self::Existing { .. } => None,
        }
    }
}

/// Upload a document and, when a task is queued, record it as `pending`
/// and hand it to `tracker`.
///
/// A failure to write the history is logged; the upload itself has already
/// succeeded at that point and tracking still starts.
///
/// # Errors
///
/// Returns the upload error unchanged. Nothing is recorded in that case.
pub async fn submit(
    api: &dyn ApiBoundary,
    cache: &RecentTaskCache,
    tracker: Option<&TaskStatusTracker>,
    upload: DocumentUpload,
) -> Result<SubmitOutcome> {
    let filename = upload.filename.clone();
    info!(
        %filename,
        bytes = upload.bytes.len(),
        force = upload.options.force,
        ocr_mode = upload.options.ocr_mode.as_str(),
        "uploading document"
    );

    let response = api.upload_document(upload).await?;
    let Some(task_id) = response.task_id.filter(|id| !id.is_empty()) else {
        info!(
            %filename,
            doc_id = response.doc_id.as_deref().unwrap_or_default(),
            "document already ingested"
        );
        return Ok(SubmitOutcome::Existing {
            doc_id: response.doc_id,
            message: response.message,
        });
    };

    let record = TaskRecord::submitted(&task_id, response.doc_id, filename);
    if let Err(e) = cache.record(record.clone()) {
        warn!(%task_id, "cannot record submitted task: {e}");
    }
    if let Some(tracker) = tracker {
        tracker.set_task(&task_id)?;
    }
    info!(%task_id, filename = %record.filename, "document queued");

    Ok(SubmitOutcome::Queued {
        task_id,
        record,
        message: response.message,
    })
}

/// Read `path` and [`submit`] it with `options`.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read, otherwise as [`submit`].
pub async fn submit_file(
    api: &dyn ApiBoundary,
    cache: &RecentTaskCache,
    tracker: Option<&TaskStatusTracker>,
    path: &Path,
    options: UploadOptions,
) -> Result<SubmitOutcome> {
    let upload = DocumentUpload::from_path(path)?.with_options(options);
    submit(api, cache, tracker, upload).await
}
