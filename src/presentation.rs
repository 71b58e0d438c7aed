//! Display text for task status views.
//!
//! Pure functions over the wire types; nothing here talks to the backend.

use docrag_api::{IngestionMode, OcrDetails, OcrMode, TaskState, TaskStatusSnapshot};

/// Ids longer than this are shortened by [`truncate_id`].
const MAX_ID_DISPLAY: usize = 20;

/// OCR metadata for a status, preferring the in-progress `info` payload.
///
/// The first payload carrying any OCR field wins as a whole; fields from
/// the two payloads are never mixed.
pub fn resolve_ocr_details(status: &TaskStatusSnapshot) -> Option<&OcrDetails> {
    status.ocr_details()
}

/// Label for the requested OCR policy.
pub fn format_ocr_mode(mode: Option<OcrMode>) -> &'static str {
    match mode {
        Some(OcrMode::Always) => "Always OCR",
        Some(OcrMode::Never) => "Never OCR",
        _ => "Auto",
    }
}

/// Label for the extraction path the backend took.
pub fn format_ingestion_mode(mode: Option<IngestionMode>) -> &'static str {
    match mode {
        Some(IngestionMode::Ocr) => "OCR extraction",
        Some(IngestionMode::DigitalText) => "Digital text path",
        _ => "Unknown",
    }
}

/// Whether OCR ran, and why not if it was skipped.
pub fn ocr_status_text(details: &OcrDetails) -> String {
    if details.ocr_skipped == Some(true) {
        return match details.ocr_skip_reason.as_deref() {
            Some(reason) if !reason.is_empty() => {
                format!("Skipped ({})", format_skip_reason(reason))
            }
            _ => "Skipped".to_owned(),
        };
    }
    if details.ocr_used == Some(true) {
        return "Used".to_owned();
    }
    "Unknown".to_owned()
}

fn format_skip_reason(reason: &str) -> &str {
    match reason {
        "digital_pdf_detected" => "digital PDF detected",
        "ocr_disabled_by_request" => "disabled by request",
        other => other,
    }
}

/// Short headline for a task state.
pub fn status_tone(state: &TaskState) -> &'static str {
    match state {
        TaskState::Success => "Complete",
        TaskState::Failure => "Needs attention",
        TaskState::Processing => "In progress",
        _ => "Queued",
    }
}

/// Shorten long ids to `first8...last4`.
pub fn truncate_id(id: &str) -> String {
    let chars: Vec<char> = id.chars().collect();
    if chars.len() <= MAX_ID_DISPLAY {
        return id.to_owned();
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// Current ingestion step reported while processing (`OCR`, `CHUNKING`, ...).
pub fn current_step(status: &TaskStatusSnapshot) -> Option<&str> {
    status.info.as_ref()?.step.as_deref()
}
