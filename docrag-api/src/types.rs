//! Wire types exchanged with the document-ingestion backend.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ── Task status vocabulary ─────────────────────────────────────

/// Coarse lifecycle state of a backend ingestion task.
///
/// Decoding is case-insensitive. States outside the known vocabulary are
/// kept verbatim in [`TaskState::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Queued, not yet picked up by a worker.
    Pending,
    /// Picked up by a worker.
    Started,
    /// Worker is running an ingestion step.
    Processing,
    /// Finished successfully.
    Success,
    /// Finished with an error.
    Failure,
    /// Any other state string reported by the backend.
    Unknown(String),
}

impl TaskState {
    /// Parse a backend state string, ignoring ASCII case.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Self::Pending,
            "STARTED" => Self::Started,
            "PROCESSING" => Self::Processing,
            "SUCCESS" => Self::Success,
            "FAILURE" => Self::Failure,
            _ => Self::Unknown(raw.to_owned()),
        }
    }

    /// Upper-case wire spelling (`"PENDING"`, `"SUCCESS"`, ...).
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Started => "STARTED",
            Self::Processing => "PROCESSING",
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Unknown(raw) => raw,
        }
    }

    /// Lower-case spelling used in persisted task history.
    pub fn to_lowercase(&self) -> String {
        self.as_str().to_ascii_lowercase()
    }

    /// `PENDING`, `STARTED` and `PROCESSING` keep a tracker polling.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::Pending | Self::Started | Self::Processing)
    }

    /// `SUCCESS` or `FAILURE`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TaskState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TaskState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

// ── OCR metadata ───────────────────────────────────────────────

/// OCR policy requested at upload time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrMode {
    /// Let the backend decide from the PDF type.
    #[default]
    Auto,
    /// Always run OCR.
    Always,
    /// Never run OCR.
    Never,
    /// A mode this client does not know about.
    #[serde(other)]
    Unrecognized,
}

impl OcrMode {
    /// Query-string spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto | Self::Unrecognized => "auto",
            Self::Always => "always",
            Self::Never => "never",
        }
    }
}

impl std::str::FromStr for OcrMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "always" => Ok(Self::Always),
            "never" => Ok(Self::Never),
            other => Err(format!("unknown OCR mode '{other}' (expected auto, always or never)")),
        }
    }
}

/// Text-extraction path the backend took for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionMode {
    /// Text came from OCR.
    Ocr,
    /// Text came from the PDF's embedded text layer.
    DigitalText,
    /// A mode this client does not know about.
    #[serde(other)]
    Unrecognized,
}

/// OCR-related fields carried by progress and result payloads.
///
/// A `null` value is treated the same as an absent field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrDetails {
    /// OCR policy requested at upload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr_mode: Option<OcrMode>,
    /// Whether OCR actually ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr_used: Option<bool>,
    /// Whether OCR was skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr_skipped: Option<bool>,
    /// Machine-readable reason for skipping OCR.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr_skip_reason: Option<String>,
    /// Extraction path taken.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingestion_mode: Option<IngestionMode>,
}

impl OcrDetails {
    /// Returns `true` when at least one OCR field is present.
    pub fn has_any(&self) -> bool {
        self.ocr_mode.is_some()
            || self.ocr_used.is_some()
            || self.ocr_skipped.is_some()
            || self.ocr_skip_reason.is_some()
            || self.ingestion_mode.is_some()
    }
}

// ── Status payloads ────────────────────────────────────────────

/// Progress payload reported while a task is `PROCESSING`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingInfo {
    /// Current ingestion step (`OCR`, `CHUNKING`, `EMBEDDING`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    /// Document being ingested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
    /// OCR metadata known so far.
    #[serde(flatten)]
    pub ocr: OcrDetails,
}

/// Terminal payload of a finished task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Worker-reported completion status (`"completed"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Ingested document id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
    /// Number of text chunks indexed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks_count: Option<u64>,
    /// Number of atomic claims extracted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims_count: Option<u64>,
    /// Detected PDF type (`digital`, `scanned`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_type: Option<String>,
    /// OCR metadata for the finished ingestion.
    #[serde(flatten)]
    pub ocr: OcrDetails,
}

/// Result of a single status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatusSnapshot {
    /// Task the snapshot belongs to.
    pub task_id: String,
    /// Coarse lifecycle state.
    pub status: TaskState,
    /// Progress payload; absent unless `PROCESSING`.
    #[serde(
        default,
        deserialize_with = "object_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub info: Option<ProcessingInfo>,
    /// Terminal payload; absent until the task is ready.
    #[serde(
        default,
        deserialize_with = "object_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<TaskResult>,
    /// Failure description, when the backend provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskStatusSnapshot {
    /// Snapshot with only a task id and state.
    pub fn new(task_id: impl Into<String>, status: TaskState) -> Self {
        Self {
            task_id: task_id.into(),
            status,
            info: None,
            result: None,
            error: None,
        }
    }

    /// Attach a progress payload.
    pub fn with_info(mut self, info: ProcessingInfo) -> Self {
        self.info = Some(info);
        self
    }

    /// Attach a terminal payload.
    pub fn with_result(mut self, result: TaskResult) -> Self {
        self.result = Some(result);
        self
    }

    /// Attach an error message.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// OCR metadata from the progress payload if it carries any OCR field,
    /// otherwise from the result payload. Fields are never merged.
    pub fn ocr_details(&self) -> Option<&OcrDetails> {
        if let Some(info) = self.info.as_ref().filter(|i| i.ocr.has_any()) {
            return Some(&info.ocr);
        }
        self.result
            .as_ref()
            .map(|r| &r.ocr)
            .filter(|ocr| ocr.has_any())
    }
}

/// Accept any JSON value; keep it only when it decodes as `T`.
///
/// The backend forwards worker payloads untouched, so a failed task can
/// carry a string or an exception repr where an object is expected.
fn object_or_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if !value.is_object() {
        return Ok(None);
    }
    Ok(serde_json::from_value(value).ok())
}

// ── Upload ─────────────────────────────────────────────────────

/// Options sent alongside an upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadOptions {
    /// Re-process a document the backend has already seen.
    pub force: bool,
    /// OCR policy.
    pub ocr_mode: OcrMode,
}

/// A PDF to upload.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    /// File name reported to the backend and kept in task history.
    pub filename: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
    /// Upload options.
    pub options: UploadOptions,
}

impl DocumentUpload {
    /// Create an upload with default options.
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
            options: UploadOptions::default(),
        }
    }

    /// Read a file from disk; the file name becomes the upload name.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be read.
    pub fn from_path(path: &std::path::Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document.pdf")
            .to_owned();
        Ok(Self::new(filename, bytes))
    }

    /// Override the upload options.
    pub fn with_options(mut self, options: UploadOptions) -> Self {
        self.options = options;
        self
    }
}

/// Backend reply to an upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Human-readable outcome.
    #[serde(default)]
    pub message: String,
    /// Ingestion task id; absent when the document already exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// Content-derived document id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
    /// `"existing"` when the upload was a duplicate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

// ── Chat & summary ─────────────────────────────────────────────

/// A question against the indexed documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The question.
    pub query: String,
    /// Restrict retrieval to one document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
    /// Restrict retrieval to atomic-claim chunks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_claim: Option<bool>,
    /// Restrict retrieval to table chunks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_table: Option<bool>,
}

impl ChatRequest {
    /// Unfiltered question.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }
}

/// Evidence backing an answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Source file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// 1-based page number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Section heading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Source document id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
    /// Truncated chunk text.
    #[serde(default)]
    pub text_snippet: String,
    /// Chunk came from a table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_table: Option<bool>,
    /// Chunk is an atomic claim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_claim: Option<bool>,
}

/// Answer to a [`ChatRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Generated answer text.
    pub answer: String,
    /// Evidence used.
    #[serde(default)]
    pub citations: Vec<Citation>,
}

/// Structured overview of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResponse {
    /// Summary text.
    pub summary: String,
}
