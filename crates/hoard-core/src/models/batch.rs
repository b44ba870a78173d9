//! Batch ingestion value types.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::upload::{UploadRecord, UploadResponse};
use crate::error::AppError;
use crate::units::format_bytes;

/// One file-like input handed to the ingestion engine.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub filename: String,
    /// What the client claimed the media type is; only a fallback for sniffing.
    pub declared_content_type: Option<String>,
    pub data: Vec<u8>,
}

impl IncomingFile {
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            declared_content_type: None,
            data,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.declared_content_type = Some(content_type.into());
        self
    }

    /// Declared size, used for admission checks.
    pub fn size(&self) -> i64 {
        self.data.len() as i64
    }
}

/// A batch that passed the caller-side cardinality checks.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    items: Vec<IncomingFile>,
}

impl BatchRequest {
    pub fn new(items: Vec<IncomingFile>, max_files: usize) -> Result<Self, AppError> {
        if items.is_empty() {
            return Err(AppError::InvalidInput(
                "Please select at least one file to upload".to_string(),
            ));
        }
        if items.len() > max_files {
            return Err(AppError::InvalidInput(format!(
                "Too many files: maximum {} files per batch, got {}",
                max_files,
                items.len()
            )));
        }
        Ok(Self { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<IncomingFile> {
        self.items
    }
}

/// Why a batch item did not end up stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum BatchFailureKind {
    FileTooLarge { size: i64, limit: i64 },
    WouldExceedQuota { remaining: i64 },
    QuotaAlreadyExceeded,
    IngestionError,
    RemovedPostHoc,
}

impl BatchFailureKind {
    /// Human-readable reason shown to the caller.
    pub fn reason(&self) -> String {
        match self {
            BatchFailureKind::FileTooLarge { size, limit } => format!(
                "File size ({}) exceeds limit of {}",
                format_bytes(*size),
                format_bytes(*limit)
            ),
            BatchFailureKind::WouldExceedQuota { remaining } => format!(
                "Would exceed storage quota ({} remaining)",
                format_bytes(*remaining)
            ),
            BatchFailureKind::QuotaAlreadyExceeded => "storage quota already exceeded".to_string(),
            BatchFailureKind::IngestionError => "Upload failed".to_string(),
            BatchFailureKind::RemovedPostHoc => {
                "removed: concurrent uploads exceeded quota".to_string()
            }
        }
    }
}

/// A rejected or evicted batch item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BatchItemFailure {
    pub filename: String,
    pub reason: String,
    #[serde(flatten)]
    pub kind: BatchFailureKind,
    /// Position of the item in the submitted batch.
    #[serde(skip)]
    pub position: usize,
}

impl BatchItemFailure {
    pub fn new(position: usize, filename: impl Into<String>, kind: BatchFailureKind) -> Self {
        Self {
            filename: filename.into(),
            reason: kind.reason(),
            kind,
            position,
        }
    }
}

/// Outcome of one batch: accepted uploads in acceptance order, failures in input order.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub accepted: Vec<UploadRecord>,
    pub failed: Vec<BatchItemFailure>,
}

impl BatchResult {
    pub fn any_accepted(&self) -> bool {
        !self.accepted.is_empty()
    }

    /// Message suitable for a flash notice or CLI output.
    pub fn summary(&self) -> String {
        let mut counts = Vec::new();
        if !self.accepted.is_empty() {
            counts.push(format!(
                "{} file(s) uploaded successfully",
                self.accepted.len()
            ));
        }
        if !self.failed.is_empty() {
            counts.push(format!("{} file(s) failed to upload", self.failed.len()));
        }

        let mut parts = vec![counts.join(", ")];
        if !self.failed.is_empty() {
            let failures = self
                .failed
                .iter()
                .map(|f| format!("{} ({})", f.filename, f.reason))
                .collect::<Vec<_>>()
                .join(", ");
            parts.push(format!("Failed: {}", failures));
        }
        parts.join(". ")
    }

    pub fn to_response(&self) -> BatchResponse {
        BatchResponse {
            accepted: self.accepted.iter().map(UploadResponse::from).collect(),
            failed: self.failed.clone(),
        }
    }
}

/// Serialized batch outcome.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchResponse {
    pub accepted: Vec<UploadResponse>,
    pub failed: Vec<BatchItemFailure>,
}
