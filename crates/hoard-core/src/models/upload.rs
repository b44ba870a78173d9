use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// How an upload entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "upload_provenance", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Interactive upload from the web interface
    Web,
    /// Programmatic API upload
    Api,
    /// Fetched from a remote URL
    UrlFetch,
    /// Delivered by an inbound chat integration
    Integration,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Web => "web",
            Provenance::Api => "api",
            Provenance::UrlFetch => "url_fetch",
            Provenance::Integration => "integration",
        }
    }
}

impl Display for Provenance {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provenance {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "web" => Ok(Provenance::Web),
            "api" => Ok(Provenance::Api),
            "url_fetch" | "url" => Ok(Provenance::UrlFetch),
            "integration" => Ok(Provenance::Integration),
            _ => Err(anyhow::anyhow!("Invalid provenance: {}", s)),
        }
    }
}

/// A persisted upload.
///
/// `file_size` and `content_type` always come from the content store, never
/// from what the caller declared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UploadRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub storage_key: String,
    pub storage_url: String,
    pub file_size: i64,
    pub content_type: String,
    pub original_filename: String,
    pub provenance: Provenance,
    pub original_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UploadRecord {
    /// Extension of the display filename, lowercased, if it has one.
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.original_filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }

    pub fn to_response(&self) -> UploadResponse {
        UploadResponse::from(self)
    }
}

/// Caller-facing view of an accepted upload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub id: Uuid,
    pub filename: String,
    pub size: i64,
    pub media_type: String,
    pub reference: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

impl From<&UploadRecord> for UploadResponse {
    fn from(record: &UploadRecord) -> Self {
        Self {
            id: record.id,
            filename: record.original_filename.clone(),
            size: record.file_size,
            media_type: record.content_type.clone(),
            reference: record.storage_key.clone(),
            url: record.storage_url.clone(),
            created_at: record.created_at,
        }
    }
}

/// A blob that the content store has durably written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBlob {
    /// Storage key; the stable reference used for deletes.
    pub key: String,
    pub url: String,
    pub byte_size: i64,
    /// Sniffed from content, falling back to the declared type.
    pub content_type: String,
}

/// Everything the repository needs to persist a new upload row.
#[derive(Debug, Clone)]
pub struct NewUpload {
    pub id: Uuid,
    pub user_id: Uuid,
    pub blob: StoredBlob,
    pub original_filename: String,
    pub provenance: Provenance,
    pub original_url: Option<String>,
}
