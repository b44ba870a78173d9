//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::content_type::detect_content_type;
use crate::StorageBackend;
use async_trait::async_trait;
use hoard_core::models::StoredBlob;
use hoard_core::AppError;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::NotFound(format!("Blob not found: {}", key)),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// All storage backends (S3, local filesystem) implement this trait so the
/// upload repository and ingestion engine never depend on a concrete backend.
///
/// **Key format:** `media/{upload_id}/{filename}`. See the crate root documentation.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write `data` under `storage_key` and return the public URL.
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<String>;

    /// Download a file by its storage key
    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Delete a file by its storage key
    ///
    /// Idempotent: deleting a key that holds nothing succeeds.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Check if a file exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Get the size in bytes of an object, if it exists.
    async fn content_length(&self, storage_key: &str) -> StorageResult<u64>;

    /// Public URL for a key, without touching the backend.
    fn public_url(&self, storage_key: &str) -> String;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;

    /// Durably write a blob and report what was actually stored.
    ///
    /// The returned size is the number of bytes written and the content type
    /// is sniffed from the data, falling back to `declared_content_type`.
    async fn put(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        filename: &str,
        declared_content_type: Option<&str>,
    ) -> StorageResult<StoredBlob> {
        let content_type = detect_content_type(&data, filename, declared_content_type);
        let byte_size = data.len() as i64;
        let url = self.upload_with_key(storage_key, data, &content_type).await?;

        Ok(StoredBlob {
            key: storage_key.to_string(),
            url,
            byte_size,
            content_type,
        })
    }
}
