//! Write-blob-then-record step shared by batch and remote ingestion.

use crate::filename::sanitize;
use crate::ids::IdGenerator;
use hoard_core::models::{NewUpload, Provenance, UploadRecord};
use hoard_core::AppError;
use hoard_db::UploadRepository;
use hoard_storage::{generate_storage_key, Storage};
use std::sync::Arc;
use uuid::Uuid;

/// One blob to persist for a user.
pub(crate) struct PendingUpload<'a> {
    pub user_id: Uuid,
    pub filename: &'a str,
    pub declared_content_type: Option<&'a str>,
    pub data: Vec<u8>,
    pub provenance: Provenance,
    pub original_url: Option<String>,
}

#[derive(Clone)]
pub(crate) struct Persister {
    uploads: Arc<dyn UploadRepository>,
    storage: Arc<dyn Storage>,
    ids: Arc<dyn IdGenerator>,
}

impl Persister {
    pub fn new(
        uploads: Arc<dyn UploadRepository>,
        storage: Arc<dyn Storage>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            uploads,
            storage,
            ids,
        }
    }

    /// Write the blob, then the record. A failed record insert removes the blob again.
    pub async fn persist(&self, pending: PendingUpload<'_>) -> Result<UploadRecord, AppError> {
        let id = self.ids.generate();
        let filename = sanitize(pending.filename);
        let storage_key = generate_storage_key(id, &filename);

        let blob = self
            .storage
            .put(
                &storage_key,
                pending.data,
                &filename,
                pending.declared_content_type,
            )
            .await?;

        let new_upload = NewUpload {
            id,
            user_id: pending.user_id,
            blob,
            original_filename: filename,
            provenance: pending.provenance,
            original_url: pending.original_url,
        };

        match self.uploads.create(new_upload).await {
            Ok(record) => Ok(record),
            Err(e) => {
                if let Err(cleanup_err) = self.storage.delete(&storage_key).await {
                    tracing::warn!(
                        error = %cleanup_err,
                        storage_key = %storage_key,
                        "Failed to clean up blob after record insert failed"
                    );
                }
                Err(e)
            }
        }
    }
}
