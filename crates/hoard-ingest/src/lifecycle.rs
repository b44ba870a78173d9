//! Listing, renaming and deleting stored uploads.

use crate::filename::renamed;
use crate::quota::QuotaService;
use hoard_core::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use hoard_core::models::{Account, UploadRecord, UsageSnapshot};
use hoard_core::AppError;
use hoard_db::UploadRepository;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Outcome of a multi-delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteManyResult {
    pub deleted: Vec<Uuid>,
    pub not_found: Vec<Uuid>,
    /// Ids whose record or blob could not be removed.
    pub failed: Vec<Uuid>,
}

/// Owner-scoped operations on existing uploads.
#[derive(Clone)]
pub struct UploadService {
    uploads: Arc<dyn UploadRepository>,
    quota: QuotaService,
}

impl UploadService {
    pub fn new(uploads: Arc<dyn UploadRepository>, quota: QuotaService) -> Self {
        Self { uploads, quota }
    }

    /// Newest first. `limit` defaults to 50 and is capped.
    pub async fn list(
        &self,
        account: &Account,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<UploadRecord>, AppError> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = offset.unwrap_or(0).max(0);
        self.uploads.list_recent(account.id, limit, offset).await
    }

    pub async fn get(&self, account: &Account, id: Uuid) -> Result<UploadRecord, AppError> {
        self.uploads
            .find(account.id, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Upload not found".to_string()))
    }

    /// Remove the record and its blob.
    #[tracing::instrument(skip(self), fields(user_id = %account.id))]
    pub async fn delete(&self, account: &Account, id: Uuid) -> Result<(), AppError> {
        if !self.uploads.destroy(account.id, id).await? {
            return Err(AppError::NotFound("Upload not found".to_string()));
        }
        tracing::info!(upload_id = %id, "Upload deleted");
        Ok(())
    }

    /// Delete each id independently; one failure never stops the rest.
    #[tracing::instrument(skip(self, ids), fields(user_id = %account.id, count = ids.len()))]
    pub async fn delete_many(&self, account: &Account, ids: &[Uuid]) -> DeleteManyResult {
        let mut result = DeleteManyResult::default();

        for &id in ids {
            match self.uploads.destroy(account.id, id).await {
                Ok(true) => result.deleted.push(id),
                Ok(false) => result.not_found.push(id),
                Err(e) => {
                    tracing::error!(error = %e, upload_id = %id, "Failed to delete upload");
                    result.failed.push(id);
                }
            }
        }

        tracing::info!(
            deleted = result.deleted.len(),
            not_found = result.not_found.len(),
            failed = result.failed.len(),
            "Batch delete finished"
        );
        result
    }

    /// Change the display filename. The stored blob does not move.
    #[tracing::instrument(skip(self), fields(user_id = %account.id))]
    pub async fn rename(
        &self,
        account: &Account,
        id: Uuid,
        new_filename: &str,
    ) -> Result<UploadRecord, AppError> {
        let requested = new_filename.trim();
        if requested.is_empty() {
            return Err(AppError::InvalidInput(
                "Missing filename parameter".to_string(),
            ));
        }

        let current = self.get(account, id).await?;
        let filename = renamed(&current.original_filename, requested);
        self.uploads.rename(account.id, id, &filename).await
    }

    pub async fn usage(&self, account: &Account) -> Result<UsageSnapshot, AppError> {
        self.quota.usage_snapshot(account).await
    }
}
