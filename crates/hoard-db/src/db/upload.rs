//! Upload repository: CRUD for the uploads table.
//!
//! Destroying a record always purges its blob from the content store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hoard_core::models::{NewUpload, Provenance, UploadRecord};
use hoard_core::AppError;
use hoard_storage::Storage;
use sqlx::{PgPool, Postgres};
use std::sync::Arc;
use uuid::Uuid;

const UPLOAD_COLUMNS: &str = "id, user_id, storage_key, storage_url, file_size, content_type, \
     original_filename, provenance, original_url, created_at, updated_at";

/// Persistence for upload records.
///
/// Every operation is scoped to the owning user. Implementations never cache
/// usage: `sum_storage_bytes` always reflects committed rows.
#[async_trait]
pub trait UploadRepository: Send + Sync {
    /// Persist a record for a blob that has already been written.
    async fn create(&self, upload: NewUpload) -> Result<UploadRecord, AppError>;

    async fn find(&self, user_id: Uuid, id: Uuid) -> Result<Option<UploadRecord>, AppError>;

    /// Records newest first.
    async fn list_recent(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<UploadRecord>, AppError>;

    /// Delete the record and purge its blob. Returns `false` if no such record.
    async fn destroy(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError>;

    /// Change the display filename; the storage key is untouched.
    async fn rename(
        &self,
        user_id: Uuid,
        id: Uuid,
        filename: &str,
    ) -> Result<UploadRecord, AppError>;

    /// Total committed bytes for the user.
    async fn sum_storage_bytes(&self, user_id: Uuid) -> Result<i64, AppError>;
}

/// Row type for the uploads table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
pub struct UploadRow {
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

impl UploadRow {
    pub fn into_record(self) -> UploadRecord {
        UploadRecord {
            id: self.id,
            user_id: self.user_id,
            storage_key: self.storage_key,
            storage_url: self.storage_url,
            file_size: self.file_size,
            content_type: self.content_type,
            original_filename: self.original_filename,
            provenance: self.provenance,
            original_url: self.original_url,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Postgres-backed [`UploadRepository`].
#[derive(Clone)]
pub struct PgUploadRepository {
    pool: PgPool,
    storage: Arc<dyn Storage>,
}

impl PgUploadRepository {
    pub fn new(pool: PgPool, storage: Arc<dyn Storage>) -> Self {
        Self { pool, storage }
    }
}

#[async_trait]
impl UploadRepository for PgUploadRepository {
    #[tracing::instrument(
        skip(self, upload),
        fields(db.table = "uploads", db.operation = "insert", db.record_id = %upload.id)
    )]
    async fn create(&self, upload: NewUpload) -> Result<UploadRecord, AppError> {
        let row = sqlx::query_as::<Postgres, UploadRow>(&format!(
            r#"
            INSERT INTO uploads (id, user_id, storage_key, storage_url, file_size,
                                 content_type, original_filename, provenance, original_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            UPLOAD_COLUMNS
        ))
        .bind(upload.id)
        .bind(upload.user_id)
        .bind(&upload.blob.key)
        .bind(&upload.blob.url)
        .bind(upload.blob.byte_size)
        .bind(&upload.blob.content_type)
        .bind(&upload.original_filename)
        .bind(upload.provenance)
        .bind(&upload.original_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_record())
    }

    #[tracing::instrument(skip(self), fields(db.table = "uploads", db.record_id = %id))]
    async fn find(&self, user_id: Uuid, id: Uuid) -> Result<Option<UploadRecord>, AppError> {
        let row = sqlx::query_as::<Postgres, UploadRow>(&format!(
            "SELECT {} FROM uploads WHERE user_id = $1 AND id = $2",
            UPLOAD_COLUMNS
        ))
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UploadRow::into_record))
    }

    #[tracing::instrument(skip(self), fields(db.table = "uploads"))]
    async fn list_recent(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<UploadRecord>, AppError> {
        let rows = sqlx::query_as::<Postgres, UploadRow>(&format!(
            r#"
            SELECT {} FROM uploads
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
            UPLOAD_COLUMNS
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(UploadRow::into_record).collect())
    }

    #[tracing::instrument(
        skip(self),
        fields(db.table = "uploads", db.operation = "delete", db.record_id = %id)
    )]
    async fn destroy(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let storage_key: Option<String> = sqlx::query_scalar(
            "DELETE FROM uploads WHERE user_id = $1 AND id = $2 RETURNING storage_key",
        )
        .bind(user_id)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(storage_key) = storage_key else {
            return Ok(false);
        };

        // The row stays until the blob is gone; a failed purge rolls back.
        match self.storage.delete(&storage_key).await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!(
                    error = %e,
                    upload_id = %id,
                    storage_key = %storage_key,
                    "Failed to purge blob, keeping upload record"
                );
                tx.rollback().await?;
                return Err(AppError::Storage(format!("Storage delete failed: {}", e)));
            }
        }

        tx.commit().await?;
        Ok(true)
    }

    #[tracing::instrument(
        skip(self),
        fields(db.table = "uploads", db.operation = "update", db.record_id = %id)
    )]
    async fn rename(
        &self,
        user_id: Uuid,
        id: Uuid,
        filename: &str,
    ) -> Result<UploadRecord, AppError> {
        let row = sqlx::query_as::<Postgres, UploadRow>(&format!(
            r#"
            UPDATE uploads
            SET original_filename = $3, updated_at = NOW()
            WHERE user_id = $1 AND id = $2
            RETURNING {}
            "#,
            UPLOAD_COLUMNS
        ))
        .bind(user_id)
        .bind(id)
        .bind(filename)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UploadRow::into_record)
            .ok_or_else(|| AppError::NotFound("Upload not found".to_string()))
    }

    #[tracing::instrument(skip(self), fields(db.table = "uploads", user_id = %user_id))]
    async fn sum_storage_bytes(&self, user_id: Uuid) -> Result<i64, AppError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(file_size), 0)::BIGINT FROM uploads WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }
}
