//! Batch ingestion with quota admission and post-hoc remediation.
//!
//! Quota is enforced in two phases. Admission checks every item, in input
//! order, against one usage read taken at the start plus the bytes this batch
//! has already accepted. Reconciliation re-reads true usage once ingestion is
//! done; if concurrent writers pushed the account over its limit, this
//! batch's own uploads are evicted newest first until the overage is covered.

use crate::ids::IdGenerator;
use crate::persist::{PendingUpload, Persister};
use crate::quota::QuotaService;
use hoard_core::models::{
    Account, BatchFailureKind, BatchItemFailure, BatchResult, IncomingFile, Provenance,
    QuotaPolicy, UploadRecord, UsageSnapshot,
};
use hoard_core::{AppError, QuotaError};
use hoard_db::UploadRepository;
use hoard_storage::Storage;
use std::sync::Arc;

/// Ingests batches of files for one account at a time.
#[derive(Clone)]
pub struct BatchIngestionEngine {
    quota: QuotaService,
    uploads: Arc<dyn UploadRepository>,
    persister: Persister,
}

/// An accepted item and where it sat in the submitted batch.
struct Accepted {
    position: usize,
    record: UploadRecord,
}

impl BatchIngestionEngine {
    pub fn new(
        quota: QuotaService,
        uploads: Arc<dyn UploadRepository>,
        storage: Arc<dyn Storage>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            quota,
            persister: Persister::new(uploads.clone(), storage, ids),
            uploads,
        }
    }

    /// Ingest `items` for `account`.
    ///
    /// Per-item problems end up in the result's failure list. Only an empty
    /// batch, an unknown quota tier or a failed initial usage read return `Err`.
    #[tracing::instrument(
        skip(self, items),
        fields(user_id = %account.id, tier = %account.quota_tier, items = items.len())
    )]
    pub async fn process_batch(
        &self,
        account: &Account,
        items: Vec<IncomingFile>,
        provenance: Provenance,
    ) -> Result<BatchResult, AppError> {
        if items.is_empty() {
            return Err(AppError::InvalidInput(
                "Please select at least one file to upload".to_string(),
            ));
        }

        let policy = self.quota.resolve_policy(account)?;
        let baseline = self.quota.current_usage(account.id).await?;

        if baseline >= policy.max_total_storage_bytes {
            tracing::debug!(
                baseline,
                limit = policy.max_total_storage_bytes,
                "Storage quota already exceeded, rejecting whole batch"
            );
            let failed = items
                .into_iter()
                .enumerate()
                .map(|(position, item)| {
                    BatchItemFailure::new(
                        position,
                        item.filename,
                        BatchFailureKind::QuotaAlreadyExceeded,
                    )
                })
                .collect();
            return Ok(BatchResult {
                accepted: Vec::new(),
                failed,
            });
        }

        let mut accepted: Vec<Accepted> = Vec::new();
        let mut failed: Vec<BatchItemFailure> = Vec::new();
        let mut batch_bytes_used: i64 = 0;

        for (position, item) in items.into_iter().enumerate() {
            if let Err(kind) = admit(&policy, baseline, batch_bytes_used, item.size()) {
                tracing::debug!(
                    filename = %item.filename,
                    size_bytes = item.size(),
                    reason = ?kind,
                    "Batch item rejected by quota"
                );
                failed.push(BatchItemFailure::new(position, item.filename, kind));
                continue;
            }

            let filename = item.filename.clone();
            match self.ingest(account, item, provenance).await {
                Ok(record) => {
                    tracing::info!(
                        upload_id = %record.id,
                        filename = %record.original_filename,
                        size_bytes = record.file_size,
                        content_type = %record.content_type,
                        "Upload accepted"
                    );
                    batch_bytes_used = batch_bytes_used.saturating_add(record.file_size);
                    accepted.push(Accepted { position, record });
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        detail = %e.detailed_message(),
                        filename = %filename,
                        "Batch item ingestion failed"
                    );
                    failed.push(BatchItemFailure::new(
                        position,
                        filename,
                        BatchFailureKind::IngestionError,
                    ));
                }
            }
        }

        if !accepted.is_empty() {
            self.remediate(account, &policy, &mut accepted, &mut failed)
                .await;
        }

        failed.sort_by_key(|f| f.position);

        Ok(BatchResult {
            accepted: accepted.into_iter().map(|a| a.record).collect(),
            failed,
        })
    }

    /// Ingest a single file, surfacing quota refusals as typed errors.
    ///
    /// Checks run against a fresh usage read before the write and again
    /// after it; a post-write overage destroys the new upload.
    #[tracing::instrument(
        skip(self, item),
        fields(user_id = %account.id, filename = %item.filename)
    )]
    pub async fn ingest_one(
        &self,
        account: &Account,
        item: IncomingFile,
        provenance: Provenance,
    ) -> Result<UploadRecord, AppError> {
        let policy = self.quota.resolve_policy(account)?;
        let size = item.size();

        if size > policy.max_file_size_bytes {
            return Err(QuotaError::FileTooLarge {
                size,
                limit: policy.max_file_size_bytes,
            }
            .into());
        }

        let used = self.quota.current_usage(account.id).await?;
        if used.saturating_add(size) > policy.max_total_storage_bytes {
            return Err(QuotaError::StorageQuotaExceeded {
                usage: UsageSnapshot::new(used, &policy),
            }
            .into());
        }

        let record = self.ingest(account, item, provenance).await?;
        enforce_after_write(&self.quota, self.uploads.as_ref(), account, &policy, record).await
    }

    async fn ingest(
        &self,
        account: &Account,
        item: IncomingFile,
        provenance: Provenance,
    ) -> Result<UploadRecord, AppError> {
        self.persister
            .persist(PendingUpload {
                user_id: account.id,
                filename: &item.filename,
                declared_content_type: item.declared_content_type.as_deref(),
                data: item.data,
                provenance,
                original_url: None,
            })
            .await
    }

    /// Evict this batch's uploads, newest first, until the account is back
    /// under its limit.
    async fn remediate(
        &self,
        account: &Account,
        policy: &QuotaPolicy,
        accepted: &mut Vec<Accepted>,
        failed: &mut Vec<BatchItemFailure>,
    ) {
        let actual = match self.quota.current_usage(account.id).await {
            Ok(actual) => actual,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    user_id = %account.id,
                    "Usage re-read failed, skipping quota reconciliation"
                );
                return;
            }
        };

        if actual <= policy.max_total_storage_bytes {
            return;
        }

        let overage = actual - policy.max_total_storage_bytes;
        tracing::warn!(
            user_id = %account.id,
            actual,
            limit = policy.max_total_storage_bytes,
            overage,
            "Concurrent uploads exceeded quota, evicting newest uploads from this batch"
        );

        let mut reclaimed: i64 = 0;
        let mut index = accepted.len();
        while index > 0 && reclaimed < overage {
            index -= 1;
            let record = &accepted[index].record;

            match self.uploads.destroy(account.id, record.id).await {
                Ok(existed) => {
                    if existed {
                        reclaimed = reclaimed.saturating_add(record.file_size);
                    }
                    tracing::warn!(
                        upload_id = %record.id,
                        filename = %record.original_filename,
                        size_bytes = record.file_size,
                        reclaimed,
                        "Upload removed to restore quota"
                    );
                    let evicted = accepted.remove(index);
                    failed.push(BatchItemFailure::new(
                        evicted.position,
                        evicted.record.original_filename,
                        BatchFailureKind::RemovedPostHoc,
                    ));
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        upload_id = %record.id,
                        "Failed to remove upload during quota reconciliation"
                    );
                }
            }
        }
    }
}

/// Admission check for one item against the running batch total.
fn admit(
    policy: &QuotaPolicy,
    baseline: i64,
    batch_bytes_used: i64,
    size: i64,
) -> Result<(), BatchFailureKind> {
    if size > policy.max_file_size_bytes {
        return Err(BatchFailureKind::FileTooLarge {
            size,
            limit: policy.max_file_size_bytes,
        });
    }

    let committed = baseline.saturating_add(batch_bytes_used);
    if committed.saturating_add(size) > policy.max_total_storage_bytes {
        return Err(BatchFailureKind::WouldExceedQuota {
            remaining: policy.remaining(committed),
        });
    }

    Ok(())
}

/// Re-read usage after a write; destroy `record` and fail if the account is
/// now over its limit.
pub(crate) async fn enforce_after_write(
    quota: &QuotaService,
    uploads: &dyn UploadRepository,
    account: &Account,
    policy: &QuotaPolicy,
    record: UploadRecord,
) -> Result<UploadRecord, AppError> {
    let actual = quota.current_usage(account.id).await?;
    if actual <= policy.max_total_storage_bytes {
        return Ok(record);
    }

    tracing::warn!(
        upload_id = %record.id,
        actual,
        limit = policy.max_total_storage_bytes,
        "Upload pushed account over quota, removing it"
    );
    uploads.destroy(account.id, record.id).await?;

    let used = quota.current_usage(account.id).await?;
    Err(QuotaError::StorageQuotaExceeded {
        usage: UsageSnapshot::new(used, policy),
    }
    .into())
}
