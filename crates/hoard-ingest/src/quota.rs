//! Quota policy resolution and usage reads.

use hoard_core::models::{Account, QuotaPolicy, TierTable, UsageSnapshot};
use hoard_core::{AppError, QuotaError};
use hoard_db::UploadRepository;
use std::sync::Arc;
use uuid::Uuid;

/// Resolves per-tier limits and reads live usage.
///
/// Usage is summed from committed upload records on every call and never
/// cached, so concurrent writers become visible as soon as they commit.
#[derive(Clone)]
pub struct QuotaService {
    uploads: Arc<dyn UploadRepository>,
    tiers: Arc<TierTable>,
}

impl QuotaService {
    pub fn new(uploads: Arc<dyn UploadRepository>, tiers: Arc<TierTable>) -> Self {
        Self { uploads, tiers }
    }

    /// Limits for the account's tier. Fails only for a tier nobody configured.
    pub fn resolve_policy(&self, account: &Account) -> Result<QuotaPolicy, QuotaError> {
        self.tiers
            .get(&account.quota_tier)
            .cloned()
            .ok_or_else(|| QuotaError::UnknownTier(account.quota_tier.clone()))
    }

    /// Fresh total of stored bytes for the user.
    pub async fn current_usage(&self, user_id: Uuid) -> Result<i64, AppError> {
        self.uploads.sum_storage_bytes(user_id).await
    }

    pub async fn usage_snapshot(&self, account: &Account) -> Result<UsageSnapshot, AppError> {
        let policy = self.resolve_policy(account)?;
        let used = self.current_usage(account.id).await?;
        Ok(UsageSnapshot::new(used, &policy))
    }

    /// Whether `additional_bytes` still fit under the account's total limit.
    pub async fn can_upload(
        &self,
        account: &Account,
        additional_bytes: i64,
    ) -> Result<bool, AppError> {
        let policy = self.resolve_policy(account)?;
        let used = self.current_usage(account.id).await?;
        Ok(used.saturating_add(additional_bytes) <= policy.max_total_storage_bytes)
    }
}
