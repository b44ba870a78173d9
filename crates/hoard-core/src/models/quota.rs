//! Quota policy and usage models.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

const MIB: i64 = 1024 * 1024;

/// Limits that apply to one quota tier.
///
/// Resolved once per request and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct QuotaPolicy {
    pub tier: String,
    pub max_file_size_bytes: i64,
    pub max_total_storage_bytes: i64,
}

impl QuotaPolicy {
    pub fn new(
        tier: impl Into<String>,
        max_file_size_bytes: i64,
        max_total_storage_bytes: i64,
    ) -> Result<Self, anyhow::Error> {
        let tier = tier.into();
        if tier.trim().is_empty() {
            return Err(anyhow::anyhow!("Quota tier name must not be empty"));
        }
        if max_file_size_bytes <= 0 || max_total_storage_bytes <= 0 {
            return Err(anyhow::anyhow!(
                "Quota tier '{}' limits must be positive (file: {}, total: {})",
                tier,
                max_file_size_bytes,
                max_total_storage_bytes
            ));
        }
        Ok(Self {
            tier,
            max_file_size_bytes,
            max_total_storage_bytes,
        })
    }

    /// Bytes left under the total limit given `used`, never negative.
    pub fn remaining(&self, used: i64) -> i64 {
        self.max_total_storage_bytes.saturating_sub(used).max(0)
    }
}

/// All configured quota tiers, keyed by tier name.
#[derive(Debug, Clone, Default)]
pub struct TierTable {
    tiers: HashMap<String, QuotaPolicy>,
}

impl TierTable {
    pub fn new(policies: impl IntoIterator<Item = QuotaPolicy>) -> Self {
        Self {
            tiers: policies
                .into_iter()
                .map(|p| (p.tier.to_lowercase(), p))
                .collect(),
        }
    }

    /// Built-in tiers used when `QUOTA_TIERS` is unset.
    pub fn builtin() -> Self {
        Self::new([
            QuotaPolicy {
                tier: "unverified".to_string(),
                max_file_size_bytes: 10 * MIB,
                max_total_storage_bytes: 50 * MIB,
            },
            QuotaPolicy {
                tier: "verified".to_string(),
                max_file_size_bytes: 100 * MIB,
                max_total_storage_bytes: 50 * 1024 * MIB,
            },
            QuotaPolicy {
                tier: "superuser".to_string(),
                max_file_size_bytes: 1024 * MIB,
                max_total_storage_bytes: 1024 * 1024 * MIB,
            },
        ])
    }

    /// Parse `name:max_file_mb:max_total_mb` entries separated by commas.
    pub fn parse(spec: &str) -> Result<Self, anyhow::Error> {
        let mut policies = Vec::new();
        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
            let [name, file_mb, total_mb] = parts.as_slice() else {
                return Err(anyhow::anyhow!(
                    "Invalid quota tier '{}': expected name:max_file_mb:max_total_mb",
                    entry
                ));
            };
            let file_mb: i64 = file_mb
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid max file size in quota tier '{}'", entry))?;
            let total_mb: i64 = total_mb.parse().map_err(|_| {
                anyhow::anyhow!("Invalid max total storage in quota tier '{}'", entry)
            })?;
            policies.push(QuotaPolicy::new(
                *name,
                file_mb.saturating_mul(MIB),
                total_mb.saturating_mul(MIB),
            )?);
        }

        if policies.is_empty() {
            return Err(anyhow::anyhow!("QUOTA_TIERS must define at least one tier"));
        }
        Ok(Self::new(policies))
    }

    pub fn get(&self, tier: &str) -> Option<&QuotaPolicy> {
        self.tiers.get(&tier.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

/// Point-in-time view of a user's storage usage.
///
/// Advisory only: stale as soon as any other writer commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UsageSnapshot {
    #[serde(rename = "storage_used")]
    pub storage_used_bytes: i64,
    #[serde(rename = "storage_limit")]
    pub storage_limit_bytes: i64,
    #[serde(rename = "quota_tier")]
    pub tier: String,
    pub percentage_used: f64,
}

impl UsageSnapshot {
    pub fn new(storage_used_bytes: i64, policy: &QuotaPolicy) -> Self {
        let percentage_used = if policy.max_total_storage_bytes > 0 {
            let raw = storage_used_bytes as f64 / policy.max_total_storage_bytes as f64 * 100.0;
            (raw * 100.0).round() / 100.0
        } else {
            0.0
        };
        Self {
            storage_used_bytes,
            storage_limit_bytes: policy.max_total_storage_bytes,
            tier: policy.tier.clone(),
            percentage_used,
        }
    }

    pub fn is_exceeded(&self) -> bool {
        self.storage_used_bytes >= self.storage_limit_bytes
    }
}
