use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// The authenticated caller an ingestion runs on behalf of.
///
/// Authentication lives outside this system; callers hand over the user id
/// and the quota tier name they resolved for that user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Account {
    pub id: Uuid,
    pub quota_tier: String,
}

impl Account {
    pub fn new(id: Uuid, quota_tier: impl Into<String>) -> Self {
        Self {
            id,
            quota_tier: quota_tier.into(),
        }
    }
}
