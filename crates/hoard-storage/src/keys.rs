//! Shared key generation for storage backends.

use hoard_core::constants::STORAGE_KEY_PREFIX;
use uuid::Uuid;

/// Storage key for an upload: `media/{upload_id}/{filename}`.
///
/// `filename` must already be sanitized.
pub fn generate_storage_key(upload_id: Uuid, filename: &str) -> String {
    format!("{}/{}/{}", STORAGE_KEY_PREFIX, upload_id, filename)
}
