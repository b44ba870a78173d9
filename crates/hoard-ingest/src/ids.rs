//! Upload identifier generation.

use uuid::Uuid;

/// Produces identifiers for new uploads.
///
/// Ids are generated before the blob is written so the storage key is known
/// up front; they double as the database primary key.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> Uuid;
}

/// Time-ordered UUIDv7 identifiers.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidV7Generator;

impl IdGenerator for UuidV7Generator {
    fn generate(&self) -> Uuid {
        Uuid::now_v7()
    }
}
