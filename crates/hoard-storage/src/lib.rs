//! Hoard Storage Library
//!
//! Content store abstraction with S3 and local filesystem backends.
//!
//! # Storage key format
//!
//! Every upload lives under `media/{upload_id}/{sanitized_filename}`. The
//! upload id is unique per upload, so two uploads with the same filename never
//! collide. Keys must not contain `..` or a leading `/`.

pub mod content_type;
pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use content_type::detect_content_type;
pub use factory::create_storage;
pub use hoard_core::StorageBackend;
pub use keys::generate_storage_key;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
