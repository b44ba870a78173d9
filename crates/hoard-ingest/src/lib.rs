//! Hoard Ingestion Layer
//!
//! Quota-enforcing ingestion of user uploads. Batches are admitted item by
//! item against a single usage read, persisted to the content store, and then
//! reconciled against live usage: if concurrent batches pushed the account
//! over its limit, the newest uploads of this batch are removed again.
//!
//! Single files can also be fetched from a remote URL, with a headers-only
//! size pre-check, validated redirects and a post-write quota check.

pub mod batch;
pub mod filename;
pub mod ids;
pub mod lifecycle;
mod persist;
pub mod quota;
pub mod remote;
pub mod ssrf;

#[cfg(test)]
pub mod test_helpers;

pub use batch::BatchIngestionEngine;
pub use filename::{preserve_extension, renamed, sanitize};
pub use ids::{IdGenerator, UuidV7Generator};
pub use lifecycle::{DeleteManyResult, UploadService};
pub use quota::QuotaService;
pub use remote::{FetchOptions, RemoteFetchIngestor};
