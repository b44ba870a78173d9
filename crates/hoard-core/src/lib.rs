//! Hoard Core Library
//!
//! This crate provides the domain models, error types, configuration and
//! quota policy types shared by every Hoard component.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;
pub mod units;

// Re-export commonly used types
pub use config::{IngestConfig, RemoteFetchConfig};
pub use error::{AppError, ErrorMetadata, FetchError, LogLevel, QuotaError};
pub use storage_types::StorageBackend;
pub use units::format_bytes;
