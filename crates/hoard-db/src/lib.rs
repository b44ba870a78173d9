//! Hoard database layer
//!
//! Postgres-backed persistence for upload records. The repository owns the
//! link between a row and its blob: destroying a record purges the blob.

pub mod db;

pub use db::{connect, PgUploadRepository, UploadRepository, UploadRow};
