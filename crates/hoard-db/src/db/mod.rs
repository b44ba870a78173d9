//! Database repositories for the data access layer
//
// Upload records and their blob lifecycle
pub mod upload;
//
// Connection pool and migrations
pub mod pool;

pub use pool::connect;
pub use upload::{PgUploadRepository, UploadRepository, UploadRow};
