//! Test helpers for ingestion tests
//!
//! In-memory stand-ins for the content store and the upload repository, plus
//! a fixture that wires them into the engine.

mod fixtures;
mod mock_repositories;
mod mock_storage;

pub use fixtures::*;
pub use mock_repositories::MockUploadRepository;
pub use mock_storage::MockStorage;
