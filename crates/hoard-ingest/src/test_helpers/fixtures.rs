//! Engine fixtures wired to in-memory backends.

use super::{MockStorage, MockUploadRepository};
use crate::batch::BatchIngestionEngine;
use crate::ids::UuidV7Generator;
use crate::lifecycle::UploadService;
use crate::quota::QuotaService;
use crate::remote::RemoteFetchIngestor;
use hoard_core::models::{Account, IncomingFile, QuotaPolicy, TierTable};
use hoard_core::RemoteFetchConfig;
use hoard_storage::{LocalStorage, Storage};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// A `free`-tier account with fresh mock storage and repository.
pub struct Fixture {
    pub storage: Arc<MockStorage>,
    pub repo: Arc<MockUploadRepository>,
    pub quota: QuotaService,
    pub engine: BatchIngestionEngine,
    pub account: Account,
}

impl Fixture {
    pub fn new(max_file_size: i64, max_total_storage: i64) -> Self {
        let storage = Arc::new(MockStorage::new());
        let repo = Arc::new(MockUploadRepository::new(storage.clone()));
        let quota = quota_service(repo.clone(), max_file_size, max_total_storage);
        let engine = BatchIngestionEngine::new(
            quota.clone(),
            repo.clone(),
            storage.clone(),
            Arc::new(UuidV7Generator),
        );

        Self {
            storage,
            repo,
            quota,
            engine,
            account: Account::new(Uuid::new_v4(), "free"),
        }
    }

    /// Remote ingestor that may reach the local mock server.
    pub fn remote(&self) -> RemoteFetchIngestor {
        self.remote_with(test_fetch_config())
    }

    pub fn remote_with(&self, config: RemoteFetchConfig) -> RemoteFetchIngestor {
        RemoteFetchIngestor::new(
            config,
            self.quota.clone(),
            self.repo.clone(),
            self.storage.clone(),
            Arc::new(UuidV7Generator),
        )
        .unwrap()
    }

    pub fn uploads(&self) -> UploadService {
        UploadService::new(self.repo.clone(), self.quota.clone())
    }
}

/// Engine writing real files under `root`.
pub async fn local_engine(
    root: &Path,
    max_file_size: i64,
    max_total_storage: i64,
) -> (BatchIngestionEngine, Account) {
    let storage: Arc<dyn Storage> = Arc::new(
        LocalStorage::new(root, "http://localhost:3000/media".to_string())
            .await
            .unwrap(),
    );
    let repo = Arc::new(MockUploadRepository::new(storage.clone()));
    let quota = quota_service(repo.clone(), max_file_size, max_total_storage);
    let engine = BatchIngestionEngine::new(quota, repo, storage, Arc::new(UuidV7Generator));
    (engine, Account::new(Uuid::new_v4(), "free"))
}

/// Plain-text file of `size` bytes.
pub fn file(name: &str, size: usize) -> IncomingFile {
    IncomingFile::new(name, vec![b'x'; size])
}

pub fn test_fetch_config() -> RemoteFetchConfig {
    RemoteFetchConfig {
        connect_timeout: Duration::from_secs(2),
        timeout: Duration::from_secs(5),
        max_redirects: 2,
        url_allowlist: None,
        allow_private_urls: true,
    }
}

fn quota_service(
    repo: Arc<MockUploadRepository>,
    max_file_size: i64,
    max_total_storage: i64,
) -> QuotaService {
    let tiers = TierTable::new([QuotaPolicy::new("free", max_file_size, max_total_storage).unwrap()]);
    QuotaService::new(repo, Arc::new(tiers))
}
