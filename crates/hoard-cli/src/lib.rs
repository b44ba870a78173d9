use anyhow::Context;
use hoard_core::models::IncomingFile;
use hoard_core::IngestConfig;
use hoard_db::{PgUploadRepository, UploadRepository};
use hoard_ingest::{
    BatchIngestionEngine, IdGenerator, QuotaService, RemoteFetchIngestor, UploadService,
    UuidV7Generator,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Services built from configuration, shared by every subcommand.
pub struct App {
    pub config: IngestConfig,
    pub batch: BatchIngestionEngine,
    pub remote: RemoteFetchIngestor,
    pub uploads: UploadService,
}

impl App {
    pub async fn from_config(config: IngestConfig) -> anyhow::Result<Self> {
        let pool = hoard_db::connect(&config).await?;
        let storage = hoard_storage::create_storage(&config)
            .await
            .context("Failed to initialize storage backend")?;

        tracing::info!(backend = %storage.backend_type(), "Storage initialized");

        let repo: Arc<dyn UploadRepository> =
            Arc::new(PgUploadRepository::new(pool, storage.clone()));
        let ids: Arc<dyn IdGenerator> = Arc::new(UuidV7Generator);
        let quota = QuotaService::new(repo.clone(), Arc::new(config.quota_tiers.clone()));

        let batch =
            BatchIngestionEngine::new(quota.clone(), repo.clone(), storage.clone(), ids.clone());
        let remote = RemoteFetchIngestor::new(
            config.remote_fetch.clone(),
            quota.clone(),
            repo.clone(),
            storage,
            ids,
        )?;
        let uploads = UploadService::new(repo, quota);

        Ok(Self {
            config,
            batch,
            remote,
            uploads,
        })
    }
}

/// Initialize tracing for the CLI.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

/// Read local files into batch items, named after their basename.
pub async fn read_files(paths: &[PathBuf]) -> anyhow::Result<Vec<IncomingFile>> {
    let mut items = Vec::with_capacity(paths.len());
    for path in paths {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        items.push(IncomingFile::new(display_name(path), data));
    }
    Ok(items)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
