//! Configuration module
//!
//! Everything is read from the environment (after loading `.env`), with
//! defaults for every setting except the database URL.

use std::env;
use std::time::Duration;

use crate::constants::MAX_FILES_PER_BATCH;
use crate::models::TierTable;
use crate::storage_types::StorageBackend;

const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const REMOTE_FETCH_CONNECT_TIMEOUT_SECS: u64 = 30;
const REMOTE_FETCH_TIMEOUT_SECS: u64 = 120;
const REMOTE_FETCH_MAX_REDIRECTS: usize = 5;

/// Settings for fetching uploads from remote URLs
#[derive(Clone, Debug)]
pub struct RemoteFetchConfig {
    pub connect_timeout: Duration,
    /// Overall per-request timeout
    pub timeout: Duration,
    pub max_redirects: usize,
    /// If set, only these domains (and their subdomains) may be fetched.
    pub url_allowlist: Option<Vec<String>>,
    pub allow_private_urls: bool,
}

impl Default for RemoteFetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(REMOTE_FETCH_CONNECT_TIMEOUT_SECS),
            timeout: Duration::from_secs(REMOTE_FETCH_TIMEOUT_SECS),
            max_redirects: REMOTE_FETCH_MAX_REDIRECTS,
            url_allowlist: None,
            allow_private_urls: false,
        }
    }
}

/// Ingestion engine configuration
#[derive(Clone, Debug)]
pub struct IngestConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub environment: String,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // S3-compatible providers (MinIO etc.)
    pub aws_region: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Quota configuration
    pub quota_tiers: TierTable,
    pub max_files_per_batch: usize,
    pub remote_fetch: RemoteFetchConfig,
}

impl IngestConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup; `from_env` uses the process environment.
    pub fn from_lookup<F>(var: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = var("ENVIRONMENT")
            .or_else(|| var("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let storage_backend = match var("STORAGE_BACKEND") {
            Some(s) => s
                .parse::<StorageBackend>()
                .map_err(|e| anyhow::anyhow!("STORAGE_BACKEND: {}", e))?,
            None => StorageBackend::Local,
        };

        let quota_tiers = match var("QUOTA_TIERS") {
            Some(spec) if !spec.trim().is_empty() => TierTable::parse(&spec)?,
            _ => TierTable::builtin(),
        };

        let url_upload_allowlist = var("URL_UPLOAD_ALLOWLIST")
            .map(|s| {
                s.split(',')
                    .map(|d| d.trim().to_lowercase())
                    .filter(|d| !d.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|domains| !domains.is_empty());

        let remote_fetch = RemoteFetchConfig {
            connect_timeout: Duration::from_secs(
                var("REMOTE_FETCH_CONNECT_TIMEOUT_SECS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(REMOTE_FETCH_CONNECT_TIMEOUT_SECS),
            ),
            timeout: Duration::from_secs(
                var("REMOTE_FETCH_TIMEOUT_SECS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(REMOTE_FETCH_TIMEOUT_SECS),
            ),
            max_redirects: var("REMOTE_FETCH_MAX_REDIRECTS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(REMOTE_FETCH_MAX_REDIRECTS),
            url_allowlist: url_upload_allowlist,
            allow_private_urls: var("ALLOW_PRIVATE_URLS")
                .unwrap_or_else(|| "false".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(false),
        };

        let config = IngestConfig {
            database_url: var("DATABASE_URL")
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: var("DB_MAX_CONNECTIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: var("DB_TIMEOUT_SECONDS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            environment,
            storage_backend,
            s3_bucket: var("S3_BUCKET"),
            s3_region: var("S3_REGION"),
            s3_endpoint: var("S3_ENDPOINT"),
            aws_region: var("AWS_REGION"),
            local_storage_path: var("LOCAL_STORAGE_PATH"),
            local_storage_base_url: var("LOCAL_STORAGE_BASE_URL"),
            quota_tiers,
            max_files_per_batch: var("MAX_FILES_PER_BATCH")
                .and_then(|s| s.parse().ok())
                .unwrap_or(MAX_FILES_PER_BATCH),
            remote_fetch,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgresql://")
            && !self.database_url.starts_with("postgres://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.max_files_per_batch == 0 {
            return Err(anyhow::anyhow!("MAX_FILES_PER_BATCH must be at least 1"));
        }

        if self.quota_tiers.is_empty() {
            return Err(anyhow::anyhow!("At least one quota tier must be configured"));
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() && self.aws_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment.to_lowercase().as_str(), "production" | "prod")
    }

    /// S3 region, preferring `S3_REGION` over `AWS_REGION`.
    pub fn s3_region(&self) -> Option<&str> {
        self.s3_region.as_deref().or(self.aws_region.as_deref())
    }

    pub fn url_upload_allowlist(&self) -> Option<&[String]> {
        self.remote_fetch.url_allowlist.as_deref()
    }
}
