//! Hoard CLI: ingest files and manage uploads from the command line.
//!
//! Reads the same environment as the service (DATABASE_URL, STORAGE_BACKEND,
//! QUOTA_TIERS, ...). Authentication is external, so the acting user and
//! quota tier are passed explicitly.

use anyhow::Context;
use clap::{Parser, Subcommand};
use hoard_core::models::{Account, BatchRequest, Provenance, UploadResponse};
use hoard_core::IngestConfig;
use hoard_cli::{init_tracing, print_json, read_files, App};
use hoard_ingest::FetchOptions;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "hoard", about = "Quota-enforcing upload store")]
struct Cli {
    /// Acting user id
    #[arg(long, value_name = "UUID", global = true)]
    user: Option<Uuid>,

    /// Quota tier of the acting user
    #[arg(long, default_value = "unverified", global = true)]
    tier: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload one or more local files as a batch
    Ingest {
        /// Files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Recorded provenance: web, api, url_fetch, integration
        #[arg(long, default_value = "api")]
        source: Provenance,
    },
    /// Download a URL and store it
    Fetch {
        url: String,
        /// Display filename; derived from the URL when omitted
        #[arg(long)]
        filename: Option<String>,
        /// Authorization header value sent to the origin host
        #[arg(long)]
        authorization: Option<String>,
    },
    /// Show storage usage against the tier limit
    Usage,
    /// List uploads, newest first
    List {
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long)]
        offset: Option<i64>,
    },
    /// Change an upload's display filename
    Rename { id: Uuid, filename: String },
    /// Delete uploads and their stored content
    Delete {
        #[arg(required = true)]
        ids: Vec<Uuid>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let user = cli.user.context("--user is required")?;
    let account = Account::new(user, cli.tier);

    let config = IngestConfig::from_env().context("Failed to load configuration")?;
    let app = App::from_config(config).await?;

    match cli.command {
        Commands::Ingest { files, source } => {
            let items = read_files(&files).await?;
            let request = BatchRequest::new(items, app.config.max_files_per_batch)?;
            let result = app
                .batch
                .process_batch(&account, request.into_items(), source)
                .await?;
            tracing::info!("{}", result.summary());
            print_json(&result.to_response())?;
        }
        Commands::Fetch {
            url,
            filename,
            authorization,
        } => {
            let options = FetchOptions {
                authorization,
                filename,
            };
            let record = app
                .remote
                .ingest_from_url(&account, &url, Provenance::UrlFetch, options)
                .await?;
            print_json(&record.to_response())?;
        }
        Commands::Usage => {
            let usage = app.uploads.usage(&account).await?;
            print_json(&usage)?;
        }
        Commands::List { limit, offset } => {
            let records = app.uploads.list(&account, limit, offset).await?;
            let response: Vec<UploadResponse> = records.iter().map(UploadResponse::from).collect();
            print_json(&response)?;
        }
        Commands::Rename { id, filename } => {
            let record = app.uploads.rename(&account, id, &filename).await?;
            print_json(&record.to_response())?;
        }
        Commands::Delete { ids } => {
            if let [id] = ids.as_slice() {
                app.uploads.delete(&account, *id).await?;
                print_json(&serde_json::json!({ "deleted": [id] }))?;
            } else {
                let result = app.uploads.delete_many(&account, &ids).await;
                print_json(&result)?;
            }
        }
    }

    Ok(())
}
