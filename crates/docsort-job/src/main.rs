//! Docsort Job - archive redistribution tool

use anyhow::Result;
use clap::Parser;
use docsort_common::logging::{init_logging, LogConfig, LogLevel};
use docsort_job::config::JobConfig;
use docsort_job::orchestrator::Orchestrator;
use docsort_job::storage::{S3Storage, StorageConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "docsort-job")]
#[command(author, version, about = "Redistributes archived documents by purchase order")]
struct Cli {
    /// Bucket holding the archives, the ledger, and the published documents
    #[arg(short, long, env = "S3_BUCKET")]
    bucket: Option<String>,

    /// Maximum number of archives processed concurrently (1 = sequential)
    #[arg(long)]
    archive_concurrency: Option<usize>,

    /// Maximum number of documents published concurrently per archive
    #[arg(long)]
    document_concurrency: Option<usize>,

    /// Local scratch directory
    #[arg(long)]
    scratch_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Environment configuration first, then the verbose flag on top
    let mut log_config = LogConfig::from_env()?.with_log_file_prefix("docsort-job");
    if cli.verbose {
        log_config = log_config.with_level(LogLevel::Debug);
    }

    init_logging(&log_config)?;

    let mut storage_config = StorageConfig::from_env()?;
    if let Some(bucket) = cli.bucket {
        storage_config = storage_config.with_bucket(bucket);
    }

    let mut job_config = JobConfig::from_env()?;
    if let Some(degree) = cli.archive_concurrency {
        job_config = job_config.with_archive_concurrency(degree);
    }
    if let Some(degree) = cli.document_concurrency {
        job_config = job_config.with_document_concurrency(degree);
    }
    if let Some(dir) = cli.scratch_dir {
        job_config = job_config.with_scratch_dir(dir);
    }

    info!("Bucket: {}", storage_config.bucket);

    let storage = S3Storage::new(storage_config).await?;

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing in-flight work and persisting the ledger");
            ctrl_c_cancel.cancel();
        }
    });

    let orchestrator = Orchestrator::new(Arc::new(storage), job_config).with_cancellation(cancel);
    let result = orchestrator.run().await?;

    info!(
        "Process finished: {} archives processed, {} documents published in {:.2}s",
        result.processed_archives.len(),
        result.published_documents.len(),
        result.duration_seconds
    );

    Ok(())
}
