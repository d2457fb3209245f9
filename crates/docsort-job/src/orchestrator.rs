//! Run orchestration
//!
//! Drives a whole redistribution run: loads the ledger, builds the dedup
//! index, fans out over un-processed archives with bounded parallelism,
//! aggregates per-archive outcomes, and persists the updated ledger before
//! cleaning up local scratch space. Per-archive failures are isolated;
//! only a ledger persist failure fails the run.

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::JobConfig;
use crate::ledger::{self, DocumentRecord, ProcessedLedger};
use crate::pipeline::{ArchiveOutcome, ArchivePipeline};
use crate::storage::{is_archive_key, ObjectStore};

/// Summary of one redistribution run
#[derive(Debug)]
pub struct RunResult {
    pub run_id: Uuid,
    /// Archives fully processed by this run
    pub processed_archives: Vec<String>,
    /// Documents published by this run
    pub published_documents: Vec<DocumentRecord>,
    /// Archives skipped because a prior run already processed them
    pub skipped_archives: Vec<String>,
    /// Archives that failed and stay pending for the next run
    pub failed_archives: Vec<String>,
    /// The merged ledger as persisted at the end of the run
    pub ledger: ProcessedLedger,
    pub duration_seconds: f64,
}

/// Orchestrates a redistribution run end to end
///
/// Exclusively owns the ledger for the duration of the run; pipelines only
/// read the dedup index and report outcomes back.
pub struct Orchestrator {
    store: Arc<dyn ObjectStore>,
    config: JobConfig,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn ObjectStore>, config: JobConfig) -> Self {
        Self {
            store,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an external cancellation signal for this run
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Execute one run
    ///
    /// Whatever the per-archive outcomes, completed work is merged into the
    /// ledger and persisted before scratch cleanup; a persist failure is
    /// the only error this returns once the fan-out has started.
    pub async fn run(&self) -> Result<RunResult> {
        let run_id = Uuid::new_v4();
        let start_time = Instant::now();

        info!("Starting redistribution run {}", run_id);

        // Leftovers from an interrupted run must not leak into this one.
        self.cleanup_scratch().await;

        let mut ledger = ledger::load(self.store.as_ref(), &self.config.ledger_key)
            .await
            .into_ledger();
        let dedup_index = Arc::new(ledger.build_index());

        debug!("Dedup index holds {} document names", dedup_index.len());

        let keys = self
            .store
            .list("")
            .await
            .context("Failed to list archives")?;
        let archives: Vec<String> = keys.into_iter().filter(|k| is_archive_key(k)).collect();

        info!("Found {} archives in the bucket", archives.len());

        let (pending, skipped): (Vec<String>, Vec<String>) = archives
            .into_iter()
            .partition(|a| !ledger.is_processed(a));

        for archive in &skipped {
            info!("Archive already processed, skipping: {}", archive);
        }

        info!(
            "Processing {} archives with concurrency={}",
            pending.len(),
            self.config.archive_degree()
        );

        let pipeline = ArchivePipeline::new(
            self.store.clone(),
            self.config.clone(),
            dedup_index,
            self.cancel.clone(),
        );

        // Pipelines report outcomes as values and never raise, so the merge
        // and persist below run no matter how many archives fail.
        let outcomes: Vec<ArchiveOutcome> = stream::iter(pending.iter())
            .map(|archive_id| pipeline.run(archive_id))
            .buffer_unordered(self.config.archive_degree())
            .collect()
            .await;

        let mut processed_archives = Vec::new();
        let mut published_documents = Vec::new();
        let mut failed_archives = Vec::new();

        for outcome in outcomes {
            match outcome {
                ArchiveOutcome::Completed {
                    archive_id,
                    documents,
                } => {
                    processed_archives.push(archive_id);
                    published_documents.extend(documents);
                },
                ArchiveOutcome::Cancelled {
                    archive_id,
                    documents,
                } => {
                    info!(
                        "Archive {} was cancelled; keeping {} published documents, archive stays pending",
                        archive_id,
                        documents.len()
                    );
                    published_documents.extend(documents);
                },
                ArchiveOutcome::Failed { archive_id, .. } => {
                    failed_archives.push(archive_id);
                },
            }
        }

        ledger.merge(processed_archives.clone(), published_documents.clone());
        ledger::persist(self.store.as_ref(), &self.config.ledger_key, &ledger)
            .await
            .context("Failed to persist ledger; completed work will be redone next run")?;

        self.cleanup_scratch().await;

        let duration = start_time.elapsed();

        info!(
            "Run {} complete: {} archives processed, {} skipped, {} failed, {} documents published in {:.2}s",
            run_id,
            processed_archives.len(),
            skipped.len(),
            failed_archives.len(),
            published_documents.len(),
            duration.as_secs_f64()
        );

        Ok(RunResult {
            run_id,
            processed_archives,
            published_documents,
            skipped_archives: skipped,
            failed_archives,
            ledger,
            duration_seconds: duration.as_secs_f64(),
        })
    }

    /// Remove the local scratch directory, tolerating its absence
    async fn cleanup_scratch(&self) {
        match tokio::fs::remove_dir_all(&self.config.scratch_dir).await {
            Ok(()) => debug!("Removed scratch directory {}", self.config.scratch_dir.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
            Err(e) => warn!(
                "Failed to clean scratch directory {}: {}",
                self.config.scratch_dir.display(),
                e
            ),
        }
    }
}
