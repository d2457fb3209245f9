//! Per-archive processing pipeline
//!
//! Runs the complete redistribution process for a single archive:
//!
//! 1. Download the archive to local scratch storage
//! 2. Unpack it into a directory derived from the archive name
//! 3. Parse the index CSV inside it
//! 4. Publish every mapped document not already in the dedup index
//!
//! A pipeline reports its result as an [`ArchiveOutcome`] value and never
//! raises past its own boundary; one bad archive cannot abort the run.

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::JobConfig;
use crate::layout;
use crate::ledger::DocumentRecord;
use crate::mapping::{MappingExtractor, MappingRecord};
use crate::storage::ObjectStore;
use crate::unpack;

/// Result of one archive pipeline run
#[derive(Debug)]
pub enum ArchiveOutcome {
    /// Every mapped document was attempted; the archive counts as processed
    Completed {
        archive_id: String,
        documents: Vec<DocumentRecord>,
    },
    /// Cancellation stopped the pipeline before all documents were
    /// attempted; the archive does not count as processed, but documents
    /// already published are kept
    Cancelled {
        archive_id: String,
        documents: Vec<DocumentRecord>,
    },
    /// The archive could not be processed; it stays pending for the next run
    Failed {
        archive_id: String,
        error: anyhow::Error,
    },
}

enum DocOutcome {
    Published(DocumentRecord),
    Skipped,
    Failed,
    NotStarted,
}

/// Pipeline for one archive
///
/// Shares the read-only dedup index with its sibling pipelines and
/// accumulates its own completions; it never writes shared state.
pub struct ArchivePipeline {
    store: Arc<dyn ObjectStore>,
    config: JobConfig,
    dedup_index: Arc<HashSet<String>>,
    cancel: CancellationToken,
}

impl ArchivePipeline {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        config: JobConfig,
        dedup_index: Arc<HashSet<String>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            config,
            dedup_index,
            cancel,
        }
    }

    /// Process one archive, reporting the outcome as a value
    pub async fn run(&self, archive_id: &str) -> ArchiveOutcome {
        if self.cancel.is_cancelled() {
            info!("Cancellation requested, not starting archive: {}", archive_id);
            return ArchiveOutcome::Cancelled {
                archive_id: archive_id.to_string(),
                documents: Vec::new(),
            };
        }

        match self.process(archive_id).await {
            Ok((documents, false)) => ArchiveOutcome::Completed {
                archive_id: archive_id.to_string(),
                documents,
            },
            Ok((documents, true)) => {
                info!(
                    "Archive {} stopped by cancellation after {} documents",
                    archive_id,
                    documents.len()
                );
                ArchiveOutcome::Cancelled {
                    archive_id: archive_id.to_string(),
                    documents,
                }
            },
            Err(error) => {
                error!(
                    "Failed to process archive {}, continuing with the others: {:#}",
                    archive_id, error
                );
                ArchiveOutcome::Failed {
                    archive_id: archive_id.to_string(),
                    error,
                }
            },
        }
    }

    async fn process(&self, archive_id: &str) -> Result<(Vec<DocumentRecord>, bool)> {
        let start_time = Instant::now();

        info!("Processing archive: {}", archive_id);

        // Step 1: Download to scratch
        let local_archive = layout::local_archive_path(&self.config.scratch_dir, archive_id);
        self.store
            .download_to(archive_id, &local_archive)
            .await
            .context("Failed to download archive")?;

        // Step 2: Unpack
        let unpack_path = layout::unpack_dir(&self.config.scratch_dir, archive_id);
        let (src, dest) = (local_archive.clone(), unpack_path.clone());
        let extracted = tokio::task::spawn_blocking(move || unpack::extract_archive(&src, &dest))
            .await
            .context("Unpack task failed")??;

        debug!("Unpacked {} files from {}", extracted, archive_id);

        // Step 3: Parse the index CSV
        let index_path =
            layout::index_file_path(&unpack_path, &self.config.index_file_prefix, archive_id);
        let extractor = MappingExtractor::new(self.config.csv_delimiter);
        let mappings = extractor
            .extract(&index_path)
            .context("Failed to parse archive index")?;

        info!("Extracted {} mappings from {}", mappings.len(), archive_id);

        // Step 4: Publish documents
        let total = mappings.len();
        let outcomes: Vec<DocOutcome> = stream::iter(mappings)
            .map(|mapping| self.publish_document(archive_id, &unpack_path, mapping))
            .buffered(self.config.document_degree())
            .collect()
            .await;

        let mut documents = Vec::new();
        let mut skipped = 0usize;
        let mut failed = 0usize;
        let mut cancelled = false;
        for outcome in outcomes {
            match outcome {
                DocOutcome::Published(record) => documents.push(record),
                DocOutcome::Skipped => skipped += 1,
                DocOutcome::Failed => failed += 1,
                DocOutcome::NotStarted => cancelled = true,
            }
        }

        info!(
            "Archive {} done: {} published, {} skipped, {} failed of {} in {:.2}s",
            archive_id,
            documents.len(),
            skipped,
            failed,
            total,
            start_time.elapsed().as_secs_f64()
        );

        Ok((documents, cancelled))
    }

    async fn publish_document(
        &self,
        archive_id: &str,
        unpack_path: &Path,
        mapping: MappingRecord,
    ) -> DocOutcome {
        if self.cancel.is_cancelled() {
            debug!("Cancellation requested, not starting document: {}", mapping.document_name);
            return DocOutcome::NotStarted;
        }

        if self.dedup_index.contains(&mapping.document_name) {
            info!("Document already published, skipping: {}", mapping.document_name);
            return DocOutcome::Skipped;
        }

        let local_path = unpack_path.join(&mapping.document_name);
        let key = layout::published_key(
            &self.config.published_prefix,
            &mapping.po_number,
            &mapping.document_name,
        );

        match self.store.upload_file(&local_path, &key).await {
            Ok(()) => {
                info!("Published {} from {}", key, archive_id);
                DocOutcome::Published(DocumentRecord::new(mapping.document_name, archive_id))
            },
            Err(e) => {
                warn!(
                    "Failed to publish {}, continuing with remaining documents: {:#}",
                    key, e
                );
                DocOutcome::Failed
            },
        }
    }
}
