//! Processed-state ledger
//!
//! Durable record of the archives and documents completed by prior runs,
//! stored as a JSON object in the same bucket the archives live in. The
//! ledger is the single source of truth for resumability: an archive or
//! document absent from it is attempted again.
//!
//! Field names match the ledgers written by the original distribution
//! tooling, so existing state remains readable.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::storage::{ObjectStore, UploadResult};

/// A completed document publication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Document file name as it appeared inside its archive
    #[serde(rename = "PdfFileName")]
    pub document_name: String,
    /// Source archive key
    #[serde(rename = "ZipFileName")]
    pub archive_id: String,
    /// Publication time
    #[serde(rename = "ProcessedTimestampUtc")]
    pub processed_at: DateTime<Utc>,
}

impl DocumentRecord {
    pub fn new(document_name: impl Into<String>, archive_id: impl Into<String>) -> Self {
        Self {
            document_name: document_name.into(),
            archive_id: archive_id.into(),
            processed_at: Utc::now(),
        }
    }
}

/// Durable record of completed work
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessedLedger {
    /// Keys of fully processed archives
    #[serde(rename = "ProcessedZips")]
    pub processed_archives: Vec<String>,
    /// Append-only log of completed document publications
    #[serde(rename = "ProcessedFiles")]
    pub processed_documents: Vec<DocumentRecord>,
}

impl ProcessedLedger {
    /// Whether an archive was fully processed by a prior run
    pub fn is_processed(&self, archive_id: &str) -> bool {
        self.processed_archives.iter().any(|a| a == archive_id)
    }

    /// Build the dedup index: the distinct document names in the log
    ///
    /// The index is a pre-run snapshot; it is never mutated while a run is
    /// in flight.
    pub fn build_index(&self) -> HashSet<String> {
        self.processed_documents
            .iter()
            .map(|d| d.document_name.clone())
            .collect()
    }

    /// Append newly completed archives and documents
    ///
    /// Archive ids already present are not duplicated; the document log is
    /// append-only and keeps whatever history it has.
    pub fn merge(&mut self, archives: Vec<String>, documents: Vec<DocumentRecord>) {
        for archive in archives {
            if !self.is_processed(&archive) {
                self.processed_archives.push(archive);
            }
        }
        self.processed_documents.extend(documents);
    }
}

/// Outcome of fetching the persisted ledger
///
/// `Missing` and `Corrupt` both fail open to an empty ledger, but they are
/// distinct conditions and are logged distinctly.
#[derive(Debug)]
pub enum LedgerLoad {
    Loaded(ProcessedLedger),
    Missing,
    Corrupt(String),
}

impl LedgerLoad {
    /// Resolve the load into a usable ledger, logging the fail-open branches
    pub fn into_ledger(self) -> ProcessedLedger {
        match self {
            LedgerLoad::Loaded(ledger) => {
                info!(
                    "Loaded ledger: {} archives, {} documents",
                    ledger.processed_archives.len(),
                    ledger.processed_documents.len()
                );
                ledger
            },
            LedgerLoad::Missing => {
                info!("No prior ledger found, starting from an empty ledger");
                ProcessedLedger::default()
            },
            LedgerLoad::Corrupt(reason) => {
                warn!("Ledger is unreadable, starting from an empty ledger: {}", reason);
                ProcessedLedger::default()
            },
        }
    }
}

/// Fetch the persisted ledger from the store
///
/// A missing key is a first run, not an error. A fetch failure also fails
/// open to `Missing`: redoing completed work is idempotent, aborting the
/// run is not.
pub async fn load(store: &dyn ObjectStore, ledger_key: &str) -> LedgerLoad {
    let bytes = match store.get(ledger_key).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return LedgerLoad::Missing,
        Err(e) => {
            warn!("Failed to fetch ledger {}: {}", ledger_key, e);
            return LedgerLoad::Missing;
        },
    };

    debug!("Fetched ledger {} ({} bytes)", ledger_key, bytes.len());

    match serde_json::from_slice(&bytes) {
        Ok(ledger) => LedgerLoad::Loaded(ledger),
        Err(e) => LedgerLoad::Corrupt(e.to_string()),
    }
}

/// Serialize and upload the ledger
///
/// Called once per run, after the fan-out has completed; a failure here is
/// fatal to the run's durability guarantee and is surfaced to the caller.
pub async fn persist(
    store: &dyn ObjectStore,
    ledger_key: &str,
    ledger: &ProcessedLedger,
) -> Result<UploadResult> {
    let bytes = serde_json::to_vec(ledger).context("Failed to serialize ledger")?;

    let result = store
        .upload_bytes(ledger_key, bytes)
        .await
        .with_context(|| format!("Failed to persist ledger to {}", ledger_key))?;

    info!(
        "Persisted ledger to {}: {} archives, {} documents ({} bytes)",
        ledger_key,
        ledger.processed_archives.len(),
        ledger.processed_documents.len(),
        result.size
    );

    Ok(result)
}
