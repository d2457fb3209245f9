//! Job configuration
//!
//! Knobs for a redistribution run: scratch location, fan-out degrees, and
//! the naming conventions shared with the archive producers.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for a redistribution job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Local scratch directory for downloaded and unpacked archives
    pub scratch_dir: PathBuf,
    /// Maximum number of archives processed concurrently (1 = sequential)
    pub archive_concurrency: usize,
    /// Maximum number of documents published concurrently per archive
    pub document_concurrency: usize,
    /// Key prefix documents are republished under
    pub published_prefix: String,
    /// Object key of the processed-state ledger
    pub ledger_key: String,
    /// File name prefix of the index CSV inside each archive
    pub index_file_prefix: String,
    /// Delimiter of the index CSV
    pub csv_delimiter: u8,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            scratch_dir: PathBuf::from("./scratch"),
            archive_concurrency: 4,
            document_concurrency: 8,
            published_prefix: "by-po".to_string(),
            ledger_key: "metadata.json".to_string(),
            index_file_prefix: "Komar_Deduction".to_string(),
            csv_delimiter: b',',
        }
    }
}

impl JobConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `DOCSORT_SCRATCH_DIR`: Local scratch directory
    /// - `DOCSORT_ARCHIVE_CONCURRENCY`: Concurrent archives (min 1)
    /// - `DOCSORT_DOCUMENT_CONCURRENCY`: Concurrent documents per archive (min 1)
    /// - `DOCSORT_PUBLISHED_PREFIX`: Destination key prefix
    /// - `DOCSORT_LEDGER_KEY`: Ledger object key
    /// - `DOCSORT_INDEX_PREFIX`: Index CSV file name prefix
    /// - `DOCSORT_CSV_DELIMITER`: Index CSV delimiter (single character)
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("DOCSORT_SCRATCH_DIR") {
            config.scratch_dir = PathBuf::from(dir);
        }

        if let Ok(n) = std::env::var("DOCSORT_ARCHIVE_CONCURRENCY") {
            config.archive_concurrency = n
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid DOCSORT_ARCHIVE_CONCURRENCY: {}", n))?;
        }

        if let Ok(n) = std::env::var("DOCSORT_DOCUMENT_CONCURRENCY") {
            config.document_concurrency = n
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid DOCSORT_DOCUMENT_CONCURRENCY: {}", n))?;
        }

        if let Ok(prefix) = std::env::var("DOCSORT_PUBLISHED_PREFIX") {
            config.published_prefix = prefix;
        }

        if let Ok(key) = std::env::var("DOCSORT_LEDGER_KEY") {
            config.ledger_key = key;
        }

        if let Ok(prefix) = std::env::var("DOCSORT_INDEX_PREFIX") {
            config.index_file_prefix = prefix;
        }

        if let Ok(delim) = std::env::var("DOCSORT_CSV_DELIMITER") {
            let mut bytes = delim.bytes();
            match (bytes.next(), bytes.next()) {
                (Some(b), None) => config.csv_delimiter = b,
                _ => anyhow::bail!("DOCSORT_CSV_DELIMITER must be a single character"),
            }
        }

        Ok(config)
    }

    /// Set the scratch directory
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    /// Set the archive fan-out degree
    pub fn with_archive_concurrency(mut self, degree: usize) -> Self {
        self.archive_concurrency = degree;
        self
    }

    /// Set the per-archive document fan-out degree
    pub fn with_document_concurrency(mut self, degree: usize) -> Self {
        self.document_concurrency = degree;
        self
    }

    /// Set the destination key prefix
    pub fn with_published_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.published_prefix = prefix.into();
        self
    }

    /// Set the ledger object key
    pub fn with_ledger_key(mut self, key: impl Into<String>) -> Self {
        self.ledger_key = key.into();
        self
    }

    /// Set the index CSV file name prefix
    pub fn with_index_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.index_file_prefix = prefix.into();
        self
    }

    /// Archive fan-out degree, clamped to at least 1
    pub fn archive_degree(&self) -> usize {
        self.archive_concurrency.max(1)
    }

    /// Document fan-out degree, clamped to at least 1
    pub fn document_degree(&self) -> usize {
        self.document_concurrency.max(1)
    }
}
