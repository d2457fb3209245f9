//! Shared test fixtures: an in-memory object store with call recording and
//! builders for archive/ledger objects.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Mutex;
use zip::write::SimpleFileOptions;

use docsort_job::layout;
use docsort_job::ledger::{DocumentRecord, ProcessedLedger};
use docsort_job::storage::{ObjectStore, UploadResult};

/// In-memory [`ObjectStore`] recording every fetch and upload key, with
/// per-key failure injection.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    fetches: Mutex<Vec<String>>,
    uploads: Mutex<Vec<String>>,
    failing_fetches: Mutex<HashSet<String>>,
    failing_uploads: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, data: Vec<u8>) {
        self.objects.lock().unwrap().insert(key.to_string(), data);
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn has_object(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    /// Keys fetched via `get`/`download_to`, in call order
    pub fn fetched_keys(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }

    /// Archive keys fetched, ignoring ledger reads
    pub fn fetched_archives(&self) -> Vec<String> {
        self.fetched_keys()
            .into_iter()
            .filter(|k| k.ends_with(".zip"))
            .collect()
    }

    /// Keys uploaded via `upload_file`/`upload_bytes`, in call order
    pub fn uploaded_keys(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn fail_fetch(&self, key: &str) {
        self.failing_fetches.lock().unwrap().insert(key.to_string());
    }

    pub fn fail_upload(&self, key: &str) {
        self.failing_uploads.lock().unwrap().insert(key.to_string());
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.fetches.lock().unwrap().push(key.to_string());
        if self.failing_fetches.lock().unwrap().contains(key) {
            return Err(anyhow!("injected fetch failure for {}", key));
        }
        Ok(self.objects.lock().unwrap().get(key).cloned())
    }

    async fn download_to(&self, key: &str, dest: &Path) -> Result<()> {
        let data = self
            .get(key)
            .await?
            .ok_or_else(|| anyhow!("object not found: {}", key))?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, data).await?;
        Ok(())
    }

    async fn upload_file(&self, source: &Path, key: &str) -> Result<()> {
        if self.failing_uploads.lock().unwrap().contains(key) {
            return Err(anyhow!("injected upload failure for {}", key));
        }
        // Mirrors the production store: a missing local path is a warned
        // no-op, not an error.
        if !source.exists() {
            return Ok(());
        }
        let data = std::fs::read(source)?;
        self.objects.lock().unwrap().insert(key.to_string(), data);
        self.uploads.lock().unwrap().push(key.to_string());
        Ok(())
    }

    async fn upload_bytes(&self, key: &str, data: Vec<u8>) -> Result<UploadResult> {
        if self.failing_uploads.lock().unwrap().contains(key) {
            return Err(anyhow!("injected upload failure for {}", key));
        }
        let size = data.len() as i64;
        self.objects.lock().unwrap().insert(key.to_string(), data);
        self.uploads.lock().unwrap().push(key.to_string());
        Ok(UploadResult {
            key: key.to_string(),
            checksum: String::new(),
            size,
        })
    }
}

/// Build a zip archive holding an index CSV plus document files
///
/// `documents` pairs a PDF name with its PO number; each PDF's content is
/// its own name, which lets tests assert published bytes end to end.
pub fn build_archive(archive_key: &str, documents: &[(&str, &str)]) -> Vec<u8> {
    let mut csv = String::from("PO Number,Attachment List\n");
    for (name, po) in documents {
        csv.push_str(&format!("{},attachments/{}\n", po, name));
    }

    let files: Vec<(String, Vec<u8>)> = documents
        .iter()
        .map(|(name, _)| (name.to_string(), name.as_bytes().to_vec()))
        .collect();

    build_archive_with_index(archive_key, &csv, &files)
}

/// Build a zip archive with explicit index content and file entries
pub fn build_archive_with_index(
    archive_key: &str,
    index_csv: &str,
    files: &[(String, Vec<u8>)],
) -> Vec<u8> {
    let index_name = format!("Komar_Deduction_{}.csv", layout::archive_stem(archive_key));

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file(index_name, SimpleFileOptions::default())
        .unwrap();
    writer.write_all(index_csv.as_bytes()).unwrap();

    for (name, data) in files {
        writer
            .start_file(name.clone(), SimpleFileOptions::default())
            .unwrap();
        writer.write_all(data).unwrap();
    }

    writer.finish().unwrap().into_inner()
}

/// Serialize a ledger the way a prior run would have persisted it
pub fn ledger_bytes(archives: &[&str], documents: &[(&str, &str)]) -> Vec<u8> {
    let ledger = ProcessedLedger {
        processed_archives: archives.iter().map(|a| a.to_string()).collect(),
        processed_documents: documents
            .iter()
            .map(|(name, archive)| DocumentRecord::new(*name, *archive))
            .collect(),
    };
    serde_json::to_vec(&ledger).unwrap()
}

/// Parse the ledger object a run persisted
pub fn parse_ledger(store: &MemoryStore, key: &str) -> ProcessedLedger {
    let bytes = store.object(key).expect("ledger object missing");
    serde_json::from_slice(&bytes).expect("ledger object unreadable")
}
