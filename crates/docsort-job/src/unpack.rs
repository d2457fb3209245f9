//! Archive extraction
//!
//! Unpacks a downloaded zip archive into a local directory. Extraction is
//! synchronous; async callers run it on a blocking thread.

use docsort_common::{DocsortError, Result};
use std::fs::File;
use std::io;
use std::path::Path;
use tracing::debug;

/// Extract every file in `archive_path` into `dest_dir`, overwriting
/// existing contents
///
/// Entries whose names escape `dest_dir` are rejected. Returns the number
/// of files written.
pub fn extract_archive(archive_path: &Path, dest_dir: &Path) -> Result<usize> {
    let file = File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| {
        DocsortError::Archive(format!(
            "Failed to read zip archive {}: {}",
            archive_path.display(),
            e
        ))
    })?;

    std::fs::create_dir_all(dest_dir)?;

    let mut extracted = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| {
            DocsortError::Archive(format!("Failed to read zip entry at index {}: {}", i, e))
        })?;

        if entry.is_dir() {
            continue;
        }

        let relative = entry.enclosed_name().ok_or_else(|| {
            DocsortError::Archive(format!("Unsafe path in zip entry: {}", entry.name()))
        })?;
        let dest_path = dest_dir.join(relative);

        if let Some(parent) = dest_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut out = File::create(&dest_path)?;
        io::copy(&mut entry, &mut out)?;
        debug!("Extracted {} ({} bytes)", dest_path.display(), entry.size());

        extracted += 1;
    }

    debug!(
        "Extracted {} files from {} into {}",
        extracted,
        archive_path.display(),
        dest_dir.display()
    );

    Ok(extracted)
}
