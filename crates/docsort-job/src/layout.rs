//! Local and remote path derivation
//!
//! Pure functions mapping an archive key to its scratch locations and a
//! mapping record to its published key. All naming conventions shared with
//! the archive producers live here.

use std::path::{Path, PathBuf};

/// File name component of an object key (text after the last `/`)
pub fn key_file_name(archive_key: &str) -> &str {
    archive_key.rsplit('/').next().unwrap_or(archive_key)
}

/// Archive base name without its extension
///
/// `invoices/zipA.zip` -> `zipA`
pub fn archive_stem(archive_key: &str) -> &str {
    let name = key_file_name(archive_key);
    match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    }
}

/// Local path an archive is downloaded to
pub fn local_archive_path(scratch_dir: &Path, archive_key: &str) -> PathBuf {
    scratch_dir.join(key_file_name(archive_key))
}

/// Directory an archive is unpacked into
///
/// Derived from the archive name so repeated runs reuse the same path and
/// sibling archives never collide.
pub fn unpack_dir(scratch_dir: &Path, archive_key: &str) -> PathBuf {
    scratch_dir.join(archive_stem(archive_key))
}

/// Path of the index CSV inside an archive's unpack directory
///
/// Follows the producer convention `{prefix}_{archiveBaseName}.csv`.
pub fn index_file_path(unpack_dir: &Path, index_prefix: &str, archive_key: &str) -> PathBuf {
    unpack_dir.join(format!("{}_{}.csv", index_prefix, archive_stem(archive_key)))
}

/// Destination key for a published document
pub fn published_key(published_prefix: &str, po_number: &str, document_name: &str) -> String {
    format!("{}/{}/{}", published_prefix, po_number, document_name)
}
