//! Index CSV parsing
//!
//! Each archive carries an index CSV mapping the PDFs it contains to the
//! purchase order they belong to. A row lists one PO number and an
//! attachment-list field naming one or more PDFs by path; every trailing
//! `name.pdf` segment is a document of that PO.
//!
//! Rows without a PO number are producer-side noise: they are logged and
//! skipped without failing the archive.

use docsort_common::{DocsortError, Result};
use regex::Regex;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use tracing::warn;

const PO_NUMBER_COLUMN: &str = "PO Number";
const ATTACHMENT_LIST_COLUMN: &str = "Attachment List";
const PDF_NAME_PATTERN: &str = r"[^/]+\.pdf";

/// A parsed association between a document and its purchase order
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MappingRecord {
    /// Document file name as it appears inside the archive
    pub document_name: String,
    /// Purchase-order number the document is filed under
    pub po_number: String,
}

/// Parser for archive index CSV files
pub struct MappingExtractor {
    delimiter: u8,
}

impl MappingExtractor {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// Parse the index file at `index_path` into mapping records
    ///
    /// Record order follows the file; duplicate (document, PO) pairs are
    /// collapsed to the first occurrence.
    pub fn extract(&self, index_path: &Path) -> Result<Vec<MappingRecord>> {
        let file = std::fs::File::open(index_path).map_err(|e| {
            DocsortError::IndexParse(format!(
                "Failed to open index file {}: {}",
                index_path.display(),
                e
            ))
        })?;
        self.extract_from_reader(file, &index_path.display().to_string())
    }

    /// Parse index CSV content from any reader
    ///
    /// `source` only labels log lines and error messages.
    pub fn extract_from_reader<R: Read>(
        &self,
        reader: R,
        source: &str,
    ) -> Result<Vec<MappingRecord>> {
        let pdf_pattern = Regex::new(PDF_NAME_PATTERN)
            .map_err(|e| DocsortError::IndexParse(format!("Invalid PDF pattern: {}", e)))?;

        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader
            .headers()
            .map_err(|e| DocsortError::IndexParse(format!("Failed to read header: {}", e)))?
            .clone();

        let po_idx = column_index(&headers, PO_NUMBER_COLUMN, source)?;
        let attachments_idx = column_index(&headers, ATTACHMENT_LIST_COLUMN, source)?;

        let mut seen = HashSet::new();
        let mut mappings = Vec::new();

        for (row, record) in csv_reader.records().enumerate() {
            let record = record.map_err(|e| {
                DocsortError::IndexParse(format!("Malformed row in {}: {}", source, e))
            })?;
            // Header is row 1; data starts at row 2.
            let line = row + 2;

            let po_number = record.get(po_idx).unwrap_or("").trim();
            if po_number.is_empty() {
                warn!("PO Number not found. Line: {} File: {}", line, source);
                continue;
            }

            let attachment_list = record.get(attachments_idx).unwrap_or("");
            for pdf in pdf_pattern.find_iter(attachment_list) {
                let mapping = MappingRecord {
                    document_name: pdf.as_str().to_string(),
                    po_number: po_number.to_string(),
                };
                if seen.insert(mapping.clone()) {
                    mappings.push(mapping);
                }
            }
        }

        Ok(mappings)
    }
}

fn column_index(headers: &csv::StringRecord, name: &str, source: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| {
            DocsortError::IndexParse(format!("Missing column \"{}\" in {}", name, source))
        })
}
