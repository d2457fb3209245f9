//! Error types for docsort

use thiserror::Error;

/// Result type alias for docsort operations
pub type Result<T> = std::result::Result<T, DocsortError>;

/// Main error type for docsort
#[derive(Error, Debug)]
pub enum DocsortError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Index parse error: {0}")]
    IndexParse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
