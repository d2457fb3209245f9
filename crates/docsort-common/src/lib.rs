//! Docsort Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling and logging for the docsort workspace.
//!
//! # Overview
//!
//! This crate provides the functionality every docsort workspace member
//! relies on:
//!
//! - **Error Handling**: the shared [`DocsortError`] type and [`Result`] alias
//! - **Logging**: tracing-based logging configuration and initialization
//!
//! # Example
//!
//! ```no_run
//! use docsort_common::{Result, DocsortError};
//!
//! fn check_prefix(prefix: &str) -> Result<()> {
//!     if prefix.is_empty() {
//!         return Err(DocsortError::Config("empty key prefix".to_string()));
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{DocsortError, Result};
