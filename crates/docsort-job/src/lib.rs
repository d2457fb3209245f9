//! Docsort Job Library
//!
//! Redistributes archived business documents held in an S3 bucket: scans the
//! bucket for zip archives, unpacks each one, reads the deduction index CSV
//! inside it, and republishes every referenced PDF under a purchase-order
//! keyed prefix. A JSON ledger in the same bucket records completed archives
//! and documents so repeated runs never re-download, re-unpack, or
//! re-publish finished work.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use docsort_job::config::JobConfig;
//! use docsort_job::orchestrator::Orchestrator;
//! use docsort_job::storage::{S3Storage, StorageConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let storage = S3Storage::new(StorageConfig::from_env()?).await?;
//!     let orchestrator = Orchestrator::new(Arc::new(storage), JobConfig::from_env()?);
//!     let result = orchestrator.run().await?;
//!     println!("published {} documents", result.published_documents.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod layout;
pub mod ledger;
pub mod mapping;
pub mod orchestrator;
pub mod pipeline;
pub mod storage;
pub mod unpack;
