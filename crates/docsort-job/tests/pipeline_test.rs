//! Archive pipeline tests against the in-memory store

mod common;

use common::{build_archive, build_archive_with_index, MemoryStore};
use docsort_job::config::JobConfig;
use docsort_job::pipeline::{ArchiveOutcome, ArchivePipeline};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn test_config(scratch: &tempfile::TempDir) -> JobConfig {
    JobConfig::default()
        .with_scratch_dir(scratch.path().join("scratch"))
        .with_archive_concurrency(1)
        .with_document_concurrency(1)
}

fn pipeline_with_index(
    store: Arc<MemoryStore>,
    config: JobConfig,
    index: HashSet<String>,
) -> ArchivePipeline {
    ArchivePipeline::new(store, config, Arc::new(index), CancellationToken::new())
}

#[tokio::test]
async fn test_completed_archive_publishes_documents() {
    let scratch = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    store.insert(
        "zipA.zip",
        build_archive("zipA.zip", &[("doc1.pdf", "4000"), ("doc2.pdf", "5000")]),
    );

    let pipeline = pipeline_with_index(store.clone(), test_config(&scratch), HashSet::new());
    let outcome = pipeline.run("zipA.zip").await;

    match outcome {
        ArchiveOutcome::Completed {
            archive_id,
            documents,
        } => {
            assert_eq!(archive_id, "zipA.zip");
            assert_eq!(documents.len(), 2);
            assert_eq!(documents[0].document_name, "doc1.pdf");
            assert_eq!(documents[0].archive_id, "zipA.zip");
        },
        other => panic!("expected Completed, got {:?}", other),
    }

    // Destination keys follow {prefix}/{po}/{document} and carry the bytes
    // unpacked from the archive.
    assert_eq!(
        store.object("by-po/4000/doc1.pdf").as_deref(),
        Some(b"doc1.pdf".as_slice())
    );
    assert_eq!(
        store.object("by-po/5000/doc2.pdf").as_deref(),
        Some(b"doc2.pdf".as_slice())
    );
}

#[tokio::test]
async fn test_indexed_document_skipped_without_publish() {
    let scratch = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    store.insert(
        "zipA.zip",
        build_archive("zipA.zip", &[("doc1.pdf", "4000"), ("doc2.pdf", "4000")]),
    );

    let index: HashSet<String> = ["doc1.pdf".to_string()].into_iter().collect();
    let pipeline = pipeline_with_index(store.clone(), test_config(&scratch), index);
    let outcome = pipeline.run("zipA.zip").await;

    match outcome {
        ArchiveOutcome::Completed { documents, .. } => {
            assert_eq!(documents.len(), 1);
            assert_eq!(documents[0].document_name, "doc2.pdf");
        },
        other => panic!("expected Completed, got {:?}", other),
    }

    assert!(!store.has_object("by-po/4000/doc1.pdf"));
    assert!(store.has_object("by-po/4000/doc2.pdf"));
}

#[tokio::test]
async fn test_download_failure_is_archive_failure() {
    let scratch = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    store.insert("zipA.zip", build_archive("zipA.zip", &[("doc1.pdf", "4000")]));
    store.fail_fetch("zipA.zip");

    let pipeline = pipeline_with_index(store.clone(), test_config(&scratch), HashSet::new());
    let outcome = pipeline.run("zipA.zip").await;

    assert!(matches!(outcome, ArchiveOutcome::Failed { .. }));
    assert!(store.uploaded_keys().is_empty());
}

#[tokio::test]
async fn test_missing_index_is_archive_failure() {
    let scratch = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    // Archive whose index file does not follow the naming convention.
    store.insert(
        "zipA.zip",
        build_archive_with_index("other.zip", "PO Number,Attachment List\n", &[]),
    );

    let pipeline = pipeline_with_index(store.clone(), test_config(&scratch), HashSet::new());
    let outcome = pipeline.run("zipA.zip").await;

    assert!(matches!(outcome, ArchiveOutcome::Failed { .. }));
}

#[tokio::test]
async fn test_document_failure_archive_still_completed() {
    let scratch = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    store.insert(
        "zipA.zip",
        build_archive("zipA.zip", &[("doc1.pdf", "4000"), ("doc2.pdf", "4000")]),
    );
    store.fail_upload("by-po/4000/doc1.pdf");

    let pipeline = pipeline_with_index(store.clone(), test_config(&scratch), HashSet::new());
    let outcome = pipeline.run("zipA.zip").await;

    // The failed document is absent from the completions but the archive
    // still counts as processed once every entry was attempted.
    match outcome {
        ArchiveOutcome::Completed { documents, .. } => {
            assert_eq!(documents.len(), 1);
            assert_eq!(documents[0].document_name, "doc2.pdf");
        },
        other => panic!("expected Completed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unlisted_local_document_is_noop_upload() {
    let scratch = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    // Index references ghost.pdf but the archive does not contain it.
    store.insert(
        "zipA.zip",
        build_archive_with_index(
            "zipA.zip",
            "PO Number,Attachment List\n4000,attachments/ghost.pdf\n",
            &[],
        ),
    );

    let pipeline = pipeline_with_index(store.clone(), test_config(&scratch), HashSet::new());
    let outcome = pipeline.run("zipA.zip").await;

    // Upload of a missing local path is a warned no-op; the document is
    // still recorded as attempted-and-completed.
    match outcome {
        ArchiveOutcome::Completed { documents, .. } => {
            assert_eq!(documents.len(), 1);
            assert_eq!(documents[0].document_name, "ghost.pdf");
        },
        other => panic!("expected Completed, got {:?}", other),
    }
    assert!(!store.has_object("by-po/4000/ghost.pdf"));
}

#[tokio::test]
async fn test_cancelled_token_prevents_start() {
    let scratch = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    store.insert("zipA.zip", build_archive("zipA.zip", &[("doc1.pdf", "4000")]));

    let cancel = CancellationToken::new();
    cancel.cancel();

    let pipeline = ArchivePipeline::new(
        store.clone(),
        test_config(&scratch),
        Arc::new(HashSet::new()),
        cancel,
    );
    let outcome = pipeline.run("zipA.zip").await;

    match outcome {
        ArchiveOutcome::Cancelled { documents, .. } => assert!(documents.is_empty()),
        other => panic!("expected Cancelled, got {:?}", other),
    }
    assert!(store.fetched_archives().is_empty());
}

#[tokio::test]
async fn test_document_order_preserved_per_archive() {
    let scratch = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    store.insert(
        "zipA.zip",
        build_archive(
            "zipA.zip",
            &[("a.pdf", "1"), ("b.pdf", "2"), ("c.pdf", "3")],
        ),
    );

    let config = test_config(&scratch).with_document_concurrency(4);
    let pipeline = pipeline_with_index(store.clone(), config, HashSet::new());
    let outcome = pipeline.run("zipA.zip").await;

    match outcome {
        ArchiveOutcome::Completed { documents, .. } => {
            let names: Vec<_> = documents.iter().map(|d| d.document_name.as_str()).collect();
            assert_eq!(names, vec!["a.pdf", "b.pdf", "c.pdf"]);
        },
        other => panic!("expected Completed, got {:?}", other),
    }
}
