// Integration tests for knowledge retrieval
// These drive the service and the in-memory store together through the
// public API: upload, search, stats, delete.

use cogni_core::Error;
use cogni_knowledge::{DocumentFile, InMemoryKnowledgeStore, KnowledgeService};
use std::sync::Arc;

fn service() -> KnowledgeService {
    KnowledgeService::new(Arc::new(InMemoryKnowledgeStore::new(120, 24).unwrap()))
}

fn text_file(name: &str, content: &str) -> DocumentFile {
    DocumentFile::new(name, content.as_bytes().to_vec())
}

#[tokio::test]
async fn test_upload_then_search_assembles_context() {
    let service = service();

    service
        .process_document(
            "t1",
            &text_file("notes.txt", "Recursion is a function calling itself."),
        )
        .await
        .unwrap();
    service
        .process_document(
            "t1",
            &text_file("algebra.txt", "Matrices have rows and columns."),
        )
        .await
        .unwrap();

    let result = service.search_chunks("t1", "recursion", 5).await.unwrap();
    assert_eq!(result.chunks.len(), 1);
    assert_eq!(result.chunks[0].file_name, "notes.txt");
    assert_eq!(result.chunks[0].tutor_id, "t1");
    assert!(result.context.contains("Recursion"));
    assert!(!result.context.contains("Matrices"));
}

#[tokio::test]
async fn test_long_document_chunked_and_limit_honored() {
    let service = service();

    let text = "Recursion unwinds the call stack one frame at a time. ".repeat(30);
    service
        .process_document("t1", &text_file("long.txt", &text))
        .await
        .unwrap();

    let stats = service.document_stats("t1").await.unwrap();
    assert!(stats.total_chunks > 1);
    assert_eq!(stats.file_names, vec!["long.txt"]);

    let result = service.search_chunks("t1", "recursion", 3).await.unwrap();
    assert_eq!(result.chunks.len(), 3);
}

#[tokio::test]
async fn test_delete_removes_all_tutor_chunks() {
    let service = service();

    service
        .process_document("t1", &text_file("a.txt", "alpha beta"))
        .await
        .unwrap();
    service.delete_tutor_chunks("t1").await.unwrap();

    let stats = service.document_stats("t1").await.unwrap();
    assert_eq!(stats.total_chunks, 0);
    let result = service.search_chunks("t1", "alpha", 5).await.unwrap();
    assert!(result.chunks.is_empty());
}

#[tokio::test]
async fn test_tutors_are_isolated() {
    let service = service();

    service
        .process_document("t1", &text_file("notes.txt", "Recursion is..."))
        .await
        .unwrap();

    let result = service.search_chunks("t2", "recursion", 5).await.unwrap();
    assert!(result.chunks.is_empty());
    assert_eq!(result.context, "");
}

#[tokio::test]
async fn test_unsupported_upload_reports_file_type() {
    let service = service();

    let err = service
        .process_document("t1", &DocumentFile::new("photo.png", vec![0x89, 0x50]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedFileType(_)));

    // Nothing was ingested on the failed upload.
    let stats = service.document_stats("t1").await.unwrap();
    assert_eq!(stats.total_chunks, 0);
}
