//! # Knowledge Retrieval
//!
//! RAG client for AI tutors: turns uploaded documents into a query-able
//! remote knowledge base and retrieves ranked context at chat time.
//!
//! ## Overview
//!
//! Text extraction and chunking run locally; embedding, ranking and storage
//! belong to the remote store behind the [`KnowledgeStore`] trait. Stores
//! advertise their optional capabilities (stats, deletion) up front so
//! callers negotiate instead of probing for missing endpoints.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cogni_knowledge::{DocumentFile, InMemoryKnowledgeStore, KnowledgeService};
//! use std::sync::Arc;
//!
//! # async fn example() -> cogni_core::Result<()> {
//! let store = Arc::new(InMemoryKnowledgeStore::new(1000, 200)?);
//! let service = KnowledgeService::new(store);
//!
//! let file = DocumentFile::new("notes.txt", b"Recursion is a function calling itself.".to_vec());
//! service.process_document("t1", &file).await?;
//!
//! let result = service.search_chunks("t1", "recursion", 5).await?;
//! println!("context for the prompt: {}", result.context);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use cogni_core::{DocumentStats, Result, StoreMetadata};
use serde::{Deserialize, Serialize};

mod chunker;
mod extract;
mod inmemory;
mod rest;
mod service;

pub use chunker::TextChunker;
pub use extract::{extract_text, DocumentFile};
pub use inmemory::InMemoryKnowledgeStore;
pub use rest::RestKnowledgeStore;
pub use service::KnowledgeService;

/// One ranked result as returned by a remote store.
///
/// Remote backends disagree on field names, so the wire shape accepts both
/// `source`/`file_name` and `text`/`content`, and the id is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteChunk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(alias = "file_name")]
    pub source: String,

    #[serde(alias = "content")]
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

/// Remote knowledge store collaborator.
///
/// The store is the sole source of truth for chunks and embeddings; each call
/// is independent and no long-lived mutable state is held client-side.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Store name and advertised capabilities.
    fn metadata(&self) -> StoreMetadata;

    /// Ingest a document into a tutor's knowledge base.
    async fn ingest(&self, tutor_id: &str, file: &DocumentFile) -> Result<()>;

    /// Return ranked chunks for a query, relevance-descending.
    async fn search(&self, tutor_id: &str, query: &str, limit: usize) -> Result<Vec<RemoteChunk>>;

    /// Summary of a tutor's knowledge base.
    async fn stats(&self, tutor_id: &str) -> Result<DocumentStats>;

    /// Delete all chunks for a tutor.
    async fn delete(&self, tutor_id: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_chunk_accepts_both_shapes() {
        let chunk: RemoteChunk =
            serde_json::from_str(r#"{"source": "notes.txt", "text": "Recursion is..."}"#).unwrap();
        assert_eq!(chunk.source, "notes.txt");
        assert_eq!(chunk.text, "Recursion is...");
        assert!(chunk.id.is_none());

        let chunk: RemoteChunk =
            serde_json::from_str(r#"{"id": "c1", "file_name": "notes.txt", "content": "..."}"#)
                .unwrap();
        assert_eq!(chunk.id.as_deref(), Some("c1"));
        assert_eq!(chunk.source, "notes.txt");
        assert_eq!(chunk.text, "...");
    }
}
