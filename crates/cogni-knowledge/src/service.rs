//! Knowledge retrieval orchestrator

use crate::{DocumentFile, KnowledgeStore};
use chrono::Utc;
use cogni_core::{
    ChunkMetadata, DocumentChunk, DocumentStats, Error, RagSearchResult, Result, StoreCapability,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Orchestrates document ingestion and retrieval for tutors.
///
/// Holds no long-lived mutable state; the injected [`KnowledgeStore`] is the
/// sole source of truth for chunks and embeddings.
pub struct KnowledgeService {
    store: Arc<dyn KnowledgeStore>,
}

impl KnowledgeService {
    pub fn new(store: Arc<dyn KnowledgeStore>) -> Self {
        Self { store }
    }

    /// Forward an uploaded document to the store for ingestion.
    ///
    /// No partial-success state is tracked; a failed upload is reported and
    /// the caller decides whether to retry.
    pub async fn process_document(&self, tutor_id: &str, file: &DocumentFile) -> Result<()> {
        info!(tutor_id, file_name = %file.file_name, "ingesting document");
        self.store.ingest(tutor_id, file).await
    }

    /// Retrieve ranked context for a query.
    ///
    /// Chunk order is whatever the store returned (assumed
    /// relevance-descending); the orchestrator never re-ranks. Chunks missing
    /// a remote id get a synthetic `{tutor_id}_doc_{index}` one.
    pub async fn search_chunks(
        &self,
        tutor_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<RagSearchResult> {
        let remote = self.store.search(tutor_id, query, limit).await?;
        debug!(tutor_id, count = remote.len(), "search returned chunks");

        let now = Utc::now();
        let chunks = remote
            .into_iter()
            .enumerate()
            .map(|(index, chunk)| DocumentChunk {
                id: chunk
                    .id
                    .unwrap_or_else(|| format!("{tutor_id}_doc_{index}")),
                tutor_id: tutor_id.to_string(),
                file_name: chunk.source,
                content: chunk.text,
                embedding: None,
                metadata: ChunkMetadata {
                    page: chunk.page,
                    section: chunk.section,
                    timestamp: Some(now),
                },
            })
            .collect();

        Ok(RagSearchResult::assemble(query, chunks))
    }

    /// Delete all of a tutor's chunks.
    ///
    /// Stores that do not support deletion produce `Error::NotSupported`
    /// rather than a fabricated success.
    pub async fn delete_tutor_chunks(&self, tutor_id: &str) -> Result<()> {
        if !self.store.metadata().supports(StoreCapability::Delete) {
            return Err(Error::NotSupported(format!(
                "store '{}' does not support chunk deletion",
                self.store.metadata().name
            )));
        }
        self.store.delete(tutor_id).await
    }

    /// Best-effort knowledge base summary.
    ///
    /// Returns a zeroed summary when the store has no stats capability.
    pub async fn document_stats(&self, tutor_id: &str) -> Result<DocumentStats> {
        if !self.store.metadata().supports(StoreCapability::Stats) {
            debug!(tutor_id, "store has no stats capability, returning empty stats");
            return Ok(DocumentStats::default());
        }
        self.store.stats(tutor_id).await
    }
}
