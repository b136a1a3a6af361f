//! In-memory knowledge store implementation

use crate::{extract_text, DocumentFile, KnowledgeStore, RemoteChunk, TextChunker};
use async_trait::async_trait;
use cogni_core::{DocumentStats, Result, StoreCapability, StoreMetadata};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, RwLock};

/// One chunk with its pre-computed word set for keyword matching.
#[derive(Debug, Clone)]
struct StoredChunk {
    file_name: String,
    content: String,
    words: HashSet<String>,
}

/// In-memory implementation of the knowledge store.
///
/// Extraction and chunking run locally; ranking is keyword overlap. Suitable
/// for tests and local development; the production store ranks by embedding
/// similarity on the backend.
///
/// Thread-safe.
#[derive(Clone)]
pub struct InMemoryKnowledgeStore {
    chunks: Arc<RwLock<HashMap<String, Vec<StoredChunk>>>>,
    chunker: TextChunker,
}

impl InMemoryKnowledgeStore {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        Ok(Self {
            chunks: Arc::new(RwLock::new(HashMap::new())),
            chunker: TextChunker::new(chunk_size, overlap)?,
        })
    }
}

#[async_trait]
impl KnowledgeStore for InMemoryKnowledgeStore {
    fn metadata(&self) -> StoreMetadata {
        StoreMetadata::new(
            "in-memory",
            vec![
                StoreCapability::Ingest,
                StoreCapability::Search,
                StoreCapability::Stats,
                StoreCapability::Delete,
            ],
        )
    }

    async fn ingest(&self, tutor_id: &str, file: &DocumentFile) -> Result<()> {
        let text = extract_text(file)?;
        let pieces = self.chunker.chunk(&text);

        let mut chunks = self.chunks.write().unwrap();
        let entry = chunks.entry(tutor_id.to_string()).or_default();

        for content in pieces {
            entry.push(StoredChunk {
                file_name: file.file_name.clone(),
                words: extract_words(&content),
                content,
            });
        }

        Ok(())
    }

    async fn search(&self, tutor_id: &str, query: &str, limit: usize) -> Result<Vec<RemoteChunk>> {
        let query_words = extract_words(query);

        let chunks = self.chunks.read().unwrap();
        let Some(stored) = chunks.get(tutor_id) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<(usize, &StoredChunk)> = stored
            .iter()
            .map(|chunk| {
                let score = chunk.words.intersection(&query_words).count();
                (score, chunk)
            })
            .filter(|(score, _)| *score > 0)
            .collect();

        // Stable sort keeps insertion order among equally relevant chunks.
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, chunk)| RemoteChunk {
                id: None,
                source: chunk.file_name.clone(),
                text: chunk.content.clone(),
                page: None,
                section: None,
            })
            .collect())
    }

    async fn stats(&self, tutor_id: &str) -> Result<DocumentStats> {
        let chunks = self.chunks.read().unwrap();
        let Some(stored) = chunks.get(tutor_id) else {
            return Ok(DocumentStats::default());
        };

        let file_names: BTreeSet<String> =
            stored.iter().map(|chunk| chunk.file_name.clone()).collect();

        Ok(DocumentStats {
            total_chunks: stored.len(),
            total_files: file_names.len(),
            file_names: file_names.into_iter().collect(),
        })
    }

    async fn delete(&self, tutor_id: &str) -> Result<()> {
        let mut chunks = self.chunks.write().unwrap();
        chunks.remove(tutor_id);
        Ok(())
    }
}

/// Extract lowercase words from text for keyword matching.
fn extract_words(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|word| !word.is_empty())
        .collect()
}
