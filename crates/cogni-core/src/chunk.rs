use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Positional metadata attached to a document chunk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// A segment of an uploaded document.
///
/// Chunks are produced client-side for preview and testing, but the remote
/// store owns the authoritative copy along with any embedding it computes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentChunk {
    pub id: String,
    pub tutor_id: String,
    pub file_name: String,
    pub content: String,

    /// Produced and owned by the remote store, never computed locally.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    #[serde(default)]
    pub metadata: ChunkMetadata,
}

/// Ephemeral per-query result of a knowledge base search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagSearchResult {
    /// Ordered by relevance, exactly as returned by the remote store.
    pub chunks: Vec<DocumentChunk>,
    pub query: String,
    /// Chunk contents joined with blank-line separators, in chunk order.
    pub context: String,
}

impl RagSearchResult {
    /// Assemble a result from ranked chunks, preserving their order.
    pub fn assemble(query: impl Into<String>, chunks: Vec<DocumentChunk>) -> Self {
        let context = chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        Self {
            chunks,
            query: query.into(),
            context,
        }
    }
}

/// Best-effort summary of a tutor's knowledge base.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStats {
    pub total_chunks: usize,
    pub total_files: usize,
    pub file_names: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(content: &str) -> DocumentChunk {
        DocumentChunk {
            id: "c1".to_string(),
            tutor_id: "t1".to_string(),
            file_name: "notes.txt".to_string(),
            content: content.to_string(),
            embedding: None,
            metadata: ChunkMetadata::default(),
        }
    }

    #[test]
    fn test_context_joined_in_order() {
        let result = RagSearchResult::assemble("q", vec![chunk("first"), chunk("second")]);
        assert_eq!(result.context, "first\n\nsecond");
    }

    #[test]
    fn test_empty_result() {
        let result = RagSearchResult::assemble("q", vec![]);
        assert!(result.chunks.is_empty());
        assert_eq!(result.context, "");
    }
}
