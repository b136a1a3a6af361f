//! Text chunking
//!
//! Greedy sliding-window split with overlap. A pure function of
//! `(text, chunk_size, overlap)`, so re-chunking the same input always yields
//! the same boundaries.

use cogni_core::{Error, Result};

/// Splits text into overlapping chunks for retrieval.
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
}

impl TextChunker {
    /// Create a chunker. `overlap` must be strictly smaller than `chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::config_error("chunk size must be positive"));
        }
        if overlap >= chunk_size {
            return Err(Error::config_error(format!(
                "overlap ({overlap}) must be smaller than chunk size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    /// Split `text` into chunks of at most `chunk_size` characters.
    ///
    /// When the right edge falls mid-document, the cut backs off to the last
    /// sentence or line boundary at or after the chunk's midpoint, so chunks
    /// avoid ending mid-sentence. Each subsequent chunk starts `overlap`
    /// characters before the previous chunk's end. Chunks that are empty
    /// after trimming are dropped.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let hard_end = (start + self.chunk_size).min(chars.len());
            let end = if hard_end < chars.len() {
                back_off(&chars, start + self.chunk_size / 2, hard_end)
            } else {
                hard_end
            };

            let chunk: String = chars[start..end].iter().collect();
            let trimmed = chunk.trim();
            if !trimmed.is_empty() {
                chunks.push(trimmed.to_string());
            }

            if end >= chars.len() {
                break;
            }

            // Slide back by the overlap, guarding against non-progress when
            // the overlap eats the whole advance.
            let next = end.saturating_sub(self.overlap);
            start = if next > start { next } else { end };
        }

        chunks
    }
}

/// Find the cut position: one past the last sentence or line boundary in
/// `(midpoint, hard_end]`, or `hard_end` when no boundary exists there.
fn back_off(chars: &[char], midpoint: usize, hard_end: usize) -> usize {
    let mut i = hard_end;
    while i > midpoint {
        if matches!(chars[i - 1], '.' | '!' | '?' | '\n') {
            return i;
        }
        i -= 1;
    }
    hard_end
}
