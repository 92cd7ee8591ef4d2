//! Splitting policy documents into overlapping passages for retrieval.
//!
//! Chunks are fixed-size windows measured in chars. Each window starts
//! `chunk_size - overlap` chars after the previous one, so consecutive
//! chunks of a document share exactly `overlap` chars.

mod window;

pub use window::{chunk, Chunks, Window};

use crate::document::Document;
use crate::error::{PolicyRagError, Result};
use serde::{Deserialize, Serialize};

/// A passage of a document, the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Source identifier of the document this chunk came from.
    pub source: String,
    /// Position of this chunk within its document.
    pub index: usize,
    /// Text content.
    pub text: String,
    /// Char offset where the chunk starts in the document.
    pub start: usize,
    /// Char offset one past the end of the chunk.
    pub end: usize,
    /// 1-based page the chunk starts on.
    pub page: u32,
}

/// Configuration for chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Target chunk length in chars.
    pub chunk_size: usize,
    /// Chars shared with the previous chunk.
    pub overlap: usize,
}

impl ChunkingConfig {
    /// Check that `0 < overlap < chunk_size`.
    pub fn validate(&self) -> Result<()> {
        if self.overlap == 0 || self.overlap >= self.chunk_size {
            return Err(PolicyRagError::InvalidInput(format!(
                "chunk overlap must satisfy 0 < overlap < chunk_size (got overlap {}, chunk_size {})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

/// Fixed-window chunker.
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    /// Create a chunker, rejecting invalid size/overlap combinations.
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    /// Lazily split a document into chunks, in document order.
    pub fn chunk_document<'a>(&self, document: &'a Document) -> impl Iterator<Item = Chunk> + 'a {
        let windows = Chunks::new(&document.text, self.config.chunk_size, self.config.overlap);

        windows.enumerate().map(move |(index, window)| Chunk {
            source: document.source.clone(),
            index,
            text: window.text.to_string(),
            start: window.start,
            end: window.end,
            page: document.page_at(window.start),
        })
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            config: ChunkingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        assert!(ChunkingConfig { chunk_size: 10, overlap: 2 }.validate().is_ok());
        assert!(ChunkingConfig { chunk_size: 10, overlap: 0 }.validate().is_err());
        assert!(ChunkingConfig { chunk_size: 10, overlap: 10 }.validate().is_err());
        assert!(Chunker::new(ChunkingConfig { chunk_size: 5, overlap: 7 }).is_err());
    }

    #[test]
    fn test_chunk_document_tracks_pages() {
        let doc = Document::from_pages("policy.pdf", &["aaaaaaaaaa", "bbbbbbbbbb", "cccccccccc"]);
        let chunker = Chunker::new(ChunkingConfig { chunk_size: 12, overlap: 4 }).unwrap();

        let chunks: Vec<Chunk> = chunker.chunk_document(&doc).collect();

        assert_eq!(chunks[0].page, 1);
        assert_eq!(chunks[0].start, 0);
        assert_eq!(chunks[1].start, 8);
        assert_eq!(chunks[1].page, 1);
        assert_eq!(chunks[2].start, 16);
        assert_eq!(chunks[2].page, 2);
        assert!(chunks.iter().all(|c| c.source == "policy.pdf"));
        assert!(chunks.iter().enumerate().all(|(i, c)| c.index == i));
        assert_eq!(chunks.last().unwrap().end, doc.text.chars().count());
    }

    #[test]
    fn test_blank_document_yields_no_chunks() {
        let doc = Document::new("empty.txt", "");
        assert_eq!(Chunker::default().chunk_document(&doc).count(), 0);
    }
}
