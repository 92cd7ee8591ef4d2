//! Policy documents and the sources they are loaded from.
//!
//! A [`Document`] is the raw text of one policy file together with the char
//! offsets at which its pages start. Documents only live long enough to be
//! chunked; the index keeps the derived chunks.

mod loader;

pub use loader::{collect_paths, DocumentSource, FileSource};

use serde::{Deserialize, Serialize};

/// Raw text of a policy document with page boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Source identifier (file path or upload name).
    pub source: String,
    /// Full text, pages concatenated in order.
    pub text: String,
    /// Char offset at which each page starts. Always begins with 0 for a paged document.
    pub page_starts: Vec<usize>,
}

impl Document {
    /// Create a single-page document.
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
            page_starts: vec![0],
        }
    }

    /// Create a document from the text of its pages.
    ///
    /// Pages are joined with a newline so words never fuse across page breaks.
    pub fn from_pages<S: AsRef<str>>(source: impl Into<String>, pages: &[S]) -> Self {
        let mut text = String::new();
        let mut page_starts = Vec::with_capacity(pages.len());
        let mut offset = 0;

        for (i, page) in pages.iter().enumerate() {
            if i > 0 {
                text.push('\n');
                offset += 1;
            }
            page_starts.push(offset);
            let page = page.as_ref();
            text.push_str(page);
            offset += page.chars().count();
        }

        Self {
            source: source.into(),
            text,
            page_starts,
        }
    }

    /// Build a document from uploaded bytes, picking the extractor from the file name.
    pub fn from_upload(name: &str, bytes: &[u8]) -> crate::error::Result<Self> {
        loader::parse_bytes(name, bytes)
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.page_starts.len().max(1)
    }

    /// 1-based page number containing the given char offset.
    pub fn page_at(&self, char_offset: usize) -> u32 {
        let idx = self.page_starts.partition_point(|&start| start <= char_offset);
        idx.max(1) as u32
    }

    /// Whether the document has no text worth indexing.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}
