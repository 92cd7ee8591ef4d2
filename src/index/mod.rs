//! Vector index over document chunks.
//!
//! [`VectorIndex`] is an append-only, exact (brute-force) nearest-neighbour
//! index. Exact search is plenty for a policy corpus of a few thousand
//! chunks and gives a deterministic ranking. [`SharedIndex`] wraps it for
//! process-wide use with one writer and many readers, and persists it as a
//! SQLite snapshot.

mod flat;
mod shared;
mod snapshot;

pub use flat::VectorIndex;
pub use shared::{IndexWriter, SharedIndex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where an indexed chunk came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Source document identifier.
    pub source: String,
    /// Position of the chunk within its document.
    pub chunk_index: usize,
    /// 1-based page the chunk starts on.
    pub page: u32,
    /// Char offset where the chunk starts.
    pub start: usize,
    /// Char offset one past the end of the chunk.
    pub end: usize,
    /// When the chunk was indexed.
    pub indexed_at: DateTime<Utc>,
}

/// An entry waiting to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEntry {
    pub embedding: Vec<f32>,
    pub text: String,
    pub metadata: EntryMetadata,
}

/// A stored entry. Immutable once inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    /// Insertion ordinal, dense from 0.
    pub id: u64,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// Chunk text.
    pub text: String,
    pub metadata: EntryMetadata,
}

/// A search match.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub entry: IndexEntry,
    /// Distance to the query under the index metric (lower is closer).
    pub distance: f32,
}

/// Per-document summary of indexed chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub source: String,
    pub chunk_count: usize,
    /// Highest page number seen for the document.
    pub pages: u32,
    pub indexed_at: DateTime<Utc>,
}

/// Distance metric used for ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// `1 - cosine similarity`, in `[0, 2]`.
    #[default]
    Cosine,
    /// Euclidean distance.
    L2,
}

impl Metric {
    /// Distance between two vectors of equal length.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Metric::Cosine => 1.0 - cosine_similarity(a, b),
            Metric::L2 => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt(),
        }
    }
}

impl std::str::FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cosine" => Ok(Metric::Cosine),
            "l2" | "euclidean" => Ok(Metric::L2),
            _ => Err(format!("Unknown distance metric: {}", s)),
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::Cosine => write!(f, "cosine"),
            Metric::L2 => write!(f, "l2"),
        }
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
