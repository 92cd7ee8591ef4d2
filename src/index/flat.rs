//! Brute-force vector index.

use super::{snapshot, IndexEntry, Metric, PendingEntry, SearchHit, SourceSummary};
use crate::error::{PolicyRagError, Result};
use std::collections::HashMap;
use std::path::Path;

/// Append-only collection of embedded chunks with exact top-k search.
///
/// The dimension is fixed by the first insert. Search scores every entry,
/// which is O(n·d) per query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorIndex {
    metric: Metric,
    dimensions: Option<usize>,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Create an empty index.
    pub fn new(metric: Metric) -> Self {
        Self {
            metric,
            dimensions: None,
            entries: Vec::new(),
        }
    }

    /// Rebuild an index from already-validated parts (used by snapshot loading).
    pub(super) fn from_parts(metric: Metric, dimensions: Option<usize>, entries: Vec<IndexEntry>) -> Self {
        Self {
            metric,
            dimensions,
            entries,
        }
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Vector dimension, `None` until the first insert.
    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Append entries. Either all entries are inserted or none are.
    ///
    /// Returns the number of entries added.
    pub fn insert(&mut self, entries: Vec<PendingEntry>) -> Result<usize> {
        let prepared = self.prepare(entries)?;
        let count = prepared.len();
        self.extend_prepared(prepared);
        Ok(count)
    }

    /// Validate entries and assign the ids they will get when appended next.
    pub(super) fn prepare(&self, entries: Vec<PendingEntry>) -> Result<Vec<IndexEntry>> {
        let mut expected = self.dimensions;
        for entry in &entries {
            let actual = entry.embedding.len();
            if actual == 0 {
                return Err(PolicyRagError::InvalidInput(
                    "cannot index an empty embedding".to_string(),
                ));
            }
            match expected {
                Some(expected) if expected != actual => {
                    return Err(PolicyRagError::DimensionMismatch { expected, actual });
                }
                None => expected = Some(actual),
                _ => {}
            }
        }

        let first_id = self.entries.len() as u64;
        Ok(entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| IndexEntry {
                id: first_id + i as u64,
                embedding: entry.embedding,
                text: entry.text,
                metadata: entry.metadata,
            })
            .collect())
    }

    /// Append entries produced by [`prepare`](Self::prepare) on this exact index state.
    pub(super) fn extend_prepared(&mut self, prepared: Vec<IndexEntry>) {
        debug_assert!(prepared
            .iter()
            .enumerate()
            .all(|(i, e)| e.id == (self.entries.len() + i) as u64));

        if let Some(first) = prepared.first() {
            self.dimensions.get_or_insert(first.embedding.len());
        }
        self.entries.extend(prepared);
    }

    /// Return the `k` entries closest to `query`, nearest first.
    ///
    /// Ties are broken by insertion order (earlier wins). Fewer than `k`
    /// entries returns all of them.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if self.entries.is_empty() {
            return Err(PolicyRagError::EmptyIndex);
        }
        if let Some(expected) = self.dimensions {
            if query.len() != expected {
                return Err(PolicyRagError::DimensionMismatch {
                    expected,
                    actual: query.len(),
                });
            }
        }

        let mut scored: Vec<(f32, usize)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (self.metric.distance(query, &entry.embedding), i))
            .collect();

        let by_distance_then_order =
            |a: &(f32, usize), b: &(f32, usize)| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1));

        let k = k.min(scored.len());
        if k == 0 {
            return Ok(Vec::new());
        }
        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, by_distance_then_order);
            scored.truncate(k);
        }
        scored.sort_unstable_by(by_distance_then_order);

        Ok(scored
            .into_iter()
            .map(|(distance, i)| SearchHit {
                entry: self.entries[i].clone(),
                distance,
            })
            .collect())
    }

    /// Summarise indexed chunks per source document, most recently indexed first.
    pub fn sources(&self) -> Vec<SourceSummary> {
        let mut by_source: HashMap<&str, SourceSummary> = HashMap::new();

        for entry in &self.entries {
            let meta = &entry.metadata;
            let summary = by_source
                .entry(meta.source.as_str())
                .or_insert_with(|| SourceSummary {
                    source: meta.source.clone(),
                    chunk_count: 0,
                    pages: 0,
                    indexed_at: meta.indexed_at,
                });

            summary.chunk_count += 1;
            summary.pages = summary.pages.max(meta.page);
            if meta.indexed_at > summary.indexed_at {
                summary.indexed_at = meta.indexed_at;
            }
        }

        let mut sources: Vec<SourceSummary> = by_source.into_values().collect();
        sources.sort_by(|a, b| b.indexed_at.cmp(&a.indexed_at).then(a.source.cmp(&b.source)));
        sources
    }

    /// Persist the full entry set to `path`, replacing any previous snapshot atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        snapshot::write(path, self.metric, self.dimensions, self.entries.iter())
    }

    /// Restore an index from a snapshot written by [`save`](Self::save).
    ///
    /// Fails with [`PolicyRagError::IndexLoad`] if the file is missing or corrupt.
    pub fn load(path: &Path) -> Result<Self> {
        snapshot::read(path)
    }
}
