//! Process-wide index handle with single-writer, multi-reader access.

use super::{Metric, PendingEntry, SearchHit, SourceSummary, VectorIndex};
use crate::error::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{debug, instrument};

/// Shared handle to the vector index.
///
/// Readers take the `RwLock` for reading and run concurrently. Writers first
/// acquire the writer gate through [`SharedIndex::writer`], which serialises
/// every write operation end to end, and then take the `RwLock` for writing
/// only for the in-memory append or swap. The snapshot is written before the
/// in-memory index changes, so readers never see entries that are not on disk.
#[derive(Clone)]
pub struct SharedIndex {
    inner: Arc<Inner>,
}

struct Inner {
    index: RwLock<VectorIndex>,
    writer: Mutex<()>,
    path: Option<PathBuf>,
}

impl SharedIndex {
    /// Wrap an index that persists to `path`.
    pub fn new(index: VectorIndex, path: impl Into<PathBuf>) -> Self {
        Self::build(index, Some(path.into()))
    }

    /// Wrap an index that lives in memory only.
    pub fn in_memory(index: VectorIndex) -> Self {
        Self::build(index, None)
    }

    fn build(index: VectorIndex, path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Inner {
                index: RwLock::new(index),
                writer: Mutex::new(()),
                path,
            }),
        }
    }

    /// Snapshot location, if persistent.
    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    /// Search for the `k` nearest entries. Waits while a writer is mutating the index.
    pub async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        self.inner.index.read().await.search(query, k)
    }

    pub async fn len(&self) -> usize {
        self.inner.index.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.index.read().await.is_empty()
    }

    pub async fn metric(&self) -> Metric {
        self.inner.index.read().await.metric()
    }

    pub async fn sources(&self) -> Vec<SourceSummary> {
        self.inner.index.read().await.sources()
    }

    /// Acquire exclusive write access. Held until the returned writer is dropped.
    pub async fn writer(&self) -> IndexWriter<'_> {
        let gate = self.inner.writer.lock().await;
        debug!("Acquired index writer");
        IndexWriter {
            shared: self,
            _gate: gate,
        }
    }
}

/// Exclusive write access to a [`SharedIndex`].
pub struct IndexWriter<'a> {
    shared: &'a SharedIndex,
    _gate: MutexGuard<'a, ()>,
}

impl IndexWriter<'_> {
    /// Append entries and persist. All-or-nothing: on error neither the
    /// snapshot nor the in-memory index changes.
    #[instrument(skip(self, entries), fields(count = entries.len()))]
    pub async fn commit(&self, entries: Vec<PendingEntry>) -> Result<usize> {
        let inner = &self.shared.inner;

        let prepared = {
            let index = inner.index.read().await;
            let prepared = index.prepare(entries)?;
            if let Some(path) = &inner.path {
                super::snapshot::write(
                    path,
                    index.metric(),
                    index.dimensions().or(prepared.first().map(|e| e.embedding.len())),
                    index.entries().iter().chain(prepared.iter()),
                )?;
            }
            prepared
        };

        // The writer gate guarantees nobody appended since `prepare`.
        let count = prepared.len();
        inner.index.write().await.extend_prepared(prepared);
        Ok(count)
    }

    /// Replace the whole index and persist it.
    #[instrument(skip(self, index), fields(entries = index.len()))]
    pub async fn replace(&self, index: VectorIndex) -> Result<()> {
        let inner = &self.shared.inner;
        if let Some(path) = &inner.path {
            index.save(path)?;
        }
        *inner.index.write().await = index;
        Ok(())
    }

    /// Swap in an index that was just loaded from this handle's snapshot. Does not write.
    pub async fn restore(&self, index: VectorIndex) {
        *self.shared.inner.index.write().await = index;
    }

    /// Metric of the current index.
    pub async fn metric(&self) -> Metric {
        self.shared.metric().await
    }
}
