//! Ingestion pipeline: chunk, embed and index policy documents.
//!
//! Every write to the shared index goes through the pipeline while holding
//! the index writer, so uploads, rebuilds and the cold-start load never
//! interleave.

use crate::chunking::{Chunk, Chunker};
use crate::document::Document;
use crate::embedding::{Embedder, RetryPolicy};
use crate::error::{PolicyRagError, Result};
use crate::index::{EntryMetadata, IndexWriter, Metric, PendingEntry, SharedIndex, VectorIndex};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// How the index was brought up by [`IngestionPipeline::open_or_rebuild`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColdStart {
    /// Restored from the snapshot with this many entries.
    Loaded(usize),
    /// Snapshot missing or unreadable; rebuilt from source documents.
    Rebuilt(usize),
    /// Nothing to load and no source documents configured.
    Empty,
}

impl ColdStart {
    pub fn entries(&self) -> usize {
        match self {
            ColdStart::Loaded(n) | ColdStart::Rebuilt(n) => *n,
            ColdStart::Empty => 0,
        }
    }
}

/// Chunker → Embedder → index insert → save.
pub struct IngestionPipeline {
    chunker: Chunker,
    embedder: Arc<dyn Embedder>,
    index: SharedIndex,
    retry: RetryPolicy,
}

impl IngestionPipeline {
    pub fn new(chunker: Chunker, embedder: Arc<dyn Embedder>, index: SharedIndex) -> Self {
        Self {
            chunker,
            embedder,
            index,
            retry: RetryPolicy::default(),
        }
    }

    /// Set how embedding calls recover from transient failures.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn index(&self) -> &SharedIndex {
        &self.index
    }

    /// Add a document to the index and persist it.
    ///
    /// All-or-nothing: on error the snapshot and the in-memory index are
    /// unchanged and the error is wrapped in [`PolicyRagError::Ingestion`].
    /// Returns the number of chunks added; a document without text adds none
    /// and does not touch the snapshot.
    #[instrument(skip(self, document), fields(source = %document.source))]
    pub async fn ingest(&self, document: &Document) -> Result<usize> {
        let writer = self.index.writer().await;
        self.ingest_with(&writer, document)
            .await
            .map_err(|e| PolicyRagError::ingestion(&document.source, e))
    }

    /// Ingest documents one after another, returning the chunks added per document.
    ///
    /// Stops at the first failure; documents before it stay indexed.
    pub async fn ingest_all(&self, documents: &[Document]) -> Result<Vec<usize>> {
        let mut counts = Vec::with_capacity(documents.len());
        for document in documents {
            counts.push(self.ingest(document).await?);
        }
        Ok(counts)
    }

    /// Replace the index with one built from `documents` only.
    ///
    /// The new index is built off to the side; readers keep searching the old
    /// one until it is swapped in. Returns the number of entries.
    #[instrument(skip(self, documents), fields(documents = documents.len()))]
    pub async fn rebuild(&self, documents: &[Document], metric: Metric) -> Result<usize> {
        let writer = self.index.writer().await;
        self.rebuild_with(&writer, documents, metric).await
    }

    /// Load the snapshot at the index path; if it is missing or corrupt,
    /// rebuild from the documents returned by `load_documents`.
    ///
    /// Documents are only loaded when a rebuild is needed. An in-memory index
    /// is always rebuilt.
    pub async fn open_or_rebuild<F, Fut>(&self, load_documents: F) -> Result<ColdStart>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Document>>>,
    {
        let writer = self.index.writer().await;
        let metric = writer.metric().await;

        if let Some(path) = self.index.path() {
            match VectorIndex::load(path) {
                Ok(loaded) => {
                    let entries = loaded.len();
                    if loaded.metric() != metric {
                        warn!(
                            "Index at {} uses {} distance; ignoring configured {}",
                            path.display(),
                            loaded.metric(),
                            metric
                        );
                    }
                    writer.restore(loaded).await;
                    info!("Loaded index with {} entries from {}", entries, path.display());
                    return Ok(ColdStart::Loaded(entries));
                }
                Err(e @ PolicyRagError::IndexLoad { .. }) => {
                    warn!("{}; rebuilding from source documents", e);
                }
                Err(e) => return Err(e),
            }
        }

        let documents = load_documents().await?;
        if documents.is_empty() {
            info!("No source documents configured, starting with an empty knowledge base");
            return Ok(ColdStart::Empty);
        }

        let entries = self.rebuild_with(&writer, &documents, metric).await?;
        Ok(ColdStart::Rebuilt(entries))
    }

    async fn ingest_with(&self, writer: &IndexWriter<'_>, document: &Document) -> Result<usize> {
        let entries = self.embed_document(document).await?;
        if entries.is_empty() {
            info!("{} has no text, nothing to index", document.source);
            return Ok(0);
        }

        let added = writer.commit(entries).await?;
        info!("Indexed {} chunks from {}", added, document.source);
        Ok(added)
    }

    async fn rebuild_with(
        &self,
        writer: &IndexWriter<'_>,
        documents: &[Document],
        metric: Metric,
    ) -> Result<usize> {
        let mut fresh = VectorIndex::new(metric);
        for document in documents {
            let entries = self
                .embed_document(document)
                .await
                .map_err(|e| PolicyRagError::ingestion(&document.source, e))?;
            fresh
                .insert(entries)
                .map_err(|e| PolicyRagError::ingestion(&document.source, e))?;
        }

        let total = fresh.len();
        writer.replace(fresh).await?;
        info!("Rebuilt index from {} documents ({} chunks)", documents.len(), total);
        Ok(total)
    }

    /// Chunk and embed a document without touching the index.
    async fn embed_document(&self, document: &Document) -> Result<Vec<PendingEntry>> {
        let chunks: Vec<Chunk> = self.chunker.chunk_document(document).collect();
        if chunks.is_empty() {
            return Ok(Vec::new());
        }
        debug!("Split {} into {} chunks", document.source, chunks.len());

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self
            .retry
            .run("document embedding", || self.embedder.embed_batch(&texts))
            .await?;

        if embeddings.len() != chunks.len() {
            return Err(PolicyRagError::EmbeddingService {
                message: format!(
                    "Expected {} embeddings, got {}",
                    chunks.len(),
                    embeddings.len()
                ),
                retryable: false,
            });
        }

        let indexed_at = Utc::now();
        Ok(chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| PendingEntry {
                embedding,
                text: chunk.text,
                metadata: EntryMetadata {
                    source: chunk.source,
                    chunk_index: chunk.index,
                    page: chunk.page,
                    start: chunk.start,
                    end: chunk.end,
                    indexed_at,
                },
            })
            .collect())
    }
}
