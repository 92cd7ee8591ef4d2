//! Top-k retrieval over the shared index.

use super::Source;
use crate::embedding::{Embedder, RetryPolicy};
use crate::error::{PolicyRagError, Result};
use crate::index::SharedIndex;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Default number of passages returned per query.
pub const DEFAULT_TOP_K: usize = 3;

/// Embeds queries and returns the `k` nearest passages.
#[derive(Clone)]
pub struct Retriever {
    index: SharedIndex,
    embedder: Arc<dyn Embedder>,
    k: usize,
    retry: RetryPolicy,
}

impl Retriever {
    pub fn new(index: SharedIndex, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            index,
            embedder,
            k: DEFAULT_TOP_K,
            retry: RetryPolicy::default(),
        }
    }

    /// Set the number of passages per query.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Set how query embedding recovers from transient failures.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn index(&self) -> &SharedIndex {
        &self.index
    }

    pub async fn is_empty(&self) -> bool {
        self.index.is_empty().await
    }

    /// Return the `k` passages closest to `query`, nearest first.
    ///
    /// Fails with [`PolicyRagError::EmptyIndex`] when nothing has been indexed.
    #[instrument(skip(self), fields(k = self.k))]
    pub async fn retrieve(&self, query: &str) -> Result<Vec<Source>> {
        if self.index.is_empty().await {
            return Err(PolicyRagError::EmptyIndex);
        }

        let embedding = self
            .retry
            .run("query embedding", || self.embedder.embed(query))
            .await?;

        let hits = self.index.search(&embedding, self.k).await?;
        debug!("Retrieved {} passages", hits.len());

        Ok(hits.into_iter().map(Source::from).collect())
    }
}
