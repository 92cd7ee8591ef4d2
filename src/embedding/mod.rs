//! Embedding generation for semantic search and retrieval.

mod hashed;
mod openai;
mod retry;

pub use hashed::HashedEmbedder;
pub use openai::OpenAIEmbedder;
pub use retry::RetryPolicy;

use crate::config::EmbeddingSettings;
use crate::error::{PolicyRagError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Trait for embedding generation.
///
/// `embed_batch` must return one vector per input, in input order, identical to
/// what repeated `embed` calls would return.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}

/// Create the embedder selected in the settings.
pub fn create_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    match settings.provider.to_lowercase().as_str() {
        "openai" => Ok(Arc::new(OpenAIEmbedder::with_config(
            &settings.model,
            settings.dimensions as usize,
            Duration::from_secs(settings.timeout_seconds),
        )?)),
        "hashed" => Ok(Arc::new(HashedEmbedder::new(settings.dimensions as usize))),
        other => Err(PolicyRagError::Config(format!(
            "Unknown embedding provider: {} (expected 'openai' or 'hashed')",
            other
        ))),
    }
}
