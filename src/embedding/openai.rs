//! OpenAI embeddings implementation.

use super::Embedder;
use crate::error::{PolicyRagError, Result};
use crate::openai::{create_client_with_timeout, is_transient};
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use std::time::Duration;
use tracing::{debug, instrument};

/// OpenAI accepts at most this many inputs per embeddings request.
const BATCH_SIZE: usize = 100;

/// Sub-batches in flight at once.
const MAX_CONCURRENT_REQUESTS: usize = 4;

/// OpenAI-based embedder.
pub struct OpenAIEmbedder {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbedder {
    /// Create a new OpenAI embedder with default settings.
    pub fn new() -> Result<Self> {
        Self::with_config("text-embedding-3-small", 1536, Duration::from_secs(30))
    }

    /// Create a new OpenAI embedder with custom model, dimensions and request timeout.
    pub fn with_config(model: &str, dimensions: usize, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(timeout)?,
            model: model.to_string(),
            dimensions,
        })
    }

    async fn embed_request(&self, input: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let expected = input.len();

        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::StringArray(input))
            .dimensions(self.dimensions as u32)
            .build()
            .map_err(|e| PolicyRagError::EmbeddingService {
                message: format!("Failed to build request: {}", e),
                retryable: false,
            })?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| PolicyRagError::EmbeddingService {
                retryable: is_transient(&e),
                message: format!("Embedding API error: {}", e),
            })?;

        // Sort by index to ensure correct order
        let mut data = response.data;
        data.sort_by_key(|e| e.index);

        if data.len() != expected {
            return Err(PolicyRagError::embedding(format!(
                "Expected {} embeddings, API returned {}",
                expected,
                data.len()
            )));
        }

        Ok(data.into_iter().map(|e| e.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| PolicyRagError::embedding("Empty embedding response"))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        // `buffered` keeps sub-batch results in submission order.
        let batches: Vec<Vec<Vec<f32>>> = futures::stream::iter(texts.chunks(BATCH_SIZE).map(<[String]>::to_vec))
            .map(|chunk| self.embed_request(chunk))
            .buffered(MAX_CONCURRENT_REQUESTS)
            .try_collect()
            .await?;

        let all_embeddings: Vec<Vec<f32>> = batches.into_iter().flatten().collect();

        debug!("Generated {} embeddings", all_embeddings.len());
        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
