//! Offline embedder based on feature hashing.
//!
//! Produces deterministic, content-dependent vectors from word and character
//! trigram hashes. Not semantically accurate like a real embedding model, but
//! texts sharing vocabulary land close together, which is enough for tests
//! and for running without an API key.

use super::Embedder;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them", "what", "how", "does", "do", "must",
];

/// Deterministic feature-hashing embedder.
#[derive(Debug, Clone)]
pub struct HashedEmbedder {
    dimensions: usize,
}

impl HashedEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        let lower = text.to_lowercase();

        let mut word_freq: HashMap<&str, u32> = HashMap::new();
        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 2 && !STOP_WORDS.contains(w))
        {
            *word_freq.entry(word).or_insert(0) += 1;
        }

        // Sorted so float accumulation order is independent of HashMap iteration order.
        let mut words: Vec<(&str, u32)> = word_freq.into_iter().collect();
        words.sort_unstable();

        for (word, freq) in words {
            let chars: Vec<char> = word.chars().collect();
            for trigram in chars.windows(3) {
                let dim = hash(trigram.iter().collect::<String>().as_bytes(), 37) % self.dimensions;
                embedding[dim] += (freq as f32).sqrt();
            }

            let dim = hash(word.as_bytes(), 31) % self.dimensions;
            embedding[dim] += freq as f32;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }
}

fn hash(bytes: &[u8], multiplier: u64) -> usize {
    bytes
        .iter()
        .fold(0u64, |acc, &b| acc.wrapping_mul(multiplier).wrapping_add(b as u64)) as usize
}

#[async_trait]
impl Embedder for HashedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Metric;

    #[tokio::test]
    async fn test_unit_length_and_dimensions() {
        let embedder = HashedEmbedder::new(128);
        let v = embedder.embed("Passwords rotate every ninety days").await.unwrap();
        assert_eq!(v.len(), 128);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_batch_matches_single_calls() {
        let embedder = HashedEmbedder::new(64);
        let texts = vec![
            "access review".to_string(),
            "vacation policy".to_string(),
            "".to_string(),
        ];
        let batch = embedder.embed_batch(&texts).await.unwrap();
        for (text, vector) in texts.iter().zip(&batch) {
            assert_eq!(&embedder.embed(text).await.unwrap(), vector);
        }
    }

    #[tokio::test]
    async fn test_shared_vocabulary_is_closer() {
        let embedder = HashedEmbedder::new(256);
        let query = embedder.embed("firewall change approval").await.unwrap();
        let related = embedder.embed("Every firewall change needs approval from security").await.unwrap();
        let unrelated = embedder.embed("Parental leave lasts sixteen weeks").await.unwrap();

        assert!(Metric::Cosine.distance(&query, &related) < Metric::Cosine.distance(&query, &unrelated));
    }
}
