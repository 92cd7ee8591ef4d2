//! Configuration settings for policy-rag.

use crate::chunking::ChunkingConfig;
use crate::error::{PolicyRagError, Result};
use crate::index::Metric;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub documents: DocumentSettings,
    pub chunking: ChunkingSettings,
    pub embedding: EmbeddingSettings,
    pub index: IndexSettings,
    pub rag: RagSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.policy-rag".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// The policy corpus used to build the index at cold start.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DocumentSettings {
    /// Files or directories containing policy documents (.pdf, .txt, .md).
    pub paths: Vec<String>,
}

/// Content chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider (openai, hashed).
    pub provider: String,
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
    /// Retries for rate limits, timeouts and server errors.
    pub max_retries: u32,
    /// First backoff delay in milliseconds; doubles on every retry.
    pub base_delay_ms: u64,
    /// Upper bound for a single backoff delay in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            timeout_seconds: 30,
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 8000,
        }
    }
}

/// Vector index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Path to the index snapshot file.
    pub path: String,
    /// Distance metric (cosine, l2). Only applies to newly built indexes.
    pub metric: Metric,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            path: "~/.policy-rag/index.sqlite".to_string(),
            metric: Metric::Cosine,
        }
    }
}

/// Question answering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    /// LLM model for response generation.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Number of chunks retrieved per question.
    pub top_k: usize,
    /// Timeout for a single language model call, in seconds.
    pub timeout_seconds: u64,
    /// Rewrite follow-up questions into standalone questions before retrieval.
    pub condense_question: bool,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.0,
            top_k: 3,
            timeout_seconds: 60,
            condense_question: true,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Check values that would otherwise fail deep inside the pipeline.
    pub fn validate(&self) -> Result<()> {
        self.chunking_config().validate()?;

        if self.rag.top_k == 0 {
            return Err(PolicyRagError::Config("rag.top_k must be at least 1".to_string()));
        }
        if self.embedding.dimensions == 0 {
            return Err(PolicyRagError::Config(
                "embedding.dimensions must be at least 1".to_string(),
            ));
        }
        if self.embedding.timeout_seconds == 0 || self.rag.timeout_seconds == 0 {
            return Err(PolicyRagError::Config("timeouts must be at least 1 second".to_string()));
        }
        Ok(())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| PolicyRagError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("policy-rag")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded index snapshot path.
    pub fn index_path(&self) -> PathBuf {
        Self::expand_path(&self.index.path)
    }

    /// Get the expanded cold-start document paths.
    pub fn document_paths(&self) -> Vec<PathBuf> {
        self.documents.paths.iter().map(|p| Self::expand_path(p)).collect()
    }

    pub fn chunking_config(&self) -> ChunkingConfig {
        ChunkingConfig {
            chunk_size: self.chunking.chunk_size,
            overlap: self.chunking.overlap,
        }
    }
}
