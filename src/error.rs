//! Error types for policy-rag.

use std::path::PathBuf;
use thiserror::Error;

/// Library-level error type for policy-rag operations.
#[derive(Error, Debug)]
pub enum PolicyRagError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding service error: {message}")]
    EmbeddingService {
        message: String,
        /// Whether the call may succeed if repeated (timeouts, rate limits, 5xx).
        retryable: bool,
    },

    #[error("Could not load index from {path:?}: {reason}")]
    IndexLoad { path: PathBuf, reason: String },

    #[error("Could not save index to {path:?}: {reason}")]
    IndexSave { path: PathBuf, reason: String },

    #[error("The knowledge base is empty. Ingest at least one policy document first.")]
    EmptyIndex,

    #[error("Embedding has {actual} dimensions but the index expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Ingestion of '{document}' failed, knowledge base left unchanged: {source}")]
    Ingestion {
        document: String,
        #[source]
        source: Box<PolicyRagError>,
    },

    #[error("Answer generation failed: {message}")]
    AnswerGeneration { message: String, retryable: bool },

    #[error("Document source error: {0}")]
    DocumentSource(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl PolicyRagError {
    /// Create a retryable embedding service error.
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::EmbeddingService {
            message: message.into(),
            retryable: true,
        }
    }

    /// Create an answer generation error.
    pub fn generation(message: impl Into<String>) -> Self {
        Self::AnswerGeneration {
            message: message.into(),
            retryable: true,
        }
    }

    /// Wrap a failure that happened while ingesting `document`.
    pub fn ingestion(document: impl Into<String>, source: PolicyRagError) -> Self {
        Self::Ingestion {
            document: document.into(),
            source: Box::new(source),
        }
    }

    /// Whether the failed operation may be retried by the caller.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::EmbeddingService { retryable, .. } => *retryable,
            Self::AnswerGeneration { retryable, .. } => *retryable,
            Self::Ingestion { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

/// Result type alias for policy-rag operations.
pub type Result<T> = std::result::Result<T, PolicyRagError>;
