//! Configuration module for policy-rag.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, RagPrompts};
pub use settings::{
    ChunkingSettings, DocumentSettings, EmbeddingSettings, GeneralSettings, IndexSettings,
    PromptSettings, RagSettings, Settings,
};
