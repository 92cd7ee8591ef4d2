//! Pre-flight checks before expensive operations.
//!
//! Validates that required configuration is available before starting
//! operations that would otherwise fail midway.

use crate::config::Settings;
use crate::error::{PolicyRagError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Ingesting and rebuilding embed documents.
    Ingest,
    /// Asking questions always calls the language model.
    Ask,
    /// Search only embeds the query.
    Search,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    let remote_embeddings = settings.embedding.provider.eq_ignore_ascii_case("openai");
    match operation {
        Operation::Ask => check_api_key()?,
        Operation::Ingest | Operation::Search if remote_embeddings => check_api_key()?,
        Operation::Ingest | Operation::Search => {}
    }
    Ok(())
}

/// Check if OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(PolicyRagError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        Err(_) => Err(PolicyRagError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_embedder_needs_no_key_for_search() {
        let mut settings = Settings::default();
        settings.embedding.provider = "hashed".to_string();
        assert!(check(Operation::Search, &settings).is_ok());
        assert!(check(Operation::Ingest, &settings).is_ok());
    }
}
