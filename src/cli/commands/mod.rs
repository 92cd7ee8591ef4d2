//! CLI command implementations.

mod ask;
mod chat;
mod config;
mod doctor;
mod ingest;
mod list;
mod rebuild;
mod search;

pub use ask::run_ask;
pub use chat::run_chat;
pub use config::run_config;
pub use doctor::run_doctor;
pub use ingest::run_ingest;
pub use list::run_list;
pub use rebuild::run_rebuild;
pub use search::run_search;

use crate::cli::Output;
use crate::config::Settings;
use crate::ingest::ColdStart;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Apply `--model` / `-k` on top of the loaded settings and re-check them.
fn apply_rag_overrides(
    settings: &mut Settings,
    model: Option<String>,
    top_k: Option<usize>,
) -> crate::error::Result<()> {
    if let Some(model) = model {
        settings.rag.model = model;
    }
    if let Some(k) = top_k {
        settings.rag.top_k = k;
    }
    settings.validate()
}

/// Build the orchestrator and bring the index up (load or rebuild).
async fn open_knowledge_base(settings: Settings) -> Result<Orchestrator> {
    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Loading knowledge base...");
    let outcome = orchestrator.start().await;
    spinner.finish_and_clear();

    match outcome? {
        ColdStart::Rebuilt(entries) => {
            Output::warning(&format!(
                "Index snapshot missing or unreadable; rebuilt from configured documents ({} chunks).",
                entries
            ));
        }
        ColdStart::Empty => {
            Output::warning("Knowledge base is empty. Use 'policy-rag ingest <path>' to add documents.");
        }
        ColdStart::Loaded(_) => {}
    }

    Ok(orchestrator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_are_validated() {
        let mut settings = Settings::default();
        apply_rag_overrides(&mut settings, Some("gpt-4o-mini".to_string()), Some(5)).unwrap();
        assert_eq!(settings.rag.model, "gpt-4o-mini");
        assert_eq!(settings.rag.top_k, 5);

        assert!(apply_rag_overrides(&mut settings, None, Some(0)).is_err());
    }

    #[test]
    fn test_no_overrides_keep_settings() {
        let mut settings = Settings::default();
        apply_rag_overrides(&mut settings, None, None).unwrap();
        assert_eq!(settings.rag.top_k, Settings::default().rag.top_k);
    }
}
