//! Search command implementation.

use super::open_knowledge_base;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::PolicyRagError;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(query: &str, limit: usize, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Search, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = open_knowledge_base(settings).await?;

    let spinner = Output::spinner("Searching...");
    let results = orchestrator.search(query, limit).await;
    spinner.finish_and_clear();

    match results {
        Ok(sources) => {
            Output::success(&format!("Found {} results", sources.len()));
            for source in &sources {
                Output::passage(source, 300);
            }
        }
        Err(PolicyRagError::EmptyIndex) => {
            Output::warning("No documents indexed yet.");
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
