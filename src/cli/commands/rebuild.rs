//! Rebuild command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the rebuild command.
///
/// Does not load the existing snapshot first; it is replaced wholesale.
pub async fn run_rebuild(settings: Settings) -> Result<()> {
    if settings.documents.paths.is_empty() {
        Output::warning("No document paths configured. Set [documents] paths in the config file.");
        return Ok(());
    }

    if let Err(e) = preflight::check(Operation::Ingest, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Rebuilding index from configured documents...");
    let result = orchestrator.rebuild_from_sources().await;
    spinner.finish_and_clear();

    match result {
        Ok(entries) => {
            Output::success(&format!("Rebuilt index with {} chunks", entries));
        }
        Err(e) => {
            Output::error(&format!("Rebuild failed, previous index kept: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
