//! Ingest command implementation.

use super::open_knowledge_base;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the ingest command.
pub async fn run_ingest(paths: &[String], settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ingest, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'policy-rag doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = open_knowledge_base(settings).await?;
    let paths: Vec<_> = paths.iter().map(|p| Settings::expand_path(p)).collect();

    let spinner = Output::spinner("Chunking, embedding and indexing...");
    let result = orchestrator.ingest_paths(&paths).await;
    spinner.finish_and_clear();

    match result {
        Ok(results) if results.is_empty() => {
            Output::warning("No supported documents found (.pdf, .txt, .md).");
        }
        Ok(results) => {
            for (source, chunks) in &results {
                Output::success(&format!("Indexed {} ({} chunks)", source, chunks));
            }
            Output::kv("Total chunks in index", &orchestrator.index().len().await.to_string());
        }
        Err(e) => {
            Output::error(&format!("{}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
