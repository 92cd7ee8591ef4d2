//! List command implementation.

use super::open_knowledge_base;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(settings: Settings) -> Result<()> {
    let orchestrator = open_knowledge_base(settings).await?;
    let documents = orchestrator.sources().await;

    if documents.is_empty() {
        Output::info("No documents indexed yet. Use 'policy-rag ingest <path>' to add content.");
        return Ok(());
    }

    Output::header(&format!("Indexed Documents ({})", documents.len()));
    println!();

    for summary in &documents {
        Output::document_info(summary);
    }

    let total_chunks: usize = documents.iter().map(|d| d.chunk_count).sum();
    println!();
    Output::kv("Total documents", &documents.len().to_string());
    Output::kv("Total chunks", &total_chunks.to_string());
    Output::kv("Metric", &orchestrator.index().metric().await.to_string());

    Ok(())
}
