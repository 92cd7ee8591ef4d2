//! Ask command implementation.

use super::{apply_rag_overrides, open_knowledge_base};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    model: Option<String>,
    top_k: Option<usize>,
    json: bool,
    mut settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'policy-rag doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    if let Err(e) = apply_rag_overrides(&mut settings, model, top_k) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = open_knowledge_base(settings).await?;
    let mut session = orchestrator.session();

    let spinner = Output::spinner("Searching knowledge base...");
    let result = session.ask(question).await;
    spinner.finish_and_clear();

    match result {
        Ok(answer) if json => {
            println!("{}", serde_json::to_string_pretty(&answer)?);
        }
        Ok(answer) => {
            println!("\n{}\n", answer.answer);

            if !answer.sources.is_empty() {
                Output::header("Sources");
                for source in &answer.sources {
                    Output::passage(source, 160);
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
