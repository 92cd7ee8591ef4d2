//! Interactive chat command.

use super::{apply_rag_overrides, open_knowledge_base};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};

/// Run the interactive chat command.
///
/// Besides questions, the prompt accepts `upload <path>` to add a document
/// mid-conversation, `clear` to reset the conversation and `exit` to quit.
pub async fn run_chat(model: Option<String>, mut settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'policy-rag doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    if let Err(e) = apply_rag_overrides(&mut settings, model, None) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = open_knowledge_base(settings).await?;
    let mut session = orchestrator.session();

    println!("\n{}", style("Policy Chat").bold().cyan());
    println!(
        "{}\n",
        style("Ask about your policies. 'upload <path>' adds a document, 'clear' resets the conversation, 'exit' quits.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            session.reset_conversation();
            Output::info("Conversation history cleared.");
            continue;
        }

        if let Some(path) = input.strip_prefix("upload ") {
            let path = Settings::expand_path(path.trim());
            let spinner = Output::spinner("Indexing document...");
            let result = orchestrator.ingest_paths(&[path]).await;
            spinner.finish_and_clear();
            match result {
                Ok(results) => {
                    for (source, chunks) in results {
                        Output::success(&format!("Indexed {} ({} chunks)", source, chunks));
                    }
                }
                Err(e) => Output::error(&format!("Upload failed: {}", e)),
            }
            continue;
        }

        let spinner = Output::spinner("Thinking...");
        let result = session.ask(input).await;
        spinner.finish_and_clear();

        match result {
            Ok(answer) => {
                println!("\n{} {}", style("Assistant:").cyan().bold(), answer.answer);
                if !answer.sources.is_empty() {
                    let citations: Vec<String> = answer.sources.iter().map(|s| s.citation()).collect();
                    println!("{}\n", style(format!("Sources: {}", citations.join(", "))).dim());
                } else {
                    println!();
                }
            }
            Err(e) => {
                Output::error(&format!("Error: {}", e));
                if e.is_retryable() {
                    Output::info("The conversation is unchanged; ask again to retry.");
                }
            }
        }
    }

    Ok(())
}
