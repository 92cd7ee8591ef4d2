//! CLI module for policy-rag.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// policy-rag - Ask questions about your policy documents
///
/// Indexes policy documents (PDF, text, markdown) into a local vector index and
/// answers questions about them with cited sources.
#[derive(Parser, Debug)]
#[command(name = "policy-rag")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check system requirements and configuration
    Doctor,

    /// Add policy documents to the knowledge base
    Ingest {
        /// Files or directories (.pdf, .txt, .md)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Ask a question and get an answer from your policy documents
    Ask {
        /// The question to ask
        question: String,

        /// LLM model to use for response generation
        #[arg(short, long)]
        model: Option<String>,

        /// Number of passages to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Print the answer and its sources as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start an interactive chat session
    Chat {
        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Search for relevant policy passages
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// List indexed documents
    List,

    /// Rebuild the index from the configured document paths
    Rebuild,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "rag.model")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask_with_options() {
        let cli = Cli::parse_from(["policy-rag", "-vv", "ask", "Who approves leave?", "-k", "5"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Ask { question, top_k, model, json } => {
                assert_eq!(question, "Who approves leave?");
                assert_eq!(top_k, Some(5));
                assert!(model.is_none());
                assert!(!json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_ingest_requires_paths() {
        assert!(Cli::try_parse_from(["policy-rag", "ingest"]).is_err());
        let cli = Cli::parse_from(["policy-rag", "ingest", "a.pdf", "policies/"]);
        assert!(matches!(cli.command, Commands::Ingest { ref paths } if paths.len() == 2));
    }
}
