//! policy-rag - Question answering over policy documents
//!
//! A local-first CLI tool and library that indexes policy documents and answers
//! questions about them with retrieval-augmented generation.
//!
//! # Overview
//!
//! policy-rag allows you to:
//! - Ingest PDF, text and markdown policy documents into a persistent vector index
//! - Ask questions and get answers grounded in the documents, with cited pages
//! - Hold multi-turn conversations where follow-up questions keep their context
//! - Add documents while questions are being answered
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management and prompt templates
//! - `document` - Loading documents from files and uploads
//! - `chunking` - Splitting documents into overlapping passages
//! - `embedding` - Embedding generation and retry policy
//! - `index` - Vector index, snapshots and the shared single-writer handle
//! - `ingest` - Ingestion pipeline and cold-start loading
//! - `rag` - Retrieval, conversation state and question answering
//! - `orchestrator` - Wiring everything together from settings
//!
//! # Example
//!
//! ```rust,no_run
//! use policy_rag::config::Settings;
//! use policy_rag::document::Document;
//! use policy_rag::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!     orchestrator.start().await?;
//!
//!     let added = orchestrator
//!         .ingest(&Document::new("leave.txt", "Annual leave is 25 days per year."))
//!         .await?;
//!     println!("Indexed {} chunks", added);
//!
//!     let mut session = orchestrator.session();
//!     let answer = session.ask("How much annual leave do I get?").await?;
//!     println!("{}", answer.format_for_display());
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod index;
pub mod ingest;
pub mod openai;
pub mod orchestrator;
pub mod rag;

pub use error::{PolicyRagError, Result};
