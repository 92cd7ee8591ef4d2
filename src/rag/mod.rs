//! RAG (Retrieval-Augmented Generation) for question answering with sources.
//!
//! Provides the ability to ask questions and get answers grounded in the
//! indexed policy documents, with multi-turn conversation history.

mod conversation;
mod engine;
mod llm;
mod retriever;

pub use conversation::{ConversationState, ConversationTurn};
pub use engine::{QaEngine, NO_KNOWLEDGE_BASE_ANSWER};
pub use llm::{LanguageModel, OpenAIChatModel, Prompt};
pub use retriever::{Retriever, DEFAULT_TOP_K};

use crate::index::{EntryMetadata, SearchHit};
use serde::{Deserialize, Serialize};

/// A retrieved passage handed to the language model and cited in answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Passage text.
    pub text: String,
    pub metadata: EntryMetadata,
    /// Distance to the query (lower is closer).
    pub distance: f32,
}

impl Source {
    /// Short human-readable reference, e.g. `handbook.pdf p.3`.
    pub fn citation(&self) -> String {
        format!("{} p.{}", self.metadata.source, self.metadata.page)
    }
}

impl From<SearchHit> for Source {
    fn from(hit: SearchHit) -> Self {
        Self {
            text: hit.entry.text,
            metadata: hit.entry.metadata,
            distance: hit.distance,
        }
    }
}

/// How an answer was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerKind {
    /// Generated by the language model from retrieved passages.
    Generated,
    /// Fixed reply because nothing has been indexed yet.
    NoKnowledgeBase,
}

/// An answer with the passages it was grounded on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// The answer text.
    pub answer: String,
    /// Passages used for the answer, nearest first.
    pub sources: Vec<Source>,
    /// The follow-up question rewritten with conversation history, when it was rewritten.
    pub standalone_question: Option<String>,
    pub kind: AnswerKind,
}

impl Answer {
    pub(crate) fn no_knowledge_base() -> Self {
        Self {
            answer: NO_KNOWLEDGE_BASE_ANSWER.to_string(),
            sources: Vec::new(),
            standalone_question: None,
            kind: AnswerKind::NoKnowledgeBase,
        }
    }

    /// Whether this is the fixed empty-knowledge-base reply.
    pub fn is_canned(&self) -> bool {
        self.kind == AnswerKind::NoKnowledgeBase
    }

    /// Format the answer for display.
    pub fn format_for_display(&self) -> String {
        let mut output = self.answer.clone();

        if !self.sources.is_empty() {
            output.push_str("\n\n--- Sources ---\n");
            for source in &self.sources {
                output.push_str(&format!(
                    "\n{} (distance: {:.3})",
                    source.citation(),
                    source.distance
                ));
            }
        }

        output
    }
}

/// Format retrieved passages for inclusion in a prompt.
pub fn format_context_for_prompt(sources: &[Source]) -> String {
    sources
        .iter()
        .enumerate()
        .map(|(i, source)| format!("---\n[{}] {}\n{}\n---", i + 1, source.citation(), source.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}
