//! Per-session conversation history.

use serde::{Deserialize, Serialize};

/// One answered question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// The question as the user asked it.
    pub question: String,
    pub answer: String,
    /// Texts of the passages the answer was grounded on, in retrieval order.
    pub sources: Vec<String>,
}

/// Ordered history of turns for one session.
///
/// Owned by the caller and not shared between tasks. Turns are only ever
/// appended; [`reset`](Self::reset) starts over.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationState {
    turns: Vec<ConversationTurn>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    /// All turns, oldest first.
    pub fn history(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn reset(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Plain-text transcript used when rewriting follow-up questions.
    pub fn transcript(&self) -> String {
        self.turns
            .iter()
            .map(|t| format!("User: {}\nAssistant: {}", t.question, t.answer))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
