//! Question answering over retrieved policy passages.

use super::{
    format_context_for_prompt, Answer, AnswerKind, ConversationState, ConversationTurn,
    LanguageModel, Prompt, Retriever,
};
use crate::config::Prompts;
use crate::error::{PolicyRagError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Reply given when the knowledge base has no documents.
pub const NO_KNOWLEDGE_BASE_ANSWER: &str = "No policy documents have been indexed yet, so there is no knowledge base to answer from. Upload a policy document and ask again.";

/// Default bound on a single language model call.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Answers questions from retrieved passages and conversation history.
///
/// `ask` never retries: a failed or timed-out model call is returned to the
/// caller as [`PolicyRagError::AnswerGeneration`] and the conversation is left
/// untouched, so the caller may simply ask again.
pub struct QaEngine {
    retriever: Retriever,
    llm: Arc<dyn LanguageModel>,
    prompts: Prompts,
    timeout: Duration,
    condense_question: bool,
}

impl QaEngine {
    pub fn new(retriever: Retriever, llm: Arc<dyn LanguageModel>) -> Self {
        Self {
            retriever,
            llm,
            prompts: Prompts::default(),
            timeout: DEFAULT_TIMEOUT,
            condense_question: true,
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Bound every language model call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether follow-up questions are rewritten before retrieval.
    pub fn with_condense_question(mut self, enabled: bool) -> Self {
        self.condense_question = enabled;
        self
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Answer `question` in the context of `conversation`.
    ///
    /// On success the turn is appended to `conversation`. On any error, and
    /// for the empty-knowledge-base reply, the conversation is unchanged.
    ///
    /// The emptiness check runs before the follow-up is condensed and the
    /// index lock is not held across model calls. A rebuild that empties the
    /// index in between still yields the canned reply, but after one
    /// condensing call to the model.
    #[instrument(skip(self, conversation), fields(history = conversation.len()))]
    pub async fn ask(&self, question: &str, conversation: &mut ConversationState) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(PolicyRagError::InvalidInput("question is empty".to_string()));
        }
        info!("Processing question: {}", question);

        if self.retriever.is_empty().await {
            info!("Knowledge base is empty, returning canned answer");
            return Ok(Answer::no_knowledge_base());
        }

        let standalone = if self.condense_question && !conversation.is_empty() {
            let rewritten = self.condense(question, conversation).await?;
            debug!("Standalone question: {}", rewritten);
            Some(rewritten)
        } else {
            None
        };
        let query = standalone.as_deref().unwrap_or(question);

        let sources = match self.retriever.retrieve(query).await {
            Ok(sources) => sources,
            // Emptied by a concurrent rebuild between the check and the search.
            Err(PolicyRagError::EmptyIndex) => return Ok(Answer::no_knowledge_base()),
            Err(e) => return Err(e),
        };

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), query.to_string());
        vars.insert("context".to_string(), format_context_for_prompt(&sources));
        let prompt = Prompt::new(
            self.prompts.render_with_custom(&self.prompts.rag.system, &HashMap::new()),
            self.prompts.render_with_custom(&self.prompts.rag.user, &vars),
        );

        let answer = self.generate(&prompt, conversation.history()).await?;
        debug!("Generated answer with {} sources", sources.len());

        conversation.append(ConversationTurn {
            question: question.to_string(),
            answer: answer.clone(),
            sources: sources.iter().map(|s| s.text.clone()).collect(),
        });

        Ok(Answer {
            answer,
            sources,
            standalone_question: standalone,
            kind: AnswerKind::Generated,
        })
    }

    /// Rewrite a follow-up into a question that stands on its own.
    async fn condense(&self, question: &str, conversation: &ConversationState) -> Result<String> {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("history".to_string(), conversation.transcript());
        let prompt = Prompt::user_only(self.prompts.render_with_custom(&self.prompts.rag.condense, &vars));

        let rewritten = self.generate(&prompt, &[]).await?;
        let rewritten = rewritten.trim();
        Ok(if rewritten.is_empty() {
            question.to_string()
        } else {
            rewritten.to_string()
        })
    }

    async fn generate(&self, prompt: &Prompt, history: &[ConversationTurn]) -> Result<String> {
        match tokio::time::timeout(self.timeout, self.llm.generate(prompt, history)).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e @ PolicyRagError::AnswerGeneration { .. })) => Err(e),
            Ok(Err(e)) => Err(PolicyRagError::AnswerGeneration {
                retryable: e.is_retryable(),
                message: e.to_string(),
            }),
            Err(_) => Err(PolicyRagError::generation(format!(
                "language model did not respond within {:?}",
                self.timeout
            ))),
        }
    }
}
