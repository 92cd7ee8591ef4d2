//! Language model collaborator.

use super::ConversationTurn;
use crate::error::{PolicyRagError, Result};
use crate::openai::{create_client_with_timeout, is_transient};
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// A rendered prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// Instructions for the model. Empty means no system message.
    pub system: String,
    /// The final user message.
    pub user: String,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }

    /// Prompt with no system message.
    pub fn user_only(user: impl Into<String>) -> Self {
        Self::new(String::new(), user)
    }
}

/// Text completion service used to answer questions.
///
/// `history` holds earlier turns of the conversation, oldest first; they are
/// sent as prior context before `prompt.user`.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &Prompt, history: &[ConversationTurn]) -> Result<String>;
}

/// OpenAI chat-completions model.
pub struct OpenAIChatModel {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAIChatModel {
    /// Create a chat model; `timeout` bounds every HTTP request.
    pub fn new(model: &str, temperature: f32, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(timeout)?,
            model: model.to_string(),
            temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

fn build_error(e: impl std::fmt::Display) -> PolicyRagError {
    PolicyRagError::AnswerGeneration {
        message: format!("Failed to build request: {}", e),
        retryable: false,
    }
}

/// Message list: system, then each earlier turn as a user/assistant pair, then the prompt.
fn build_messages(
    prompt: &Prompt,
    history: &[ConversationTurn],
) -> Result<Vec<ChatCompletionRequestMessage>> {
    let mut messages: Vec<ChatCompletionRequestMessage> = Vec::with_capacity(history.len() * 2 + 2);

    if !prompt.system.is_empty() {
        messages.push(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(prompt.system.clone())
                .build()
                .map_err(build_error)?
                .into(),
        );
    }

    for turn in history {
        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(turn.question.clone())
                .build()
                .map_err(build_error)?
                .into(),
        );
        messages.push(
            ChatCompletionRequestAssistantMessageArgs::default()
                .content(turn.answer.clone())
                .build()
                .map_err(build_error)?
                .into(),
        );
    }

    messages.push(
        ChatCompletionRequestUserMessageArgs::default()
            .content(prompt.user.clone())
            .build()
            .map_err(build_error)?
            .into(),
    );

    Ok(messages)
}

#[async_trait]
impl LanguageModel for OpenAIChatModel {
    #[instrument(skip(self, prompt, history), fields(model = %self.model, history = history.len()))]
    async fn generate(&self, prompt: &Prompt, history: &[ConversationTurn]) -> Result<String> {
        let messages = build_messages(prompt, history)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(build_error)?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            PolicyRagError::AnswerGeneration {
                retryable: is_transient(&e),
                message: format!("Failed to generate response: {}", e),
            }
        })?;

        let answer = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| PolicyRagError::generation("Empty response from LLM"))?
            .clone();

        debug!("Generated {} chars", answer.len());
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(question: &str, answer: &str) -> ConversationTurn {
        ConversationTurn {
            question: question.to_string(),
            answer: answer.to_string(),
            sources: Vec::new(),
        }
    }

    #[test]
    fn test_messages_follow_history_order() {
        let prompt = Prompt::new("be brief", "What about contractors?");
        let history = vec![turn("Who gets leave?", "Employees."), turn("How much?", "25 days.")];

        let messages = build_messages(&prompt, &history).unwrap();
        assert_eq!(messages.len(), 6);
        assert!(matches!(messages[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(messages[1], ChatCompletionRequestMessage::User(_)));
        assert!(matches!(messages[2], ChatCompletionRequestMessage::Assistant(_)));
        assert!(matches!(messages[5], ChatCompletionRequestMessage::User(_)));
    }

    #[test]
    fn test_empty_system_prompt_is_skipped() {
        let messages = build_messages(&Prompt::user_only("rewrite this"), &[]).unwrap();
        assert_eq!(messages.len(), 1);
        assert!(matches!(messages[0], ChatCompletionRequestMessage::User(_)));
    }

    #[test]
    fn test_model_creation() {
        let model = OpenAIChatModel::new("gpt-3.5-turbo", 0.0, Duration::from_secs(5)).unwrap();
        assert_eq!(model.model(), "gpt-3.5-turbo");
    }
}
