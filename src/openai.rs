//! OpenAI client configuration with sensible defaults.

use crate::error::{PolicyRagError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Create an OpenAI client with a custom timeout.
///
/// The timeout bounds every HTTP request so a hung API call surfaces as an error.
pub fn create_client_with_timeout(timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| PolicyRagError::Config(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Client::with_config(OpenAIConfig::default()).with_http_client(http_client))
}

/// Whether an OpenAI error is worth retrying.
///
/// Transport failures (timeouts, resets) and rate-limit/server errors are retryable;
/// malformed requests and bad credentials are not.
pub fn is_transient(error: &async_openai::error::OpenAIError) -> bool {
    use async_openai::error::OpenAIError;

    match error {
        OpenAIError::Reqwest(_) => true,
        OpenAIError::ApiError(api) => {
            let kind = api.r#type.as_deref().unwrap_or_default();
            let code = api
                .code
                .as_ref()
                .map(|c| c.to_string())
                .unwrap_or_default();
            kind.contains("rate_limit")
                || kind.contains("server_error")
                || code.contains("rate_limit")
        }
        _ => false,
    }
}
