//! Client for an OpenAI-compatible chat completion endpoint.
//!
//! One POST per call, no retries and no state kept between calls. The
//! request timeout is the only deadline applied.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default endpoint for chat completions.
pub const DEFAULT_COMPLETION_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Default model identifier sent with every request.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Completion client errors.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Completion API key is not configured")]
    Configuration,

    #[error("Completion endpoint returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Unexpected completion response: {0}")]
    Parse(String),

    #[error("Completion request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Per-call sampling parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            max_tokens: 4000,
            temperature: 0.7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// HTTP client for the completion endpoint.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    url: String,
    api_key: Option<String>,
    model: String,
    client: Client,
}

impl CompletionClient {
    pub fn new(url: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self::with_timeout(url, api_key, model, None)
    }

    /// Create a client whose requests give up after `timeout`.
    pub fn with_timeout(
        url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Self {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Self {
            url: url.into(),
            api_key,
            model: model.into(),
            client: builder.build().unwrap_or_else(|e| {
                tracing::warn!("Falling back to default HTTP client: {}", e);
                Client::new()
            }),
        }
    }

    /// Send `system_prompt` and `user_prompt` as a two-message conversation
    /// and return the first choice's text.
    pub async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: CompletionOptions,
    ) -> Result<String, CompletionError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(CompletionError::Configuration)?;

        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        };

        tracing::debug!(
            model = %self.model,
            prompt_chars = user_prompt.chars().count(),
            max_tokens = options.max_tokens,
            "Sending completion request"
        );

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::warn!("Completion endpoint returned {}", status);
            return Err(CompletionError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        parse_completion(&body)
    }
}

/// Pull `choices[0].message.content` out of a completion envelope.
fn parse_completion(body: &str) -> Result<String, CompletionError> {
    let envelope: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| CompletionError::Parse(e.to_string()))?;

    envelope
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| CompletionError::Parse("response has no message content".to_string()))
}
