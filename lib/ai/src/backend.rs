//! LLM backend abstraction.
//!
//! Provides a unified interface over chat-completion providers. The
//! production backend is [`OpenAiBackend`](crate::openai::OpenAiBackend);
//! tests substitute scripted implementations.

use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default OpenAI API base URL.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default chat model.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo-0125";

/// Available LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    /// OpenAI API.
    OpenAi,
    /// Generic OpenAI-compatible API.
    OpenAiCompatible,
    /// In-process scripted backend used by tests.
    Scripted,
}

/// Configuration for an LLM backend.
#[derive(Debug, Clone)]
pub struct LlmBackendConfig {
    /// The provider type.
    pub provider: LlmProvider,
    /// Base URL for the API, without a trailing `/chat/completions`.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Bearer credential, if required.
    pub api_key: Option<String>,
    /// HTTP client timeout. `None` leaves the request unbounded.
    pub timeout: Option<Duration>,
}

impl LlmBackendConfig {
    /// Creates a configuration for the OpenAI API.
    #[must_use]
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: LlmProvider::OpenAi,
            base_url: OPENAI_BASE_URL.to_string(),
            model: model.into(),
            api_key: Some(api_key.into()),
            timeout: None,
        }
    }

    /// Creates a configuration for an OpenAI-compatible endpoint.
    #[must_use]
    pub fn openai_compatible(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: LlmProvider::OpenAiCompatible,
            base_url: base_url.into(),
            model: model.into(),
            api_key: None,
            timeout: None,
        }
    }

    /// Sets the bearer credential.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the HTTP client timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the chat completions URL.
    #[must_use]
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// A request to an LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmRequest {
    /// Ordered conversational context, oldest first.
    pub messages: Vec<LlmMessage>,
}

impl LlmRequest {
    /// Creates a request carrying the given messages.
    #[must_use]
    pub fn new(messages: Vec<LlmMessage>) -> Self {
        Self { messages }
    }

    /// Creates a request with a single user prompt.
    #[must_use]
    pub fn prompt(prompt: impl Into<String>) -> Self {
        Self::new(vec![LlmMessage::user(prompt)])
    }
}

/// A message in a completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmMessage {
    /// The role of the message sender.
    pub role: MessageRole,
    /// The content of the message.
    pub content: String,
}

impl LlmMessage {
    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User/human message.
    User,
    /// Assistant/AI message.
    Assistant,
}

/// A response from an LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    /// The generated content, as returned by the provider.
    pub content: String,
    /// Token usage statistics.
    pub usage: TokenUsage,
    /// Model that generated the response.
    pub model: String,
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of input tokens.
    pub input_tokens: u32,
    /// Number of output tokens.
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Returns the total number of tokens.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Trait for LLM backends.
///
/// Implementations make exactly one attempt per call and report every
/// transport or protocol problem as an [`LlmError`].
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Generates a response for the given request.
    ///
    /// # Errors
    ///
    /// Returns an error if the LLM call fails.
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Returns the provider type.
    fn provider(&self) -> LlmProvider;

    /// Returns the model name.
    fn model(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_request_is_a_single_user_message() {
        let request = LlmRequest::prompt("Describe this customer");

        assert_eq!(request.messages, vec![LlmMessage::user("Describe this customer")]);
    }

    #[test]
    fn message_roles_serialize_lowercase() {
        let json = serde_json::to_value(LlmMessage::assistant("Hello!")).expect("serialize");
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"], "Hello!");
    }

    #[test]
    fn token_usage_total() {
        let usage = TokenUsage {
            input_tokens: 100,
            output_tokens: 50,
        };
        assert_eq!(usage.total(), 150);
    }

    #[test]
    fn completions_url_ignores_trailing_slash() {
        let config = LlmBackendConfig::openai_compatible("http://localhost:8080/v1/", "local");
        assert_eq!(
            config.completions_url(),
            "http://localhost:8080/v1/chat/completions"
        );
        assert_eq!(
            LlmBackendConfig::openai("sk-test", DEFAULT_MODEL).completions_url(),
            "https://api.openai.com/v1/chat/completions"
        );
    }
}
