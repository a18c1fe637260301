//! Completion client.
//!
//! The single boundary between the pipeline and the remote model. Every
//! call makes exactly one backend attempt. [`CompletionClient::complete`]
//! absorbs failures into a fixed fallback text so downstream steps always
//! receive something to work with; [`CompletionClient::try_complete`]
//! surfaces them instead.

use crate::backend::{LlmBackend, LlmMessage, LlmRequest};
use crate::error::LlmError;
use concierge_core::InvocationId;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Text returned in place of a generated response when a completion fails.
pub const DEFAULT_FALLBACK: &str = "Sorry, I could not generate a response at this time.";

/// Wraps a backend with trimming, logging and the fallback policy.
#[derive(Clone)]
pub struct CompletionClient {
    backend: Arc<dyn LlmBackend>,
    fallback: String,
}

impl CompletionClient {
    /// Creates a client over the given backend.
    #[must_use]
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self {
            backend,
            fallback: DEFAULT_FALLBACK.to_string(),
        }
    }

    /// Overrides the fallback text.
    #[must_use]
    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }

    /// Returns the fallback text.
    #[must_use]
    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Returns the backend's model name.
    #[must_use]
    pub fn model(&self) -> &str {
        self.backend.model()
    }

    /// Sends `messages`, in order, and returns the trimmed generated text.
    ///
    /// # Errors
    ///
    /// Returns an error if `messages` is empty or the backend call fails.
    pub async fn try_complete(&self, messages: &[LlmMessage]) -> Result<String, LlmError> {
        if messages.is_empty() {
            return Err(LlmError::InvalidRequest {
                reason: "at least one message is required".to_string(),
            });
        }

        let invocation_id = InvocationId::new();
        let started = Instant::now();
        let request = LlmRequest::new(messages.to_vec());

        let response = self.backend.generate(&request).await.inspect_err(|e| {
            warn!(
                invocation_id = %invocation_id,
                model = self.backend.model(),
                error = %e,
                "Completion request failed"
            );
        })?;

        debug!(
            invocation_id = %invocation_id,
            model = %response.model,
            messages = messages.len(),
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            latency_ms = started.elapsed().as_millis() as u64,
            "Completion succeeded"
        );

        Ok(response.content.trim().to_string())
    }

    /// Sends `messages` and returns the trimmed generated text, or the
    /// fallback text if anything goes wrong.
    pub async fn complete(&self, messages: &[LlmMessage]) -> String {
        match self.try_complete(messages).await {
            Ok(content) => content,
            Err(_) => self.fallback.clone(),
        }
    }
}

impl fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionClient")
            .field("provider", &self.backend.provider())
            .field("model", &self.backend.model())
            .field("fallback", &self.fallback)
            .finish()
    }
}
