//! Scripted backends for tests.
//!
//! Enabled for this crate's own tests and, through the `test-util`
//! feature, for downstream crates.

use crate::backend::{LlmBackend, LlmProvider, LlmRequest, LlmResponse, TokenUsage};
use crate::error::LlmError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

type Responder = Box<dyn Fn(&LlmRequest) -> Result<String, LlmError> + Send + Sync>;

/// A backend that replays queued outcomes and records every request.
///
/// Once the queue is drained, requests are answered by the responder if
/// one was set, or with `"ok"` otherwise.
pub struct ScriptedBackend {
    outcomes: Mutex<VecDeque<Result<String, LlmError>>>,
    responder: Option<Responder>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedBackend {
    /// Creates a backend with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            responder: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queues a successful reply.
    #[must_use]
    pub fn reply(self, content: impl Into<String>) -> Self {
        self.push(Ok(content.into()))
    }

    /// Queues a failure.
    #[must_use]
    pub fn fail(self, error: LlmError) -> Self {
        self.push(Err(error))
    }

    /// Answers unscripted requests with `responder`.
    #[must_use]
    pub fn respond_with<F>(mut self, responder: F) -> Self
    where
        F: Fn(&LlmRequest) -> Result<String, LlmError> + Send + Sync + 'static,
    {
        self.responder = Some(Box::new(responder));
        self
    }

    /// Returns every request received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Returns the content of the last message of every request.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter_map(|r| r.messages.last().map(|m| m.content.clone()))
            .collect()
    }

    fn push(self, outcome: Result<String, LlmError>) -> Self {
        self.outcomes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(outcome);
        self
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request.clone());

        let scripted = self
            .outcomes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();
        let outcome = match (scripted, &self.responder) {
            (Some(outcome), _) => outcome,
            (None, Some(responder)) => responder(request),
            (None, None) => Ok("ok".to_string()),
        };

        outcome.map(|content| LlmResponse {
            content,
            usage: TokenUsage::default(),
            model: "scripted".to_string(),
        })
    }

    fn provider(&self) -> LlmProvider {
        LlmProvider::Scripted
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
