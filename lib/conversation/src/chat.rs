//! Chat turns.

use crate::error::ConversationError;
use crate::message::Message;
use crate::session::{Conversation, ConversationState};
use concierge_ai::{AnalysisPipeline, FailurePolicy};
use concierge_core::CustomerRecord;
use rootcause::prelude::Report;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Number of user turns replayed to the model by default.
pub const DEFAULT_REPLAY_TURNS: usize = 20;

/// Runs chat turns against a shared analysis pipeline.
#[derive(Debug, Clone)]
pub struct ChatService {
    pipeline: Arc<AnalysisPipeline>,
    replay_turns: Option<NonZeroUsize>,
}

impl ChatService {
    /// Creates a service that replays the last [`DEFAULT_REPLAY_TURNS`]
    /// user turns.
    #[must_use]
    pub fn new(pipeline: Arc<AnalysisPipeline>) -> Self {
        Self {
            pipeline,
            replay_turns: NonZeroUsize::new(DEFAULT_REPLAY_TURNS),
        }
    }

    /// Sets how many user turns are replayed; `None` replays everything.
    #[must_use]
    pub fn with_replay_turns(mut self, replay_turns: Option<NonZeroUsize>) -> Self {
        self.replay_turns = replay_turns;
        self
    }

    /// Answers `user_text` within `conversation`.
    ///
    /// An empty conversation is first opened with a generated greeting. The
    /// greeting, the user message and the reply are appended together once
    /// the reply is in hand, so a failed turn leaves the conversation as it
    /// was.
    ///
    /// # Errors
    ///
    /// Returns an error if `user_text` is blank, if the greeting cannot be
    /// produced, or if the reply fails under [`FailurePolicy::Propagate`].
    #[instrument(skip_all, fields(conversation_id = %conversation.id))]
    pub async fn turn(
        &self,
        conversation: &mut Conversation,
        customer: &CustomerRecord,
        user_text: &str,
    ) -> Result<String, Report<ConversationError>> {
        if user_text.trim().is_empty() {
            return Err(ConversationError::EmptyInput.into());
        }

        let conversation_id = conversation.id;
        let mut pending = Vec::with_capacity(3);
        if conversation.state() == ConversationState::Empty {
            let greeting = self
                .pipeline
                .greeting(customer)
                .await
                .map_err(|report| {
                    report.context(ConversationError::Greeting { conversation_id })
                })?;
            pending.push(Message::assistant(greeting));
        }
        pending.push(Message::user(user_text));

        let context = conversation.replay(&pending, self.replay_turns);
        let client = self.pipeline.client();
        let reply = match self.pipeline.policy() {
            FailurePolicy::Fallback => client.complete(&context).await,
            FailurePolicy::Propagate => client.try_complete(&context).await.map_err(|source| {
                ConversationError::Completion {
                    conversation_id,
                    source,
                }
            })?,
        };

        pending.push(Message::assistant(reply.clone()));
        conversation.commit(pending);

        debug!(
            messages = conversation.message_count(),
            replayed = context.len(),
            "chat turn completed"
        );
        Ok(reply)
    }
}
