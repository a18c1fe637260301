//! Conversation sessions.
//!
//! A conversation is an append-only message history that opens with an
//! assistant greeting and then alternates user and assistant messages.
//! Sessions live only in memory and are swept once idle.

use crate::error::SessionError;
use crate::message::{Message, Role};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use concierge_ai::LlmMessage;
use concierge_core::ConversationId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use tokio::sync::Mutex;
use tracing::debug;

/// The state of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    /// No greeting yet.
    Empty,
    /// Greeting sent; accepting turns.
    Active,
}

/// A single caller's chat history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation identifier.
    pub id: ConversationId,
    messages: Vec<Message>,
    /// When the conversation was created.
    pub created_at: DateTime<Utc>,
    /// When a turn last completed.
    pub last_active_at: DateTime<Utc>,
}

impl Conversation {
    /// Creates an empty conversation with a fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        Self::with_id(ConversationId::new())
    }

    /// Creates an empty conversation with the given identifier.
    #[must_use]
    pub fn with_id(id: ConversationId) -> Self {
        let now = Utc::now();
        Self {
            id,
            messages: Vec::new(),
            created_at: now,
            last_active_at: now,
        }
    }

    /// Returns the conversation state.
    #[must_use]
    pub fn state(&self) -> ConversationState {
        if self.messages.is_empty() {
            ConversationState::Empty
        } else {
            ConversationState::Active
        }
    }

    /// Returns the full history, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the number of messages.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Returns the last message, if any.
    #[must_use]
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Returns true if no turn has completed since `cutoff`.
    #[must_use]
    pub fn is_idle_since(&self, cutoff: DateTime<Utc>) -> bool {
        self.last_active_at < cutoff
    }

    /// Builds the context for the next reply: the stored history followed by
    /// `pending`, which must end with the new user message.
    ///
    /// With a window of `n` turns, only the opening greeting and the last
    /// `n` user turns are replayed.
    pub(crate) fn replay(
        &self,
        pending: &[Message],
        window: Option<NonZeroUsize>,
    ) -> Vec<LlmMessage> {
        let history: Vec<&Message> = self.messages.iter().chain(pending).collect();
        let Some((greeting, rest)) = history.split_first() else {
            return Vec::new();
        };

        let keep = match window {
            Some(turns) => rest.len().min(turns.get().saturating_mul(2) - 1),
            None => rest.len(),
        };

        std::iter::once(*greeting)
            .chain(rest[rest.len() - keep..].iter().copied())
            .map(LlmMessage::from)
            .collect()
    }

    /// Appends a completed turn.
    pub(crate) fn commit(&mut self, turn: Vec<Message>) {
        debug_assert!(
            turn.iter()
                .zip(self.expected_roles())
                .all(|(message, role)| message.role == role),
            "turn breaks role alternation"
        );
        self.messages.extend(turn);
        self.last_active_at = Utc::now();
    }

    fn expected_roles(&self) -> impl Iterator<Item = Role> {
        let start_with_assistant = self.messages.len() % 2 == 0;
        [Role::Assistant, Role::User]
            .into_iter()
            .cycle()
            .skip(usize::from(!start_with_assistant))
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for conversation storage.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Gets a conversation by ID.
    async fn get(&self, id: ConversationId) -> Result<Option<Conversation>, SessionError>;

    /// Stores a conversation, replacing any previous version.
    async fn put(&self, conversation: Conversation) -> Result<(), SessionError>;

    /// Removes conversations idle since before `older_than`, returning how
    /// many were removed.
    async fn remove_idle(&self, older_than: DateTime<Utc>) -> Result<usize, SessionError>;
}

/// Process-local session store.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    conversations: Mutex<HashMap<ConversationId, Conversation>>,
}

impl InMemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored conversations.
    pub async fn len(&self) -> usize {
        self.conversations.lock().await.len()
    }

    /// Returns true if the store holds no conversations.
    pub async fn is_empty(&self) -> bool {
        self.conversations.lock().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, id: ConversationId) -> Result<Option<Conversation>, SessionError> {
        Ok(self.conversations.lock().await.get(&id).cloned())
    }

    async fn put(&self, conversation: Conversation) -> Result<(), SessionError> {
        self.conversations
            .lock()
            .await
            .insert(conversation.id, conversation);
        Ok(())
    }

    async fn remove_idle(&self, older_than: DateTime<Utc>) -> Result<usize, SessionError> {
        let mut conversations = self.conversations.lock().await;
        let before = conversations.len();
        conversations.retain(|_, conversation| !conversation.is_idle_since(older_than));
        let removed = before - conversations.len();

        debug!(removed, remaining = conversations.len(), "swept idle conversations");
        Ok(removed)
    }
}
