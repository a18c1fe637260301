//! Message types for conversations.

use chrono::{DateTime, Utc};
use concierge_ai::LlmMessage;
use concierge_core::MessageId;
use serde::{Deserialize, Serialize};

/// Who sent a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The customer.
    User,
    /// The model, including the opening greeting.
    Assistant,
}

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier.
    pub id: MessageId,
    /// Message role.
    pub role: Role,
    /// Message content.
    pub content: String,
    /// When the message was created.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Creates a new message.
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

impl From<&Message> for LlmMessage {
    fn from(message: &Message) -> Self {
        match message.role {
            Role::User => Self::user(message.content.clone()),
            Role::Assistant => Self::assistant(message.content.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_ai::MessageRole;

    #[test]
    fn message_creation() {
        let msg = Message::user("Hello!");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello!");
    }

    #[test]
    fn converts_to_wire_message() {
        let wire = LlmMessage::from(&Message::assistant("Good morning, Maria!"));
        assert_eq!(wire.role, MessageRole::Assistant);
        assert_eq!(wire.content, "Good morning, Maria!");
    }

    #[test]
    fn message_serde_roundtrip() {
        let msg = Message::assistant("Here's your offer.");

        let json = serde_json::to_string(&msg).expect("serialize");
        assert!(json.contains("\"role\":\"assistant\""));
        let parsed: Message = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(msg, parsed);
    }
}
