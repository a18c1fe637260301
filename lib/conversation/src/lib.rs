//! Chat sessions for concierge.
//!
//! This crate provides:
//!
//! - **Conversation**: Append-only history opened by a greeting
//! - **Session Store**: Conversations keyed by ID, with idle sweeping
//! - **Chat Service**: One user turn in, one assistant reply out

pub mod chat;
pub mod error;
pub mod message;
pub mod session;

pub use chat::{ChatService, DEFAULT_REPLAY_TURNS};
pub use error::{ConversationError, SessionError};
pub use message::{Message, Role};
pub use session::{Conversation, ConversationState, InMemorySessionStore, SessionStore};
