//! Error types for the conversation crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `SessionError`: Errors from session store operations
//! - `ConversationError`: Chat turn failures, carried in a `Report`. A
//!   failed greeting wraps the pipeline's own report as its child.

use concierge_ai::LlmError;
use concierge_core::ConversationId;
use std::fmt;

/// Errors from session store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Storage operation failed.
    StorageFailed { reason: String },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StorageFailed { reason } => {
                write!(f, "session storage failed: {reason}")
            }
        }
    }
}

impl std::error::Error for SessionError {}

/// Chat turn errors.
///
/// A turn that fails leaves its conversation untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationError {
    /// The user message was empty or whitespace.
    EmptyInput,
    /// The opening greeting could not be produced. The pipeline failure
    /// is the child report.
    Greeting { conversation_id: ConversationId },
    /// The reply completion failed under the propagate policy.
    Completion {
        conversation_id: ConversationId,
        source: LlmError,
    },
}

impl fmt::Display for ConversationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "user input must not be empty"),
            Self::Greeting { conversation_id } => {
                write!(f, "greeting failed for {conversation_id}")
            }
            Self::Completion {
                conversation_id,
                source,
            } => {
                write!(f, "reply failed for {conversation_id}: {source}")
            }
        }
    }
}

impl std::error::Error for ConversationError {}
