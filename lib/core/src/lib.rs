//! Core domain types and utilities for concierge.
//!
//! This crate provides the foundational types shared by the AI pipeline,
//! the conversation service and the HTTP server: the rootcause `Result`
//! alias, typed IDs and the customer record.

pub mod customer;
pub mod error;
pub mod id;

pub use customer::{CustomerField, CustomerRecord, RecordError};
pub use error::Result;
pub use id::{ConversationId, InvocationId, MessageId, ParseIdError};
