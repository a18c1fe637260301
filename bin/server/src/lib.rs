//! HTTP API for concierge.
//!
//! Exposes the artifact pipeline and the chat session under `/api`.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
