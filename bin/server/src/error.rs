//! HTTP error responses.
//!
//! Domain errors from the pipeline and chat layers are mapped to status
//! codes here; every error body is `{"error": description}`.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use concierge_ai::PipelineError;
use concierge_conversation::{ConversationError, SessionError};
use rootcause::prelude::Report;
use serde_json::json;
use std::fmt;

/// Errors returned by API handlers.
#[derive(Debug)]
pub enum ApiError {
    /// The request body was unusable.
    BadRequest { reason: String },
    /// A pipeline step failed.
    Pipeline(Report<PipelineError>),
    /// A chat turn failed.
    Conversation(Report<ConversationError>),
    /// The session store failed.
    Session(SessionError),
}

impl ApiError {
    /// Returns the response status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Pipeline(report) => pipeline_status(report.current_context()),
            Self::Conversation(report) => match report.current_context() {
                ConversationError::EmptyInput => StatusCode::BAD_REQUEST,
                ConversationError::Completion { .. } => StatusCode::BAD_GATEWAY,
                ConversationError::Greeting { .. } => report
                    .iter_reports()
                    .find_map(|node| node.downcast_current_context::<PipelineError>())
                    .map_or(StatusCode::INTERNAL_SERVER_ERROR, pipeline_status),
            },
            Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn pipeline_status(error: &PipelineError) -> StatusCode {
    match error {
        PipelineError::Completion { .. } => StatusCode::BAD_GATEWAY,
        PipelineError::Compose { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Writes every context in the report tree on one line, outermost first.
fn write_chain<C>(f: &mut fmt::Formatter<'_>, report: &Report<C>) -> fmt::Result {
    for (depth, node) in report.iter_reports().enumerate() {
        if depth > 0 {
            f.write_str(": ")?;
        }
        write!(f, "{}", node.format_current_context())?;
    }
    Ok(())
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadRequest { reason } => write!(f, "{reason}"),
            Self::Pipeline(report) => write_chain(f, report),
            Self::Conversation(report) => write_chain(f, report),
            Self::Session(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<Report<PipelineError>> for ApiError {
    fn from(report: Report<PipelineError>) -> Self {
        Self::Pipeline(report)
    }
}

impl From<Report<ConversationError>> for ApiError {
    fn from(report: Report<ConversationError>) -> Self {
        Self::Conversation(report)
    }
}

impl From<SessionError> for ApiError {
    fn from(error: SessionError) -> Self {
        Self::Session(error)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest {
            reason: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
