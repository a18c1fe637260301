//! Error types for the AI crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `LlmError`: Low-level completion backend failures
//! - `PromptError`: Prompt composition failures
//! - `PipelineError`: Analysis pipeline context, carried in a `Report`

use crate::composer::ArtifactKind;
use concierge_core::RecordError;
use std::fmt;

/// Errors from LLM backend operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// The request could not be sent or the connection failed.
    RequestFailed { reason: String },
    /// The endpoint answered with a non-success status.
    Status { status: u16, body: String },
    /// Response parsing failed.
    ResponseParseFailed { reason: String },
    /// The response carried no generated text.
    EmptyResponse,
    /// Timeout waiting for response.
    Timeout,
    /// Rate limit exceeded.
    RateLimited { retry_after_secs: Option<u64> },
    /// The request itself was unusable.
    InvalidRequest { reason: String },
    /// Invalid configuration.
    InvalidConfig { reason: String },
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestFailed { reason } => {
                write!(f, "LLM request failed: {reason}")
            }
            Self::Status { status, body } => {
                write!(f, "LLM endpoint returned HTTP {status}: {body}")
            }
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse LLM response: {reason}")
            }
            Self::EmptyResponse => write!(f, "LLM response contained no text"),
            Self::Timeout => write!(f, "LLM request timed out"),
            Self::RateLimited { retry_after_secs } => {
                if let Some(secs) = retry_after_secs {
                    write!(f, "rate limited, retry after {secs}s")
                } else {
                    write!(f, "rate limited")
                }
            }
            Self::InvalidRequest { reason } => {
                write!(f, "invalid LLM request: {reason}")
            }
            Self::InvalidConfig { reason } => {
                write!(f, "invalid LLM configuration: {reason}")
            }
        }
    }
}

impl std::error::Error for LlmError {}

/// Errors from prompt composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    /// Template not found.
    TemplateNotFound { name: String },
    /// A declared template variable was not supplied.
    MissingVariable { template: String, variable: String },
    /// A customer field required by the template could not be read.
    Field {
        template: String,
        source: RecordError,
    },
}

impl PromptError {
    /// Returns true if the failure is a missing or unusable customer field.
    #[must_use]
    pub fn is_field_error(&self) -> bool {
        matches!(self, Self::Field { .. })
    }
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TemplateNotFound { name } => {
                write!(f, "prompt template not found: {name}")
            }
            Self::MissingVariable { template, variable } => {
                write!(
                    f,
                    "missing required variable '{variable}' in template '{template}'"
                )
            }
            Self::Field { template, source } => {
                write!(f, "cannot compose '{template}' prompt: {source}")
            }
        }
    }
}

impl std::error::Error for PromptError {}

/// Analysis pipeline errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// The prompt for an artifact could not be composed.
    Compose {
        artifact: ArtifactKind,
        source: PromptError,
    },
    /// The completion for an artifact failed and the failure policy
    /// asked for it to be surfaced.
    Completion {
        artifact: ArtifactKind,
        source: LlmError,
    },
}

impl PipelineError {
    /// Returns the artifact whose step failed.
    #[must_use]
    pub fn artifact(&self) -> ArtifactKind {
        match self {
            Self::Compose { artifact, .. } | Self::Completion { artifact, .. } => *artifact,
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compose { source, .. } => write!(f, "{source}"),
            Self::Completion { artifact, source } => {
                write!(f, "{artifact} generation failed: {source}")
            }
        }
    }
}

impl std::error::Error for PipelineError {}
