//! LLM plumbing for concierge.
//!
//! This crate turns customer records into customer-facing text:
//!
//! - **Backends**: OpenAI-compatible chat completion over HTTP
//! - **Completion client**: One attempt per call, with a fallback text
//! - **Composer**: Pure prompt templates for each artifact
//! - **Pipeline**: Persona→greeting and spending-profile→offer chains
//!
//! The chat session built on top of the pipeline lives in
//! `concierge-conversation`.

pub mod backend;
pub mod completion;
pub mod composer;
pub mod error;
pub mod openai;
pub mod pipeline;
pub mod prompt;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use backend::{
    LlmBackend, LlmBackendConfig, LlmMessage, LlmProvider, LlmRequest, LlmResponse, MessageRole,
};
pub use completion::{CompletionClient, DEFAULT_FALLBACK};
pub use composer::ArtifactKind;
pub use error::{LlmError, PipelineError, PromptError};
pub use openai::OpenAiBackend;
pub use pipeline::{AnalysisPipeline, FailurePolicy, OfferBundle, PipelineResult};
pub use prompt::{PromptRegistry, PromptTemplate};
