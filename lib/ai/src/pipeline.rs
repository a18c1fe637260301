//! Customer analysis pipeline.
//!
//! Chains single-prompt completions into the customer-facing artifacts.
//! Chained steps run strictly in sequence because each prompt embeds the
//! previous step's output verbatim, fallback text included.

use crate::backend::LlmMessage;
use crate::completion::CompletionClient;
use crate::composer::{self, ArtifactKind};
use crate::error::{PipelineError, PromptError};
use concierge_core::CustomerRecord;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Result type for pipeline operations.
pub type PipelineResult<T> = concierge_core::Result<T, PipelineError>;

/// What a step does when its completion fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Substitute the fallback text and keep going.
    #[default]
    Fallback,
    /// Stop and return the completion error.
    Propagate,
}

/// The three texts derived from one spending-profile analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferBundle {
    pub spending_profile: String,
    pub offer: String,
    pub notification: String,
}

/// Produces persona, greeting, offer and payment texts for a customer.
#[derive(Debug, Clone)]
pub struct AnalysisPipeline {
    client: CompletionClient,
    policy: FailurePolicy,
}

impl AnalysisPipeline {
    /// Creates a pipeline with the default failure policy.
    #[must_use]
    pub fn new(client: CompletionClient) -> Self {
        Self {
            client,
            policy: FailurePolicy::default(),
        }
    }

    /// Sets the failure policy.
    #[must_use]
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the completion client.
    #[must_use]
    pub fn client(&self) -> &CompletionClient {
        &self.client
    }

    /// Returns the failure policy.
    #[must_use]
    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Runs a single completion for `prompt` under the failure policy.
    async fn step(
        &self,
        artifact: ArtifactKind,
        prompt: Result<String, PromptError>,
    ) -> PipelineResult<String> {
        let prompt = prompt.map_err(|source| PipelineError::Compose { artifact, source })?;
        let messages = [LlmMessage::user(prompt)];

        let text = match self.policy {
            FailurePolicy::Fallback => self.client.complete(&messages).await,
            FailurePolicy::Propagate => self
                .client
                .try_complete(&messages)
                .await
                .map_err(|source| PipelineError::Completion { artifact, source })?,
        };

        debug!(%artifact, chars = text.len(), "artifact generated");
        Ok(text)
    }

    /// Classifies the customer into a persona.
    ///
    /// # Errors
    ///
    /// Returns an error if a persona field is missing, or if the completion
    /// fails under [`FailurePolicy::Propagate`].
    #[instrument(skip_all)]
    pub async fn persona(&self, customer: &CustomerRecord) -> PipelineResult<String> {
        self.step(ArtifactKind::Persona, composer::persona_prompt(customer))
            .await
    }

    /// Generates a persona-toned greeting. Runs the persona step first.
    ///
    /// # Errors
    ///
    /// Returns an error if a required field is missing, or if a completion
    /// fails under [`FailurePolicy::Propagate`].
    #[instrument(skip_all)]
    pub async fn greeting(&self, customer: &CustomerRecord) -> PipelineResult<String> {
        let persona = self.persona(customer).await?;
        self.step(
            ArtifactKind::Greeting,
            composer::greeting_prompt(customer, &persona),
        )
        .await
    }

    /// Describes the customer's purchasing and spending profile.
    ///
    /// # Errors
    ///
    /// Returns an error if a billing or usage field is missing, or if the
    /// completion fails under [`FailurePolicy::Propagate`].
    #[instrument(skip_all)]
    pub async fn spending_profile(&self, customer: &CustomerRecord) -> PipelineResult<String> {
        self.step(
            ArtifactKind::SpendingProfile,
            composer::spending_profile_prompt(customer),
        )
        .await
    }

    /// Suggests an offer. Runs a fresh spending-profile step first.
    ///
    /// # Errors
    ///
    /// Returns an error if a required field is missing, or if a completion
    /// fails under [`FailurePolicy::Propagate`].
    #[instrument(skip_all)]
    pub async fn offer(&self, customer: &CustomerRecord) -> PipelineResult<String> {
        let profile = self.spending_profile(customer).await?;
        self.step(ArtifactKind::Offer, composer::offer_prompt(&profile))
            .await
    }

    /// Writes the offer notification. Runs a fresh spending-profile step
    /// first.
    ///
    /// # Errors
    ///
    /// Returns an error if a required field is missing, or if a completion
    /// fails under [`FailurePolicy::Propagate`].
    #[instrument(skip_all)]
    pub async fn notification(&self, customer: &CustomerRecord) -> PipelineResult<String> {
        let profile = self.spending_profile(customer).await?;
        self.step(
            ArtifactKind::Notification,
            composer::notification_prompt(customer, &profile),
        )
        .await
    }

    /// Produces the offer and the notification from a single shared
    /// spending-profile analysis.
    ///
    /// # Errors
    ///
    /// Returns an error if a required field is missing, or if a completion
    /// fails under [`FailurePolicy::Propagate`].
    #[instrument(skip_all)]
    pub async fn offer_bundle(&self, customer: &CustomerRecord) -> PipelineResult<OfferBundle> {
        // Compose the notification prompt up front so a missing income
        // field fails before any completion is spent.
        composer::notification_prompt(customer, "").map_err(|source| {
            PipelineError::Compose {
                artifact: ArtifactKind::Notification,
                source,
            }
        })?;

        let spending_profile = self.spending_profile(customer).await?;
        let offer = self
            .step(ArtifactKind::Offer, composer::offer_prompt(&spending_profile))
            .await?;
        let notification = self
            .step(
                ArtifactKind::Notification,
                composer::notification_prompt(customer, &spending_profile),
            )
            .await?;

        Ok(OfferBundle {
            spending_profile,
            offer,
            notification,
        })
    }

    /// Reviews payment metadata and writes a reminder or an all-clear.
    ///
    /// # Errors
    ///
    /// Returns an error if a payment field is missing, or if the completion
    /// fails under [`FailurePolicy::Propagate`].
    #[instrument(skip_all)]
    pub async fn payment_status(&self, customer: &CustomerRecord) -> PipelineResult<String> {
        self.step(
            ArtifactKind::PaymentStatus,
            composer::payment_status_prompt(customer),
        )
        .await
    }
}
