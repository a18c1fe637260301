//! Prompt composition for customer artifacts.
//!
//! One pure function per artifact. Each reads the customer fields its
//! template needs, embeds their values verbatim, and fails on the first
//! missing field instead of substituting a placeholder. Chained artifacts
//! additionally take the text generated by the previous step.

use crate::error::PromptError;
use crate::prompt::{PromptRegistry, PromptTemplate};
use concierge_core::{CustomerField, CustomerRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// The kinds of text the pipeline derives from a customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Persona,
    Greeting,
    SpendingProfile,
    Offer,
    Notification,
    PaymentStatus,
}

impl ArtifactKind {
    /// Returns the template name for this artifact.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Persona => "persona",
            Self::Greeting => "greeting",
            Self::SpendingProfile => "spending_profile",
            Self::Offer => "offer",
            Self::Notification => "notification",
            Self::PaymentStatus => "payment_status",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields used to classify the persona.
pub const PERSONA_FIELDS: &[CustomerField] = &[
    CustomerField::Name,
    CustomerField::Age,
    CustomerField::SeniorCitizen,
    CustomerField::Gender,
];

/// Billing and usage fields used for the spending profile.
pub const SPENDING_FIELDS: &[CustomerField] = &[
    CustomerField::CustomerId,
    CustomerField::Name,
    CustomerField::Age,
    CustomerField::Income,
    CustomerField::Partner,
    CustomerField::Dependents,
    CustomerField::PhoneService,
    CustomerField::InternetService,
    CustomerField::MonthlyCharges,
    CustomerField::DeviceProtection,
    CustomerField::StreamingTv,
    CustomerField::StreamingMovies,
    CustomerField::Contract,
    CustomerField::PaymentMethod,
    CustomerField::TotalCharges,
    CustomerField::TvUsageHours,
    CustomerField::InternetUsageGb,
    CustomerField::PhoneUsageHours,
    CustomerField::PreviousPurchases,
];

/// Payment metadata used for the payment-status message.
pub const PAYMENT_FIELDS: &[CustomerField] = &[
    CustomerField::Name,
    CustomerField::PaymentMethod,
    CustomerField::CardExpiryDate,
    CustomerField::LastPaymentDate,
    CustomerField::SubscriptionStatus,
    CustomerField::FraudSuspected,
];

const PERSONA_TEMPLATE: &str = "\
Based on the customer information below, identify the customer's persona.

{{customer_profile}}

The personas are:
- Persona Dona Maria: a 70-year-old woman who has trouble reading the app and needs clear, friendly communication.
- Persona Nicolas: a 20-year-old who likes to explore every feature of the app and prefers casual, dynamic communication.

Answer with a description of the persona (Dona Maria or Nicolas).";

const GREETING_TEMPLATE: &str = "\
Based on the information below, write only a suitable, friendly greeting for the customer. Do not mention the persona explicitly.

Customer name: {{name}}
Persona: {{persona}}

Instructions:
- For an older customer (like Dona Maria), use clear, warm and formal communication.
- For a young customer (like Nicolas), use casual, friendly and dynamic communication.

Do not include persona details in the greeting, only the right tone and a friendly greeting.

Always use the customer's name, never the persona's name.";

const SPENDING_PROFILE_TEMPLATE: &str = "\
Analyze the customer information below and identify the customer's purchasing and spending profile.

{{customer_profile}}

Answer with a description of the customer's purchasing and spending profile.";

const OFFER_TEMPLATE: &str = "\
Based on the information below, suggest the best offer for the customer.

Spending profile analysis: {{spending_profile}}

Answer with the best offer for this customer. The customer's TotalCharges must not change significantly, and the price must be compatible with the customer's income (RendaReais).";

const NOTIFICATION_TEMPLATE: &str = "\
Based on the information below, write a personalized offer notification for the customer.

Spending profile analysis: {{spending_profile}}

Structure the notification as follows:
- A short, catchy title that highlights the offer. Ask an engaging question in the title.
- An attention-grabbing opening sentence that gets the customer interested in the offer. Avoid sounding like a scam.
- A clear, detailed description of the offer, explaining how it fits the customer's profile.
- A closing line inviting the customer to take the offer.
- Keep the text short and avoid the word \"conservative\".

Make sure the customer's TotalCharges does not change significantly and that the price is compatible with the customer's monthly income ({{income}}).

Answer only with the formatted notification.";

const PAYMENT_STATUS_TEMPLATE: &str = "\
You are a virtual assistant that reviews customers' payment status and sends proactive reminders to avoid service interruptions.

Customer information:

{{customer_profile}}

Look for possible payment problems, such as:
- Expired card
- Subscription not renewed or suspended
- No recent payment
- Suspected fraud

If there is a problem, write a clear, friendly notification asking the customer to fix it. If everything is in order, tell the customer that their account is up to date.

Answer with a clear, proactive message.";

static REGISTRY: LazyLock<PromptRegistry> = LazyLock::new(|| {
    let mut registry = PromptRegistry::new();
    registry.register(
        PromptTemplate::new(ArtifactKind::Persona.as_str(), PERSONA_TEMPLATE)
            .with_variable("customer_profile", "Name, age, senior flag and gender"),
    );
    registry.register(
        PromptTemplate::new(ArtifactKind::Greeting.as_str(), GREETING_TEMPLATE)
            .with_variable("name", "Customer name")
            .with_variable("persona", "Generated persona description"),
    );
    registry.register(
        PromptTemplate::new(ArtifactKind::SpendingProfile.as_str(), SPENDING_PROFILE_TEMPLATE)
            .with_variable("customer_profile", "Billing and usage fields"),
    );
    registry.register(
        PromptTemplate::new(ArtifactKind::Offer.as_str(), OFFER_TEMPLATE)
            .with_variable("spending_profile", "Generated spending profile"),
    );
    registry.register(
        PromptTemplate::new(ArtifactKind::Notification.as_str(), NOTIFICATION_TEMPLATE)
            .with_variable("spending_profile", "Generated spending profile")
            .with_variable("income", "Customer monthly income"),
    );
    registry.register(
        PromptTemplate::new(ArtifactKind::PaymentStatus.as_str(), PAYMENT_STATUS_TEMPLATE)
            .with_variable("customer_profile", "Payment fields"),
    );
    registry
});

/// Returns the built-in template registry.
#[must_use]
pub fn registry() -> &'static PromptRegistry {
    &REGISTRY
}

fn field(
    artifact: ArtifactKind,
    customer: &CustomerRecord,
    field: CustomerField,
) -> Result<String, PromptError> {
    customer.text(field).map_err(|source| PromptError::Field {
        template: artifact.as_str().to_string(),
        source,
    })
}

/// Renders `fields` as `- Label: value` lines.
fn profile_block(
    artifact: ArtifactKind,
    customer: &CustomerRecord,
    fields: &[CustomerField],
) -> Result<String, PromptError> {
    let lines = fields
        .iter()
        .map(|f| Ok(format!("- {}: {}", f.label(), field(artifact, customer, *f)?)))
        .collect::<Result<Vec<_>, PromptError>>()?;
    Ok(lines.join("\n"))
}

fn render(artifact: ArtifactKind, variables: HashMap<&str, String>) -> Result<String, PromptError> {
    REGISTRY.render(artifact.as_str(), &variables)
}

/// Composes the persona classification prompt.
///
/// # Errors
///
/// Returns an error if a persona field is missing.
pub fn persona_prompt(customer: &CustomerRecord) -> Result<String, PromptError> {
    let artifact = ArtifactKind::Persona;
    let profile = profile_block(artifact, customer, PERSONA_FIELDS)?;
    render(artifact, HashMap::from([("customer_profile", profile)]))
}

/// Composes the greeting prompt from the generated persona.
///
/// # Errors
///
/// Returns an error if the customer name is missing.
pub fn greeting_prompt(customer: &CustomerRecord, persona: &str) -> Result<String, PromptError> {
    let artifact = ArtifactKind::Greeting;
    let name = field(artifact, customer, CustomerField::Name)?;
    render(
        artifact,
        HashMap::from([("name", name), ("persona", persona.to_string())]),
    )
}

/// Composes the spending-profile analysis prompt.
///
/// # Errors
///
/// Returns an error if a billing or usage field is missing.
pub fn spending_profile_prompt(customer: &CustomerRecord) -> Result<String, PromptError> {
    let artifact = ArtifactKind::SpendingProfile;
    let profile = profile_block(artifact, customer, SPENDING_FIELDS)?;
    render(artifact, HashMap::from([("customer_profile", profile)]))
}

/// Composes the offer suggestion prompt from the generated spending profile.
///
/// # Errors
///
/// Never fails for the built-in template; the signature matches the other
/// composers.
pub fn offer_prompt(spending_profile: &str) -> Result<String, PromptError> {
    render(
        ArtifactKind::Offer,
        HashMap::from([("spending_profile", spending_profile.to_string())]),
    )
}

/// Composes the offer notification prompt.
///
/// # Errors
///
/// Returns an error if the customer income is missing.
pub fn notification_prompt(
    customer: &CustomerRecord,
    spending_profile: &str,
) -> Result<String, PromptError> {
    let artifact = ArtifactKind::Notification;
    let income = field(artifact, customer, CustomerField::Income)?;
    render(
        artifact,
        HashMap::from([
            ("spending_profile", spending_profile.to_string()),
            ("income", income),
        ]),
    )
}

/// Composes the payment-status review prompt.
///
/// # Errors
///
/// Returns an error if a payment field is missing.
pub fn payment_status_prompt(customer: &CustomerRecord) -> Result<String, PromptError> {
    let artifact = ArtifactKind::PaymentStatus;
    let profile = profile_block(artifact, customer, PAYMENT_FIELDS)?;
    render(artifact, HashMap::from([("customer_profile", profile)]))
}
