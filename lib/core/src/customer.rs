//! Customer records.
//!
//! A record is a flat mapping from source column name to a scalar value,
//! exactly as it arrives from the tabular customer source. Records are
//! never written back; prompt composition only reads from them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;

/// Columns of the customer source that prompts draw on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CustomerField {
    CustomerId,
    Name,
    Age,
    SeniorCitizen,
    Gender,
    Income,
    Partner,
    Dependents,
    PhoneService,
    InternetService,
    MonthlyCharges,
    DeviceProtection,
    StreamingTv,
    StreamingMovies,
    Contract,
    PaymentMethod,
    TotalCharges,
    TvUsageHours,
    InternetUsageGb,
    PhoneUsageHours,
    PreviousPurchases,
    CardExpiryDate,
    LastPaymentDate,
    SubscriptionStatus,
    FraudSuspected,
}

impl CustomerField {
    /// Returns the column name used by the customer source.
    #[must_use]
    pub const fn column(&self) -> &'static str {
        match self {
            Self::CustomerId => "customerID",
            Self::Name => "Nome",
            Self::Age => "Idade",
            Self::SeniorCitizen => "SeniorCitizen",
            Self::Gender => "gender",
            Self::Income => "RendaReais",
            Self::Partner => "Partner",
            Self::Dependents => "Dependents",
            Self::PhoneService => "PhoneService",
            Self::InternetService => "InternetService",
            Self::MonthlyCharges => "MonthlyCharges",
            Self::DeviceProtection => "DeviceProtection",
            Self::StreamingTv => "StreamingTV",
            Self::StreamingMovies => "StreamingMovies",
            Self::Contract => "Contract",
            Self::PaymentMethod => "PaymentMethod",
            Self::TotalCharges => "TotalCharges",
            Self::TvUsageHours => "TVUsageHours",
            Self::InternetUsageGb => "InternetUsageGB",
            Self::PhoneUsageHours => "PhoneUsageHours",
            Self::PreviousPurchases => "PreviousPurchases",
            Self::CardExpiryDate => "CardExpiryDate",
            Self::LastPaymentDate => "LastPaymentDate",
            Self::SubscriptionStatus => "SubscriptionStatus",
            Self::FraudSuspected => "FraudSuspected",
        }
    }

    /// Returns a human-readable label for prompt text.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::CustomerId => "Customer ID",
            Self::Name => "Name",
            Self::Age => "Age",
            Self::SeniorCitizen => "Senior citizen",
            Self::Gender => "Gender",
            Self::Income => "Monthly income (BRL)",
            Self::Partner => "Partner",
            Self::Dependents => "Dependents",
            Self::PhoneService => "Phone service",
            Self::InternetService => "Internet service",
            Self::MonthlyCharges => "Monthly charges",
            Self::DeviceProtection => "Device protection",
            Self::StreamingTv => "Streaming TV",
            Self::StreamingMovies => "Streaming movies",
            Self::Contract => "Contract",
            Self::PaymentMethod => "Payment method",
            Self::TotalCharges => "Total charges",
            Self::TvUsageHours => "TV usage (hours)",
            Self::InternetUsageGb => "Internet usage (GB)",
            Self::PhoneUsageHours => "Phone usage (hours)",
            Self::PreviousPurchases => "Previous purchases",
            Self::CardExpiryDate => "Card expiry date",
            Self::LastPaymentDate => "Last payment date",
            Self::SubscriptionStatus => "Subscription status",
            Self::FraudSuspected => "Fraud suspected",
        }
    }
}

impl fmt::Display for CustomerField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Errors from reading a customer record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// The column is absent or null.
    MissingField { field: CustomerField },
    /// The column holds an object or array instead of a scalar.
    NotScalar { field: CustomerField },
    /// The payload was not a JSON object.
    NotAnObject,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField { field } => {
                write!(f, "customer record is missing field '{field}'")
            }
            Self::NotScalar { field } => {
                write!(f, "customer field '{field}' must be a scalar value")
            }
            Self::NotAnObject => write!(f, "customer record must be a JSON object"),
        }
    }
}

impl std::error::Error for RecordError {}

/// A single customer's data, keyed by source column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerRecord(Map<String, JsonValue>);

impl CustomerRecord {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Sets a field value.
    #[must_use]
    pub fn with(mut self, field: CustomerField, value: impl Into<JsonValue>) -> Self {
        self.0.insert(field.column().to_string(), value.into());
        self
    }

    /// Returns the field rendered as prompt text.
    ///
    /// Strings are returned verbatim; numbers and booleans use their JSON
    /// spelling. A null value counts as missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the field is absent, null, or not a scalar.
    pub fn text(&self, field: CustomerField) -> Result<String, RecordError> {
        match self.0.get(field.column()) {
            None | Some(JsonValue::Null) => Err(RecordError::MissingField { field }),
            Some(JsonValue::String(s)) => Ok(s.clone()),
            Some(JsonValue::Array(_) | JsonValue::Object(_)) => {
                Err(RecordError::NotScalar { field })
            }
            Some(other) => Ok(other.to_string()),
        }
    }

    /// Returns true if the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<JsonValue> for CustomerRecord {
    type Error = RecordError;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        match value {
            JsonValue::Object(map) => Ok(Self(map)),
            _ => Err(RecordError::NotAnObject),
        }
    }
}
