use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payment backends the engine can route an attempt to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    Stripe,
    Paynow,
}

impl PaymentProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProvider::Stripe => "stripe",
            PaymentProvider::Paynow => "paynow",
        }
    }
}

impl std::fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Authentication required: {0}")]
    Authentication(String),
    #[error("Provider rejected payment: {0}")]
    Provider(String),
    #[error("Transport failure: {0}")]
    Transport(String),
    #[error("Storage failure: {0}")]
    Storage(String),
}

/// A named line on a mobile-money invoice (e.g. "Safari Lodge - 2 nights").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub amount: f64,
}

/// The amount actually charged for a request: line items override the flat
/// amount when present.
pub fn charged_amount(request: &PaymentRequest) -> f64 {
    match &request.items {
        Some(items) if !items.is_empty() => items.iter().map(|item| item.amount).sum(),
        _ => request.amount,
    }
}

/// Normalized input to the orchestrator. Built fresh per attempt; the
/// `reference` string is the only identity it carries and must be unique
/// per attempt on the merchant side.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentRequest {
    pub amount: f64,
    pub reference: String,
    pub email: String,
    pub phone: Option<String>,
    pub items: Option<Vec<LineItem>>,
    pub description: Option<String>,
    pub return_url: Option<String>,
    pub booking_id: Option<Uuid>,
    /// Set by the API layer from the bearer session. Required for card
    /// payments; absent for anonymous mobile-money checkouts.
    pub customer_id: Option<String>,
}

/// Normalized initiation result returned to the caller, tagged by provider.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum PaymentResponse {
    MobileMoney {
        redirect_url: String,
        poll_url: String,
        reference: String,
    },
    Card {
        payment_intent_id: String,
        client_secret: String,
    },
}

/// What a provider adapter produced for one initiation call. A declined
/// attempt is a normal outcome here, not an error; only transport and
/// credential problems surface as `PaymentError`.
#[derive(Debug, Clone)]
pub enum InitiateOutcome {
    MobileMoney {
        redirect_url: String,
        poll_url: String,
    },
    Card {
        payment_intent_id: String,
        client_secret: String,
    },
    Declined {
        error: String,
    },
}

/// Lifecycle of one persisted payment attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentAttemptStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl PaymentAttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentAttemptStatus::Pending => "pending",
            PaymentAttemptStatus::Processing => "processing",
            PaymentAttemptStatus::Completed => "completed",
            PaymentAttemptStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentAttemptStatus::Pending),
            "processing" => Some(PaymentAttemptStatus::Processing),
            "completed" => Some(PaymentAttemptStatus::Completed),
            "failed" => Some(PaymentAttemptStatus::Failed),
            _ => None,
        }
    }

    /// Terminal statuses admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentAttemptStatus::Completed | PaymentAttemptStatus::Failed
        )
    }
}

/// One payment attempt against a booking. Retries produce new rows; rows
/// are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Option<Uuid>,
    pub amount_minor: i64,
    pub provider: PaymentProvider,
    pub provider_reference: String,
    pub poll_url: Option<String>,
    pub payment_intent_id: Option<String>,
    pub client_secret: Option<String>,
    pub status: PaymentAttemptStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(
        booking_id: Option<Uuid>,
        amount_minor: i64,
        provider: PaymentProvider,
        provider_reference: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            booking_id,
            amount_minor,
            provider,
            provider_reference,
            poll_url: None,
            payment_intent_id: None,
            client_secret: None,
            status: PaymentAttemptStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Three-state polling outcome. Transport failures are NOT folded in here;
/// they propagate as `Err` so callers can tell "still pending" from
/// "poll failed".
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum PollOutcome {
    Pending { status: String },
    Paid,
    Failed { status: String },
}

/// Capability seam between the orchestrator and an external payment SDK.
/// Adapters are constructed with their credentials and injected, so tests
/// can substitute doubles.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Start one payment attempt with the provider.
    async fn initiate(&self, request: &PaymentRequest) -> Result<InitiateOutcome, PaymentError>;

    /// Query the provider for the current status of an attempt, given the
    /// opaque poll handle issued at initiation. Returns the provider's raw
    /// status string.
    async fn poll_status(&self, _poll_url: &str) -> Result<String, PaymentError> {
        Err(PaymentError::Provider(
            "status polling not supported by this provider".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_status_round_trips_strings() {
        for status in [
            PaymentAttemptStatus::Pending,
            PaymentAttemptStatus::Processing,
            PaymentAttemptStatus::Completed,
            PaymentAttemptStatus::Failed,
        ] {
            assert_eq!(PaymentAttemptStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PaymentAttemptStatus::parse("refunded"), None);
    }

    #[test]
    fn items_override_flat_amount() {
        let mut request = PaymentRequest {
            amount: 150.0,
            ..Default::default()
        };
        assert_eq!(charged_amount(&request), 150.0);

        request.items = Some(vec![
            LineItem { name: "Lodge".to_string(), amount: 120.0 },
            LineItem { name: "Game drive".to_string(), amount: 35.5 },
        ]);
        assert_eq!(charged_amount(&request), 155.5);

        request.items = Some(vec![]);
        assert_eq!(charged_amount(&request), 150.0);
    }

    #[test]
    fn terminal_statuses() {
        assert!(PaymentAttemptStatus::Completed.is_terminal());
        assert!(PaymentAttemptStatus::Failed.is_terminal());
        assert!(!PaymentAttemptStatus::Pending.is_terminal());
        assert!(!PaymentAttemptStatus::Processing.is_terminal());
    }
}
