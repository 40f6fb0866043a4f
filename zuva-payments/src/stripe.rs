use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use zuva_core::payment::{InitiateOutcome, PaymentError, PaymentRequest, ProviderAdapter};

/// Connection settings for the Stripe REST API.
#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub api_base: String,
    pub timeout_ms: u64,
}

/// Card-payment adapter. Creates a server-side payment intent and hands the
/// client secret back; the actual charge is confirmed client-side with that
/// secret, then reported through the webhook or the client-confirmation
/// endpoint.
pub struct StripeAdapter {
    http: reqwest::Client,
    config: StripeConfig,
}

#[derive(Debug, Deserialize)]
struct IntentReply {
    id: String,
    client_secret: String,
}

#[derive(Debug, Deserialize)]
struct ErrorReply {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl StripeAdapter {
    pub fn new(config: StripeConfig) -> Result<Self, PaymentError> {
        let timeout_ms = if config.timeout_ms > 0 {
            config.timeout_ms
        } else {
            15_000
        };
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| PaymentError::Transport(e.to_string()))?;
        Ok(Self { http, config })
    }
}

/// Convert a USD amount to integer cents, rounding half up at the cent
/// boundary. 19.999 becomes 2000, not 1999.
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0 + 0.5).floor() as i64
}

#[async_trait]
impl ProviderAdapter for StripeAdapter {
    async fn initiate(&self, request: &PaymentRequest) -> Result<InitiateOutcome, PaymentError> {
        let amount_minor = to_minor_units(request.amount);

        let mut form: Vec<(String, String)> = vec![
            ("amount".to_string(), amount_minor.to_string()),
            ("currency".to_string(), "usd".to_string()),
            ("receipt_email".to_string(), request.email.clone()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];
        if let Some(description) = &request.description {
            form.push(("description".to_string(), description.clone()));
        }
        // Metadata carries booking and user identifiers for later
        // reconciliation of webhook events.
        if let Some(booking_id) = request.booking_id {
            form.push(("metadata[booking_id]".to_string(), booking_id.to_string()));
        }
        if let Some(customer_id) = &request.customer_id {
            form.push(("metadata[user_id]".to_string(), customer_id.clone()));
        }
        form.push((
            "metadata[reference]".to_string(),
            request.reference.clone(),
        ));

        let url = format!("{}/v1/payment_intents", self.config.api_base);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        if response.status().is_success() {
            let reply: IntentReply = response
                .json()
                .await
                .map_err(|e| PaymentError::Transport(e.to_string()))?;
            tracing::info!(intent_id = %reply.id, amount_minor, "created payment intent");
            Ok(InitiateOutcome::Card {
                payment_intent_id: reply.id,
                client_secret: reply.client_secret,
            })
        } else {
            let status = response.status();
            let message = match response.json::<ErrorReply>().await {
                Ok(reply) => reply
                    .error
                    .message
                    .unwrap_or_else(|| format!("intent creation failed ({})", status)),
                Err(_) => format!("intent creation failed ({})", status),
            };
            tracing::warn!(%status, "payment intent rejected: {}", message);
            Err(PaymentError::Provider(message))
        }
    }
}
