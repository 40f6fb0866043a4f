use std::collections::HashMap;

use axum::{
    extract::{Form, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use zuva_core::payment::PaymentError;
use zuva_payments::poller::{is_failed_status, is_paid_status};
use zuva_payments::PaymentSignal;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StripeWebhook {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub object: PaymentIntentObject,
}

#[derive(Debug, Deserialize)]
pub struct PaymentIntentObject {
    pub id: String,
    pub status: String,
    pub metadata: Option<serde_json::Value>,
}

/// POST /v1/webhooks/payments/stripe
/// Receive payment status updates from Stripe. Terminal events are fed to
/// the reconciler; anything it has already settled is a no-op.
pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    Json(payload): Json<StripeWebhook>,
) -> Result<StatusCode, StatusCode> {
    tracing::info!(
        "Received webhook: {} for intent {}",
        payload.type_,
        payload.data.object.id
    );

    let intent_id = payload.data.object.id;
    let signal = match payload.type_.as_str() {
        "payment_intent.succeeded" => PaymentSignal::WebhookSucceeded { intent_id },
        "payment_intent.payment_failed" | "payment_intent.canceled" => {
            PaymentSignal::WebhookFailed { intent_id }
        }
        // Not a terminal event; acknowledge and move on.
        _ => return Ok(StatusCode::OK),
    };

    match state.reconciler.apply(signal).await {
        Ok(outcome) => {
            tracing::info!("Webhook reconciled: {:?}", outcome);
            Ok(StatusCode::OK)
        }
        // An intent we never recorded is not ours to settle; acknowledge so
        // the provider stops retrying.
        Err(PaymentError::Validation(msg)) => {
            tracing::warn!("Webhook for unknown intent ignored: {}", msg);
            Ok(StatusCode::OK)
        }
        Err(e) => {
            tracing::error!("Webhook reconciliation failed: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// POST /v1/webhooks/payments/paynow
/// The gateway posts the attempt status to the merchant's result URL as a
/// urlencoded form. Push twin of the poller; both funnel into the
/// reconciler, so a callback landing after a poll (or vice versa) is a
/// no-op.
pub async fn handle_paynow_result(
    State(state): State<AppState>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<StatusCode, StatusCode> {
    let fields: HashMap<String, String> = form
        .into_iter()
        .map(|(key, value)| (key.to_ascii_lowercase(), value))
        .collect();

    let Some(poll_url) = fields.get("pollurl").cloned() else {
        tracing::warn!("Paynow callback without a poll URL ignored");
        return Ok(StatusCode::OK);
    };
    let status = fields
        .get("status")
        .map(|s| s.trim().to_ascii_lowercase())
        .unwrap_or_default();

    let signal = if is_paid_status(&status) {
        PaymentSignal::GatewayPaid { poll_url }
    } else if is_failed_status(&status) {
        PaymentSignal::GatewayFailed { poll_url, status }
    } else {
        // Not terminal; the poller will pick it up.
        return Ok(StatusCode::OK);
    };

    match state.reconciler.apply(signal).await {
        Ok(outcome) => {
            tracing::info!("Paynow callback reconciled: {:?}", outcome);
            Ok(StatusCode::OK)
        }
        Err(PaymentError::Validation(msg)) => {
            tracing::warn!("Paynow callback for unknown attempt ignored: {}", msg);
            Ok(StatusCode::OK)
        }
        Err(e) => {
            tracing::error!("Paynow callback reconciliation failed: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
