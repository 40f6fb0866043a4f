use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use zuva_core::payment::{LineItem, PaymentProvider, PaymentRequest, PaymentResponse, PollOutcome};
use zuva_payments::stripe::to_minor_units;

use crate::error::AppError;
use crate::middleware::auth::CustomerClaims;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CardIntentRequest {
    pub booking_id: Uuid,
    pub amount: f64,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CardIntentResponse {
    pub client_secret: String,
    pub payment_intent_id: String,
}

#[derive(Debug, Deserialize)]
pub struct MobileMoneyRequest {
    pub email: String,
    pub phone: String,
    pub amount: f64,
    pub reference: String,
    pub items: Option<Vec<LineItem>>,
    pub return_url: Option<String>,
    pub booking_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct MobileMoneyResponse {
    pub success: bool,
    pub redirect_url: String,
    pub poll_url: String,
    pub reference: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub poll_url: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub paid: bool,
    pub status: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/payments/card-intent
/// Create a card payment intent for a booking (bearer auth).
pub async fn create_card_intent(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Json(req): Json<CardIntentRequest>,
) -> Result<Json<CardIntentResponse>, AppError> {
    let booking = state
        .bookings
        .get_booking(req.booking_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or_else(|| AppError::NotFoundError("booking not found".to_string()))?;

    if booking.user_id != claims.sub {
        return Err(AppError::AuthorizationError(
            "booking does not belong to you".to_string(),
        ));
    }

    // The intent must charge exactly what the booking costs; a mismatched
    // amount would still confirm the booking through the webhook.
    if to_minor_units(req.amount) != booking.total_price_minor {
        return Err(AppError::ValidationError(
            "amount does not match the booking total".to_string(),
        ));
    }

    let request = PaymentRequest {
        amount: req.amount,
        // One reference per attempt keeps retries distinguishable upstream.
        reference: format!("card-{}-{}", req.booking_id.simple(), Uuid::new_v4().simple()),
        email: claims.email.clone(),
        description: req.description,
        booking_id: Some(req.booking_id),
        customer_id: Some(claims.sub),
        ..Default::default()
    };

    let response = state
        .orchestrator
        .process_payment(PaymentProvider::Stripe, request)
        .await?;

    match response {
        PaymentResponse::Card {
            client_secret,
            payment_intent_id,
        } => Ok(Json(CardIntentResponse {
            client_secret,
            payment_intent_id,
        })),
        other => Err(AppError::InternalServerError(format!(
            "unexpected orchestrator response: {:?}",
            other
        ))),
    }
}

/// POST /v1/payments/mobile-money
/// Initiate a mobile money payment.
pub async fn create_mobile_money_payment(
    State(state): State<AppState>,
    Json(req): Json<MobileMoneyRequest>,
) -> Result<Json<MobileMoneyResponse>, AppError> {
    let request = PaymentRequest {
        amount: req.amount,
        reference: req.reference,
        email: req.email,
        phone: Some(req.phone),
        items: req.items,
        return_url: req.return_url,
        booking_id: req.booking_id,
        ..Default::default()
    };

    let response = state
        .orchestrator
        .process_payment(PaymentProvider::Paynow, request)
        .await?;

    match response {
        PaymentResponse::MobileMoney {
            redirect_url,
            poll_url,
            reference,
        } => Ok(Json(MobileMoneyResponse {
            success: true,
            redirect_url,
            poll_url,
            reference,
        })),
        other => Err(AppError::InternalServerError(format!(
            "unexpected orchestrator response: {:?}",
            other
        ))),
    }
}

/// POST /v1/payments/status
/// Poll the gateway for the current status of a mobile money attempt.
pub async fn check_payment_status(
    State(state): State<AppState>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<StatusResponse>, AppError> {
    let outcome = state.poller.check_payment_status(&req.poll_url).await?;

    let response = match outcome {
        PollOutcome::Paid => StatusResponse {
            paid: true,
            status: "paid".to_string(),
        },
        PollOutcome::Pending { status } | PollOutcome::Failed { status } => StatusResponse {
            paid: false,
            status,
        },
    };
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mobile_money_request_deserializes_with_optional_fields() {
        let body = r#"{
            "email": "guest@example.com",
            "phone": "0771234567",
            "amount": 150.0,
            "reference": "BK-1",
            "items": [{"name": "Lodge", "amount": 150.0}]
        }"#;
        let req: MobileMoneyRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.reference, "BK-1");
        assert!(req.return_url.is_none());
        assert_eq!(req.items.unwrap().len(), 1);
    }
}
