use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use zuva_core::booking::Booking;
use zuva_payments::stripe::to_minor_units;
use zuva_payments::{PaymentSignal, ReconcileOutcome};

use crate::error::AppError;
use crate::middleware::auth::CustomerClaims;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub destination_id: Option<Uuid>,
    pub event_id: Option<Uuid>,
    pub total_price: f64,
    pub contact_email: String,
    pub contact_phone: Option<String>,
}

#[derive(Debug, Serialize)]
struct BookingResponse {
    booking_id: Uuid,
    status: String,
    payment_status: String,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmPaymentRequest {
    pub payment_intent_id: String,
}

#[derive(Debug, Serialize)]
struct ConfirmPaymentResponse {
    booking_id: Uuid,
    settled: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking))
        .route("/v1/bookings/{id}", get(get_booking))
        .route("/v1/bookings/{id}/confirm-payment", post(confirm_payment))
}

async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    if req.destination_id.is_none() && req.event_id.is_none() {
        return Err(AppError::ValidationError(
            "booking needs a destination or an event".to_string(),
        ));
    }
    if !(req.total_price > 0.0) {
        return Err(AppError::ValidationError(
            "total price must be greater than zero".to_string(),
        ));
    }

    let mut booking = Booking::new(
        claims.sub,
        req.destination_id,
        req.event_id,
        to_minor_units(req.total_price),
        req.contact_email,
    );
    booking.contact_phone = req.contact_phone;

    state
        .bookings
        .create_booking(&booking)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    info!("Booking created: {}", booking.id);

    Ok(Json(BookingResponse {
        booking_id: booking.id,
        status: booking.status.as_str().to_string(),
        payment_status: booking.payment_status.as_str().to_string(),
    }))
}

async fn get_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .bookings
        .get_booking(booking_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or_else(|| AppError::NotFoundError("booking not found".to_string()))?;

    if booking.user_id != claims.sub {
        return Err(AppError::AuthorizationError(
            "booking does not belong to you".to_string(),
        ));
    }

    Ok(Json(booking))
}

/// Client-side card confirmation. This is only a completion *signal*; the
/// reconciler decides whether it wins or a webhook/poll already settled the
/// attempt.
async fn confirm_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Path(booking_id): Path<Uuid>,
    Json(req): Json<ConfirmPaymentRequest>,
) -> Result<Json<ConfirmPaymentResponse>, AppError> {
    let booking = state
        .bookings
        .get_booking(booking_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or_else(|| AppError::NotFoundError("booking not found".to_string()))?;

    if booking.user_id != claims.sub {
        return Err(AppError::AuthorizationError(
            "booking does not belong to you".to_string(),
        ));
    }

    let outcome = state
        .reconciler
        .apply(PaymentSignal::ClientConfirmed {
            booking_id,
            intent_id: req.payment_intent_id,
        })
        .await?;

    info!("Client confirmation for booking {}: {:?}", booking_id, outcome);

    Ok(Json(ConfirmPaymentResponse {
        booking_id,
        settled: outcome == ReconcileOutcome::Settled,
    }))
}
