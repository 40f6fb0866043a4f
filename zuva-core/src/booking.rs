use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Booking lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" => Some(BookingStatus::Cancelled),
            "completed" => Some(BookingStatus::Completed),
            _ => None,
        }
    }
}

/// Payment-side status mirrored on the booking row. Expected to move
/// monotonically toward a terminal state; the reconciler's conditional
/// updates are what actually enforce that.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingPaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
}

impl BookingPaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingPaymentStatus::Pending => "pending",
            BookingPaymentStatus::Processing => "processing",
            BookingPaymentStatus::Completed => "completed",
            BookingPaymentStatus::Failed => "failed",
            BookingPaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingPaymentStatus::Pending),
            "processing" => Some(BookingPaymentStatus::Processing),
            "completed" => Some(BookingPaymentStatus::Completed),
            "failed" => Some(BookingPaymentStatus::Failed),
            "refunded" => Some(BookingPaymentStatus::Refunded),
            _ => None,
        }
    }
}

/// A user's intent to reserve a destination stay or an event ticket.
/// `destination_id` and `event_id` are mutually exclusive in practice but
/// not enforced at the type level. Never hard-deleted by the payment flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: String,
    pub destination_id: Option<Uuid>,
    pub event_id: Option<Uuid>,
    pub status: BookingStatus,
    pub payment_status: BookingPaymentStatus,
    pub total_price_minor: i64,
    pub currency: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(
        user_id: String,
        destination_id: Option<Uuid>,
        event_id: Option<Uuid>,
        total_price_minor: i64,
        contact_email: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            destination_id,
            event_id,
            status: BookingStatus::Pending,
            payment_status: BookingPaymentStatus::Pending,
            total_price_minor,
            currency: "USD".to_string(),
            contact_email,
            contact_phone: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_booking_starts_pending() {
        let booking = Booking::new(
            "user-1".to_string(),
            Some(Uuid::new_v4()),
            None,
            25000,
            "guest@example.com".to_string(),
        );
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.payment_status, BookingPaymentStatus::Pending);
        assert_eq!(booking.currency, "USD");
    }

    #[test]
    fn status_parse_rejects_unknown() {
        assert_eq!(BookingStatus::parse("confirmed"), Some(BookingStatus::Confirmed));
        assert_eq!(BookingStatus::parse("CONFIRMED"), None);
        assert_eq!(BookingPaymentStatus::parse("refunded"), Some(BookingPaymentStatus::Refunded));
        assert_eq!(BookingPaymentStatus::parse("void"), None);
    }
}
