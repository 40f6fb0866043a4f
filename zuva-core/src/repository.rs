use async_trait::async_trait;
use uuid::Uuid;

use crate::booking::Booking;
use crate::payment::{Payment, PaymentAttemptStatus};
use crate::BoxError;

/// Repository trait for booking data access
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn create_booking(&self, booking: &Booking) -> Result<(), BoxError>;

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, BoxError>;

    /// Flip the booking to confirmed/completed, but only if its payment
    /// status is still open. Returns whether a row actually changed, so the
    /// caller can tell a winning signal from a late duplicate.
    async fn confirm_if_payment_open(&self, id: Uuid) -> Result<bool, BoxError>;

    /// Mark the booking's payment as failed, conditionally as above.
    async fn fail_payment_if_open(&self, id: Uuid) -> Result<bool, BoxError>;
}

/// Repository trait for payment attempt data access
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create_payment(&self, payment: &Payment) -> Result<(), BoxError>;

    async fn get_payment(&self, id: Uuid) -> Result<Option<Payment>, BoxError>;

    async fn find_by_poll_url(&self, poll_url: &str) -> Result<Option<Payment>, BoxError>;

    async fn find_by_intent_id(&self, intent_id: &str) -> Result<Option<Payment>, BoxError>;

    /// Conditional terminal write: moves the attempt to `status` only if it
    /// is still pending or processing. Returns whether the row changed.
    async fn settle_if_open(
        &self,
        id: Uuid,
        status: PaymentAttemptStatus,
    ) -> Result<bool, BoxError>;
}
