use std::sync::Arc;

use zuva_core::payment::{PaymentError, PollOutcome, ProviderAdapter};
use zuva_core::repository::PaymentRepository;

use crate::reconcile::{PaymentReconciler, PaymentSignal};

/// Gateway statuses that mean the money arrived.
const PAID_STATUSES: [&str; 3] = ["paid", "awaiting delivery", "delivered"];
/// Gateway statuses from which no payment will ever arrive.
const FAILED_STATUSES: [&str; 4] = ["cancelled", "failed", "disputed", "refunded"];

/// `status` must already be trimmed and lowercased.
pub fn is_paid_status(status: &str) -> bool {
    PAID_STATUSES.contains(&status)
}

pub fn is_failed_status(status: &str) -> bool {
    FAILED_STATUSES.contains(&status)
}

/// Queries the mobile-money gateway for the current status of an attempt
/// and mirrors terminal outcomes into storage through the reconciler.
pub struct StatusPoller {
    adapter: Arc<dyn ProviderAdapter>,
    payments: Arc<dyn PaymentRepository>,
    reconciler: Arc<PaymentReconciler>,
}

impl StatusPoller {
    pub fn new(
        adapter: Arc<dyn ProviderAdapter>,
        payments: Arc<dyn PaymentRepository>,
        reconciler: Arc<PaymentReconciler>,
    ) -> Self {
        Self {
            adapter,
            payments,
            reconciler,
        }
    }

    /// Poll once. The handle must belong to a recorded attempt; callers
    /// cannot make the server fetch arbitrary URLs. Transport and gateway
    /// errors propagate as `Err`; a non-terminal gateway status is a normal
    /// `Pending` outcome, so the caller can always tell "still pending"
    /// from "poll failed".
    pub async fn check_payment_status(&self, poll_url: &str) -> Result<PollOutcome, PaymentError> {
        self.payments
            .find_by_poll_url(poll_url)
            .await
            .map_err(|e| PaymentError::Storage(e.to_string()))?
            .ok_or_else(|| PaymentError::Validation("unknown poll handle".to_string()))?;

        let raw = self.adapter.poll_status(poll_url).await?;
        let status = raw.trim().to_ascii_lowercase();

        if is_paid_status(&status) {
            self.reconciler
                .apply(PaymentSignal::GatewayPaid {
                    poll_url: poll_url.to_string(),
                })
                .await?;
            return Ok(PollOutcome::Paid);
        }

        if is_failed_status(&status) {
            self.reconciler
                .apply(PaymentSignal::GatewayFailed {
                    poll_url: poll_url.to_string(),
                    status: status.clone(),
                })
                .await?;
            return Ok(PollOutcome::Failed { status });
        }

        tracing::debug!(%poll_url, %status, "payment still pending");
        Ok(PollOutcome::Pending { status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{InMemoryBookingRepository, InMemoryPaymentRepository, MockProviderAdapter};
    use uuid::Uuid;
    use zuva_core::booking::{Booking, BookingStatus};
    use zuva_core::payment::{InitiateOutcome, Payment, PaymentProvider};
    use zuva_core::repository::{BookingRepository, PaymentRepository};

    const POLL_URL: &str = "https://gw.test/poll/77";

    async fn harness() -> (
        StatusPoller,
        Arc<MockProviderAdapter>,
        Arc<InMemoryBookingRepository>,
        Arc<InMemoryPaymentRepository>,
        Uuid,
    ) {
        let adapter = Arc::new(MockProviderAdapter::returning(
            InitiateOutcome::MobileMoney {
                redirect_url: "https://gw.test/pay/77".to_string(),
                poll_url: POLL_URL.to_string(),
            },
        ));
        let bookings = Arc::new(InMemoryBookingRepository::new());
        let payments = Arc::new(InMemoryPaymentRepository::new());

        let booking = Booking::new(
            "user-1".to_string(),
            None,
            Some(Uuid::new_v4()),
            8000,
            "guest@example.com".to_string(),
        );
        let booking_id = booking.id;
        bookings.create_booking(&booking).await.unwrap();

        let mut payment = Payment::new(
            Some(booking_id),
            8000,
            PaymentProvider::Paynow,
            "BK-77".to_string(),
        );
        payment.poll_url = Some(POLL_URL.to_string());
        payments.create_payment(&payment).await.unwrap();

        let reconciler = Arc::new(PaymentReconciler::new(bookings.clone(), payments.clone()));
        let poller = StatusPoller::new(adapter.clone(), payments.clone(), reconciler);
        (poller, adapter, bookings, payments, booking_id)
    }

    #[tokio::test]
    async fn paid_status_confirms_booking_exactly_once() {
        let (poller, adapter, bookings, _, booking_id) = harness().await;
        adapter.set_poll_status("Paid");

        let outcome = poller.check_payment_status(POLL_URL).await.unwrap();
        assert_eq!(outcome, PollOutcome::Paid);

        let booking = bookings.get_booking(booking_id).await.unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn repeat_poll_is_idempotent_with_zero_extra_writes() {
        let (poller, adapter, bookings, payments, _) = harness().await;
        adapter.set_poll_status("Paid");

        let first = poller.check_payment_status(POLL_URL).await.unwrap();
        let writes_after_first = bookings.writes() + payments.writes();

        let second = poller.check_payment_status(POLL_URL).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(bookings.writes() + payments.writes(), writes_after_first);
        assert_eq!(adapter.poll_calls(), 2);
    }

    #[tokio::test]
    async fn created_status_is_pending_and_writes_nothing() {
        let (poller, adapter, bookings, payments, _) = harness().await;
        adapter.set_poll_status("Created");
        let writes_before = bookings.writes() + payments.writes();

        let outcome = poller.check_payment_status(POLL_URL).await.unwrap();

        assert_eq!(outcome, PollOutcome::Pending { status: "created".to_string() });
        assert_eq!(bookings.writes() + payments.writes(), writes_before);
    }

    #[tokio::test]
    async fn unknown_poll_handle_is_rejected_without_touching_the_gateway() {
        let (poller, adapter, _, _, _) = harness().await;

        let err = poller
            .check_payment_status("http://169.254.169.254/latest/meta-data")
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::Validation(_)));
        assert_eq!(adapter.poll_calls(), 0);
    }

    #[tokio::test]
    async fn transport_failure_is_an_error_not_a_status() {
        let (poller, adapter, _, _, _) = harness().await;
        adapter.fail_poll_transport("connection reset");

        let err = poller.check_payment_status(POLL_URL).await.unwrap_err();
        assert!(matches!(err, PaymentError::Transport(_)));
    }

    #[tokio::test]
    async fn cancelled_status_fails_the_attempt() {
        let (poller, adapter, _, payments, _) = harness().await;
        adapter.set_poll_status("Cancelled");

        let outcome = poller.check_payment_status(POLL_URL).await.unwrap();
        assert_eq!(outcome, PollOutcome::Failed { status: "cancelled".to_string() });

        let payment = payments.find_by_poll_url(POLL_URL).await.unwrap().unwrap();
        assert!(payment.status.is_terminal());
    }
}
