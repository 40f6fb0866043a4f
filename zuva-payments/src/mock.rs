//! In-memory doubles for the provider seam and the repositories. Used by
//! the unit tests here and by the API crate when running without a real
//! gateway or database.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use zuva_core::booking::{Booking, BookingPaymentStatus, BookingStatus};
use zuva_core::payment::{
    InitiateOutcome, Payment, PaymentAttemptStatus, PaymentError, PaymentRequest, ProviderAdapter,
};
use zuva_core::repository::{BookingRepository, PaymentRepository};
use zuva_core::BoxError;

/// Scripted provider adapter that counts invocations.
pub struct MockProviderAdapter {
    outcome: Mutex<InitiateOutcome>,
    poll_reply: Mutex<Result<String, String>>,
    initiate_calls: AtomicUsize,
    poll_calls: AtomicUsize,
}

impl MockProviderAdapter {
    pub fn returning(outcome: InitiateOutcome) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            poll_reply: Mutex::new(Ok("created".to_string())),
            initiate_calls: AtomicUsize::new(0),
            poll_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_outcome(&self, outcome: InitiateOutcome) {
        *self.outcome.lock().unwrap() = outcome;
    }

    pub fn set_poll_status(&self, status: &str) {
        *self.poll_reply.lock().unwrap() = Ok(status.to_string());
    }

    pub fn fail_poll_transport(&self, message: &str) {
        *self.poll_reply.lock().unwrap() = Err(message.to_string());
    }

    pub fn initiate_calls(&self) -> usize {
        self.initiate_calls.load(Ordering::SeqCst)
    }

    pub fn poll_calls(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderAdapter for MockProviderAdapter {
    async fn initiate(&self, _request: &PaymentRequest) -> Result<InitiateOutcome, PaymentError> {
        self.initiate_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.outcome.lock().unwrap().clone())
    }

    async fn poll_status(&self, _poll_url: &str) -> Result<String, PaymentError> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        match &*self.poll_reply.lock().unwrap() {
            Ok(status) => Ok(status.clone()),
            Err(message) => Err(PaymentError::Transport(message.clone())),
        }
    }
}

/// Booking store backed by a HashMap. `writes()` exposes the mutation count
/// so tests can assert that duplicate signals do not touch rows.
#[derive(Default)]
pub struct InMemoryBookingRepository {
    bookings: Mutex<HashMap<Uuid, Booking>>,
    writes: AtomicUsize,
}

impl InMemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn create_booking(&self, booking: &Booking) -> Result<(), BoxError> {
        self.bookings
            .lock()
            .unwrap()
            .insert(booking.id, booking.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, BoxError> {
        Ok(self.bookings.lock().unwrap().get(&id).cloned())
    }

    async fn confirm_if_payment_open(&self, id: Uuid) -> Result<bool, BoxError> {
        let mut bookings = self.bookings.lock().unwrap();
        match bookings.get_mut(&id) {
            Some(booking)
                if matches!(
                    booking.payment_status,
                    BookingPaymentStatus::Pending | BookingPaymentStatus::Processing
                ) =>
            {
                booking.status = BookingStatus::Confirmed;
                booking.payment_status = BookingPaymentStatus::Completed;
                booking.updated_at = chrono::Utc::now();
                self.writes.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn fail_payment_if_open(&self, id: Uuid) -> Result<bool, BoxError> {
        let mut bookings = self.bookings.lock().unwrap();
        match bookings.get_mut(&id) {
            Some(booking)
                if matches!(
                    booking.payment_status,
                    BookingPaymentStatus::Pending | BookingPaymentStatus::Processing
                ) =>
            {
                booking.payment_status = BookingPaymentStatus::Failed;
                booking.updated_at = chrono::Utc::now();
                self.writes.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// Payment-attempt store backed by a HashMap, with the same write counter.
#[derive(Default)]
pub struct InMemoryPaymentRepository {
    payments: Mutex<HashMap<Uuid, Payment>>,
    writes: AtomicUsize,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.payments.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn create_payment(&self, payment: &Payment) -> Result<(), BoxError> {
        self.payments
            .lock()
            .unwrap()
            .insert(payment.id, payment.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_payment(&self, id: Uuid) -> Result<Option<Payment>, BoxError> {
        Ok(self.payments.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_poll_url(&self, poll_url: &str) -> Result<Option<Payment>, BoxError> {
        Ok(self
            .payments
            .lock()
            .unwrap()
            .values()
            .find(|payment| payment.poll_url.as_deref() == Some(poll_url))
            .cloned())
    }

    async fn find_by_intent_id(&self, intent_id: &str) -> Result<Option<Payment>, BoxError> {
        Ok(self
            .payments
            .lock()
            .unwrap()
            .values()
            .find(|payment| payment.payment_intent_id.as_deref() == Some(intent_id))
            .cloned())
    }

    async fn settle_if_open(
        &self,
        id: Uuid,
        status: PaymentAttemptStatus,
    ) -> Result<bool, BoxError> {
        let mut payments = self.payments.lock().unwrap();
        match payments.get_mut(&id) {
            Some(payment) if !payment.status.is_terminal() => {
                payment.status = status;
                payment.updated_at = chrono::Utc::now();
                self.writes.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
