use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use zuva_core::payment::{Payment, PaymentAttemptStatus, PaymentProvider};
use zuva_core::repository::PaymentRepository;
use zuva_core::BoxError;

pub struct StorePaymentRepository {
    pool: PgPool,
}

impl StorePaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    booking_id: Option<Uuid>,
    amount_minor: i64,
    provider: String,
    provider_reference: String,
    poll_url: Option<String>,
    payment_intent_id: Option<String>,
    client_secret: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PaymentRow {
    fn into_payment(self) -> Result<Payment, BoxError> {
        let provider = match self.provider.as_str() {
            "stripe" => PaymentProvider::Stripe,
            "paynow" => PaymentProvider::Paynow,
            other => return Err(format!("unknown payment provider: {}", other).into()),
        };
        let status = PaymentAttemptStatus::parse(&self.status)
            .ok_or_else(|| format!("unknown payment status: {}", self.status))?;

        Ok(Payment {
            id: self.id,
            booking_id: self.booking_id,
            amount_minor: self.amount_minor,
            provider,
            provider_reference: self.provider_reference,
            poll_url: self.poll_url,
            payment_intent_id: self.payment_intent_id,
            client_secret: self.client_secret,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, booking_id, amount_minor, provider, provider_reference, poll_url,
           payment_intent_id, client_secret, status, created_at, updated_at
    FROM payments
"#;

#[async_trait]
impl PaymentRepository for StorePaymentRepository {
    async fn create_payment(&self, payment: &Payment) -> Result<(), BoxError> {
        sqlx::query(
            r#"
            INSERT INTO payments (id, booking_id, amount_minor, provider, provider_reference,
                                  poll_url, payment_intent_id, client_secret, status,
                                  created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(payment.id)
        .bind(payment.booking_id)
        .bind(payment.amount_minor)
        .bind(payment.provider.as_str())
        .bind(&payment.provider_reference)
        .bind(&payment.poll_url)
        .bind(&payment.payment_intent_id)
        .bind(&payment.client_secret)
        .bind(payment.status.as_str())
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_payment(&self, id: Uuid) -> Result<Option<Payment>, BoxError> {
        let row: Option<PaymentRow> =
            sqlx::query_as(&format!("{} WHERE id = $1", SELECT_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(PaymentRow::into_payment).transpose()
    }

    async fn find_by_poll_url(&self, poll_url: &str) -> Result<Option<Payment>, BoxError> {
        let row: Option<PaymentRow> =
            sqlx::query_as(&format!("{} WHERE poll_url = $1", SELECT_COLUMNS))
                .bind(poll_url)
                .fetch_optional(&self.pool)
                .await?;
        row.map(PaymentRow::into_payment).transpose()
    }

    async fn find_by_intent_id(&self, intent_id: &str) -> Result<Option<Payment>, BoxError> {
        let row: Option<PaymentRow> =
            sqlx::query_as(&format!("{} WHERE payment_intent_id = $1", SELECT_COLUMNS))
                .bind(intent_id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(PaymentRow::into_payment).transpose()
    }

    async fn settle_if_open(
        &self,
        id: Uuid,
        status: PaymentAttemptStatus,
    ) -> Result<bool, BoxError> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status IN ('pending', 'processing')
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
