use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use zuva_core::booking::{Booking, BookingPaymentStatus, BookingStatus};
use zuva_core::repository::BookingRepository;
use zuva_core::BoxError;

pub struct StoreBookingRepository {
    pool: PgPool,
}

impl StoreBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    user_id: String,
    destination_id: Option<Uuid>,
    event_id: Option<Uuid>,
    status: String,
    payment_status: String,
    total_price_minor: i64,
    currency: String,
    contact_email: String,
    contact_phone: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_booking(self) -> Result<Booking, BoxError> {
        let status = BookingStatus::parse(&self.status)
            .ok_or_else(|| format!("unknown booking status: {}", self.status))?;
        let payment_status = BookingPaymentStatus::parse(&self.payment_status)
            .ok_or_else(|| format!("unknown payment status: {}", self.payment_status))?;

        Ok(Booking {
            id: self.id,
            user_id: self.user_id,
            destination_id: self.destination_id,
            event_id: self.event_id,
            status,
            payment_status,
            total_price_minor: self.total_price_minor,
            currency: self.currency,
            contact_email: self.contact_email,
            contact_phone: self.contact_phone,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl BookingRepository for StoreBookingRepository {
    async fn create_booking(&self, booking: &Booking) -> Result<(), BoxError> {
        sqlx::query(
            r#"
            INSERT INTO bookings (id, user_id, destination_id, event_id, status, payment_status,
                                  total_price_minor, currency, contact_email, contact_phone,
                                  created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(booking.id)
        .bind(&booking.user_id)
        .bind(booking.destination_id)
        .bind(booking.event_id)
        .bind(booking.status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(booking.total_price_minor)
        .bind(&booking.currency)
        .bind(&booking.contact_email)
        .bind(&booking.contact_phone)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, BoxError> {
        let row: Option<BookingRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, destination_id, event_id, status, payment_status,
                   total_price_minor, currency, contact_email, contact_phone,
                   created_at, updated_at
            FROM bookings WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(BookingRow::into_booking).transpose()
    }

    async fn confirm_if_payment_open(&self, id: Uuid) -> Result<bool, BoxError> {
        // Conditional write: only the first terminal signal flips the row.
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET status = 'confirmed', payment_status = 'completed', updated_at = NOW()
            WHERE id = $1 AND payment_status IN ('pending', 'processing')
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn fail_payment_if_open(&self, id: Uuid) -> Result<bool, BoxError> {
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET payment_status = 'failed', updated_at = NOW()
            WHERE id = $1 AND payment_status IN ('pending', 'processing')
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
