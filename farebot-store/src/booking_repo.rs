use async_trait::async_trait;
use farebot_core::contract::{BookingRecord, BookingRepository, BookingSummary, PassengerRecord};
use sqlx::PgPool;
use uuid::Uuid;

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
struct BookingSummaryRow {
    booking_reference: Option<String>,
    origin: Option<String>,
    destination: Option<String>,
    departure_time: Option<String>,
    arrival_time: Option<String>,
    total_passengers: Option<i32>,
    price: Option<f64>,
}

impl From<BookingSummaryRow> for BookingSummary {
    fn from(row: BookingSummaryRow) -> Self {
        BookingSummary {
            booking_reference: row.booking_reference.unwrap_or_default(),
            origin_code: row.origin.unwrap_or_default(),
            destination_code: row.destination.unwrap_or_default(),
            departure_at: row.departure_time.unwrap_or_default(),
            arrival_at: row.arrival_time.unwrap_or_default(),
            total_passengers: row.total_passengers.unwrap_or_default(),
            price: row.price.unwrap_or_default(),
        }
    }
}

#[async_trait]
impl BookingRepository for StoreBookingRepository {
    async fn ensure_user(
        &self,
        user_id: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            r#"
            INSERT INTO users (pid, whatsapp_id)
            VALUES ($1, $2)
            ON CONFLICT (whatsapp_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_booking(
        &self,
        booking: &BookingRecord,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            r#"
            INSERT INTO flight_bookings (
                pid, whatsapp_id, origin, destination, departure_time, arrival_time,
                price, airline_name, total_passengers, booking_reference,
                payment_reference, payment_status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'PENDING')
            "#,
        )
        .bind(booking.pid.to_string())
        .bind(&booking.user_id)
        .bind(&booking.origin_code)
        .bind(&booking.destination_code)
        .bind(&booking.departure_at)
        .bind(&booking.arrival_at)
        .bind(booking.price)
        .bind(&booking.airline_code)
        .bind(booking.total_passengers)
        .bind(&booking.booking_reference)
        .bind(&booking.payment_reference)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_passenger(
        &self,
        passenger: &PassengerRecord,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            r#"
            INSERT INTO passengers (psrid, pid, p_name, dob, gender, seat)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(passenger.psrid.to_string())
        .bind(passenger.pid.to_string())
        .bind(&passenger.name)
        .bind(passenger.dob)
        .bind(passenger.gender.as_str())
        .bind(&passenger.seat)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_paid(
        &self,
        payment_reference: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let result = sqlx::query(
            r#"
            UPDATE flight_bookings
            SET payment_status = 'PAID'
            WHERE payment_reference = $1
            "#,
        )
        .bind(payment_reference)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::warn!(payment_reference, "no booking row matched payment reference");
        }
        Ok(())
    }

    async fn recent_bookings(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<BookingSummary>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = sqlx::query_as::<_, BookingSummaryRow>(
            r#"
            SELECT booking_reference, origin, destination, departure_time,
                   arrival_time, total_passengers, price
            FROM flight_bookings
            WHERE whatsapp_id = $1
            ORDER BY booking_time DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(BookingSummary::from).collect())
    }
}
