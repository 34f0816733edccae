use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::info;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS users (
        sno SERIAL PRIMARY KEY,
        pid VARCHAR(50) NOT NULL,
        whatsapp_id VARCHAR(100) UNIQUE NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS flight_bookings (
        sno SERIAL PRIMARY KEY,
        pid VARCHAR(50) NOT NULL UNIQUE,
        whatsapp_id VARCHAR(100) NOT NULL,
        origin VARCHAR(100),
        destination VARCHAR(100),
        departure_time VARCHAR(100),
        arrival_time VARCHAR(100),
        price DOUBLE PRECISION,
        airline_name VARCHAR(255),
        total_passengers INT,
        booking_reference VARCHAR(100) UNIQUE,
        payment_reference VARCHAR(100),
        payment_status VARCHAR(20) NOT NULL DEFAULT 'PENDING',
        booking_time TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS passengers (
        psrid VARCHAR(50) PRIMARY KEY,
        pid VARCHAR(50) NOT NULL REFERENCES flight_bookings(pid),
        p_name VARCHAR(100) NOT NULL,
        dob DATE NOT NULL,
        gender VARCHAR(10) NOT NULL,
        seat VARCHAR(10),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
];

impl DbClient {
    pub async fn new(connection_string: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    /// Create the booking tables if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        for ddl in SCHEMA {
            sqlx::query(ddl).execute(&self.pool).await?;
        }
        info!("Database schema ready.");
        Ok(())
    }
}
