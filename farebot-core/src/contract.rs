use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::offer::FlightOffer;
use crate::session::{Gender, Passenger, Session};

/// Resolve a free-text city name to an IATA location code.
#[async_trait]
pub trait LocationResolver: Send + Sync {
    async fn resolve_location_code(
        &self,
        city_name: &str,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Search bookable offers for a route and departure date.
#[async_trait]
pub trait FlightSearch: Send + Sync {
    /// Supplier-side failures collapse to an empty list; the dialogue
    /// treats "no offers" and "search failed" identically.
    async fn search_offers(
        &self,
        origin_code: &str,
        destination_code: &str,
        date: NaiveDate,
    ) -> Result<Vec<FlightOffer>, Box<dyn std::error::Error + Send + Sync>>;
}

/// A payment link created with the provider.
#[derive(Debug, Clone)]
pub struct PaymentLink {
    pub id: String,
    pub url: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment link for the amount in minor units.
    async fn create_payment_link(
        &self,
        amount_minor: i64,
        currency: &str,
        customer_name: &str,
        customer_contact: &str,
        description: &str,
    ) -> Result<PaymentLink, Box<dyn std::error::Error + Send + Sync>>;

    /// True iff at least one payment against the reference has captured.
    async fn is_payment_captured(
        &self,
        payment_reference: &str,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
}

/// One persisted booking row.
#[derive(Debug, Clone)]
pub struct BookingRecord {
    pub pid: Uuid,
    pub user_id: String,
    pub origin_code: String,
    pub destination_code: String,
    pub departure_at: String,
    pub arrival_at: String,
    pub price: f64,
    pub airline_code: String,
    pub total_passengers: i32,
    pub booking_reference: String,
    pub payment_reference: String,
}

/// One persisted passenger row, referencing its booking by `pid`.
#[derive(Debug, Clone)]
pub struct PassengerRecord {
    pub psrid: Uuid,
    pub pid: Uuid,
    pub name: String,
    pub dob: NaiveDate,
    pub gender: Gender,
    pub seat: String,
}

/// Row shape for the recent-bookings listing.
#[derive(Debug, Clone)]
pub struct BookingSummary {
    pub booking_reference: String,
    pub origin_code: String,
    pub destination_code: String,
    pub departure_at: String,
    pub arrival_at: String,
    pub total_passengers: i32,
    pub price: f64,
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Record the user identity if not already present.
    async fn ensure_user(
        &self,
        user_id: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Insert one booking row with payment status PENDING.
    async fn insert_booking(
        &self,
        booking: &BookingRecord,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn insert_passenger(
        &self,
        passenger: &PassengerRecord,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Flip the persisted booking to PAID once capture is verified.
    async fn mark_paid(
        &self,
        payment_reference: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn recent_bookings(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<BookingSummary>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Keyed store owning all sessions. Backends may be in-process or external;
/// same-user races resolve last-write-wins.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(
        &self,
        user_id: &str,
    ) -> Result<Option<Session>, Box<dyn std::error::Error + Send + Sync>>;

    async fn put(
        &self,
        user_id: &str,
        session: Session,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn delete(
        &self,
        user_id: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

#[async_trait]
pub trait TicketRenderer: Send + Sync {
    /// Render the ticket artifact and return a user-shareable reference
    /// (file path or URL) to it.
    async fn render_ticket(
        &self,
        booking_reference: &str,
        flight: &FlightOffer,
        passengers: &[Passenger],
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}
