use serde::{Deserialize, Serialize};

/// Immutable snapshot of one flight search result. Timestamps are kept as
/// the supplier's wire strings (local times without zone information).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlightOffer {
    pub departure_code: String,
    pub departure_at: String,
    pub arrival_code: String,
    pub arrival_at: String,
    pub airline_code: String,
    pub price: f64,
    pub currency: String,
}
