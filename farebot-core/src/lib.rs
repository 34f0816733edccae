pub mod contract;
pub mod engine;
pub mod finalizer;
pub mod normalize;
pub mod offer;
pub mod prompts;
pub mod session;

pub use contract::{
    BookingRecord, BookingRepository, BookingSummary, FlightSearch, LocationResolver,
    PassengerRecord, PaymentGateway, PaymentLink, SessionStore, TicketRenderer,
};
pub use engine::{ConversationRules, DialogueEngine, EngineDeps};
pub use offer::FlightOffer;
pub use session::{Gender, Passenger, Session, Step};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Session storage error: {0}")]
    StoreError(String),
    #[error("Booking persistence error: {0}")]
    PersistenceError(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
