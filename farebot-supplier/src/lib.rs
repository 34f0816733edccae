pub mod messaging;
pub mod payment;
pub mod ticket;
pub mod travel;

pub use messaging::WhatsAppClient;
pub use payment::PaymentLinkClient;
pub use ticket::PdfTicket;
pub use travel::TravelApiClient;
