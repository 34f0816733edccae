use std::net::SocketAddr;
use std::sync::Arc;

use farebot_api::{app, AppState};
use farebot_core::{DialogueEngine, EngineDeps};
use farebot_store::{DbClient, InMemorySessionStore, StoreBookingRepository};
use farebot_supplier::{PaymentLinkClient, PdfTicket, TravelApiClient, WhatsAppClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "farebot_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = farebot_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Farebot API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.ensure_schema()
        .await
        .expect("Failed to prepare database schema");

    let travel = Arc::new(TravelApiClient::new(
        config.travel_api.base_url.clone(),
        config.travel_api.api_key.clone(),
        config.travel_api.api_secret.clone(),
        config.travel_api.currency.clone(),
    ));
    let payments = Arc::new(PaymentLinkClient::new(
        config.payments.base_url.clone(),
        config.payments.key_id.clone(),
        config.payments.key_secret.clone(),
        config.payments.callback_url.clone(),
    ));
    let messenger = Arc::new(WhatsAppClient::new(
        config.messaging.base_url.clone(),
        config.messaging.account_sid.clone(),
        config.messaging.auth_token.clone(),
        config.messaging.from_number.clone(),
    ));

    let engine = Arc::new(DialogueEngine::new(
        EngineDeps {
            sessions: Arc::new(InMemorySessionStore::new()),
            resolver: travel.clone(),
            search: travel,
            payments,
            bookings: Arc::new(StoreBookingRepository::new(db.pool.clone())),
            tickets: Arc::new(PdfTicket::new(config.tickets.output_dir.clone().into())),
        },
        config.conversation.rules(),
    ));

    let state = AppState { engine, messenger };
    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
