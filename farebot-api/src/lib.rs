use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod messages;
pub mod state;
pub mod webhook;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    Router::new()
        .route("/", get(webhook::health))
        .route("/webhook", post(webhook::handle_webhook))
        .route("/send-whatsapp", post(messages::send_whatsapp))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
