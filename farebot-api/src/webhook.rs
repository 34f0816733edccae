use axum::{extract::State, Form, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::state::AppState;

/// Inbound message webhook payload, form-encoded by the gateway.
#[derive(Debug, Deserialize)]
pub struct WebhookForm {
    #[serde(rename = "Body", default)]
    pub body: String,
    #[serde(rename = "From")]
    pub from: String,
}

/// POST /webhook
/// One inbound message in, one plain-text reply body out.
pub async fn handle_webhook(
    State(state): State<AppState>,
    Form(form): Form<WebhookForm>,
) -> String {
    tracing::debug!(from = %form.from, "inbound message received");
    state.engine.handle_message(&form.from, &form.body).await
}

/// GET /
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "Server is running" }))
}
