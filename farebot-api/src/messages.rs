use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub recipient_number: String,
    pub message_body: String,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub status: String,
    pub message_sid: String,
}

/// POST /send-whatsapp
/// Direct message-send endpoint, independent of any dialogue session.
pub async fn send_whatsapp(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, AppError> {
    let sid = state
        .messenger
        .send_message(&req.recipient_number, &req.message_body)
        .await
        .map_err(|err| {
            tracing::error!(recipient = %req.recipient_number, error = %err, "failed to send WhatsApp message");
            AppError::SendFailed(
                "Failed to send message. Please check the recipient number and try again."
                    .to_string(),
            )
        })?;

    Ok(Json(SendMessageResponse {
        status: "sent successfully".to_string(),
        message_sid: sid,
    }))
}
