use std::sync::Arc;

use farebot_core::DialogueEngine;
use farebot_supplier::WhatsAppClient;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<DialogueEngine>,
    pub messenger: Arc<WhatsAppClient>,
}
