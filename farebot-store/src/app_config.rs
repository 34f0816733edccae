use farebot_core::ConversationRules;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub travel_api: TravelApiConfig,
    pub payments: PaymentsConfig,
    pub messaging: MessagingConfig,
    #[serde(default)]
    pub tickets: TicketConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TravelApiConfig {
    pub base_url: String,
    pub api_key: String,
    pub api_secret: String,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "INR".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentsConfig {
    pub base_url: String,
    pub key_id: String,
    pub key_secret: String,
    pub callback_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MessagingConfig {
    pub base_url: String,
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TicketConfig {
    pub output_dir: String,
}

impl Default for TicketConfig {
    fn default() -> Self {
        Self {
            output_dir: "tickets".to_string(),
        }
    }
}

/// Dialogue tunables; defaults mirror the product rules in
/// [`ConversationRules`].
#[derive(Debug, Deserialize, Clone)]
pub struct ConversationConfig {
    #[serde(default = "default_debounce")]
    pub debounce_seconds: i64,
    #[serde(default = "default_session_ttl")]
    pub session_ttl_seconds: i64,
    #[serde(default = "default_booking_window")]
    pub booking_window_days: i64,
    #[serde(default = "default_max_offers")]
    pub max_offers: usize,
}

fn default_debounce() -> i64 {
    2
}

fn default_session_ttl() -> i64 {
    3600
}

fn default_booking_window() -> i64 {
    10
}

fn default_max_offers() -> usize {
    5
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            debounce_seconds: default_debounce(),
            session_ttl_seconds: default_session_ttl(),
            booking_window_days: default_booking_window(),
            max_offers: default_max_offers(),
        }
    }
}

impl ConversationConfig {
    pub fn rules(&self) -> ConversationRules {
        ConversationRules {
            debounce_seconds: self.debounce_seconds,
            session_ttl_seconds: self.session_ttl_seconds,
            booking_window_days: self.booking_window_days,
            max_offers: self.max_offers,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Environment-specific overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `FAREBOT__SERVER__PORT=8080` sets `server.port`
            .add_source(config::Environment::with_prefix("FAREBOT").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
