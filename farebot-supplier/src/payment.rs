//! Payment-link provider client: link creation and capture polling.

use async_trait::async_trait;
use farebot_core::contract::{PaymentGateway, PaymentLink};
use serde::Deserialize;
use serde_json::json;

pub struct PaymentLinkClient {
    http: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
    callback_url: String,
}

#[derive(Debug, Deserialize)]
struct PaymentLinkResponse {
    id: Option<String>,
    short_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrderPaymentsResponse {
    #[serde(default)]
    items: Vec<WirePayment>,
}

#[derive(Debug, Deserialize)]
struct WirePayment {
    status: String,
}

impl PaymentLinkClient {
    pub fn new(base_url: String, key_id: String, key_secret: String, callback_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            key_id,
            key_secret,
            callback_url,
        }
    }
}

#[async_trait]
impl PaymentGateway for PaymentLinkClient {
    async fn create_payment_link(
        &self,
        amount_minor: i64,
        currency: &str,
        customer_name: &str,
        customer_contact: &str,
        description: &str,
    ) -> Result<PaymentLink, Box<dyn std::error::Error + Send + Sync>> {
        let body = json!({
            "amount": amount_minor,
            "currency": currency,
            "accept_partial": false,
            "description": description,
            "customer": {
                "name": customer_name,
                "contact": customer_contact,
            },
            "notify": {
                "sms": true,
                "email": false,
            },
            "reminder_enable": true,
            "callback_url": self.callback_url,
            "callback_method": "get",
        });

        let response = self
            .http
            .post(format!("{}/v1/payment_links", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let link: PaymentLinkResponse = response.json().await?;
        // Treat a response missing either field as a failed creation.
        match (link.id, link.short_url) {
            (Some(id), Some(url)) => Ok(PaymentLink { id, url }),
            _ => Err("payment link response missing id or short_url".into()),
        }
    }

    async fn is_payment_captured(
        &self,
        payment_reference: &str,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let response = self
            .http
            .get(format!(
                "{}/v1/orders/{}/payments",
                self.base_url, payment_reference
            ))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await?
            .error_for_status()?;

        let payments: OrderPaymentsResponse = response.json().await?;
        Ok(payments.items.iter().any(|p| p.status == "captured"))
    }
}
