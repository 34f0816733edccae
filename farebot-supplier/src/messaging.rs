//! WhatsApp gateway client for the direct message-send endpoint.

use serde::Deserialize;

pub struct WhatsAppClient {
    http: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    sid: String,
}

impl WhatsAppClient {
    pub fn new(
        base_url: String,
        account_sid: String,
        auth_token: String,
        from_number: String,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            account_sid,
            auth_token,
            from_number,
        }
    }

    /// Send one WhatsApp message and return the provider's message sid.
    pub async fn send_message(
        &self,
        recipient_number: &str,
        body: &str,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        );
        let response = self
            .http
            .post(url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[
                ("From", format!("whatsapp:{}", self.from_number)),
                ("To", format!("whatsapp:{}", recipient_number)),
                ("Body", body.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let message: MessageResponse = response.json().await?;
        tracing::info!(recipient_number, sid = %message.sid, "WhatsApp message sent");
        Ok(message.sid)
    }
}
