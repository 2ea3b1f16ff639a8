//! WhatsApp channel over the Twilio REST API

use agentdesk_config::WhatsAppConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};

use crate::{Channel, ChannelError, OutboundMessage, Result};

const PREFIX: &str = "whatsapp:";

/// Phone number without the `whatsapp:` address prefix
pub fn strip_prefix(address: &str) -> &str {
    let address = address.trim();
    address.strip_prefix(PREFIX).unwrap_or(address)
}

fn address(number: &str) -> String {
    format!("{}{}", PREFIX, strip_prefix(number))
}

/// Sends WhatsApp messages through Twilio
pub struct WhatsAppChannel {
    config: WhatsAppConfig,
    client: Client,
}

impl WhatsAppChannel {
    pub fn new(config: WhatsAppConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_sid
        )
    }
}

#[async_trait]
impl Channel for WhatsAppChannel {
    fn name(&self) -> &str {
        "whatsapp"
    }

    async fn send(&self, msg: &OutboundMessage) -> Result<()> {
        if !self.config.has_credentials() {
            return Err(ChannelError::NotConfigured("Twilio".to_string()));
        }

        let form = [
            ("From", address(&self.config.from_number)),
            ("To", address(&msg.to)),
            ("Body", msg.body.clone()),
        ];
        debug!("Sending WhatsApp message to {}", msg.to);

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(body);
            return Err(ChannelError::Api {
                channel: "Twilio".to_string(),
                status: status.as_u16(),
                message,
            });
        }

        info!("WhatsApp message delivered to {}", msg.to);
        Ok(())
    }
}
