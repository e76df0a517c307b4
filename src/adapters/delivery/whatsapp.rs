//! WhatsApp Cloud API delivery channel.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;

use crate::domain::foundation::LeadId;
use crate::ports::{DeliveryChannel, DeliveryError};

const GRAPH_API_BASE: &str = "https://graph.facebook.com";

#[derive(Debug, Clone)]
pub struct WhatsAppClientConfig {
    access_token: Secret<String>,
    pub phone_number_id: String,
    pub api_version: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl WhatsAppClientConfig {
    pub fn new(access_token: Secret<String>, phone_number_id: impl Into<String>) -> Self {
        Self {
            access_token,
            phone_number_id: phone_number_id.into(),
            api_version: "v18.0".to_string(),
            base_url: GRAPH_API_BASE.to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/{}/{}/messages",
            self.base_url, self.api_version, self.phone_number_id
        )
    }
}

pub struct WhatsAppDeliveryChannel {
    config: WhatsAppClientConfig,
    client: Client,
}

impl WhatsAppDeliveryChannel {
    pub fn new(config: WhatsAppClientConfig) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                DeliveryError::NotConfigured(format!("Failed to create HTTP client: {}", e))
            })?;
        Ok(Self { config, client })
    }
}

/// Mexican mobile numbers arrive as `521XXXXXXXXXX` but the API only accepts
/// `52XXXXXXXXXX`.
pub fn normalize_mexican_number(number: &str) -> String {
    match number.strip_prefix("521") {
        Some(rest) if number.len() >= 12 => format!("52{}", rest),
        _ => number.to_string(),
    }
}

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    messaging_product: &'static str,
    recipient_type: &'static str,
    to: String,
    #[serde(rename = "type")]
    kind: &'static str,
    text: TextBody<'a>,
}

#[derive(Debug, Serialize)]
struct TextBody<'a> {
    preview_url: bool,
    body: &'a str,
}

impl<'a> TextMessage<'a> {
    fn new(to: &LeadId, body: &'a str) -> Self {
        Self {
            messaging_product: "whatsapp",
            recipient_type: "individual",
            to: normalize_mexican_number(to.as_str()),
            kind: "text",
            text: TextBody {
                preview_url: false,
                body,
            },
        }
    }
}

#[async_trait]
impl DeliveryChannel for WhatsAppDeliveryChannel {
    async fn send(&self, to: &LeadId, text: &str) -> Result<bool, DeliveryError> {
        let response = self
            .client
            .post(self.config.messages_url())
            .bearer_auth(self.config.access_token.expose_secret())
            .json(&TextMessage::new(to, text))
            .send()
            .await
            .map_err(|e| DeliveryError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected(format!("status {}: {}", status, body)));
        }

        tracing::info!(lead_id = %to, "message delivered");
        Ok(true)
    }
}
