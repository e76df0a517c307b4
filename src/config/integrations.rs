//! External services: WhatsApp, HubSpot and the extraction service
//!
//! Each section is optional. A missing WhatsApp or HubSpot token selects the
//! logging adapter; a missing extraction endpoint selects the keyword extractor.

use secrecy::Secret;
use serde::Deserialize;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppConfig {
    pub access_token: Option<Secret<String>>,
    pub phone_number_id: Option<String>,
    #[serde(default = "default_whatsapp_version")]
    pub api_version: String,
    /// Token Meta echoes during the webhook subscription handshake
    pub verify_token: Option<Secret<String>>,
    /// App secret used to check `X-Hub-Signature-256` on webhook calls
    pub app_secret: Option<Secret<String>>,
}

impl WhatsAppConfig {
    pub fn is_enabled(&self) -> bool {
        self.access_token.is_some()
    }

    /// The inbound webhook is mounted only when a verify token is configured.
    pub fn webhook_enabled(&self) -> bool {
        self.verify_token.is_some()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.is_enabled() && self.phone_number_id.as_deref().map_or(true, str::is_empty) {
            return Err(ValidationError::MissingRequired("whatsapp.phone_number_id"));
        }
        Ok(())
    }
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            phone_number_id: None,
            api_version: default_whatsapp_version(),
            verify_token: None,
            app_secret: None,
        }
    }
}

fn default_whatsapp_version() -> String {
    "v18.0".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct HubSpotConfig {
    pub access_token: Option<Secret<String>>,
}

impl HubSpotConfig {
    pub fn is_enabled(&self) -> bool {
        self.access_token.is_some()
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ExtractionConfig {
    /// URL of the extraction service
    pub endpoint: Option<String>,
    pub api_key: Option<Secret<String>>,
}

impl ExtractionConfig {
    pub fn validate(&self, production: bool) -> Result<(), ValidationError> {
        let Some(endpoint) = &self.endpoint else {
            return Ok(());
        };
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ValidationError::InvalidUrl("extraction.endpoint"));
        }
        if production && !endpoint.starts_with("https://") {
            return Err(ValidationError::MustBeHttps("extraction.endpoint"));
        }
        Ok(())
    }
}
