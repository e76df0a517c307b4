//! HTTP client for an external extraction service.
//!
//! The service receives the history and the context message and answers
//! with a flat `field -> value` object, optionally wrapped in `{"fields": ...}`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};

use crate::domain::conversation::{Message, SenderRole};
use crate::ports::{ExtractionError, FieldExtractor};

/// Configuration for the extraction service client.
#[derive(Debug, Clone)]
pub struct HttpExtractorConfig {
    pub endpoint: String,
    api_key: Option<Secret<String>>,
    pub timeout: Duration,
}

impl HttpExtractorConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_api_key(mut self, key: Secret<String>) -> Self {
        self.api_key = Some(key);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct HttpFieldExtractor {
    config: HttpExtractorConfig,
    client: Client,
}

impl HttpFieldExtractor {
    pub fn new(config: HttpExtractorConfig) -> Result<Self, ExtractionError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                ExtractionError::Unavailable(format!("Failed to create HTTP client: {}", e))
            })?;
        Ok(Self { config, client })
    }
}

#[derive(Debug, Serialize)]
struct ExtractionRequest<'a> {
    messages: Vec<WireMessage<'a>>,
    context: Option<WireMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    text: &'a str,
}

impl<'a> From<&'a Message> for WireMessage<'a> {
    fn from(message: &'a Message) -> Self {
        let role = match message.sender {
            SenderRole::Lead => "lead",
            SenderRole::Bot => "bot",
            SenderRole::Agent => "agent",
        };
        Self {
            role,
            text: &message.text,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExtractionResponse {
    Wrapped { fields: HashMap<String, Option<String>> },
    Flat(HashMap<String, Option<String>>),
}

impl ExtractionResponse {
    fn into_fields(self) -> HashMap<String, String> {
        let raw = match self {
            Self::Wrapped { fields } => fields,
            Self::Flat(fields) => fields,
        };
        raw.into_iter()
            .filter_map(|(name, value)| value.map(|v| (name, v)))
            .collect()
    }
}

#[async_trait]
impl FieldExtractor for HttpFieldExtractor {
    async fn extract(
        &self,
        history: &[Message],
        context: Option<&Message>,
    ) -> Result<HashMap<String, String>, ExtractionError> {
        let body = ExtractionRequest {
            messages: history.iter().map(WireMessage::from).collect(),
            context: context.map(WireMessage::from),
        };

        let mut request = self.client.post(&self.config.endpoint).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ExtractionError::Timeout(self.config.timeout.as_secs())
            } else {
                ExtractionError::Unavailable(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Unavailable(format!(
                "status {}: {}",
                status, body
            )));
        }

        let parsed: ExtractionResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::InvalidResponse(e.to_string()))?;

        let fields = parsed.into_fields();
        tracing::debug!(count = fields.len(), "extraction service returned fields");
        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;

    #[test]
    fn config_builder_works() {
        let config = HttpExtractorConfig::new("http://extract.local/v1")
            .with_timeout(Duration::from_secs(3))
            .with_api_key(Secret::new("k".to_string()));
        assert_eq!(config.endpoint, "http://extract.local/v1");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert!(config.api_key.is_some());
    }

    #[test]
    fn request_carries_roles_and_context() {
        let agent = Message::from_agent("Supongo que necesitas un rompedor", Timestamp::now());
        let lead = Message::from_lead("Así es", Timestamp::now());
        let history = vec![agent.clone(), lead];
        let body = ExtractionRequest {
            messages: history.iter().map(WireMessage::from).collect(),
            context: Some(WireMessage::from(&agent)),
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][1]["role"], "lead");
        assert_eq!(json["context"]["role"], "agent");
    }

    #[test]
    fn accepts_wrapped_and_flat_responses() {
        let wrapped: ExtractionResponse =
            serde_json::from_str(r#"{"fields": {"nombre": "Ana", "correo": null}}"#).unwrap();
        let fields = wrapped.into_fields();
        assert_eq!(fields.get("nombre").map(String::as_str), Some("Ana"));
        assert!(!fields.contains_key("correo"));

        let flat: ExtractionResponse =
            serde_json::from_str(r#"{"tipo_maquinaria": "rompedores"}"#).unwrap();
        assert_eq!(
            flat.into_fields().get("tipo_maquinaria").map(String::as_str),
            Some("rompedores")
        );
    }
}
