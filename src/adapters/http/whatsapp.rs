//! WhatsApp Cloud API webhook.
//!
//! `GET /webhooks/whatsapp` answers Meta's subscription handshake and
//! `POST /webhooks/whatsapp` turns inbound text messages into lead events,
//! using the WhatsApp message id (`wamid`) as the event id. Status callbacks
//! (sent, delivered, read) are acknowledged and ignored.
//!
//! When an app secret is configured, every POST must carry a valid
//! `X-Hub-Signature-256` HMAC-SHA256 of the raw body.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::application::LeadMessageCommand;
use crate::domain::foundation::{LeadId, Timestamp, ValidationError};

use super::handlers::{run_to_completion, ApiError, AppState};

type HmacSha256 = Hmac<Sha256>;

/// Sent when the lead sends audio, images or anything else that is not text.
pub const NON_TEXT_REPLY: &str = "¡Hola! Solo puedo procesar mensajes de texto. \
    Por favor, envíame un mensaje de texto y te responderé con información sobre maquinaria.";

const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";

/// Secrets for the inbound webhook.
#[derive(Clone)]
pub struct WebhookSecrets {
    verify_token: Secret<String>,
    app_secret: Option<Secret<String>>,
}

impl WebhookSecrets {
    pub fn new(verify_token: Secret<String>) -> Self {
        Self {
            verify_token,
            app_secret: None,
        }
    }

    pub fn with_app_secret(mut self, app_secret: Secret<String>) -> Self {
        self.app_secret = Some(app_secret);
        self
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Payload
// ════════════════════════════════════════════════════════════════════════════════

/// Query of the subscription handshake.
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub value: ChangeValue,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
    #[serde(default)]
    pub statuses: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    /// The `wamid` assigned by WhatsApp.
    pub id: String,
    pub from: String,
    /// Unix seconds, sent as a string.
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: Option<TextBody>,
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
    pub body: String,
}

/// One inbound message, normalised.
#[derive(Debug)]
pub enum InboundEvent {
    Text(LeadMessageCommand),
    Unsupported { from: String, kind: String },
}

impl WebhookPayload {
    fn values(&self) -> impl Iterator<Item = &ChangeValue> {
        self.entry.iter().flat_map(|e| e.changes.iter()).map(|c| &c.value)
    }

    pub fn has_statuses(&self) -> bool {
        self.values().any(|v| !v.statuses.is_empty())
    }

    pub fn events(&self) -> Vec<InboundEvent> {
        self.values()
            .flat_map(|v| v.messages.iter())
            .map(|message| match &message.text {
                Some(text) => InboundEvent::Text(
                    LeadMessageCommand::new(
                        message.from.as_str(),
                        text.body.as_str(),
                        event_time(message.timestamp.as_deref()),
                    )
                    .with_event_id(message.id.as_str()),
                ),
                None => InboundEvent::Unsupported {
                    from: message.from.clone(),
                    kind: message.kind.clone().unwrap_or_else(|| "unknown".to_string()),
                },
            })
            .collect()
    }
}

fn event_time(raw: Option<&str>) -> Timestamp {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .map(Timestamp::from_unix_secs)
        .unwrap_or_else(Timestamp::now)
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// GET /webhooks/whatsapp
pub async fn verify_webhook(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> Result<impl IntoResponse, ApiError> {
    let secrets = state
        .whatsapp
        .as_ref()
        .ok_or(ApiError::Forbidden("WhatsApp webhook is not configured"))?;

    let (Some(mode), Some(token)) = (params.mode.as_deref(), params.verify_token.as_deref()) else {
        return Err(ApiError::BadRequest(ValidationError::empty_field("hub.verify_token")));
    };

    if mode == "subscribe" && secret_matches(token, secrets.verify_token.expose_secret()) {
        tracing::info!("whatsapp webhook verified");
        Ok((StatusCode::OK, params.challenge.unwrap_or_default()))
    } else {
        tracing::warn!(mode, "whatsapp webhook verification failed");
        Err(ApiError::Forbidden("Verification failed"))
    }
}

/// POST /webhooks/whatsapp
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let secrets = state
        .whatsapp
        .as_ref()
        .ok_or(ApiError::Forbidden("WhatsApp webhook is not configured"))?;

    if let Some(app_secret) = &secrets.app_secret {
        let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
        let valid = signature
            .map(|s| signature_valid(&body, s, app_secret.expose_secret()))
            .unwrap_or(false);
        if !valid {
            tracing::warn!("rejected whatsapp webhook with invalid signature");
            return Err(ApiError::Unauthorized);
        }
    }

    let payload: WebhookPayload = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!(error = %e, "unreadable whatsapp webhook payload");
        ApiError::BadRequest(ValidationError::invalid_format("body", e.to_string()))
    })?;

    let events = payload.events();
    if events.is_empty() {
        if payload.has_statuses() {
            tracing::debug!("whatsapp status update ignored");
        } else {
            tracing::debug!(object = ?payload.object, "whatsapp webhook without messages ignored");
        }
        return Ok((StatusCode::OK, "OK"));
    }

    for event in events {
        match event {
            InboundEvent::Text(cmd) => {
                let orchestrator = state.collaborators.orchestrator();
                let work = async move { orchestrator.handle_lead_message(cmd).await };
                let result = run_to_completion(work).await;
                match result {
                    Ok(outcome) if outcome.duplicate => {
                        tracing::debug!(
                            lead_id = %outcome.lead_id,
                            "redelivered whatsapp message acknowledged"
                        );
                    }
                    Ok(_) => {}
                    // Meta redelivers on failure; the wamid makes that safe.
                    Err(e @ (ApiError::Unavailable(_) | ApiError::Internal)) => return Err(e),
                    Err(e) => tracing::warn!(error = ?e, "whatsapp message handled with errors"),
                }
            }
            InboundEvent::Unsupported { from, kind } => {
                tracing::info!(%from, %kind, "non-text whatsapp message");
                reply_non_text(&state, &from).await;
            }
        }
    }

    Ok((StatusCode::OK, "OK"))
}

async fn reply_non_text(state: &AppState, from: &str) {
    let lead_id = match LeadId::new(from) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(error = %e, "non-text message from invalid sender");
            return;
        }
    };
    if let Err(e) = state.collaborators.delivery.send(&lead_id, NON_TEXT_REPLY).await {
        tracing::warn!(lead_id = %lead_id, error = %e, "failed to send text-only notice");
    }
}

fn secret_matches(presented: &str, expected: &str) -> bool {
    !expected.is_empty() && bool::from(presented.as_bytes().ct_eq(expected.as_bytes()))
}

/// Checks a `sha256=<hex>` signature of `body`.
fn signature_valid(body: &[u8], header: &str, app_secret: &str) -> bool {
    let Some(provided) = header.strip_prefix("sha256=").and_then(hex_decode) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(app_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let expected = mac.finalize().into_bytes();
    bool::from(expected.as_slice().ct_eq(provided.as_slice()))
}

fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    let hex = hex.trim();
    if !hex.is_ascii() || hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect()
}

#[cfg(test)]
pub(crate) fn sign(body: &[u8], app_secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes()).unwrap();
    mac.update(body);
    let hex: String = mac
        .finalize()
        .into_bytes()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect();
    format!("sha256={}", hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT_PAYLOAD: &str = r#"{
        "object": "whatsapp_business_account",
        "entry": [{
            "id": "102290129340398",
            "changes": [{
                "field": "messages",
                "value": {
                    "messaging_product": "whatsapp",
                    "contacts": [{"profile": {"name": "Ana"}, "wa_id": "5215512345678"}],
                    "messages": [{
                        "from": "5215512345678",
                        "id": "wamid.HBgNNTIxNTUxMjM0NTY3OBUCABIYFDNB",
                        "timestamp": "1767225600",
                        "type": "text",
                        "text": {"body": "Hola, busco un compresor"}
                    }]
                }
            }]
        }]
    }"#;

    const STATUS_PAYLOAD: &str = r#"{
        "object": "whatsapp_business_account",
        "entry": [{"changes": [{"value": {
            "statuses": [{"id": "wamid.X", "status": "delivered", "recipient_id": "5215512345678"}]
        }}]}]
    }"#;

    #[test]
    fn text_message_becomes_lead_event() {
        let payload: WebhookPayload = serde_json::from_str(TEXT_PAYLOAD).unwrap();
        let events = payload.events();

        assert_eq!(events.len(), 1);
        let InboundEvent::Text(cmd) = &events[0] else {
            panic!("expected a text event");
        };
        assert_eq!(cmd.lead_id, "5215512345678");
        assert_eq!(cmd.text, "Hola, busco un compresor");
        assert_eq!(cmd.event_id.as_deref(), Some("wamid.HBgNNTIxNTUxMjM0NTY3OBUCABIYFDNB"));
        assert_eq!(cmd.timestamp, Timestamp::from_unix_secs(1_767_225_600));
    }

    #[test]
    fn status_updates_carry_no_events() {
        let payload: WebhookPayload = serde_json::from_str(STATUS_PAYLOAD).unwrap();
        assert!(payload.events().is_empty());
        assert!(payload.has_statuses());
    }

    #[test]
    fn non_text_message_is_unsupported() {
        let payload: WebhookPayload = serde_json::from_str(
            r#"{"entry": [{"changes": [{"value": {"messages": [
                {"from": "5215512345678", "id": "wamid.A", "type": "audio", "audio": {"id": "1"}}
            ]}}]}]}"#,
        )
        .unwrap();

        match &payload.events()[..] {
            [InboundEvent::Unsupported { from, kind }] => {
                assert_eq!(from, "5215512345678");
                assert_eq!(kind, "audio");
            }
            other => panic!("unexpected events: {:?}", other),
        }
    }

    #[test]
    fn signatures_are_checked_against_the_raw_body() {
        let body = TEXT_PAYLOAD.as_bytes();
        let header = sign(body, "app-secret");

        assert!(signature_valid(body, &header, "app-secret"));
        assert!(!signature_valid(body, &header, "other-secret"));
        assert!(!signature_valid(b"{}", &header, "app-secret"));
        assert!(!signature_valid(body, "sha256=zz", "app-secret"));
        assert!(!signature_valid(body, header.trim_start_matches("sha256="), "app-secret"));
    }

    #[test]
    fn hex_decode_rejects_odd_and_non_ascii_input() {
        assert_eq!(hex_decode("0aff"), Some(vec![0x0a, 0xff]));
        assert_eq!(hex_decode("abc"), None);
        assert_eq!(hex_decode("éé"), None);
    }
}
