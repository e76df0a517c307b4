//! HTTP handlers for conversation endpoints.
//!
//! Each request builds a fresh orchestrator from the shared collaborators,
//! so no conversation state lives in the server between requests. Mutating
//! units of work run on their own task: a request that is dropped or timed
//! out does not cancel a half-finished commit.

use std::future::Future;

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use secrecy::Secret;

use crate::application::{
    AgentMessageCommand, Collaborators, LeadMessageCommand, OrchestratorError,
    ReleaseControlCommand, TakeControlCommand,
};
use crate::domain::foundation::ValidationError;

use super::dto::{
    AgentMessageRequest, AgentMessageResponse, ErrorResponse, LeadMessageRequest,
    LeadMessageResponse, ModeControlResponse, ReleaseRequest, TakeoverRequest,
};
use super::whatsapp::WebhookSecrets;

/// Shared application state for the HTTP API.
#[derive(Clone)]
pub struct AppState {
    pub collaborators: Collaborators,
    /// Shared secret expected on agent routes.
    pub agent_token: Secret<String>,
    /// Set when the WhatsApp webhook is enabled.
    pub whatsapp: Option<WebhookSecrets>,
}

impl AppState {
    pub fn new(collaborators: Collaborators, agent_token: Secret<String>) -> Self {
        Self {
            collaborators,
            agent_token,
            whatsapp: None,
        }
    }

    pub fn with_whatsapp_webhook(mut self, secrets: WebhookSecrets) -> Self {
        self.whatsapp = Some(secrets);
        self
    }
}

/// Runs a unit of work on its own task and waits for it.
pub(crate) async fn run_to_completion<T, F>(work: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, OrchestratorError>> + Send + 'static,
    T: Send + 'static,
{
    match tokio::spawn(work).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(e) => {
            tracing::error!(error = %e, "unit of work aborted");
            Err(ApiError::Internal)
        }
    }
}

/// POST /api/leads/messages
pub async fn post_lead_message(
    State(state): State<AppState>,
    Json(req): Json<LeadMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let orchestrator = state.collaborators.orchestrator();
    let cmd = LeadMessageCommand::from(req);
    let outcome =
        run_to_completion(async move { orchestrator.handle_lead_message(cmd).await }).await?;
    Ok((StatusCode::OK, Json(LeadMessageResponse::from(outcome))))
}

/// POST /api/agent/messages
pub async fn post_agent_message(
    State(state): State<AppState>,
    Json(req): Json<AgentMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let orchestrator = state.collaborators.orchestrator();
    let cmd = AgentMessageCommand::from(req);
    let outcome =
        run_to_completion(async move { orchestrator.handle_agent_message(cmd).await }).await?;
    Ok((StatusCode::OK, Json(AgentMessageResponse::from(outcome))))
}

/// POST /api/agent/takeover
pub async fn post_takeover(
    State(state): State<AppState>,
    Json(req): Json<TakeoverRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let orchestrator = state.collaborators.orchestrator();
    let cmd = TakeControlCommand::from(req);
    let outcome = run_to_completion(async move { orchestrator.take_control(cmd).await }).await?;
    Ok((StatusCode::OK, Json(ModeControlResponse::from(outcome))))
}

/// POST /api/agent/release
pub async fn post_release(
    State(state): State<AppState>,
    Json(req): Json<ReleaseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let orchestrator = state.collaborators.orchestrator();
    let cmd = ReleaseControlCommand::from(req);
    let outcome = run_to_completion(async move { orchestrator.release_control(cmd).await }).await?;
    Ok((StatusCode::OK, Json(ModeControlResponse::from(outcome))))
}

/// GET /api/conversations/:identity
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state
        .collaborators
        .orchestrator()
        .get_conversation(&identity)
        .await?;
    Ok((StatusCode::OK, Json(summary)))
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error mapping
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub enum ApiError {
    BadRequest(ValidationError),
    Unauthorized,
    Forbidden(&'static str),
    NotFound(String),
    /// Delivery failed after the conversation was committed.
    DeliveryFailed { message_id: String, reason: String },
    Unavailable(String),
    Internal,
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::Validation(e) => ApiError::BadRequest(e),
            OrchestratorError::ConversationNotFound(id) => ApiError::NotFound(id.to_string()),
            OrchestratorError::Delivery {
                message_id, reason, ..
            } => ApiError::DeliveryFailed {
                message_id: message_id.to_string(),
                reason,
            },
            OrchestratorError::Persistence(e) => ApiError::Unavailable(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ApiError::BadRequest(err) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("BAD_REQUEST", err.to_string())
                    .with_details(serde_json::json!({ "field": err.field() })),
            ),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("UNAUTHORIZED", "Missing or invalid credentials"),
            ),
            ApiError::Forbidden(msg) => {
                (StatusCode::FORBIDDEN, ErrorResponse::new("FORBIDDEN", msg))
            }
            ApiError::NotFound(id) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new("NOT_FOUND", format!("Conversation not found: {}", id)),
            ),
            ApiError::DeliveryFailed { message_id, reason } => {
                tracing::warn!(%message_id, %reason, "delivery failed after commit");
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorResponse::new(
                        "DELIVERY_FAILED",
                        "Message could not be delivered; it was committed to the conversation",
                    )
                    .with_details(serde_json::json!({
                        "committed": true,
                        "message_id": message_id,
                        "reason": reason,
                    })),
                )
            }
            ApiError::Unavailable(msg) => {
                tracing::error!("Persistence error: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse::new("PERSISTENCE_FAILED", "Conversation could not be saved"),
                )
            }
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("INTERNAL_ERROR", "The request could not be processed"),
            ),
        };

        (status, Json(error)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{LeadId, MessageId};

    #[test]
    fn validation_maps_to_bad_request() {
        let err = ApiError::from(OrchestratorError::Validation(ValidationError::empty_field("text")));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn delivery_failure_maps_to_bad_gateway() {
        let err = ApiError::from(OrchestratorError::Delivery {
            lead_id: LeadId::new("5215512345678").unwrap(),
            message_id: MessageId::new(),
            reason: "timeout".to_string(),
        });
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn missing_conversation_maps_to_not_found() {
        let err = ApiError::from(OrchestratorError::ConversationNotFound(
            LeadId::new("5215512345678").unwrap(),
        ));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
