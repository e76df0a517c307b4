//! Axum routes for the HTTP API.

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;

use super::handlers::{
    get_conversation, health, post_agent_message, post_lead_message, post_release, post_takeover,
    AppState,
};
use super::middleware::require_agent_token;
use super::whatsapp::{receive_webhook, verify_webhook};

/// Creates the full router.
///
/// REST Endpoints:
/// - POST /api/leads/messages - Inbound lead event
/// - POST /api/agent/messages - Operator message (agent token)
/// - POST /api/agent/takeover - Explicit takeover (agent token)
/// - POST /api/agent/release - Hand back to the bot (agent token)
/// - GET /api/conversations/:identity - Conversation summary (agent token)
/// - GET /webhooks/whatsapp - WhatsApp subscription handshake
/// - POST /webhooks/whatsapp - WhatsApp inbound messages
/// - GET /health - Liveness
pub fn api_router(state: AppState) -> Router {
    let agent = Router::new()
        .route("/agent/messages", post(post_agent_message))
        .route("/agent/takeover", post(post_takeover))
        .route("/agent/release", post(post_release))
        .route("/conversations/:identity", get(get_conversation))
        .route_layer(from_fn_with_state(state.clone(), require_agent_token));

    let api = Router::new()
        .route("/leads/messages", post(post_lead_message))
        .merge(agent);

    Router::new()
        .nest("/api", api)
        .route(
            "/webhooks/whatsapp",
            get(verify_webhook).post(receive_webhook),
        )
        .route("/health", get(health))
        .with_state(state)
}
