//! HTTP adapter - REST API over the orchestrator.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod whatsapp;

pub use handlers::{ApiError, AppState};
pub use routes::api_router;
pub use whatsapp::WebhookSecrets;
