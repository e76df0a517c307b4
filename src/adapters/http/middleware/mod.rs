//! HTTP middleware for axum.

pub mod auth;

pub use auth::require_agent_token;
