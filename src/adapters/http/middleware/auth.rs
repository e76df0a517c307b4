//! Agent token middleware.
//!
//! Agent routes expect `Authorization: Bearer <token>` carrying the shared
//! agent secret. The comparison runs in constant time.
//!
//! ```text
//! Request → require_agent_token → handler
//!                 ↓ (missing or wrong token)
//!               401 Unauthorized
//! ```

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use secrecy::ExposeSecret;
use subtle::ConstantTimeEq;

use crate::adapters::http::handlers::{ApiError, AppState};

pub async fn require_agent_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    match token {
        Some(token) if token_matches(token, state.agent_token.expose_secret()) => {
            next.run(request).await
        }
        Some(_) => {
            tracing::warn!("rejected agent request with invalid token");
            ApiError::Unauthorized.into_response()
        }
        None => ApiError::Unauthorized.into_response(),
    }
}

fn token_matches(presented: &str, expected: &str) -> bool {
    !expected.is_empty() && bool::from(presented.as_bytes().ct_eq(expected.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compares_tokens_exactly() {
        assert!(token_matches("s3cret", "s3cret"));
        assert!(!token_matches("s3cre", "s3cret"));
        assert!(!token_matches("S3CRET", "s3cret"));
    }

    #[test]
    fn empty_expected_token_never_matches() {
        assert!(!token_matches("", ""));
    }
}
