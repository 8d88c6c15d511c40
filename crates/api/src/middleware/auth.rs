//! # Authentication Module
//!
//! Webhook routes are called by the messaging gateway. When `WEBHOOK_TOKEN`
//! is configured every webhook call must carry it as a bearer token.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use pelada_core::errors::PeladaError;

use crate::{ApiState, middleware::error_handling::AppError};

/// Rejects webhook calls without the configured bearer token.
///
/// Open when no token is configured.
pub async fn require_webhook_token(
    State(state): State<Arc<ApiState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(expected) = &state.webhook_token {
        if !token_matches(request.headers(), expected) {
            warn!(path = %request.uri().path(), "Rejected webhook call with a missing or wrong token");
            return Err(AppError(PeladaError::Authentication(
                "invalid webhook token".to_string(),
            )));
        }
    }

    Ok(next.run(request).await)
}

/// Compares the `Authorization: Bearer` value against `expected`.
pub fn token_matches(headers: &HeaderMap, expected: &str) -> bool {
    let Some(presented) = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
    else {
        return false;
    };

    // Length leaks but content does not.
    presented.len() == expected.len()
        && presented
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
}
