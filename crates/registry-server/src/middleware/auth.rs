//! Bearer-token authentication, toggled by `auth.enabled`.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::services::AppState;

/// Reject requests that do not carry the configured bearer token.
///
/// Applied only to the data-product/schema API routes; health and info
/// stay open so orchestrators can probe the server without a token.
pub async fn require_bearer_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.auth.enabled {
        return next.run(request).await;
    }

    let expected = state.config.auth.token.as_deref().unwrap_or_default();
    let supplied = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match supplied {
        Some(token) if token == expected => next.run(request).await,
        _ => {
            tracing::warn!("rejected request with missing or invalid bearer token");
            (StatusCode::UNAUTHORIZED, "missing or invalid bearer token").into_response()
        }
    }
}
