//! Idempotency-key cache (C6): replays a previously produced response
//! for a POST/PUT request whose path and canonicalized body were seen
//! before, via the `moka::future::Cache` held on [`AppState`].

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::services::AppState;

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;
const REPLAYED_HEADER: &str = "idempotent-replayed";

/// A previously produced response, cheap to clone and replay.
#[derive(Clone)]
pub struct CachedResponse {
    status: StatusCode,
    body: Vec<u8>,
}

/// Cache POST/PUT responses keyed on `<path>#<hash(body)>` and replay
/// them on a repeat request; GET/DELETE pass straight through.
pub async fn cache_idempotent_responses(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !matches!(request.method(), &Method::POST | &Method::PUT) {
        return next.run(request).await;
    }

    let path = request.uri().path().to_string();
    let (parts, body) = request.into_parts();
    let body_bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => return StatusCode::PAYLOAD_TOO_LARGE.into_response(),
    };

    let key = format!("{path}#{}", canonical_hash(&body_bytes));

    if let Some(cached) = state.idempotency.get(&key).await {
        let mut response = (cached.status, cached.body).into_response();
        response
            .headers_mut()
            .insert(REPLAYED_HEADER, HeaderValue::from_static("true"));
        return response;
    }

    let request = Request::from_parts(parts, Body::from(body_bytes));
    let response = next.run(request).await;

    let status = response.status();
    let (parts, body) = response.into_parts();
    let body_bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    };

    if status.is_success() {
        state
            .idempotency
            .insert(
                key,
                CachedResponse {
                    status,
                    body: body_bytes.to_vec(),
                },
            )
            .await;
    }

    Response::from_parts(parts, Body::from(body_bytes))
}

/// Sort object keys before hashing so semantically identical bodies
/// with different key order map to the same idempotency key.
fn canonical_hash(body: &[u8]) -> String {
    let canonical = match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(value) => serde_json::to_vec(&canonicalize(value)).unwrap_or_else(|_| body.to_vec()),
        Err(_) => body.to_vec(),
    };

    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    format!("{:x}", hasher.finalize())
}

fn canonicalize(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut sorted = serde_json::Map::new();
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            for key in keys {
                let v = map[&key].clone();
                sorted.insert(key, canonicalize(v));
            }
            serde_json::Value::Object(sorted)
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(canonicalize).collect())
        }
        other => other,
    }
}
