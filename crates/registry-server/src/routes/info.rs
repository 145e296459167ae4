//! Server info endpoint.

use axum::response::Json;
use serde_json::{json, Value};

pub async fn server_info() -> Json<Value> {
    Json(json!({
        "name": "registry-server",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Data product metadata registry HTTP server",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
