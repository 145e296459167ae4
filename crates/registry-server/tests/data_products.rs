//! End-to-end tests driving the axum router directly with `tower::ServiceExt::oneshot`,
//! against an in-memory store, covering the concrete scenarios from the
//! resource API facade's contract.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use registry_server::services::AppState;
use registry_server::{build_app, ServerConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn test_app() -> axum::Router {
    let config = ServerConfig::default();
    let app_state = Arc::new(AppState::new_in_memory(config.clone()));
    build_app(&config, app_state)
}

async fn send(app: &axum::Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value, axum::http::HeaderMap) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(match body {
            Some(v) => Body::from(serde_json::to_vec(&v).unwrap()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json, headers)
}

fn hmpps_payload() -> Value {
    json!({
        "name": "hmpps_use_of_force",
        "description": "Use of force incidents",
        "domain": "hmpps",
        "status": "draft",
        "email": "team@example.com",
        "retentionPeriod": 365,
        "dpiaRequired": false,
        "owner": "hmpps-team",
        "ownerDisplayName": "HMPPS Team",
        "tags": {},
        "schemas": []
    })
}

#[tokio::test]
async fn scenario_1_create_initial_product() {
    let app = test_app();
    let (status, body, _) = send(&app, Method::POST, "/data-products", Some(hmpps_payload())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], "v1.0");
    assert_eq!(body["id"], "dp:hmpps_use_of_force");
}

#[tokio::test]
async fn scenario_2_invalid_identifier() {
    let app = test_app();
    let (status, body, _) = send(&app, Method::GET, "/data-products/hmpps_use_of_the_force", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Invalid id: hmpps_use_of_the_force");
}

#[tokio::test]
async fn scenario_3_missing_product() {
    let app = test_app();
    let (status, _, _) = send(&app, Method::GET, "/data-products/dp:unknown", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn scenario_4_idempotent_replay() {
    let app = test_app();
    let payload = hmpps_payload();

    let (first_status, _, first_headers) =
        send(&app, Method::POST, "/data-products", Some(payload.clone())).await;
    assert_eq!(first_status, StatusCode::OK);
    assert!(first_headers.get("idempotent-replayed").is_none());

    let (second_status, _, second_headers) =
        send(&app, Method::POST, "/data-products", Some(payload)).await;
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(second_headers.get("idempotent-replayed").unwrap(), "true");
}

#[tokio::test]
async fn scenario_5_minor_schema_update_adds_column() {
    let app = test_app();
    let mut payload = hmpps_payload();
    payload["schemas"] = json!([{
        "name": "events",
        "tableDescription": "events table",
        "columns": [
            {"name": "id", "type": "bigint", "description": ""},
            {"name": "name", "type": "string", "description": ""}
        ]
    }]);
    send(&app, Method::POST, "/data-products", Some(payload)).await;

    let update = json!({
        "columns": [
            {"name": "id", "type": "bigint", "description": ""},
            {"name": "name", "type": "string", "description": ""},
            {"name": "extra", "type": "string", "description": ""}
        ]
    });
    let (status, body, _) = send(&app, Method::PUT, "/schemas/dp:hmpps_use_of_force:events", Some(update)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["columns"].as_array().unwrap().len(), 3);

    let (_, product, _) = send(&app, Method::GET, "/data-products/dp:hmpps_use_of_force", None).await;
    assert_eq!(product["version"], "v1.1");
}

#[tokio::test]
async fn scenario_6_major_schema_update_removes_column() {
    let app = test_app();
    let mut payload = hmpps_payload();
    payload["schemas"] = json!([{
        "name": "events",
        "tableDescription": "events table",
        "columns": [
            {"name": "id", "type": "bigint", "description": ""},
            {"name": "name", "type": "string", "description": ""}
        ]
    }]);
    send(&app, Method::POST, "/data-products", Some(payload)).await;

    let update = json!({
        "columns": [{"name": "id", "type": "bigint", "description": ""}]
    });
    let (status, body, _) = send(&app, Method::PUT, "/schemas/dp:hmpps_use_of_force:events", Some(update)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["columns"].as_array().unwrap().len(), 1);

    let (_, product, _) = send(&app, Method::GET, "/data-products/dp:hmpps_use_of_force", None).await;
    assert_eq!(product["version"], "v2.0");
}

#[tokio::test]
async fn scenario_7_forbidden_metadata_update_rejects_rename() {
    let app = test_app();
    send(&app, Method::POST, "/data-products", Some(hmpps_payload())).await;

    let update = json!({"name": "renamed"});
    let (status, body, _) = send(&app, Method::PUT, "/data-products/dp:hmpps_use_of_force", Some(update)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("invalid update"));
}

#[tokio::test]
async fn scenario_8_duplicate_schema_name_conflicts() {
    let app = test_app();
    send(&app, Method::POST, "/data-products", Some(hmpps_payload())).await;

    let schema = json!({
        "name": "t",
        "tableDescription": "a table",
        "columns": [{"name": "id", "type": "bigint", "description": ""}]
    });

    let (first, _, _) = send(&app, Method::POST, "/schemas/dp:hmpps_use_of_force:t", Some(schema.clone())).await;
    assert_eq!(first, StatusCode::OK);

    let (second, _, _) = send(&app, Method::POST, "/schemas/dp:hmpps_use_of_force:t", Some(schema)).await;
    assert_eq!(second, StatusCode::CONFLICT);
}

#[tokio::test]
async fn ambient_9_config_validation_rejects_zero_port() {
    let mut config = ServerConfig::default();
    config.server.port = 0;
    config.database.url = "postgresql://localhost/registry".to_string();
    assert!(config.validate().is_err());
}

#[tokio::test]
async fn ambient_11_get_requests_are_never_idempotency_replayed() {
    let app = test_app();
    send(&app, Method::POST, "/data-products", Some(hmpps_payload())).await;

    let (_, _, first_headers) = send(&app, Method::GET, "/data-products/dp:hmpps_use_of_force", None).await;
    let (_, _, second_headers) = send(&app, Method::GET, "/data-products/dp:hmpps_use_of_force", None).await;

    assert!(first_headers.get("idempotent-replayed").is_none());
    assert!(second_headers.get("idempotent-replayed").is_none());
}
