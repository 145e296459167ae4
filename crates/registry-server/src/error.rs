//! HTTP-facing error type: translates engine/store failures into status
//! codes and the wire's `{"detail": "..."}` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServerError>;

/// Errors that can surface from an HTTP handler.
#[derive(Error, Debug)]
pub enum ServerError {
    /// A path segment did not parse as `dp:<name>` or `dp:<name>:<table>`.
    #[error("{0}")]
    BadIdentifier(String),

    /// A request body failed field-level validation (unknown field,
    /// forbidden key, malformed regex-checked value).
    #[error("validation error: {0}")]
    Validation(String),

    /// The versioning engine rejected or could not process the request.
    #[error(transparent)]
    Engine(#[from] registry_core::EngineError),

    /// The metadata store rejected or could not process the request.
    #[error(transparent)]
    Store(#[from] registry_store::StoreError),

    /// A configuration error surfaced at startup.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Body was not valid JSON.
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),
}

impl ServerError {
    /// HTTP status code this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::BadIdentifier(_) => StatusCode::BAD_REQUEST,
            ServerError::Validation(_) => StatusCode::BAD_REQUEST,
            ServerError::Json(_) => StatusCode::BAD_REQUEST,
            ServerError::Engine(e) => match e {
                registry_core::EngineError::MalformedVersion(_) => StatusCode::INTERNAL_SERVER_ERROR,
                registry_core::EngineError::InvalidUpdate(_) => StatusCode::BAD_REQUEST,
                registry_core::EngineError::Validation(_) => StatusCode::BAD_REQUEST,
                registry_core::EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            },
            ServerError::Store(e) => match e {
                registry_store::StoreError::NotFound(_) => StatusCode::NOT_FOUND,
                registry_store::StoreError::UniqueViolation(_) => StatusCode::CONFLICT,
                registry_store::StoreError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                registry_store::StoreError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ServerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable error code, mirrored in logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::BadIdentifier(_) => "bad_identifier",
            ServerError::Validation(_) => "validation_error",
            ServerError::Json(_) => "invalid_json",
            ServerError::Engine(registry_core::EngineError::MalformedVersion(_)) => {
                "malformed_version"
            }
            ServerError::Engine(registry_core::EngineError::InvalidUpdate(_)) => "invalid_update",
            ServerError::Engine(registry_core::EngineError::Validation(_)) => "validation_error",
            ServerError::Engine(registry_core::EngineError::NotFound(_)) => "not_found",
            ServerError::Store(registry_store::StoreError::NotFound(_)) => "not_found",
            ServerError::Store(registry_store::StoreError::UniqueViolation(_)) => "conflict",
            ServerError::Store(registry_store::StoreError::Database(_)) => "database_error",
            ServerError::Store(registry_store::StoreError::Serialization(_)) => "serialization_error",
            ServerError::Config(_) => "config_error",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.error_code(), "request failed");
        } else {
            tracing::warn!(error = %self, code = self.error_code(), "request rejected");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
