//! HTTP server for the data-product metadata registry.
//!
//! Wires the versioning engine (`registry-core`) and the metadata store
//! (`registry-store`) behind an `axum` resource API facade, with layered
//! configuration, structured logging, request idempotency, and a single
//! bearer-token authentication toggle.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod services;

pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use server::{build_app, Server};

/// Re-exports commonly needed by the binary entry point.
pub mod prelude {
    pub use crate::{
        config::ServerConfig,
        error::{Result, ServerError},
        server::Server,
        services::AppState,
    };
}
