//! The axum application: route wiring, middleware layers, and the
//! graceful-shutdown-aware serve loop.

use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    middleware,
    routing::get,
    Router,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::{
    config::ServerConfig,
    error::Result,
    middleware::{auth::require_bearer_token, idempotency::cache_idempotent_responses},
    routes,
    services::AppState,
};

/// The registry HTTP server.
pub struct Server {
    config: ServerConfig,
    app_state: Arc<AppState>,
}

impl Server {
    /// Build the server, connecting to the database and priming state.
    pub async fn new(config: ServerConfig) -> Result<Self> {
        let app_state = Arc::new(AppState::new(&config).await?);
        Ok(Self { config, app_state })
    }

    /// Bind and serve until a shutdown signal arrives.
    pub async fn start(self) -> Result<()> {
        let app = build_app(&self.config, self.app_state.clone());
        let addr = self.socket_addr();

        info!("starting registry server on {addr}");

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| registry_store::StoreError::Database(sqlx::Error::Io(e)))?;

        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| registry_store::StoreError::Database(sqlx::Error::Io(e)))?;

        info!("server stopped gracefully");
        Ok(())
    }

    fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.config.server.host, self.config.server.port)
            .parse()
            .expect("invalid server bind address")
    }
}

/// Assemble the full `axum::Router`: routes, the idempotency and
/// bearer-auth middleware, and the tower-http layer stack. Split out from
/// [`Server`] so tests can drive the router directly against an
/// in-memory [`AppState`] without a database connection.
pub fn build_app(config: &ServerConfig, app_state: Arc<AppState>) -> Router {
    // Idempotency replay is scoped to product creation: a retried schema
    // POST must still hit the store so duplicate names surface as 409s.
    let product_routes = routes::data_products::product_routes().layer(middleware::from_fn_with_state(
        app_state.clone(),
        cache_idempotent_responses,
    ));
    let schema_routes = routes::data_products::schema_routes();

    let api_routes = product_routes
        .merge(schema_routes)
        .layer(middleware::from_fn_with_state(app_state.clone(), require_bearer_token));

    let mut app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/info", get(routes::info::server_info))
        .merge(api_routes)
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(TimeoutLayer::new(Duration::from_secs(config.server.timeout)));

    if config.server.compression_enabled {
        app = app.layer(CompressionLayer::new());
    }

    if config.server.cors_enabled {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        );
    }

    app.layer(TraceLayer::new_for_http()).with_state(app_state)
}

/// Wait for Ctrl+C or SIGTERM, whichever comes first.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C"),
        _ = terminate => info!("received SIGTERM"),
    }

    warn!("starting graceful shutdown");
}
