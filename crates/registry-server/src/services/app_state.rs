//! Shared application state handed to every handler via axum's `State`.

use moka::future::Cache;
use registry_store::{MetadataStore, PostgresStore};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};

use crate::{
    config::ServerConfig,
    error::{Result, ServerError},
    middleware::idempotency::CachedResponse,
};

/// State shared across every request: the metadata store and the
/// idempotency cache (C6).
#[derive(Clone)]
pub struct AppState {
    /// The metadata store backing every product/version/schema operation.
    pub store: Arc<dyn MetadataStore>,

    /// Cached responses for idempotency-key replay, keyed on
    /// `<path>#<body-hash>`.
    pub idempotency: Cache<String, CachedResponse>,

    /// The configuration this state was built from.
    pub config: ServerConfig,
}

impl AppState {
    /// Build application state: connect the database pool, run
    /// migrations if configured to, and size the idempotency cache.
    pub async fn new(config: &ServerConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .acquire_timeout(Duration::from_secs(config.database.connect_timeout))
            .connect(&config.database.url)
            .await
            .map_err(registry_store::StoreError::Database)?;

        if config.database.run_migrations {
            sqlx::migrate!("../../migrations")
                .run(&pool)
                .await
                .map_err(|e| ServerError::Store(registry_store::StoreError::Database(e.into())))?;
        }

        let store: Arc<dyn MetadataStore> = Arc::new(PostgresStore::new(pool));
        let idempotency = Self::init_idempotency_cache();

        Ok(Self {
            store,
            idempotency,
            config: config.clone(),
        })
    }

    /// Build application state around an in-memory store, skipping the
    /// database connection entirely. Used by integration tests and local
    /// runs that don't have Postgres available.
    pub fn new_in_memory(config: ServerConfig) -> Self {
        Self {
            store: Arc::new(registry_store::MemoryStore::new()),
            idempotency: Self::init_idempotency_cache(),
            config,
        }
    }

    fn init_idempotency_cache() -> Cache<String, CachedResponse> {
        Cache::builder().max_capacity(10_000).build()
    }
}
