//! The resource API facade (C5): translates `dp:<name>` / `dp:<name>:<table>`
//! identifiers and JSON payloads into versioning-engine and metadata-store
//! calls.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use registry_core::engine;
use registry_core::model::{DataProductVersion, Schema};
use serde_json::Value;

use crate::error::{Result, ServerError};
use crate::services::AppState;

use super::identifiers::{parse_product_id, parse_schema_id};
use super::wire::{product_update_map, CreateProductRequest, ProductView, SchemaView, UpdateSchemaRequest};

/// Mount the `/data-products` surface. Kept separate from [`schema_routes`]
/// so the idempotency-cache layer can be scoped to product creation alone:
/// a retried `POST /data-products` should replay the first response, but a
/// retried `POST /schemas/:id` for a name that already exists is a genuine
/// conflict the store must still reject (see scenario 8 vs. scenario 4).
pub fn product_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/data-products", post(create_product).get(list_products))
        .route("/data-products/:id", get(get_product).put(update_product))
}

/// Mount the `/schemas` surface.
pub fn schema_routes() -> Router<Arc<AppState>> {
    Router::new().route("/schemas/:id", get(get_schema).put(update_schema).post(create_schema))
}

async fn create_product(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductView>)> {
    let schemas = body
        .schemas
        .into_iter()
        .map(|s| s.into_domain().map_err(ServerError::from))
        .collect::<Result<Vec<Schema>>>()?;

    let initial = DataProductVersion {
        id: None,
        name: body.name,
        version: registry_core::Version::INITIAL,
        description: body.description,
        domain: body.domain,
        status: body.status,
        email: body.email,
        retention_period: body.retention_period,
        dpia_required: body.dpia_required,
        owner: body.owner,
        owner_display_name: body.owner_display_name,
        maintainer: body.maintainer,
        maintainer_display_name: body.maintainer_display_name,
        tags: body.tags,
        dpia_location: None,
        last_updated: None,
        creation_date: None,
        storage_location: None,
        row_count: None,
        schemas,
    };

    let persisted = state.store.create_product(initial).await?;
    tracing::info!(product = %persisted.name, version = %persisted.version, "created product");
    Ok((StatusCode::OK, Json(ProductView::from_domain(&persisted))))
}

async fn list_products(State(state): State<Arc<AppState>>) -> Result<Json<Vec<ProductView>>> {
    let versions = state.store.list_latest().await?;
    Ok(Json(versions.iter().map(ProductView::from_domain).collect()))
}

async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ProductView>> {
    let name = parse_product_id(&id)?;
    let version = state.store.fetch_latest(&name).await?;
    Ok(Json(ProductView::from_domain(&version)))
}

async fn update_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<ProductView>> {
    let name = parse_product_id(&id)?;
    let current = state.store.fetch_latest(&name).await?;
    let patch = product_update_map(body)?;
    let proposed = engine::update_metadata(&current, patch)?;

    let persisted = if proposed.id.is_some() {
        proposed
    } else {
        let next = state.store.advance_head(&name, proposed).await?;
        tracing::info!(product = %name, version = %next.version, "advanced product head");
        next
    };

    Ok(Json(ProductView::from_domain(&persisted)))
}

async fn get_schema(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SchemaView>> {
    let (name, table) = parse_schema_id(&id)?;
    let schema = state.store.fetch_schema(&name, &table).await?;
    Ok(Json(SchemaView::from_domain(&name, &schema)))
}

async fn create_schema(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<super::wire::CreateSchemaRequest>,
) -> Result<(StatusCode, Json<SchemaView>)> {
    let (name, table) = parse_schema_id(&id)?;
    if body.name != table {
        return Err(ServerError::Validation(format!(
            "schema name {:?} does not match path table {table:?}",
            body.name
        )));
    }

    let schema = body.into_domain()?;
    let created = state.store.create_schema(&name, schema).await?;
    tracing::info!(product = %name, table = %table, "created schema");
    Ok((StatusCode::OK, Json(SchemaView::from_domain(&name, &created))))
}

async fn update_schema(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateSchemaRequest>,
) -> Result<Json<SchemaView>> {
    let (name, table) = parse_schema_id(&id)?;
    let current = state.store.fetch_latest(&name).await?;
    let patch = body.into_patch()?;
    let proposed = engine::update_schema(&current, &table, patch)?;

    let persisted = if proposed.id.is_some() {
        proposed
    } else {
        let next = state.store.advance_head(&name, proposed).await?;
        tracing::info!(product = %name, table = %table, version = %next.version, "advanced product head via schema update");
        next
    };

    let schema = persisted
        .schemas
        .iter()
        .find(|s| s.name == table)
        .cloned()
        .ok_or_else(|| ServerError::Store(registry_store::StoreError::schema_not_found(&name, &table)))?;

    Ok(Json(SchemaView::from_domain(&name, &schema)))
}
