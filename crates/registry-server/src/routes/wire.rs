//! Wire-facing (camelCase) request/response DTOs, kept separate from the
//! snake_case domain types in `registry_core::model` per the wire contract.

use std::collections::BTreeMap;

use registry_core::model::{Column, DataProductVersion, Schema, Status};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::identifiers::{product_id, schema_id};

/// A column as it appears in request and response bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnView {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub description: String,
}

/// A schema as it appears in response bodies.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaView {
    pub id: String,
    pub name: String,
    pub table_description: String,
    pub columns: Vec<ColumnView>,
}

impl SchemaView {
    pub fn from_domain(product_name: &str, schema: &Schema) -> Self {
        Self {
            id: schema_id(product_name, &schema.name),
            name: schema.name.clone(),
            table_description: schema.table_description.clone(),
            columns: schema
                .columns
                .iter()
                .map(|c| ColumnView {
                    name: c.name.clone(),
                    type_: c.type_.clone(),
                    description: c.description.clone(),
                })
                .collect(),
        }
    }
}

/// A data product version as it appears in response bodies.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub domain: String,
    pub status: Status,
    pub email: String,
    pub retention_period: u32,
    pub dpia_required: bool,
    pub owner: String,
    pub owner_display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintainer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintainer_display_name: Option<String>,
    pub tags: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dpia_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<i64>,
    pub schemas: Vec<SchemaView>,
}

impl ProductView {
    pub fn from_domain(version: &DataProductVersion) -> Self {
        Self {
            id: product_id(&version.name),
            name: version.name.clone(),
            version: version.version.to_string(),
            description: version.description.clone(),
            domain: version.domain.clone(),
            status: version.status,
            email: version.email.clone(),
            retention_period: version.retention_period,
            dpia_required: version.dpia_required,
            owner: version.owner.clone(),
            owner_display_name: version.owner_display_name.clone(),
            maintainer: version.maintainer.clone(),
            maintainer_display_name: version.maintainer_display_name.clone(),
            tags: version.tags.clone(),
            dpia_location: version.dpia_location.clone(),
            last_updated: version.last_updated,
            creation_date: version.creation_date,
            storage_location: version.storage_location.clone(),
            row_count: version.row_count,
            schemas: version
                .schemas
                .iter()
                .map(|s| SchemaView::from_domain(&version.name, s))
                .collect(),
        }
    }
}

/// Request body for creating a new product. Schemas are optional; an
/// absent list creates the product with no attached tables.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_status")]
    pub status: Status,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub retention_period: u32,
    #[serde(default)]
    pub dpia_required: bool,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub owner_display_name: String,
    #[serde(default)]
    pub maintainer: Option<String>,
    #[serde(default)]
    pub maintainer_display_name: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub schemas: Vec<CreateSchemaRequest>,
}

fn default_status() -> Status {
    Status::Draft
}

/// Request body for creating a schema under a product's current version.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSchemaRequest {
    pub name: String,
    #[serde(default)]
    pub table_description: String,
    #[serde(default)]
    pub columns: Vec<ColumnView>,
}

impl CreateSchemaRequest {
    pub fn into_domain(self) -> registry_core::Result<Schema> {
        let columns = self
            .columns
            .into_iter()
            .map(|c| Column::new(c.name, c.type_, c.description))
            .collect::<registry_core::Result<Vec<_>>>()?;
        Schema::new(self.name, self.table_description, columns)
    }
}

/// Request body for a schema update (`PUT dp:<name>:<table>`): only the
/// fields present are patched, mirroring `registry_core::SchemaPatch`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSchemaRequest {
    #[serde(default)]
    pub table_description: Option<String>,
    #[serde(default)]
    pub columns: Option<Vec<ColumnView>>,
}

impl UpdateSchemaRequest {
    pub fn into_patch(self) -> registry_core::Result<registry_core::SchemaPatch> {
        let columns = self
            .columns
            .map(|cols| {
                cols.into_iter()
                    .map(|c| Column::new(c.name, c.type_, c.description))
                    .collect::<registry_core::Result<Vec<_>>>()
            })
            .transpose()?;
        Ok(registry_core::SchemaPatch {
            columns,
            table_description: self.table_description,
        })
    }
}

/// camelCase wire field names, mapped to the snake_case keys the
/// classifier and `DataProductVersion::apply_metadata_map` use.
fn camel_to_snake(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            out.push('_');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Convert a camelCase JSON object body into a snake_case keyed map
/// suitable for [`registry_core::engine::update_metadata`]. Keys that do
/// not map to the identity field or an updatable metadata field are
/// rejected up front as a validation error rather than silently ignored.
pub fn product_update_map(body: Value) -> crate::error::Result<Map<String, Value>> {
    let Value::Object(fields) = body else {
        return Err(crate::error::ServerError::Validation(
            "request body must be a JSON object".to_string(),
        ));
    };

    let mut snake = Map::new();
    for (key, value) in fields {
        let snake_key = camel_to_snake(&key);
        if snake_key != "name" && !registry_core::UPDATABLE_METADATA_FIELDS.contains(&snake_key.as_str())
        {
            return Err(crate::error::ServerError::Validation(format!(
                "unknown field: {key}"
            )));
        }
        snake.insert(snake_key, value);
    }
    Ok(snake)
}
