//! Postgres-backed [`MetadataStore`] implementation.
//!
//! Every operation runs inside one transaction (`self.pool.begin()`), so a
//! read of the current version and a subsequent `advance_head` observe a
//! consistent snapshot and commit atomically. Uniqueness is enforced by the
//! database (`unique(name, version)`, `unique(version_id, name)`); this
//! layer only translates the resulting SQLSTATE `23505` into
//! [`StoreError::UniqueViolation`].

use async_trait::async_trait;
use registry_core::{Column, DataProductVersion, Schema, Status, Version};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::repository::MetadataStore;

/// A [`MetadataStore`] backed by a Postgres connection pool.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wrap an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The connection pool backing this store.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn load_version(
        executor: impl sqlx::PgExecutor<'_> + Copy,
        name: &str,
        version: &str,
    ) -> StoreResult<DataProductVersion> {
        let row: Option<VersionRow> = sqlx::query_as(
            "SELECT id, name, version, description, domain, status, email, retention_period, \
             dpia_required, owner, owner_display_name, maintainer, maintainer_display_name, tags, \
             dpia_location, last_updated, creation_date, storage_location, row_count \
             FROM versions WHERE name = $1 AND version = $2",
        )
        .bind(name)
        .bind(version)
        .fetch_optional(executor)
        .await?;

        let row = row.ok_or_else(|| StoreError::version_not_found(name, version))?;
        let schemas = Self::load_schemas(executor, row.id).await?;
        row.into_domain(schemas)
    }

    async fn load_schemas(
        executor: impl sqlx::PgExecutor<'_>,
        version_id: Uuid,
    ) -> StoreResult<Vec<Schema>> {
        let rows: Vec<SchemaRow> = sqlx::query_as(
            "SELECT id, name, table_description, columns FROM schemas \
             WHERE version_id = $1 ORDER BY name",
        )
        .bind(version_id)
        .fetch_all(executor)
        .await?;

        rows.into_iter().map(SchemaRow::into_domain).collect()
    }

    async fn insert_version(
        tx: &mut Transaction<'_, Postgres>,
        version_id: Uuid,
        v: &DataProductVersion,
    ) -> StoreResult<()> {
        let tags = serde_json::to_value(&v.tags)?;
        sqlx::query(
            "INSERT INTO versions \
             (id, name, version, description, domain, status, email, retention_period, \
              dpia_required, owner, owner_display_name, maintainer, maintainer_display_name, \
              tags, dpia_location, last_updated, creation_date, storage_location, row_count) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19)",
        )
        .bind(version_id)
        .bind(&v.name)
        .bind(v.version.to_string())
        .bind(&v.description)
        .bind(&v.domain)
        .bind(status_to_str(v.status))
        .bind(&v.email)
        .bind(v.retention_period as i32)
        .bind(v.dpia_required)
        .bind(&v.owner)
        .bind(&v.owner_display_name)
        .bind(&v.maintainer)
        .bind(&v.maintainer_display_name)
        .bind(tags)
        .bind(&v.dpia_location)
        .bind(v.last_updated)
        .bind(v.creation_date)
        .bind(&v.storage_location)
        .bind(v.row_count)
        .execute(&mut **tx)
        .await
        .map_err(|e| translate_unique(e, || format!("{}@{}", v.name, v.version)))?;
        Ok(())
    }

    async fn insert_schema(
        tx: &mut Transaction<'_, Postgres>,
        version_id: Uuid,
        schema_id: Uuid,
        schema: &Schema,
    ) -> StoreResult<()> {
        let columns = serde_json::to_value(&schema.columns)?;
        sqlx::query(
            "INSERT INTO schemas (id, version_id, name, table_description, columns) \
             VALUES ($1,$2,$3,$4,$5)",
        )
        .bind(schema_id)
        .bind(version_id)
        .bind(&schema.name)
        .bind(&schema.table_description)
        .bind(columns)
        .execute(&mut **tx)
        .await
        .map_err(|e| translate_unique(e, || format!("{}:{}", version_id, schema.name)))?;
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for PostgresStore {
    async fn create_product(
        &self,
        initial_version: DataProductVersion,
    ) -> StoreResult<DataProductVersion> {
        let mut tx = self.pool.begin().await?;

        let product_id = Uuid::new_v4();
        let version_id = Uuid::new_v4();

        Self::insert_version(&mut tx, version_id, &initial_version).await?;

        sqlx::query("INSERT INTO products (id, name, current_version_id) VALUES ($1, $2, $3)")
            .bind(product_id)
            .bind(&initial_version.name)
            .bind(version_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| translate_unique(e, || initial_version.name.clone()))?;

        let mut schemas = Vec::with_capacity(initial_version.schemas.len());
        for schema in &initial_version.schemas {
            let schema_id = Uuid::new_v4();
            Self::insert_schema(&mut tx, version_id, schema_id, schema).await?;
            let mut persisted = schema.clone();
            persisted.id = Some(schema_id);
            schemas.push(persisted);
        }

        tx.commit().await?;
        tracing::info!(name = %initial_version.name, version = %initial_version.version, "created product");

        Ok(DataProductVersion {
            id: Some(version_id),
            schemas,
            ..initial_version
        })
    }

    async fn advance_head(
        &self,
        name: &str,
        new_version: DataProductVersion,
    ) -> StoreResult<DataProductVersion> {
        let mut tx = self.pool.begin().await?;

        let version_id = Uuid::new_v4();
        Self::insert_version(&mut tx, version_id, &new_version).await?;

        let updated = sqlx::query(
            "UPDATE products SET current_version_id = $1 WHERE name = $2",
        )
        .bind(version_id)
        .bind(name)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::product_not_found(name));
        }

        let mut schemas = Vec::with_capacity(new_version.schemas.len());
        for schema in &new_version.schemas {
            let schema_id = Uuid::new_v4();
            Self::insert_schema(&mut tx, version_id, schema_id, schema).await?;
            let mut persisted = schema.clone();
            persisted.id = Some(schema_id);
            schemas.push(persisted);
        }

        tx.commit().await?;
        tracing::info!(name, version = %new_version.version, "advanced head");

        Ok(DataProductVersion {
            id: Some(version_id),
            schemas,
            ..new_version
        })
    }

    async fn fetch_by_name_and_version(
        &self,
        name: &str,
        version: Version,
    ) -> StoreResult<DataProductVersion> {
        Self::load_version(&self.pool, name, &version.to_string()).await
    }

    async fn fetch_latest(&self, name: &str) -> StoreResult<DataProductVersion> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT v.version FROM products p JOIN versions v ON v.id = p.current_version_id \
             WHERE p.name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        let (version,) = row.ok_or_else(|| StoreError::product_not_found(name))?;
        Self::load_version(&self.pool, name, &version).await
    }

    async fn list_latest(&self) -> StoreResult<Vec<DataProductVersion>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT p.name, v.version FROM products p \
             JOIN versions v ON v.id = p.current_version_id ORDER BY p.name",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for (name, version) in rows {
            out.push(Self::load_version(&self.pool, &name, &version).await?);
        }
        Ok(out)
    }

    async fn create_schema(&self, product_name: &str, schema: Schema) -> StoreResult<Schema> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(Uuid,)> = sqlx::query_as(
            "SELECT v.id FROM products p JOIN versions v ON v.id = p.current_version_id \
             WHERE p.name = $1",
        )
        .bind(product_name)
        .fetch_optional(&mut *tx)
        .await?;
        let (version_id,) = row.ok_or_else(|| StoreError::product_not_found(product_name))?;

        let schema_id = Uuid::new_v4();
        Self::insert_schema(&mut tx, version_id, schema_id, &schema).await?;
        tx.commit().await?;

        let mut persisted = schema;
        persisted.id = Some(schema_id);
        Ok(persisted)
    }

    async fn fetch_schema(&self, product_name: &str, table_name: &str) -> StoreResult<Schema> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            "SELECT v.id FROM products p JOIN versions v ON v.id = p.current_version_id \
             WHERE p.name = $1",
        )
        .bind(product_name)
        .fetch_optional(&self.pool)
        .await?;
        let (version_id,) = row.ok_or_else(|| StoreError::product_not_found(product_name))?;

        let row: Option<SchemaRow> = sqlx::query_as(
            "SELECT id, name, table_description, columns FROM schemas \
             WHERE version_id = $1 AND name = $2",
        )
        .bind(version_id)
        .bind(table_name)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| StoreError::schema_not_found(product_name, table_name))?
            .into_domain()
    }
}

fn translate_unique(err: sqlx::Error, what: impl FnOnce() -> String) -> StoreError {
    if StoreError::is_unique_violation(&err) {
        StoreError::UniqueViolation(what())
    } else {
        StoreError::Database(err)
    }
}

fn status_to_str(status: Status) -> &'static str {
    match status {
        Status::Draft => "draft",
        Status::Published => "published",
        Status::Retired => "retired",
    }
}

#[derive(sqlx::FromRow)]
struct VersionRow {
    id: Uuid,
    name: String,
    version: String,
    description: String,
    domain: String,
    status: String,
    email: String,
    retention_period: i32,
    dpia_required: bool,
    owner: String,
    owner_display_name: String,
    maintainer: Option<String>,
    maintainer_display_name: Option<String>,
    tags: serde_json::Value,
    dpia_location: Option<String>,
    last_updated: Option<chrono::DateTime<chrono::Utc>>,
    creation_date: Option<chrono::DateTime<chrono::Utc>>,
    storage_location: Option<String>,
    row_count: Option<i64>,
}

impl VersionRow {
    fn into_domain(self, schemas: Vec<Schema>) -> StoreResult<DataProductVersion> {
        let status = match self.status.as_str() {
            "draft" => Status::Draft,
            "published" => Status::Published,
            "retired" => Status::Retired,
            other => {
                return Err(StoreError::Database(sqlx::Error::Decode(
                    format!("unknown status {other:?}").into(),
                )))
            }
        };
        let version: Version = self
            .version
            .parse()
            .map_err(|e: registry_core::EngineError| StoreError::Database(sqlx::Error::Decode(e.to_string().into())))?;

        Ok(DataProductVersion {
            id: Some(self.id),
            name: self.name,
            version,
            description: self.description,
            domain: self.domain,
            status,
            email: self.email,
            retention_period: self.retention_period as u32,
            dpia_required: self.dpia_required,
            owner: self.owner,
            owner_display_name: self.owner_display_name,
            maintainer: self.maintainer,
            maintainer_display_name: self.maintainer_display_name,
            tags: serde_json::from_value(self.tags)?,
            dpia_location: self.dpia_location,
            last_updated: self.last_updated,
            creation_date: self.creation_date,
            storage_location: self.storage_location,
            row_count: self.row_count,
            schemas,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SchemaRow {
    id: Uuid,
    name: String,
    table_description: String,
    columns: serde_json::Value,
}

impl SchemaRow {
    fn into_domain(self) -> StoreResult<Schema> {
        let columns: Vec<Column> = serde_json::from_value(self.columns)?;
        Ok(Schema {
            id: Some(self.id),
            name: self.name,
            table_description: self.table_description,
            columns,
        })
    }
}
