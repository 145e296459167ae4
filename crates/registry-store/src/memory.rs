//! In-memory [`MetadataStore`] implementation, for tests and local runs.
//!
//! Mirrors the shape of [`crate::postgres::PostgresStore`] without a
//! database: a concurrent map keyed by `(name, version)` plus a second map
//! from product name to its current version, so that head advancement is a
//! single atomic map update.

use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;
use registry_core::{DataProductVersion, Schema, Version};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::repository::MetadataStore;

/// An in-memory, process-local [`MetadataStore`].
#[derive(Default)]
pub struct MemoryStore {
    heads: DashMap<String, Version>,
    versions: DashMap<(String, Version), DataProductVersion>,
}

impl MemoryStore {
    /// Construct an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn create_product(
        &self,
        initial_version: DataProductVersion,
    ) -> StoreResult<DataProductVersion> {
        if self.heads.contains_key(&initial_version.name) {
            return Err(StoreError::UniqueViolation(format!(
                "product {} already exists",
                initial_version.name
            )));
        }

        let mut stored = initial_version;
        stored.id = Some(Uuid::new_v4());
        for schema in &mut stored.schemas {
            schema.id = Some(Uuid::new_v4());
        }

        self.heads.insert(stored.name.clone(), stored.version);
        self.versions
            .insert((stored.name.clone(), stored.version), stored.clone());
        Ok(stored)
    }

    async fn advance_head(
        &self,
        name: &str,
        new_version: DataProductVersion,
    ) -> StoreResult<DataProductVersion> {
        if !self.heads.contains_key(name) {
            return Err(StoreError::product_not_found(name));
        }

        let mut stored = new_version;
        stored.id = Some(Uuid::new_v4());
        for schema in &mut stored.schemas {
            schema.id = Some(Uuid::new_v4());
        }

        let key = (stored.name.clone(), stored.version);
        match self.versions.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(StoreError::UniqueViolation(format!(
                    "{}@{}",
                    stored.name, stored.version
                )))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(stored.clone());
            }
        }
        self.heads.insert(name.to_string(), stored.version);
        Ok(stored)
    }

    async fn fetch_by_name_and_version(
        &self,
        name: &str,
        version: Version,
    ) -> StoreResult<DataProductVersion> {
        self.versions
            .get(&(name.to_string(), version))
            .map(|r| r.clone())
            .ok_or_else(|| StoreError::version_not_found(name, version))
    }

    async fn fetch_latest(&self, name: &str) -> StoreResult<DataProductVersion> {
        let version = *self
            .heads
            .get(name)
            .ok_or_else(|| StoreError::product_not_found(name))?;
        self.fetch_by_name_and_version(name, version).await
    }

    async fn list_latest(&self) -> StoreResult<Vec<DataProductVersion>> {
        let heads: BTreeMap<String, Version> = self
            .heads
            .iter()
            .map(|r| (r.key().clone(), *r.value()))
            .collect();

        let mut out = Vec::with_capacity(heads.len());
        for (name, version) in heads {
            out.push(self.fetch_by_name_and_version(&name, version).await?);
        }
        Ok(out)
    }

    async fn create_schema(&self, product_name: &str, schema: Schema) -> StoreResult<Schema> {
        let version = *self
            .heads
            .get(product_name)
            .ok_or_else(|| StoreError::product_not_found(product_name))?;
        let key = (product_name.to_string(), version);

        let mut entry = self
            .versions
            .get_mut(&key)
            .ok_or_else(|| StoreError::version_not_found(product_name, version))?;

        if entry.schemas.iter().any(|s| s.name == schema.name) {
            return Err(StoreError::UniqueViolation(format!(
                "{}:{}",
                product_name, schema.name
            )));
        }

        let mut persisted = schema;
        persisted.id = Some(Uuid::new_v4());
        entry.schemas.push(persisted.clone());
        Ok(persisted)
    }

    async fn fetch_schema(&self, product_name: &str, table_name: &str) -> StoreResult<Schema> {
        let version = *self
            .heads
            .get(product_name)
            .ok_or_else(|| StoreError::product_not_found(product_name))?;
        let entry = self
            .versions
            .get(&(product_name.to_string(), version))
            .ok_or_else(|| StoreError::version_not_found(product_name, version))?;

        entry
            .schemas
            .iter()
            .find(|s| s.name == table_name)
            .cloned()
            .ok_or_else(|| StoreError::schema_not_found(product_name, table_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry_core::{Column, Status};
    use std::collections::BTreeMap as Map;

    fn version(name: &str, v: Version) -> DataProductVersion {
        DataProductVersion {
            id: None,
            name: name.to_string(),
            version: v,
            description: "desc".to_string(),
            domain: "domain".to_string(),
            status: Status::Draft,
            email: "team@example.com".to_string(),
            retention_period: 30,
            dpia_required: false,
            owner: "owner".to_string(),
            owner_display_name: "Owner".to_string(),
            maintainer: None,
            maintainer_display_name: None,
            tags: Map::new(),
            dpia_location: None,
            last_updated: None,
            creation_date: None,
            storage_location: None,
            row_count: None,
            schemas: Vec::new(),
        }
    }

    #[tokio::test]
    async fn create_product_then_fetch_latest() {
        let store = MemoryStore::new();
        let created = store
            .create_product(version("hmpps_use_of_force", Version::new(1, 0)))
            .await
            .unwrap();
        assert!(created.id.is_some());

        let fetched = store.fetch_latest("hmpps_use_of_force").await.unwrap();
        assert_eq!(fetched.version, Version::new(1, 0));
    }

    #[tokio::test]
    async fn create_product_twice_is_unique_violation() {
        let store = MemoryStore::new();
        store
            .create_product(version("p", Version::new(1, 0)))
            .await
            .unwrap();
        let err = store
            .create_product(version("p", Version::new(1, 0)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn fetch_latest_missing_product_is_not_found() {
        let store = MemoryStore::new();
        let err = store.fetch_latest("nope").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn advance_head_moves_the_pointer() {
        let store = MemoryStore::new();
        store
            .create_product(version("p", Version::new(1, 0)))
            .await
            .unwrap();
        store
            .advance_head("p", version("p", Version::new(1, 1)))
            .await
            .unwrap();

        let latest = store.fetch_latest("p").await.unwrap();
        assert_eq!(latest.version, Version::new(1, 1));

        let historical = store
            .fetch_by_name_and_version("p", Version::new(1, 0))
            .await
            .unwrap();
        assert_eq!(historical.version, Version::new(1, 0));
    }

    #[tokio::test]
    async fn advance_head_on_unknown_product_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .advance_head("nope", version("nope", Version::new(1, 1)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_latest_is_ordered_by_name() {
        let store = MemoryStore::new();
        store
            .create_product(version("zebra", Version::new(1, 0)))
            .await
            .unwrap();
        store
            .create_product(version("alpha", Version::new(1, 0)))
            .await
            .unwrap();

        let all = store.list_latest().await.unwrap();
        let names: Vec<&str> = all.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zebra"]);
    }

    #[tokio::test]
    async fn create_schema_then_fetch() {
        let store = MemoryStore::new();
        store
            .create_product(version("p", Version::new(1, 0)))
            .await
            .unwrap();

        let schema = Schema::new(
            "events",
            "events table",
            vec![Column::new("id", "bigint", "").unwrap()],
        )
        .unwrap();
        let created = store.create_schema("p", schema).await.unwrap();
        assert!(created.id.is_some());

        let fetched = store.fetch_schema("p", "events").await.unwrap();
        assert_eq!(fetched.name, "events");
    }

    #[tokio::test]
    async fn duplicate_schema_name_is_unique_violation() {
        let store = MemoryStore::new();
        store
            .create_product(version("p", Version::new(1, 0)))
            .await
            .unwrap();

        let schema = Schema::new("events", "t", vec![]).unwrap();
        store.create_schema("p", schema.clone()).await.unwrap();
        let err = store.create_schema("p", schema).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn fetch_schema_missing_is_not_found() {
        let store = MemoryStore::new();
        store
            .create_product(version("p", Version::new(1, 0)))
            .await
            .unwrap();
        let err = store.fetch_schema("p", "missing").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
