//! The metadata store contract (C4): persistence for products, versions,
//! and schemas, under the invariants the versioning engine relies on.

use async_trait::async_trait;
use registry_core::{DataProductVersion, Schema, Version};

use crate::error::StoreResult;

/// Persists products, versions, and schemas.
///
/// Every method operates inside a single database transaction; on any
/// uncaught failure the transaction rolls back and no partial state is
/// visible. Implementors must treat `(name, version)` and, within a
/// version, schema `name` as uniqueness boundaries enforced by the store
/// itself (not merely by callers checking first) so that concurrent
/// callers racing to advance the same head are resolved by the store.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Write the initial version, create the product pointing at it, and
    /// return the persisted version with assigned identifiers.
    ///
    /// Fails with [`crate::StoreError::UniqueViolation`] if a product with
    /// this name already exists.
    async fn create_product(
        &self,
        initial_version: DataProductVersion,
    ) -> StoreResult<DataProductVersion>;

    /// Persist `new_version` as a sibling version of `name`'s product and
    /// re-point the product's head at it, in one transaction.
    ///
    /// Fails with [`crate::StoreError::UniqueViolation`] on a concurrent
    /// advance that produced the same `(name, version)` pair, and with
    /// [`crate::StoreError::NotFound`] if no product named `name` exists.
    async fn advance_head(
        &self,
        name: &str,
        new_version: DataProductVersion,
    ) -> StoreResult<DataProductVersion>;

    /// Fetch one specific version of a product by name and version number.
    async fn fetch_by_name_and_version(
        &self,
        name: &str,
        version: Version,
    ) -> StoreResult<DataProductVersion>;

    /// Fetch the version currently pointed to by a product's head.
    async fn fetch_latest(&self, name: &str) -> StoreResult<DataProductVersion>;

    /// Fetch, for every product, the version its head currently points to,
    /// ordered by product name.
    async fn list_latest(&self) -> StoreResult<Vec<DataProductVersion>>;

    /// Persist one schema bound to the product's current version.
    ///
    /// Fails with [`crate::StoreError::UniqueViolation`] on a duplicate
    /// `(version, schema.name)` pair.
    async fn create_schema(&self, product_name: &str, schema: Schema) -> StoreResult<Schema>;

    /// Fetch the schema named `table_name` belonging to the product's
    /// current version.
    async fn fetch_schema(&self, product_name: &str, table_name: &str) -> StoreResult<Schema>;
}
