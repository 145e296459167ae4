//! Error types for metadata store operations.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by the metadata store.
///
/// These map directly onto the error kinds produced by the rest of the
/// system: `NotFound` and `UniqueViolation` are expected outcomes a caller
/// branches on, while `Database` wraps anything the driver itself reports.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No product, version, or schema matched the lookup.
    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint was violated: duplicate product name,
    /// duplicate `(name, version)`, or duplicate schema name in a version.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// Underlying database driver error not otherwise recognized.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored column (`tags`, `columns`) failed to (de)serialize as JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Construct a [`StoreError::NotFound`] for a missing product.
    pub fn product_not_found(name: impl Into<String>) -> Self {
        Self::NotFound(format!("product {}", name.into()))
    }

    /// Construct a [`StoreError::NotFound`] for a missing version.
    pub fn version_not_found(name: impl Into<String>, version: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{} {}", name.into(), version))
    }

    /// Construct a [`StoreError::NotFound`] for a missing schema.
    pub fn schema_not_found(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self::NotFound(format!("{}:{}", name.into(), table.into()))
    }

    /// True if the underlying Postgres error is a unique-violation
    /// (SQLSTATE `23505`), the signal the transaction layer uses to decide
    /// whether to retranslate a raw database error into [`StoreError::UniqueViolation`].
    pub fn is_unique_violation(err: &sqlx::Error) -> bool {
        matches!(
            err.as_database_error().and_then(|e| e.code()),
            Some(code) if code == "23505"
        )
    }
}
