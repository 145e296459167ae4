//! Error types for the registry's core versioning engine.

use thiserror::Error;

/// Result type alias for core engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Error types that can occur while parsing identifiers or applying updates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A version string did not match `v<major>.<minor>`.
    #[error("malformed version string: {0}")]
    MalformedVersion(String),

    /// A proposed update changed a field outside the updatable set, or
    /// targeted a schema that does not exist, or tried to remove a schema
    /// that isn't present.
    #[error("invalid update: {0}")]
    InvalidUpdate(String),

    /// A payload failed a shape or regex check before it ever reached the
    /// versioning engine.
    #[error("validation error: {0}")]
    Validation(String),

    /// `update_schema` targeted a table name absent from the current version.
    #[error("not found: {0}")]
    NotFound(String),
}
