//! # registry-core
//!
//! Core data structures and the semantic versioning engine for the data
//! product registry: the version identifier grammar, the change classifier,
//! and the versioning engine that turns a proposed update into a new
//! immutable version.
//!
//! This crate has no knowledge of HTTP or persistence; it operates purely
//! on in-memory snapshots handed to it by a caller (the metadata store, in
//! the full system).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod classify;
pub mod engine;
pub mod error;
pub mod model;
pub mod version;

pub use classify::UpdateKind;
pub use engine::SchemaPatch;
pub use error::{EngineError, Result};
pub use model::{Column, DataProductVersion, Schema, Status, UPDATABLE_METADATA_FIELDS};
pub use version::Version;
