//! Domain types: `Product`, `DataProductVersion`, `Schema`, `Column`.
//!
//! These are the in-process representations the versioning engine and the
//! metadata store operate on. Wire-level (camelCase) translation happens at
//! the HTTP facade, not here.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{EngineError, Result};
use crate::version::Version;

/// `^[a-z0-9_]+$`, applied to product, table, and column names.
pub static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9_]+$").unwrap());

/// Column type grammar from the wire contract: integer families, floats,
/// fixed-point decimals, bounded strings, and a handful of scalar types.
pub static COLUMN_TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(u?(tiny|small|big|)int|float|double|decimal\(\d{1,2},\s?\d{1,2}\)|char\(\d{1,3}\)|varchar\(\d{0,5}\)|varchar|string|boolean|date|timestamp)$",
    )
    .unwrap()
});

/// Validate a product, table, or column name against the shared name grammar.
pub fn validate_name(name: &str) -> Result<()> {
    if NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(EngineError::Validation(format!(
            "name {name:?} does not match ^[a-z0-9_]+$"
        )))
    }
}

/// Validate a column type string against the type grammar (see module docs).
pub fn validate_column_type(type_: &str) -> Result<()> {
    if COLUMN_TYPE_RE.is_match(type_) {
        Ok(())
    } else {
        Err(EngineError::Validation(format!(
            "column type {type_:?} does not match the supported type grammar"
        )))
    }
}

/// Lifecycle status of a data product version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Not yet ready for consumption.
    Draft,
    /// Generally available to consumers.
    Published,
    /// No longer maintained; historical versions remain addressable.
    Retired,
}

/// A single column of a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name; matches [`NAME_RE`].
    pub name: String,
    /// Column type; matches [`COLUMN_TYPE_RE`].
    #[serde(rename = "type")]
    pub type_: String,
    /// Free-text description.
    pub description: String,
}

impl Column {
    /// Construct a column, validating its name and type against the wire grammar.
    pub fn new(
        name: impl Into<String>,
        type_: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        let type_ = type_.into();
        validate_name(&name)?;
        validate_column_type(&type_)?;
        Ok(Self {
            name,
            type_,
            description: description.into(),
        })
    }
}

/// A table definition bound to exactly one [`DataProductVersion`].
///
/// Schemas are never shared across versions: the engine always copies them,
/// assigning a fresh `id` on the copy, so that a committed version's schemas
/// never change underneath a reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Opaque internal identifier; `None` until persisted.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<uuid::Uuid>,
    /// Table name; matches [`NAME_RE`]; unique within its version.
    pub name: String,
    /// Free-text description of the table.
    pub table_description: String,
    /// Ordered column descriptors, in input order.
    pub columns: Vec<Column>,
}

impl Schema {
    /// Construct a schema not yet bound to a version, validating its name.
    pub fn new(
        name: impl Into<String>,
        table_description: impl Into<String>,
        columns: Vec<Column>,
    ) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            id: None,
            name,
            table_description: table_description.into(),
            columns,
        })
    }

    /// A copy of this schema with a fresh identity, as the engine produces
    /// when carrying a schema forward into a new version.
    pub fn copied(&self) -> Self {
        let mut copy = self.clone();
        copy.id = None;
        copy
    }
}

/// The fixed set of metadata keys a caller may change via `update_metadata`.
///
/// Any other key present in a proposed change (including `name`, which is
/// immutable once a product is created) classifies the update as Forbidden.
pub const UPDATABLE_METADATA_FIELDS: &[&str] = &[
    "description",
    "email",
    "owner",
    "owner_display_name",
    "domain",
    "status",
    "dpia_required",
    "retention_period",
    "maintainer",
    "maintainer_display_name",
    "tags",
];

/// An immutable snapshot of a product's metadata and schemas at one version.
///
/// Everything here except `id` is either copied forward or carried unchanged
/// by the versioning engine; nothing on an already-persisted `DataProductVersion`
/// is ever mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataProductVersion {
    /// Opaque internal identifier; `None` until persisted.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<uuid::Uuid>,
    /// Denormalized from the owning product, to support `(name, version)` uniqueness.
    pub name: String,
    /// `v<major>.<minor>`.
    pub version: Version,
    /// Free-text description of the data product.
    pub description: String,
    /// Business domain the product belongs to.
    pub domain: String,
    /// Lifecycle status.
    pub status: Status,
    /// Contact address for the owning team.
    pub email: String,
    /// Retention period in days; must be `>= 0`.
    pub retention_period: u32,
    /// Whether a data protection impact assessment is required.
    pub dpia_required: bool,
    /// Owning user or team identifier.
    pub owner: String,
    /// Human-readable name of the owner.
    pub owner_display_name: String,
    /// Optional secondary maintainer identifier.
    #[serde(default)]
    pub maintainer: Option<String>,
    /// Human-readable name of the maintainer.
    #[serde(default)]
    pub maintainer_display_name: Option<String>,
    /// Arbitrary key-value tags; keys unique per version.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// Location of the DPIA document, if any.
    #[serde(default)]
    pub dpia_location: Option<String>,
    /// Timestamp of the last update to this version's lineage, if known.
    #[serde(default)]
    pub last_updated: Option<chrono::DateTime<chrono::Utc>>,
    /// Timestamp this version was created.
    #[serde(default)]
    pub creation_date: Option<chrono::DateTime<chrono::Utc>>,
    /// Physical storage location backing this product, if any.
    #[serde(default)]
    pub storage_location: Option<String>,
    /// Last known row count, if tracked.
    #[serde(default)]
    pub row_count: Option<i64>,
    /// Schemas belonging to this version, ordered by name.
    pub schemas: Vec<Schema>,
}

impl DataProductVersion {
    /// Serialize the updatable-and-identity fields into a generic JSON map,
    /// for use by the change classifier. `name` is included deliberately so
    /// that a proposed rename is detected as a non-updatable-key change.
    pub fn metadata_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("name".into(), Value::String(self.name.clone()));
        map.insert(
            "description".into(),
            Value::String(self.description.clone()),
        );
        map.insert("email".into(), Value::String(self.email.clone()));
        map.insert("owner".into(), Value::String(self.owner.clone()));
        map.insert(
            "owner_display_name".into(),
            Value::String(self.owner_display_name.clone()),
        );
        map.insert("domain".into(), Value::String(self.domain.clone()));
        map.insert(
            "status".into(),
            serde_json::to_value(self.status).expect("Status serializes"),
        );
        map.insert(
            "dpia_required".into(),
            Value::Bool(self.dpia_required),
        );
        map.insert(
            "retention_period".into(),
            Value::Number(self.retention_period.into()),
        );
        map.insert(
            "maintainer".into(),
            self.maintainer
                .clone()
                .map(Value::String)
                .unwrap_or(Value::Null),
        );
        map.insert(
            "maintainer_display_name".into(),
            self.maintainer_display_name
                .clone()
                .map(Value::String)
                .unwrap_or(Value::Null),
        );
        map.insert(
            "tags".into(),
            serde_json::to_value(&self.tags).expect("tags serialize"),
        );
        map
    }

    /// Apply a proposed metadata map (as produced by overlaying a patch onto
    /// [`metadata_map`](Self::metadata_map)) back onto this version's typed
    /// fields. Only called after the classifier has confirmed the change is
    /// not Forbidden, so every key is expected to be present and well-typed.
    pub fn apply_metadata_map(&mut self, map: Map<String, Value>) -> Result<()> {
        let get_str = |map: &Map<String, Value>, key: &str| -> Result<String> {
            map.get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| EngineError::Validation(format!("missing field: {key}")))
        };

        self.description = get_str(&map, "description")?;
        self.email = get_str(&map, "email")?;
        self.owner = get_str(&map, "owner")?;
        self.owner_display_name = get_str(&map, "owner_display_name")?;
        self.domain = get_str(&map, "domain")?;
        self.status = map
            .get("status")
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| EngineError::Validation(e.to_string()))?
            .ok_or_else(|| EngineError::Validation("missing field: status".into()))?;
        self.dpia_required = map
            .get("dpia_required")
            .and_then(Value::as_bool)
            .ok_or_else(|| EngineError::Validation("missing field: dpia_required".into()))?;
        self.retention_period = map
            .get("retention_period")
            .and_then(Value::as_u64)
            .map(|n| n as u32)
            .ok_or_else(|| EngineError::Validation("missing field: retention_period".into()))?;
        self.maintainer = map
            .get("maintainer")
            .and_then(Value::as_str)
            .map(str::to_string);
        self.maintainer_display_name = map
            .get("maintainer_display_name")
            .and_then(Value::as_str)
            .map(str::to_string);
        self.tags = map
            .get("tags")
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| EngineError::Validation(e.to_string()))?
            .unwrap_or_default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_regex_accepts_lowercase_alnum_underscore() {
        assert!(validate_name("hmpps_use_of_force").is_ok());
        assert!(validate_name("Hmpps").is_err());
        assert!(validate_name("has-dash").is_err());
        assert!(validate_name("").is_err());
    }

    #[test]
    fn column_type_grammar_accepts_documented_types() {
        for ty in [
            "int",
            "uint",
            "tinyint",
            "utinyint",
            "bigint",
            "float",
            "double",
            "decimal(10,2)",
            "decimal(3, 1)",
            "char(5)",
            "varchar(100)",
            "varchar",
            "string",
            "boolean",
            "date",
            "timestamp",
        ] {
            assert!(validate_column_type(ty).is_ok(), "expected {ty} to be valid");
        }
    }

    #[test]
    fn column_type_grammar_rejects_unknown_types() {
        for ty in ["INT", "decimal(100,2)", "varchar(123456)", "text", "json"] {
            assert!(
                validate_column_type(ty).is_err(),
                "expected {ty} to be rejected"
            );
        }
    }
}
