//! The versioning engine (C3): applies a proposed update to the current
//! version of a data product, yielding a new, unpersisted immutable version
//! with carried-forward schemas.
//!
//! None of the functions here talk to storage. They take the currently
//! loaded [`DataProductVersion`] and return either the same version
//! (no-op) or a new one with no `id` set, for the caller to persist.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::classify::{classify_metadata, classify_schema, UpdateKind};
use crate::error::{EngineError, Result};
use crate::model::{Column, DataProductVersion, Schema};

/// A partial update to a schema: either field may be omitted, in which case
/// the current value is retained.
#[derive(Debug, Clone, Default)]
pub struct SchemaPatch {
    /// Replacement column list, if the update touches columns.
    pub columns: Option<Vec<Column>>,
    /// Replacement table description, if the update touches it.
    pub table_description: Option<String>,
}

/// Remove the named schemas from the current version.
///
/// Fails with [`EngineError::InvalidUpdate`] if any name in `names` is not a
/// schema of `current`, with no side effects. An empty `names` is a no-op,
/// returning `current` unchanged; any non-empty, fully-valid set
/// unconditionally bumps the major version, even if every remaining schema
/// is carried forward unchanged.
pub fn remove_schemas(
    current: &DataProductVersion,
    names: &BTreeSet<String>,
) -> Result<DataProductVersion> {
    if names.is_empty() {
        return Ok(current.clone());
    }

    let current_names: BTreeSet<&str> =
        current.schemas.iter().map(|s| s.name.as_str()).collect();
    let missing: Vec<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|n| !current_names.contains(n))
        .collect();
    if !missing.is_empty() {
        return Err(EngineError::InvalidUpdate(format!(
            "unknown schema name(s): {}",
            missing.join(", ")
        )));
    }

    let mut next = current.clone();
    next.id = None;
    next.version = current.version.increment_major();
    next.schemas = current
        .schemas
        .iter()
        .filter(|s| !names.contains(&s.name))
        .map(Schema::copied)
        .collect();
    Ok(next)
}

/// Apply a partial metadata patch to the current version.
///
/// `patch` is overlaid onto the current version's metadata map and the
/// classifier decides the outcome:
/// - Forbidden (a key outside the updatable set differs) → `InvalidUpdate`.
/// - Unchanged (empty effective diff) → the current version, unmodified.
/// - Minor → a new version with incremented minor, the patch applied, and
///   every schema copied forward verbatim.
///
/// Metadata updates never bump the major version.
pub fn update_metadata(
    current: &DataProductVersion,
    patch: Map<String, Value>,
) -> Result<DataProductVersion> {
    let current_map = current.metadata_map();
    let mut proposed_map = current_map.clone();
    for (key, value) in patch {
        proposed_map.insert(key, value);
    }

    let (kind, _changed) = classify_metadata(&current_map, &proposed_map);
    match kind {
        UpdateKind::Forbidden => Err(EngineError::InvalidUpdate(
            "update changes a non-updatable metadata field".to_string(),
        )),
        UpdateKind::Unchanged => Ok(current.clone()),
        UpdateKind::Minor => {
            let mut next = current.clone();
            next.id = None;
            next.version = current.version.increment_minor();
            next.apply_metadata_map(proposed_map)?;
            next.schemas = current.schemas.iter().map(Schema::copied).collect();
            Ok(next)
        }
        UpdateKind::Major => unreachable!("metadata diffs never classify as Major"),
    }
}

/// Apply a partial schema patch to one table of the current version.
///
/// Fails with [`EngineError::NotFound`] if `table_name` does not name a
/// schema on `current`. Otherwise the classifier decides the outcome:
/// - Unchanged → the current version, unmodified.
/// - Minor → a new version with incremented minor; the target schema is
///   replaced with the patched copy, all others carried forward.
/// - Major → the same, but with the major version incremented instead.
pub fn update_schema(
    current: &DataProductVersion,
    table_name: &str,
    patch: SchemaPatch,
) -> Result<DataProductVersion> {
    let target = current
        .schemas
        .iter()
        .find(|s| s.name == table_name)
        .ok_or_else(|| {
            EngineError::NotFound(format!(
                "{} {} has no schema named {table_name:?}",
                current.name, current.version
            ))
        })?;

    let mut proposed = target.clone();
    if let Some(columns) = patch.columns {
        proposed.columns = columns;
    }
    if let Some(table_description) = patch.table_description {
        proposed.table_description = table_description;
    }

    let (kind, _diff) = classify_schema(target, &proposed);
    match kind {
        UpdateKind::Unchanged => Ok(current.clone()),
        UpdateKind::Forbidden => unreachable!("schema diffs never classify as Forbidden"),
        UpdateKind::Minor | UpdateKind::Major => {
            let mut next = current.clone();
            next.id = None;
            next.version = if kind == UpdateKind::Major {
                current.version.increment_major()
            } else {
                current.version.increment_minor()
            };
            proposed.id = None;
            next.schemas = current
                .schemas
                .iter()
                .map(|s| {
                    if s.name == table_name {
                        proposed.clone()
                    } else {
                        s.copied()
                    }
                })
                .collect();
            Ok(next)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Status;
    use crate::version::Version;
    use std::collections::BTreeMap;

    fn base_version() -> DataProductVersion {
        DataProductVersion {
            id: Some(uuid::Uuid::new_v4()),
            name: "hmpps_use_of_force".to_string(),
            version: Version::new(1, 0),
            description: "desc".to_string(),
            domain: "hmpps".to_string(),
            status: Status::Draft,
            email: "team@example.com".to_string(),
            retention_period: 365,
            dpia_required: false,
            owner: "owner".to_string(),
            owner_display_name: "Owner".to_string(),
            maintainer: None,
            maintainer_display_name: None,
            tags: BTreeMap::new(),
            dpia_location: None,
            last_updated: None,
            creation_date: None,
            storage_location: None,
            row_count: None,
            schemas: vec![Schema::new(
                "events",
                "events table",
                vec![
                    Column::new("id", "bigint", "").unwrap(),
                    Column::new("name", "string", "").unwrap(),
                ],
            )
            .unwrap()],
        }
    }

    #[test]
    fn update_metadata_empty_patch_is_noop() {
        let current = base_version();
        let next = update_metadata(&current, Map::new()).unwrap();
        assert_eq!(next.version, current.version);
        assert!(next.id.is_some());
    }

    #[test]
    fn update_metadata_bumps_minor_and_never_major() {
        let current = base_version();
        let mut patch = Map::new();
        patch.insert("description".into(), Value::String("new desc".into()));
        let next = update_metadata(&current, patch).unwrap();
        assert_eq!(next.version, Version::new(1, 1));
        assert_eq!(next.description, "new desc");
        assert_eq!(next.schemas.len(), current.schemas.len());
        assert!(next.id.is_none());
    }

    #[test]
    fn update_metadata_rejects_forbidden_field() {
        let current = base_version();
        let mut patch = Map::new();
        patch.insert("name".into(), Value::String("renamed".into()));
        let err = update_metadata(&current, patch).unwrap_err();
        assert!(matches!(err, EngineError::InvalidUpdate(_)));
    }

    #[test]
    fn update_schema_adding_column_is_minor() {
        let current = base_version();
        let patch = SchemaPatch {
            columns: Some(vec![
                Column::new("id", "bigint", "").unwrap(),
                Column::new("name", "string", "").unwrap(),
                Column::new("extra", "string", "").unwrap(),
            ]),
            table_description: None,
        };
        let next = update_schema(&current, "events", patch).unwrap();
        assert_eq!(next.version, Version::new(1, 1));
        assert_eq!(next.schemas[0].columns.len(), 3);
    }

    #[test]
    fn update_schema_removing_column_is_major() {
        let current = base_version();
        let patch = SchemaPatch {
            columns: Some(vec![Column::new("id", "bigint", "").unwrap()]),
            table_description: None,
        };
        let next = update_schema(&current, "events", patch).unwrap();
        assert_eq!(next.version, Version::new(2, 0));
        assert_eq!(next.schemas[0].columns.len(), 1);
    }

    #[test]
    fn update_schema_missing_table_is_not_found() {
        let current = base_version();
        let patch = SchemaPatch::default();
        let err = update_schema(&current, "missing", patch).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn remove_schemas_with_unknown_name_fails_with_no_side_effects() {
        let current = base_version();
        let mut names = BTreeSet::new();
        names.insert("nope".to_string());
        let err = remove_schemas(&current, &names).unwrap_err();
        assert!(matches!(err, EngineError::InvalidUpdate(_)));
    }

    #[test]
    fn remove_schemas_bumps_major_and_drops_named_schema() {
        let mut current = base_version();
        current.schemas.push(
            Schema::new("other", "other table", vec![Column::new("id", "int", "").unwrap()])
                .unwrap(),
        );
        let mut names = BTreeSet::new();
        names.insert("events".to_string());
        let next = remove_schemas(&current, &names).unwrap();
        assert_eq!(next.version, Version::new(2, 0));
        assert_eq!(next.schemas.len(), 1);
        assert_eq!(next.schemas[0].name, "other");
    }

    #[test]
    fn remove_schemas_empty_set_is_noop() {
        let current = base_version();
        let next = remove_schemas(&current, &BTreeSet::new()).unwrap();
        assert_eq!(next.version, current.version);
        assert!(next.id.is_some());
    }
}
