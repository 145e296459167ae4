//! The change classifier (C2): given two snapshots, decide whether the
//! difference is unchanged, backward-compatible, backward-incompatible, or
//! forbidden outright.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::model::{Schema, UPDATABLE_METADATA_FIELDS};

/// Ordered `Unchanged < Minor < Major < Forbidden`, so the derived [`Ord`]
/// matches severity; combining two kinds is `a.max(b)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UpdateKind {
    /// No observable difference.
    Unchanged,
    /// Backward-compatible: existing consumers keep working.
    Minor,
    /// Backward-incompatible: existing consumers may break.
    Major,
    /// Changes a field or value that may never be changed this way.
    Forbidden,
}

/// Diff a current and proposed metadata map.
///
/// `proposed` is expected to already be `current` overlaid with a patch
/// (see [`crate::engine::update_metadata`]); this function only compares.
/// Any key that differs and is outside [`UPDATABLE_METADATA_FIELDS`] makes
/// the whole update Forbidden. Otherwise any non-empty diff is Minor;
/// metadata changes never classify as Major on their own.
pub fn classify_metadata(
    current: &Map<String, Value>,
    proposed: &Map<String, Value>,
) -> (UpdateKind, BTreeSet<String>) {
    let mut changed = BTreeSet::new();
    let keys: BTreeSet<&String> = current.keys().chain(proposed.keys()).collect();
    for key in keys {
        let c = current.get(key).unwrap_or(&Value::Null);
        let p = proposed.get(key).unwrap_or(&Value::Null);
        if c != p {
            changed.insert(key.clone());
        }
    }

    if changed.is_empty() {
        return (UpdateKind::Unchanged, changed);
    }

    let forbidden = changed
        .iter()
        .any(|k| !UPDATABLE_METADATA_FIELDS.contains(&k.as_str()));

    let kind = if forbidden {
        UpdateKind::Forbidden
    } else {
        UpdateKind::Minor
    };
    (kind, changed)
}

/// Column-level differences between two same-named schemas.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnDiff {
    /// Columns present in `old` but absent from `new`.
    pub removed: Vec<String>,
    /// Columns present in `new` but absent from `old`.
    pub added: Vec<String>,
    /// Columns retained in both, with a changed `type`.
    pub types_changed: Vec<String>,
    /// Columns retained in both, with a changed `description`.
    pub descriptions_changed: Vec<String>,
}

/// Full diff of a schema update: column-level changes plus whether
/// `table_description` changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDiff {
    /// Per-column changes.
    pub columns: ColumnDiff,
    /// Whether `table_description` differs between `old` and `new`.
    pub table_description_changed: bool,
}

/// Diff two schemas of the same name.
///
/// The only non-column attribute whose change is Minor is `table_description`;
/// any other non-column attribute change would be Major, but `Schema` carries
/// no such attribute today. Column changes are matched by name: removed
/// columns and type changes on retained columns are Major; added columns and
/// description changes on retained columns are Minor. The result is the
/// maximum across every signal observed (see [`UpdateKind`]'s `Ord`).
pub fn classify_schema(old: &Schema, new: &Schema) -> (UpdateKind, SchemaDiff) {
    let old_cols: std::collections::BTreeMap<&str, &crate::model::Column> =
        old.columns.iter().map(|c| (c.name.as_str(), c)).collect();
    let new_cols: std::collections::BTreeMap<&str, &crate::model::Column> =
        new.columns.iter().map(|c| (c.name.as_str(), c)).collect();

    let removed: Vec<String> = old_cols
        .keys()
        .filter(|name| !new_cols.contains_key(*name))
        .map(|name| name.to_string())
        .collect();
    let added: Vec<String> = new_cols
        .keys()
        .filter(|name| !old_cols.contains_key(*name))
        .map(|name| name.to_string())
        .collect();

    let mut types_changed = Vec::new();
    let mut descriptions_changed = Vec::new();
    for (name, old_col) in &old_cols {
        if let Some(new_col) = new_cols.get(name) {
            if old_col.type_ != new_col.type_ {
                types_changed.push(name.to_string());
            }
            if old_col.description != new_col.description {
                descriptions_changed.push(name.to_string());
            }
        }
    }

    let column_kind = if !removed.is_empty() || !types_changed.is_empty() {
        UpdateKind::Major
    } else if !added.is_empty() || !descriptions_changed.is_empty() {
        UpdateKind::Minor
    } else {
        UpdateKind::Unchanged
    };

    let table_description_changed = old.table_description != new.table_description;
    let non_column_kind = if table_description_changed {
        UpdateKind::Minor
    } else {
        UpdateKind::Unchanged
    };

    let kind = column_kind.max(non_column_kind);
    let diff = SchemaDiff {
        columns: ColumnDiff {
            removed,
            added,
            types_changed,
            descriptions_changed,
        },
        table_description_changed,
    };
    (kind, diff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Column;

    fn map(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn empty_diff_is_unchanged() {
        let m = map(&[("description", Value::String("a".into()))]);
        let (kind, changed) = classify_metadata(&m, &m);
        assert_eq!(kind, UpdateKind::Unchanged);
        assert!(changed.is_empty());
    }

    #[test]
    fn updatable_field_change_is_minor() {
        let current = map(&[("description", Value::String("a".into()))]);
        let proposed = map(&[("description", Value::String("b".into()))]);
        let (kind, changed) = classify_metadata(&current, &proposed);
        assert_eq!(kind, UpdateKind::Minor);
        assert_eq!(changed.len(), 1);
    }

    #[test]
    fn non_updatable_field_change_is_forbidden() {
        let current = map(&[("name", Value::String("a".into()))]);
        let proposed = map(&[("name", Value::String("b".into()))]);
        let (kind, _) = classify_metadata(&current, &proposed);
        assert_eq!(kind, UpdateKind::Forbidden);
    }

    #[test]
    fn none_equals_none_is_not_a_change() {
        let current = map(&[("maintainer", Value::Null)]);
        let proposed = map(&[("maintainer", Value::Null)]);
        let (kind, _) = classify_metadata(&current, &proposed);
        assert_eq!(kind, UpdateKind::Unchanged);
    }

    fn col(name: &str, ty: &str, desc: &str) -> Column {
        Column::new(name, ty, desc).unwrap()
    }

    #[test]
    fn added_column_is_minor() {
        let old = Schema::new("t", "d", vec![col("id", "bigint", "")]).unwrap();
        let new = Schema::new(
            "t",
            "d",
            vec![col("id", "bigint", ""), col("extra", "string", "")],
        )
        .unwrap();
        let (kind, diff) = classify_schema(&old, &new);
        assert_eq!(kind, UpdateKind::Minor);
        assert_eq!(diff.columns.added, vec!["extra".to_string()]);
    }

    #[test]
    fn removed_column_is_major() {
        let old = Schema::new(
            "t",
            "d",
            vec![col("id", "bigint", ""), col("name", "string", "")],
        )
        .unwrap();
        let new = Schema::new("t", "d", vec![col("id", "bigint", "")]).unwrap();
        let (kind, diff) = classify_schema(&old, &new);
        assert_eq!(kind, UpdateKind::Major);
        assert_eq!(diff.columns.removed, vec!["name".to_string()]);
    }

    #[test]
    fn type_change_is_major() {
        let old = Schema::new("t", "d", vec![col("id", "int", "")]).unwrap();
        let new = Schema::new("t", "d", vec![col("id", "bigint", "")]).unwrap();
        let (kind, _) = classify_schema(&old, &new);
        assert_eq!(kind, UpdateKind::Major);
    }

    #[test]
    fn table_description_alone_is_minor() {
        let old = Schema::new("t", "old desc", vec![col("id", "int", "")]).unwrap();
        let new = Schema::new("t", "new desc", vec![col("id", "int", "")]).unwrap();
        let (kind, diff) = classify_schema(&old, &new);
        assert_eq!(kind, UpdateKind::Minor);
        assert!(diff.table_description_changed);
    }

    #[test]
    fn major_column_signal_dominates_minor_table_description() {
        let old = Schema::new("t", "old desc", vec![col("id", "int", "")]).unwrap();
        let new = Schema::new("t", "new desc", vec![]).unwrap();
        let (kind, _) = classify_schema(&old, &new);
        assert_eq!(kind, UpdateKind::Major);
    }

    #[test]
    fn identical_schemas_are_unchanged() {
        let s = Schema::new("t", "d", vec![col("id", "int", "")]).unwrap();
        let (kind, _) = classify_schema(&s, &s);
        assert_eq!(kind, UpdateKind::Unchanged);
    }
}
