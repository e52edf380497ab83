//! # Deep Merge
//!
//! Recursive union of two mapping trees where the child wins every scalar
//! conflict. Conflicts are kept but reported as warnings so a caller can see
//! which inherited values were shadowed.

use crate::error::{DiagnosticKind, Diagnostics};
use crate::raml::value::scalar_string;
use serde_yaml::{Mapping, Value};

/// Merges `parent` into `child`, returning the union.
///
/// - keys only in `parent` are copied;
/// - keys only in `child` are kept;
/// - mappings present on both sides are merged recursively;
/// - differing scalars keep the child value and record a `MergeConflict`.
///
/// A `null` child entry counts as absent, so `get:` with no body still picks up
/// everything an inherited `get` declares.
///
/// `merge(merge(a, b), b) == merge(a, b)` for any `a`, `b`.
pub fn merge_mappings(
    child: &Mapping,
    parent: &Mapping,
    location: &str,
    diagnostics: &Diagnostics,
) -> Mapping {
    let mut merged = child.clone();
    for (key, parent_value) in parent {
        let path = key_path(location, key);
        let Some(child_value) = merged.get_mut(key) else {
            merged.insert(key.clone(), parent_value.clone());
            continue;
        };
        let replacement = match (&*child_value, parent_value) {
            (Value::Null, _) => Some(parent_value.clone()),
            (_, Value::Null) => None,
            (Value::Mapping(c), Value::Mapping(p)) => {
                Some(Value::Mapping(merge_mappings(c, p, &path, diagnostics)))
            }
            (c, p) if c == p => None,
            _ => {
                diagnostics.record(
                    DiagnosticKind::MergeConflict,
                    path,
                    "inherited value shadowed by a more specific one",
                );
                None
            }
        };
        if let Some(value) = replacement {
            *child_value = value;
        }
    }
    merged
}

/// Value-level convenience over [`merge_mappings`].
///
/// Non-mapping inputs follow the scalar rule: the child wins unless it is
/// `null`.
pub fn merge_values(
    child: &Value,
    parent: &Value,
    location: &str,
    diagnostics: &Diagnostics,
) -> Value {
    match (child, parent) {
        (Value::Mapping(c), Value::Mapping(p)) => {
            Value::Mapping(merge_mappings(c, p, location, diagnostics))
        }
        (Value::Null, p) => p.clone(),
        (c, Value::Null) => c.clone(),
        (c, p) => {
            if c != p {
                diagnostics.record(
                    DiagnosticKind::MergeConflict,
                    location,
                    "inherited value shadowed by a more specific one",
                );
            }
            c.clone()
        }
    }
}

fn key_path(location: &str, key: &Value) -> String {
    let key = scalar_string(key).unwrap_or_else(|| "?".to_string());
    if location.is_empty() {
        key
    } else {
        format!("{}.{}", location, key)
    }
}
