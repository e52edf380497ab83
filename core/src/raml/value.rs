//! # Raw Tree Helpers
//!
//! Small accessors over the decoded `serde_yaml` tree. The document arrives
//! untyped, so every builder goes through these to read keys tolerantly.

use crate::error::{DiagnosticKind, Diagnostics};
use serde_yaml::{Mapping, Value};

/// Looks up `key` in `map`, treating an explicit `null` as absent.
pub(crate) fn get<'a>(map: &'a Mapping, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|v| !v.is_null())
}

/// Looks up `key` and returns it when it is a mapping.
pub(crate) fn get_mapping<'a>(map: &'a Mapping, key: &str) -> Option<&'a Mapping> {
    get(map, key).and_then(Value::as_mapping)
}

/// Looks up `key` and renders it as a string when it is a scalar.
pub(crate) fn get_string(map: &Mapping, key: &str) -> Option<String> {
    get(map, key).and_then(scalar_string)
}

/// Renders a scalar (string, number, bool) as a string.
pub(crate) fn scalar_string(value: &Value) -> Option<String> {
    match untag(value) {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Strips YAML tags (e.g. an unresolved `!include`) down to the inner value.
pub(crate) fn untag(value: &Value) -> &Value {
    match value {
        Value::Tagged(tagged) => untag(&tagged.value),
        other => other,
    }
}

/// True for values that do not count as a match during first-match resolution.
pub(crate) fn is_empty(value: &Value) -> bool {
    match untag(value) {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Sequence(seq) => seq.is_empty(),
        Value::Mapping(map) => map.is_empty(),
        _ => false,
    }
}

/// Reads a list of strings, accepting a single scalar as a one-element list.
pub(crate) fn string_list(value: Option<&Value>) -> Vec<String> {
    match value.map(untag) {
        Some(Value::Sequence(seq)) => seq.iter().filter_map(scalar_string).collect(),
        Some(other) => scalar_string(other).into_iter().collect(),
        None => Vec::new(),
    }
}

/// Returns the mapping behind a value, or an empty one for `null`.
pub(crate) fn mapping_or_empty(value: Option<&Value>) -> Mapping {
    match value.map(untag) {
        Some(Value::Mapping(map)) => map.clone(),
        _ => Mapping::new(),
    }
}

/// Reads a named-declaration section (`traits`, `resourceTypes`, ...).
///
/// Accepts a mapping of `name: data` or a list of single-entry mappings.
/// Anything else is recorded as a shape problem and yields nothing.
pub(crate) fn named_entries(
    value: Option<&Value>,
    section: &str,
    diagnostics: &Diagnostics,
) -> Vec<(String, Value)> {
    let mut entries = Vec::new();
    match value.map(untag) {
        None | Some(Value::Null) => {}
        Some(Value::Mapping(map)) => {
            for (k, v) in map {
                match scalar_string(k) {
                    Some(name) => entries.push((name, v.clone())),
                    None => diagnostics.record(
                        DiagnosticKind::Shape,
                        section,
                        "declaration name must be a scalar",
                    ),
                }
            }
        }
        Some(Value::Sequence(items)) => {
            for item in items {
                match untag(item) {
                    Value::Mapping(map) => {
                        for (k, v) in map {
                            if let Some(name) = scalar_string(k) {
                                entries.push((name, v.clone()));
                            }
                        }
                    }
                    _ => diagnostics.record(
                        DiagnosticKind::Shape,
                        section,
                        "list entries must be single-entry mappings",
                    ),
                }
            }
        }
        Some(_) => diagnostics.record(
            DiagnosticKind::Shape,
            section,
            "expected a mapping or a list of mappings",
        ),
    }
    entries
}

/// Joins location fragments with `.`, skipping empty ones.
pub(crate) fn location(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(".")
}
