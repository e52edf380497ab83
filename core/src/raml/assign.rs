//! # Assignments
//!
//! Traits (`is`), resource types (`type`) and security schemes (`securedBy`)
//! are assigned by bare name, by a list of names, or by single-entry mappings
//! carrying substitution parameters. All of these normalise here, once, into
//! [`Assignment`] values.

use crate::error::{DiagnosticKind, Diagnostics};
use crate::raml::value::{scalar_string, untag};
use indexmap::IndexMap;
use serde_yaml::Value;

/// A normalised reference to a named template or scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    /// `is: [paged]`
    Name(String),
    /// `is: [{paged: {max: 10}}]`
    Parameterized(String, IndexMap<String, String>),
    /// `securedBy: [null]`: explicitly no security scheme.
    Unsecured,
}

impl Assignment {
    /// The referenced name. [`Assignment::Unsecured`] renders as `null`,
    /// the way it is written.
    pub fn name(&self) -> &str {
        match self {
            Assignment::Name(name) | Assignment::Parameterized(name, _) => name,
            Assignment::Unsecured => "null",
        }
    }

    /// Substitution parameters supplied with the assignment, if any.
    pub fn params(&self) -> Option<&IndexMap<String, String>> {
        match self {
            Assignment::Parameterized(_, params) => Some(params),
            Assignment::Name(_) | Assignment::Unsecured => None,
        }
    }

    /// True for an explicit `null` entry.
    pub fn is_unsecured(&self) -> bool {
        matches!(self, Assignment::Unsecured)
    }

    fn same_target(&self, other: &Assignment) -> bool {
        self.is_unsecured() == other.is_unsecured() && self.name() == other.name()
    }

    /// Re-encodes the assignment in its list-entry form.
    pub fn to_value(&self) -> Value {
        match self {
            Assignment::Unsecured => Value::Null,
            Assignment::Name(name) => Value::String(name.clone()),
            Assignment::Parameterized(name, params) => {
                let mut inner = serde_yaml::Mapping::new();
                for (k, v) in params {
                    inner.insert(Value::String(k.clone()), Value::String(v.clone()));
                }
                let mut outer = serde_yaml::Mapping::new();
                outer.insert(Value::String(name.clone()), Value::Mapping(inner));
                Value::Mapping(outer)
            }
        }
    }
}

/// Expected shape of an assignment attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentShape {
    /// `is` / `securedBy`: a list of entries.
    List,
    /// `type`: one entry.
    Single,
}

/// Normalises an assignment attribute into an ordered list of assignments.
///
/// A bare scalar where a list is expected is accepted but recorded as a shape
/// problem. `null` list entries (an explicit "no scheme" in `securedBy`) are
/// preserved as [`Assignment::Unsecured`] so callers can honour them.
pub fn normalize_assignments(
    value: Option<&Value>,
    shape: AssignmentShape,
    location: &str,
    diagnostics: &Diagnostics,
) -> Vec<Assignment> {
    let Some(value) = value else {
        return Vec::new();
    };
    let mut out = Vec::new();
    match untag(value) {
        Value::Null => {}
        Value::Sequence(items) => {
            if shape == AssignmentShape::Single {
                diagnostics.record(
                    DiagnosticKind::Shape,
                    location,
                    "expected a single assignment, found a list",
                );
            }
            for item in items {
                if item.is_null() {
                    out.push(Assignment::Unsecured);
                    continue;
                }
                push_entry(item, location, diagnostics, &mut out);
            }
        }
        other => {
            if shape == AssignmentShape::List && !other.is_mapping() {
                diagnostics.record(
                    DiagnosticKind::Shape,
                    location,
                    "expected a list of assignments, found a scalar",
                );
            }
            push_entry(other, location, diagnostics, &mut out);
        }
    }
    if shape == AssignmentShape::Single && out.len() > 1 {
        diagnostics.record(
            DiagnosticKind::Shape,
            location,
            "only the first of several assignments is used",
        );
        out.truncate(1);
    }
    out
}

fn push_entry(value: &Value, location: &str, diagnostics: &Diagnostics, out: &mut Vec<Assignment>) {
    match untag(value) {
        Value::Mapping(map) => {
            for (k, v) in map {
                let Some(name) = scalar_string(k) else {
                    diagnostics.record(DiagnosticKind::Shape, location, "assignment name must be a scalar");
                    continue;
                };
                match untag(v) {
                    Value::Mapping(params) => {
                        let params = params
                            .iter()
                            .filter_map(|(pk, pv)| Some((scalar_string(pk)?, param_string(pv))))
                            .collect();
                        out.push(Assignment::Parameterized(name, params));
                    }
                    Value::Null => out.push(Assignment::Name(name)),
                    _ => {
                        diagnostics.record(
                            DiagnosticKind::Shape,
                            location,
                            format!("parameters for '{}' must be a mapping", name),
                        );
                        out.push(Assignment::Name(name));
                    }
                }
            }
        }
        other => match scalar_string(other) {
            Some(name) => out.push(Assignment::Name(name)),
            None => diagnostics.record(DiagnosticKind::Shape, location, "unsupported assignment entry"),
        },
    }
}

fn param_string(value: &Value) -> String {
    scalar_string(value).unwrap_or_else(|| {
        serde_json::to_string(value).unwrap_or_default()
    })
}

/// Appends `extra` to `base`, skipping names already present.
pub(crate) fn extend_unique(base: &mut Vec<Assignment>, extra: impl IntoIterator<Item = Assignment>) {
    for assignment in extra {
        if !base.iter().any(|a| a.same_target(&assignment)) {
            base.push(assignment);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(src: &str) -> Value {
        serde_yaml::from_str(src).unwrap()
    }

    #[test]
    fn test_all_forms_normalize_to_names() {
        let diags = Diagnostics::new();
        let list = yaml("[paged, {secured: {scope: admin}}]");
        let got = normalize_assignments(Some(&list), AssignmentShape::List, "is", &diags);
        assert_eq!(got[0], Assignment::Name("paged".into()));
        assert_eq!(got[1].name(), "secured");
        assert_eq!(got[1].params().unwrap()["scope"], "admin");
        assert!(diags.is_empty());
    }

    #[test]
    fn test_bare_name_for_list_is_shape_warning() {
        let diags = Diagnostics::new();
        let got = normalize_assignments(Some(&yaml("paged")), AssignmentShape::List, "is", &diags);
        assert_eq!(got, vec![Assignment::Name("paged".into())]);
        assert_eq!(diags.snapshot()[0].kind, DiagnosticKind::Shape);
    }

    #[test]
    fn test_single_type_with_parameters() {
        let diags = Diagnostics::new();
        let v = yaml("{collection: {name: widget, count: 3}}");
        let got = normalize_assignments(Some(&v), AssignmentShape::Single, "type", &diags);
        assert_eq!(got.len(), 1);
        let params = got[0].params().unwrap();
        assert_eq!(params["name"], "widget");
        assert_eq!(params["count"], "3");
        assert!(diags.is_empty());
    }

    #[test]
    fn test_null_entry_preserved_for_secured_by() {
        let diags = Diagnostics::new();
        let v = yaml("[~, oauth_2_0, 'null']");
        let got = normalize_assignments(Some(&v), AssignmentShape::List, "securedBy", &diags);
        assert_eq!(got[0], Assignment::Unsecured);
        assert_eq!(got[0].to_value(), Value::Null);
        assert_eq!(got[1].name(), "oauth_2_0");
        assert_eq!(got[2], Assignment::Name("null".into()));
    }

    #[test]
    fn test_non_scalar_parameter_is_serialized() {
        let diags = Diagnostics::new();
        let v = yaml("[{oauth_2_0: {scopes: [ADMIN]}}]");
        let got = normalize_assignments(Some(&v), AssignmentShape::List, "securedBy", &diags);
        assert_eq!(got[0].params().unwrap()["scopes"], r#"["ADMIN"]"#);
    }

    #[test]
    fn test_extend_unique_keeps_first() {
        let mut base = vec![Assignment::Name("a".into())];
        extend_unique(
            &mut base,
            vec![Assignment::Name("a".into()), Assignment::Name("b".into())],
        );
        assert_eq!(base.len(), 2);
    }
}
