//! # Parameter Substitution
//!
//! Rewrites `<<name>>` and `<<name | !tag>>` placeholders in template data.
//! Templates are immutable; substitution walks a template and builds a new
//! value, so one template can be specialised for many assignments.

use crate::error::{DiagnosticKind, Diagnostics};
use crate::raml::tags::TagRegistry;
use indexmap::IndexMap;
use regex::{Captures, Regex};
use serde_yaml::{Mapping, Value};
use std::sync::OnceLock;

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER_RE.get_or_init(|| {
        Regex::new(r"<<\s*(?P<name>[^\s|<>]+)\s*(?:\|\s*!(?P<tag>[^\s<>]+)\s*)?>>")
            .expect("Invalid regex")
    })
}

/// Substitution parameters plus the tags they may be post-processed with.
pub struct Substitution<'a> {
    params: &'a IndexMap<String, String>,
    tags: &'a TagRegistry,
    diagnostics: &'a Diagnostics,
    location: &'a str,
}

impl<'a> Substitution<'a> {
    /// Prepares a substitution for one assignment.
    pub fn new(
        params: &'a IndexMap<String, String>,
        tags: &'a TagRegistry,
        diagnostics: &'a Diagnostics,
        location: &'a str,
    ) -> Self {
        Self {
            params,
            tags,
            diagnostics,
            location,
        }
    }

    /// Replaces every placeholder in `text`.
    ///
    /// Placeholders naming an unknown parameter are left as they are. An
    /// unknown tag leaves that occurrence untouched and records a diagnostic.
    pub fn apply_str(&self, text: &str) -> String {
        if !text.contains("<<") {
            return text.to_string();
        }
        placeholder_regex()
            .replace_all(text, |caps: &Captures| self.replacement(caps))
            .into_owned()
    }

    /// Applies [`Substitution::apply_str`] to every key and string in a tree.
    pub fn apply_value(&self, value: &Value) -> Value {
        match value {
            Value::String(s) => Value::String(self.apply_str(s)),
            Value::Sequence(items) => {
                Value::Sequence(items.iter().map(|v| self.apply_value(v)).collect())
            }
            Value::Mapping(map) => Value::Mapping(self.apply_mapping(map)),
            other => other.clone(),
        }
    }

    /// Mapping form of [`Substitution::apply_value`].
    pub fn apply_mapping(&self, map: &Mapping) -> Mapping {
        map.iter()
            .map(|(k, v)| (self.apply_value(k), self.apply_value(v)))
            .collect()
    }

    fn replacement(&self, caps: &Captures) -> String {
        let whole = caps[0].to_string();
        let Some(value) = self.params.get(&caps["name"]) else {
            return whole;
        };
        let Some(tag) = caps.name("tag") else {
            return value.clone();
        };
        match self.tags.apply(tag.as_str(), value) {
            Some(tagged) => {
                tracing::trace!(tag = tag.as_str(), value = %value, result = %tagged, "applied tag");
                tagged
            }
            None => {
                self.diagnostics.record(
                    DiagnosticKind::UnknownTag,
                    self.location,
                    format!("unknown substitution tag '!{}'", tag.as_str()),
                );
                whole
            }
        }
    }
}

/// One-shot helper: substitute `params` into a whole template mapping.
pub fn substitute_mapping(
    template: &Mapping,
    params: &IndexMap<String, String>,
    tags: &TagRegistry,
    diagnostics: &Diagnostics,
    location: &str,
) -> Mapping {
    Substitution::new(params, tags, diagnostics, location).apply_mapping(template)
}
