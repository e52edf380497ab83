//! URI parameter ordering.
//!
//! Declared URI parameters come out in the order their placeholders appear in
//! the template, and every placeholder gets exactly one parameter.

use crate::raml::models::{ParamKind, Parameter};
use regex::Regex;
use std::sync::OnceLock;

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([^{}]+)\}").expect("Invalid regex constant"))
}

/// Distinct `{name}` placeholders in left-to-right order.
pub fn template_placeholders(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in placeholder_regex().captures_iter(template) {
        let name = caps[1].trim().to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Orders `declared` by placeholder position in the first template.
///
/// Placeholders with no declaration get a synthesized required `string`
/// parameter, except `version` and names listed in `excluded` (declared
/// elsewhere, typically as base URI parameters). Declarations that match no
/// placeholder are dropped.
pub fn order_uri_parameters<S: AsRef<str>>(
    templates: &[S],
    declared: Vec<Parameter>,
    excluded: &[String],
) -> Vec<Parameter> {
    let Some(template) = templates.first() else {
        return Vec::new();
    };
    let mut declared = declared;
    let mut ordered = Vec::new();
    for name in template_placeholders(template.as_ref()) {
        if let Some(pos) = declared.iter().position(|p| p.name == name) {
            ordered.push(declared.remove(pos));
        } else if name != "version" && !excluded.contains(&name) {
            let mut synthesized = Parameter::new(ParamKind::Uri, name);
            synthesized.required = true;
            synthesized.synthesized = true;
            ordered.push(synthesized);
        }
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(params: &[Parameter]) -> Vec<&str> {
        params.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_synthesizes_missing_and_orders() {
        let mut sub = Parameter::new(ParamKind::Uri, "sub");
        sub.description = Some("declared".into());
        let ordered = order_uri_parameters(&["/widgets/{id}/{sub}"], vec![sub], &[]);
        assert_eq!(names(&ordered), vec!["id", "sub"]);
        assert!(ordered[0].synthesized);
        assert!(ordered[0].required);
        assert_eq!(ordered[0].param_type, "string");
        assert!(!ordered[1].synthesized);
        assert_eq!(ordered[1].description.as_deref(), Some("declared"));
    }

    #[test]
    fn test_version_and_excluded_never_synthesized() {
        let ordered = order_uri_parameters(
            &["https://{subDomain}.example.com/{version}/{party}"],
            Vec::new(),
            &["subDomain".to_string()],
        );
        assert_eq!(names(&ordered), vec!["party"]);
    }

    #[test]
    fn test_unreferenced_declarations_dropped() {
        let stray = Parameter::new(ParamKind::Uri, "stray");
        let ordered = order_uri_parameters(&["/things/{id}"], vec![stray], &[]);
        assert_eq!(names(&ordered), vec!["id"]);
    }

    #[test]
    fn test_only_first_template_counts() {
        let ordered = order_uri_parameters(&["/a/{x}", "/b/{y}"], Vec::new(), &[]);
        assert_eq!(names(&ordered), vec!["x"]);
        assert!(order_uri_parameters::<&str>(&[], Vec::new(), &[]).is_empty());
    }

    #[test]
    fn test_placeholders_are_distinct() {
        assert_eq!(template_placeholders("/{a}/{b}/{a}"), vec!["a", "b"]);
    }
}
