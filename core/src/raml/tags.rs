//! # Substitution Tags
//!
//! Named functions applied to a parameter value in `<<name | !tag>>`.

use heck::{ToKebabCase, ToLowerCamelCase, ToShoutyKebabCase, ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};
use std::collections::HashMap;
use std::fmt;

/// A tag function.
pub type TagFn = Box<dyn Fn(&str) -> String>;

/// Registry of tag functions, keyed by tag name (without the `!`).
pub struct TagRegistry {
    tags: HashMap<String, TagFn>,
}

impl TagRegistry {
    /// A registry with no tags at all.
    pub fn empty() -> Self {
        Self {
            tags: HashMap::new(),
        }
    }

    /// Registers (or replaces) a tag.
    pub fn register(&mut self, name: impl Into<String>, func: impl Fn(&str) -> String + 'static) {
        self.tags.insert(name.into(), Box::new(func));
    }

    /// Applies the named tag, or returns `None` if it is not registered.
    pub fn apply(&self, name: &str, value: &str) -> Option<String> {
        self.tags.get(name).map(|f| f(value))
    }

    /// True when `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }
}

impl Default for TagRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("pluralize", pluralize);
        registry.register("singularize", singularize);
        registry.register("uppercase", |s: &str| s.to_uppercase());
        registry.register("lowercase", |s: &str| s.to_lowercase());
        registry.register("lowercamelcase", |s: &str| s.to_lower_camel_case());
        registry.register("uppercamelcase", |s: &str| s.to_upper_camel_case());
        registry.register("lowerunderscorecase", |s: &str| s.to_snake_case());
        registry.register("upperunderscorecase", |s: &str| s.to_shouty_snake_case());
        registry.register("lowerhyphencase", |s: &str| s.to_kebab_case());
        registry.register("upperhyphencase", |s: &str| s.to_shouty_kebab_case());
        registry
    }
}

impl fmt::Debug for TagRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.tags.keys().collect();
        names.sort();
        f.debug_struct("TagRegistry").field("tags", &names).finish()
    }
}

const IRREGULAR: [(&str, &str); 8] = [
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
    ("foot", "feet"),
    ("tooth", "teeth"),
    ("datum", "data"),
];

/// English plural of a word, covering the regular suffix rules.
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    let lower = word.to_lowercase();
    if let Some((_, plural)) = IRREGULAR.iter().find(|(s, _)| *s == lower) {
        return plural.to_string();
    }
    if IRREGULAR.iter().any(|(_, p)| *p == lower) {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix('y') {
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            return format!("{}ies", stem);
        }
    }
    if ["s", "x", "z", "ch", "sh"].iter().any(|s| lower.ends_with(s)) {
        return format!("{}es", word);
    }
    format!("{}s", word)
}

/// English singular of a word; the inverse of [`pluralize`] for regular words.
pub fn singularize(word: &str) -> String {
    let lower = word.to_lowercase();
    if let Some((singular, _)) = IRREGULAR.iter().find(|(_, p)| *p == lower) {
        return singular.to_string();
    }
    if let Some(stem) = word.strip_suffix("ies") {
        return format!("{}y", stem);
    }
    for suffix in ["ches", "shes", "xes", "zes", "sses"] {
        if lower.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    if lower.ends_with('s') && !lower.ends_with("ss") {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pluralize_rules() {
        assert_eq!(pluralize("widget"), "widgets");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("key"), "keys");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("person"), "people");
        assert_eq!(pluralize("people"), "people");
    }

    #[test]
    fn test_singularize_rules() {
        assert_eq!(singularize("widgets"), "widget");
        assert_eq!(singularize("categories"), "category");
        assert_eq!(singularize("boxes"), "box");
        assert_eq!(singularize("class"), "class");
        assert_eq!(singularize("children"), "child");
    }

    #[test]
    fn test_case_tags() {
        let tags = TagRegistry::default();
        assert_eq!(tags.apply("uppercamelcase", "user id").as_deref(), Some("UserId"));
        assert_eq!(tags.apply("lowerhyphencase", "UserId").as_deref(), Some("user-id"));
        assert_eq!(tags.apply("upperunderscorecase", "userId").as_deref(), Some("USER_ID"));
        assert!(tags.apply("shout", "x").is_none());
    }

    #[test]
    fn test_custom_tag() {
        let mut tags = TagRegistry::empty();
        tags.register("reverse", |s: &str| s.chars().rev().collect());
        assert_eq!(tags.apply("reverse", "abc").as_deref(), Some("cba"));
        assert!(!tags.contains("pluralize"));
    }
}
