#![deny(missing_docs)]

//! # Parser Configuration
//!
//! Options recognised by the resolver. Every field has a default, so an empty
//! YAML document (or `ParserConfig::default()`) is a valid configuration.

use crate::error::{AppError, AppResult};
use serde::Deserialize;

/// Document generation the input was written against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub enum RamlVersion {
    /// RAML 0.8.
    #[default]
    #[serde(rename = "0.8")]
    V08,
    /// RAML 1.0.
    #[serde(rename = "1.0")]
    V10,
}

/// Rules that differ between document generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct VersionPolicy {
    /// Whether `get?`-style optional methods are recognised in resource types.
    pub optional_methods: bool,
    /// Maximum number of parent hops a resource type chain may take.
    /// `None` means unlimited (cycles are still rejected).
    pub max_type_chain: Option<usize>,
}

impl VersionPolicy {
    /// Policy for the given document generation.
    pub fn for_version(version: RamlVersion) -> Self {
        match version {
            RamlVersion::V08 => Self {
                optional_methods: true,
                max_type_chain: None,
            },
            RamlVersion::V10 => Self {
                optional_methods: false,
                max_type_chain: None,
            },
        }
    }
}

/// Configuration for a single parse.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Fail with `AppError::Invalid` when error diagnostics were recorded.
    pub validate: bool,
    /// Recognised HTTP methods, in the order resources expand them.
    pub http_optional: Vec<String>,
    /// Recognised body mime types.
    pub media_types: Vec<String>,
    /// Protocols accepted by the structural validator.
    pub protocols: Vec<String>,
    /// Document generation.
    pub raml_version: RamlVersion,
    /// Explicit policy; derived from `raml_version` when absent.
    pub policy: Option<VersionPolicy>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            validate: true,
            http_optional: DEFAULT_METHODS.iter().map(|m| m.to_string()).collect(),
            media_types: DEFAULT_MEDIA_TYPES.iter().map(|m| m.to_string()).collect(),
            protocols: vec!["HTTP".to_string(), "HTTPS".to_string()],
            raml_version: RamlVersion::default(),
            policy: None,
        }
    }
}

const DEFAULT_METHODS: [&str; 9] = [
    "get", "post", "put", "delete", "patch", "head", "options", "trace", "connect",
];

const DEFAULT_MEDIA_TYPES: [&str; 14] = [
    "application/json",
    "application/xml",
    "application/x-www-form-urlencoded",
    "multipart/form-data",
    "text/plain",
    "text/html",
    "text/xml",
    "text/csv",
    "application/octet-stream",
    "application/javascript",
    "application/hal+json",
    "application/vnd.api+json",
    "application/problem+json",
    "application/yaml",
];

impl ParserConfig {
    /// Parses a configuration from YAML; missing keys take their defaults.
    pub fn from_yaml_str(yaml: &str) -> AppResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml)
            .map_err(|e| AppError::Decode(format!("Failed to parse parser config: {}", e)))
    }

    /// The effective version policy.
    pub fn version_policy(&self) -> VersionPolicy {
        self.policy
            .unwrap_or_else(|| VersionPolicy::for_version(self.raml_version))
    }

    /// Returns the method name for a key, along with its optional flag.
    ///
    /// `get` yields `("get", false)`; `get?` yields `("get", true)` when the
    /// policy allows optional methods. Anything else is not a method.
    pub fn method_key<'a>(&self, key: &'a str) -> Option<(&'a str, bool)> {
        if let Some(base) = key.strip_suffix('?') {
            if self.version_policy().optional_methods && self.is_method(base) {
                return Some((base, true));
            }
            return None;
        }
        self.is_method(key).then_some((key, false))
    }

    /// True for a recognised method name (without `?`).
    pub fn is_method(&self, name: &str) -> bool {
        self.http_optional.iter().any(|m| m == name)
    }

    /// Position of a method in `http_optional`, used for ordering.
    pub fn method_rank(&self, name: &str) -> usize {
        self.http_optional
            .iter()
            .position(|m| m == name)
            .unwrap_or(self.http_optional.len())
    }

    /// True for a configured mime type or any well-formed `type/subtype` token
    /// of a registered top-level type.
    pub fn is_media_type(&self, key: &str) -> bool {
        if self.media_types.iter().any(|m| m.eq_ignore_ascii_case(key)) {
            return true;
        }
        let Some((top, sub)) = key.split_once('/') else {
            return false;
        };
        const TOP_LEVEL: [&str; 9] = [
            "application",
            "audio",
            "font",
            "image",
            "message",
            "model",
            "multipart",
            "text",
            "video",
        ];
        (TOP_LEVEL.contains(&top) || top == "*")
            && !sub.is_empty()
            && sub
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "!#$&^_.+-*".contains(c))
    }
}
