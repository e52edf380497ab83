#![deny(missing_docs)]

//! # RAML Models
//!
//! The resolved API model. Everything here is built once by the root builder
//! and never mutated afterwards.

use crate::error::Diagnostic;
use crate::raml::assign::Assignment;
use crate::raml::registry::{ResourceTypeRegistry, SecuritySchemeRegistry, TraitRegistry};
use crate::schema::LoadedSchema;
use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};
use std::fmt;

/// Where a named parameter is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// Request or response header.
    Header,
    /// Path (or base URI) template parameter.
    Uri,
    /// Query string parameter.
    Query,
    /// Form field.
    Form,
}

impl ParamKind {
    /// The attribute key this kind is declared under.
    pub fn attribute(self) -> &'static str {
        match self {
            ParamKind::Header => "headers",
            ParamKind::Uri => "uriParameters",
            ParamKind::Query => "queryParameters",
            ParamKind::Form => "formParameters",
        }
    }
}

/// A named parameter (header, URI, query or form parameter).
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Where the parameter is carried.
    pub kind: ParamKind,
    /// Declared name.
    pub name: String,
    /// Display name; defaults to `name`.
    pub display_name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Declared type; defaults to `string`.
    pub param_type: String,
    /// Whether the parameter must be present. URI parameters default to true.
    pub required: bool,
    /// Whether the parameter may repeat.
    pub repeat: bool,
    /// Default value.
    pub default: Option<Value>,
    /// Example value.
    pub example: Option<Value>,
    /// Allowed values.
    pub enum_values: Option<Vec<Value>>,
    /// Regular expression the value must match.
    pub pattern: Option<String>,
    /// Minimum string length.
    pub min_length: Option<u64>,
    /// Maximum string length.
    pub max_length: Option<u64>,
    /// Minimum numeric value.
    pub minimum: Option<f64>,
    /// Maximum numeric value.
    pub maximum: Option<f64>,
    /// Owning method, recorded for headers.
    pub method: Option<String>,
    /// True when the parameter was synthesized from a URI placeholder.
    pub synthesized: bool,
    /// Raw declaration.
    pub raw: Value,
}

impl Parameter {
    /// A default parameter with every facet at its default value.
    pub fn new(kind: ParamKind, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            kind,
            display_name: name.clone(),
            name,
            description: None,
            param_type: "string".to_string(),
            required: kind == ParamKind::Uri,
            repeat: false,
            default: None,
            example: None,
            enum_values: None,
            pattern: None,
            min_length: None,
            max_length: None,
            minimum: None,
            maximum: None,
            method: None,
            synthesized: false,
            raw: Value::Null,
        }
    }
}

/// A request or response body for one mime type.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    /// Mime type key.
    pub mime_type: String,
    /// Loaded schema, if declared.
    pub schema: Option<LoadedSchema>,
    /// Loaded example, if declared.
    pub example: Option<LoadedSchema>,
    /// Form parameters for form-encoded bodies.
    pub form_params: Vec<Parameter>,
    /// Raw declaration.
    pub raw: Value,
}

/// A response status code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    /// A numeric status code.
    Code(u16),
    /// A key that could not be read as a status code (e.g. `default`).
    Other(String),
}

impl ResponseCode {
    /// Coerces a response key to a numeric code when possible.
    pub fn from_key(key: &str) -> Self {
        key.trim()
            .parse::<u16>()
            .map(ResponseCode::Code)
            .unwrap_or_else(|_| ResponseCode::Other(key.to_string()))
    }

    /// The numeric code, if any.
    pub fn as_u16(&self) -> Option<u16> {
        match self {
            ResponseCode::Code(c) => Some(*c),
            ResponseCode::Other(_) => None,
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseCode::Code(c) => write!(f, "{}", c),
            ResponseCode::Other(s) => f.write_str(s),
        }
    }
}

/// A declared response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Status code.
    pub code: ResponseCode,
    /// Description.
    pub description: Option<String>,
    /// Response headers.
    pub headers: Vec<Parameter>,
    /// Response bodies.
    pub body: Vec<Body>,
    /// Owning method.
    pub method: Option<String>,
    /// Raw declaration.
    pub raw: Value,
}

/// One entry of the root `documentation` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Documentation {
    /// Section title.
    pub title: String,
    /// Section content.
    pub content: String,
}

/// The attribute set shared by resources, traits and resource types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    /// Display name.
    pub display_name: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Headers.
    pub headers: Vec<Parameter>,
    /// Query parameters.
    pub query_params: Vec<Parameter>,
    /// Form parameters.
    pub form_params: Vec<Parameter>,
    /// URI parameters.
    pub uri_params: Vec<Parameter>,
    /// Base URI parameters.
    pub base_uri_params: Vec<Parameter>,
    /// Bodies.
    pub body: Vec<Body>,
    /// Responses.
    pub responses: Vec<Response>,
    /// Media type.
    pub media_type: Option<String>,
    /// Protocols.
    pub protocols: Vec<String>,
    /// Security assignments.
    pub secured_by: Vec<Assignment>,
}

/// Sub-attributes a security scheme attaches to secured methods.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescribedBy {
    /// Headers.
    pub headers: Vec<Parameter>,
    /// Query parameters.
    pub query_params: Vec<Parameter>,
    /// URI parameters.
    pub uri_params: Vec<Parameter>,
    /// Form parameters.
    pub form_params: Vec<Parameter>,
    /// Bodies.
    pub body: Vec<Body>,
    /// Responses.
    pub responses: Vec<Response>,
    /// Media type.
    pub media_type: Option<String>,
    /// Protocols.
    pub protocols: Vec<String>,
    /// Usage notes.
    pub usage: Option<String>,
    /// Documentation entries.
    pub documentation: Vec<Documentation>,
}

/// A named authentication mechanism.
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityScheme {
    /// Declared name.
    pub name: String,
    /// Scheme type (`OAuth 2.0`, `Basic Authentication`, ...).
    pub scheme_type: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Scheme-specific settings, passed through.
    pub settings: Option<Value>,
    /// Resolved `describedBy` block.
    pub described_by: DescribedBy,
    /// Raw declaration.
    pub raw: Value,
}

/// A reusable mixin of attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct TraitNode {
    /// Declared name.
    pub name: String,
    /// Template data (unsubstituted in the registry, substituted on resources).
    pub raw: Mapping,
    /// Attributes resolved from `raw`.
    pub attributes: Attributes,
    /// Usage notes.
    pub usage: Option<String>,
}

/// A reusable resource template, materialised once per method.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceTypeNode {
    /// Declared name.
    pub name: String,
    /// Method this node describes; `None` for method-less types.
    pub method: Option<String>,
    /// True when the method was declared with a `?` suffix.
    pub optional: bool,
    /// Method-level data.
    pub raw: Mapping,
    /// Type-level data (everything that is not a method).
    pub level: Mapping,
    /// Names of the resource types this one chains to, nearest first.
    pub chain: Vec<String>,
    /// Traits assigned inside the type.
    pub is: Vec<Assignment>,
    /// Attributes resolved from the template data.
    pub attributes: Attributes,
    /// Usage notes.
    pub usage: Option<String>,
}

/// A resource, bound to one method (or to none for path-only containers).
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceNode {
    /// Path segment as declared (e.g. `/{id}`).
    pub name: String,
    /// Display name.
    pub display_name: String,
    /// Bound method.
    pub method: Option<String>,
    /// Full relative path.
    pub path: String,
    /// Absolute URI (base URI + path).
    pub absolute_uri: String,
    /// Resolved attributes.
    pub attributes: Attributes,
    /// Assigned traits.
    pub is: Vec<Assignment>,
    /// Assigned traits, specialised for this resource.
    pub traits: Vec<TraitNode>,
    /// Assigned resource type.
    pub type_assignment: Option<Assignment>,
    /// Assigned resource type, specialised for this resource.
    pub resource_type: Option<ResourceTypeNode>,
    /// Security schemes matching `attributes.secured_by`.
    pub security_schemes: Vec<SecurityScheme>,
    /// Index of the parent node in `RootNode::resources`.
    pub parent: Option<usize>,
    /// Raw resource data.
    pub raw: Mapping,
}

/// The root of a resolved API.
#[derive(Debug)]
pub struct RootNode {
    /// API title.
    pub title: Option<String>,
    /// API version.
    pub version: Option<String>,
    /// Supported protocols.
    pub protocols: Vec<String>,
    /// Base URI with `{version}` filled in.
    pub base_uri: String,
    /// Base URI parameters, ordered by placeholder.
    pub base_uri_params: Vec<Parameter>,
    /// Root-level URI parameters.
    pub uri_params: Vec<Parameter>,
    /// Default media type.
    pub media_type: Option<String>,
    /// Documentation entries.
    pub documentation: Vec<Documentation>,
    /// Named schemas.
    pub schemas: IndexMap<String, LoadedSchema>,
    /// Default security assignment.
    pub secured_by: Vec<Assignment>,
    /// Security schemes.
    pub security_schemes: SecuritySchemeRegistry,
    /// Traits.
    pub traits: TraitRegistry,
    /// Resource types.
    pub resource_types: ResourceTypeRegistry,
    /// Resources in depth-first order.
    pub resources: Vec<ResourceNode>,
    /// Everything recorded during resolution.
    pub diagnostics: Vec<Diagnostic>,
    /// Raw document.
    pub raw: Mapping,
}

impl RootNode {
    /// The parent of `node`, if it has one.
    pub fn parent_of(&self, node: &ResourceNode) -> Option<&ResourceNode> {
        node.parent.and_then(|idx| self.resources.get(idx))
    }

    /// Every node expanded for `path`.
    pub fn resources_at<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a ResourceNode> + 'a {
        self.resources.iter().filter(move |r| r.path == path)
    }

    /// The node for `path` bound to `method` (`None` for path-only nodes).
    pub fn resource(&self, path: &str, method: Option<&str>) -> Option<&ResourceNode> {
        self.resources
            .iter()
            .find(|r| r.path == path && r.method.as_deref() == method)
    }

    /// Diagnostics recorded during resolution.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}
