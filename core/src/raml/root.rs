//! # Root Builder
//!
//! Orchestrates a parse. Construction order is fixed: root scalars, then
//! security schemes, traits, resource types and finally the resource tree.
//! Each stage only reads what the earlier ones produced.

use crate::config::ParserConfig;
use crate::error::{AppError, AppResult, DiagnosticKind, Diagnostics, InvalidRamlError};
use crate::raml::assign::{normalize_assignments, AssignmentShape};
use crate::raml::context::ParseContext;
use crate::raml::inherit::AttributeSource;
use crate::raml::models::{ParamKind, Parameter, RootNode};
use crate::raml::params::{order_uri_parameters, ParamFactory};
use crate::raml::registry::{ResourceTypeRegistry, SecuritySchemeRegistry, TemplateEnv, TraitRegistry};
use crate::raml::resources::ResourceTreeBuilder;
use crate::raml::tags::TagRegistry;
use crate::raml::value::{get, get_mapping, get_string, named_entries, string_list, untag};
use crate::schema::{DefaultSchemaLoader, LoadedSchema, SchemaLoader};
use crate::validation::{Attribute, StructuralValidator, Validator};
use indexmap::IndexMap;
use regex::Regex;
use serde_yaml::{Mapping, Value};
use std::sync::OnceLock;

fn scheme_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(?i)(https|http)://").expect("Invalid regex constant"))
}

/// Root-level values every node falls back to.
#[derive(Debug, Clone, Default)]
pub struct RootDefaults {
    /// Raw document.
    pub raw: Mapping,
    /// Base URI with `{version}` filled in.
    pub base_uri: String,
    /// Explicit protocols, or the base URI's scheme.
    pub protocols: Vec<String>,
    /// Default media type.
    pub media_type: Option<String>,
    /// Names of every parameter the root already binds in the base URI,
    /// whether declared as a base URI or a URI parameter.
    pub base_params: Vec<String>,
}

impl RootDefaults {
    /// The base URI's scheme, upper-cased.
    pub fn scheme_protocol(&self) -> Option<String> {
        scheme_regex()
            .captures(&self.base_uri)
            .map(|caps| caps[1].to_uppercase())
    }
}

impl AttributeSource for RootDefaults {
    fn attribute(&self, key: &str) -> Option<Value> {
        match key {
            "protocols" => Some(Value::Sequence(
                self.protocols.iter().cloned().map(Value::String).collect(),
            )),
            "mediaType" => self.media_type.clone().map(Value::String),
            other => get(&self.raw, other).cloned(),
        }
    }
}

/// Builds a [`RootNode`] from a decoded document.
pub struct RamlParser {
    config: ParserConfig,
    tags: TagRegistry,
    schema_loader: Box<dyn SchemaLoader>,
    validator: Box<dyn Validator>,
}

impl RamlParser {
    /// A parser with the builtin tags, the default schema loader and the
    /// structural validator.
    pub fn new(config: ParserConfig) -> Self {
        let validator = StructuralValidator::new(config.protocols.clone());
        Self {
            config,
            tags: TagRegistry::default(),
            schema_loader: Box::new(DefaultSchemaLoader),
            validator: Box::new(validator),
        }
    }

    /// Registers an extra substitution tag.
    pub fn with_tag(mut self, name: impl Into<String>, func: impl Fn(&str) -> String + 'static) -> Self {
        self.tags.register(name, func);
        self
    }

    /// Replaces the schema loader.
    pub fn with_schema_loader(mut self, loader: impl SchemaLoader + 'static) -> Self {
        self.schema_loader = Box::new(loader);
        self
    }

    /// Replaces the validator.
    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    /// Parses YAML text.
    pub fn parse_str(&self, source: &str) -> AppResult<RootNode> {
        let document: Value = serde_yaml::from_str(source)
            .map_err(|e| AppError::Decode(format!("Failed to parse RAML document: {}", e)))?;
        self.parse(&document)
    }

    /// Resolves a decoded document.
    ///
    /// Every problem is collected into the returned node's diagnostics. With
    /// `validate` set, error-severity diagnostics fail the parse instead.
    pub fn parse(&self, document: &Value) -> AppResult<RootNode> {
        let Some(raw) = untag(document).as_mapping() else {
            return Err(AppError::Decode(
                "RAML document root must be a mapping".to_string(),
            ));
        };
        let diagnostics = Diagnostics::new();
        let root = self.build(raw, &diagnostics);
        let diagnostics = diagnostics.into_vec();
        tracing::debug!(
            resources = root.resources.len(),
            diagnostics = diagnostics.len(),
            "RAML document resolved"
        );

        if self.config.validate && diagnostics.iter().any(|d| d.is_error()) {
            return Err(InvalidRamlError {
                diagnostics: diagnostics.into_iter().filter(|d| d.is_error()).collect(),
            }
            .into());
        }
        Ok(RootNode { diagnostics, ..root })
    }

    fn build(&self, raw: &Mapping, diagnostics: &Diagnostics) -> RootNode {
        let title = get_string(raw, "title");
        if title.is_none() {
            diagnostics.record(DiagnosticKind::MissingRequired, "title", "the API has no title");
        }
        let version = get_string(raw, "version");
        let base_uri = resolve_base_uri(raw, version.as_deref(), diagnostics);
        let media_type = get_string(raw, "mediaType");
        let schemas: IndexMap<String, LoadedSchema> = named_entries(raw.get("schemas"), "schemas", diagnostics)
            .into_iter()
            .map(|(name, value)| {
                let loaded = self.schema_loader.load(&value);
                (name, loaded)
            })
            .collect();

        let ctx = ParseContext {
            config: &self.config,
            diagnostics,
            tags: &self.tags,
            schema_loader: self.schema_loader.as_ref(),
            validator: self.validator.as_ref(),
            media_type: media_type.as_deref(),
            schemas: &schemas,
        };
        let factory = ParamFactory::new(&ctx);

        let mut protocols: Vec<String> = string_list(get(raw, "protocols"))
            .into_iter()
            .map(|p| p.to_uppercase())
            .collect();
        let mut defaults = RootDefaults {
            raw: raw.clone(),
            base_uri,
            protocols: Vec::new(),
            media_type: media_type.clone(),
            base_params: Vec::new(),
        };
        if protocols.is_empty() {
            protocols = defaults.scheme_protocol().into_iter().collect();
        }
        defaults.protocols = protocols.clone();

        let declared_uri = root_params(&factory, raw, "uriParameters");
        let declared_uri_names: Vec<String> = declared_uri.iter().map(|p| p.name.clone()).collect();
        let base_uri_params = order_uri_parameters(
            &[defaults.base_uri.as_str()],
            root_params(&factory, raw, "baseUriParameters"),
            &declared_uri_names,
        );
        let base_names: Vec<String> = base_uri_params.iter().map(|p| p.name.clone()).collect();
        let uri_params = order_uri_parameters(&[defaults.base_uri.as_str()], declared_uri, &base_names);
        defaults.base_params = base_names;
        defaults
            .base_params
            .extend(uri_params.iter().map(|p| p.name.clone()));
        let documentation = factory.documentation(get(raw, "documentation"), "");
        let secured_by = normalize_assignments(get(raw, "securedBy"), AssignmentShape::List, "securedBy", diagnostics);

        ctx.validate("protocols", Attribute::Protocols(&protocols));
        ctx.validate("mediaType", Attribute::MediaType(media_type.as_deref()));
        ctx.validate("baseUriParameters", Attribute::Parameters(ParamKind::Uri, &base_uri_params));
        ctx.validate("uriParameters", Attribute::Parameters(ParamKind::Uri, &uri_params));
        ctx.validate("documentation", Attribute::Documentation(&documentation));

        let env = TemplateEnv {
            ctx: &ctx,
            root: &defaults,
        };
        let security_schemes = SecuritySchemeRegistry::build(raw, &ctx);
        let traits = TraitRegistry::build(raw, &env);
        let resource_types = ResourceTypeRegistry::build(raw, &env, &traits);
        tracing::debug!(
            schemes = security_schemes.len(),
            traits = traits.len(),
            resource_types = resource_types.len(),
            "registries built"
        );
        let resources =
            ResourceTreeBuilder::new(&env, &defaults, &traits, &resource_types, &security_schemes).build(raw);

        RootNode {
            title,
            version,
            protocols,
            base_uri: defaults.base_uri,
            base_uri_params,
            uri_params,
            media_type,
            documentation,
            schemas,
            secured_by,
            security_schemes,
            traits,
            resource_types,
            resources,
            diagnostics: Vec::new(),
            raw: defaults.raw,
        }
    }
}

impl Default for RamlParser {
    fn default() -> Self {
        Self::new(ParserConfig::default())
    }
}

fn root_params(factory: &ParamFactory<'_, '_>, raw: &Mapping, key: &str) -> Vec<Parameter> {
    get_mapping(raw, key)
        .map(|params| factory.parameters(params, ParamKind::Uri, None))
        .unwrap_or_default()
}

/// Fills `{version}` into the base URI. A base URI that needs a version the
/// document does not declare is recorded and left as is.
fn resolve_base_uri(raw: &Mapping, version: Option<&str>, diagnostics: &Diagnostics) -> String {
    let base_uri = get_string(raw, "baseUri").unwrap_or_default();
    if !base_uri.contains("{version}") {
        return base_uri;
    }
    match version {
        Some(version) => base_uri.replace("{version}", version),
        None => {
            diagnostics.record(
                DiagnosticKind::MissingRequired,
                "version",
                "baseUri references {version} but no version is declared",
            );
            base_uri
        }
    }
}

/// Resolves a decoded document with the default collaborators.
pub fn parse_raml(document: &Value, config: &ParserConfig) -> AppResult<RootNode> {
    RamlParser::new(config.clone()).parse(document)
}

/// Decodes and resolves YAML text with the default collaborators.
pub fn parse_raml_str(source: &str, config: &ParserConfig) -> AppResult<RootNode> {
    RamlParser::new(config.clone()).parse_str(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lenient() -> ParserConfig {
        ParserConfig {
            validate: false,
            ..ParserConfig::default()
        }
    }

    #[test]
    fn test_version_is_filled_into_base_uri() {
        let doc = "title: Example\nversion: v1\nbaseUri: https://{subDomain}.example.com/{version}/{party}\nbaseUriParameters:\n  party: {description: Tenant}\n";
        let root = parse_raml_str(doc, &lenient()).unwrap();
        assert_eq!(root.base_uri, "https://{subDomain}.example.com/v1/{party}");
        assert_eq!(root.protocols, vec!["HTTPS".to_string()]);
        let names: Vec<_> = root.base_uri_params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["subDomain", "party"]);
        assert!(root.base_uri_params[0].synthesized);
        assert_eq!(root.base_uri_params[1].description.as_deref(), Some("Tenant"));
        assert!(root.diagnostics().is_empty());
    }

    #[test]
    fn test_root_uri_parameters_are_not_synthesized_again() {
        let doc = "title: Tenants\nbaseUri: https://{subDomain}.example.com/api\nuriParameters:\n  subDomain: {description: Tenant subdomain}\n/things:\n  get:\n";
        let root = parse_raml_str(doc, &ParserConfig::default()).unwrap();
        assert!(root.base_uri_params.is_empty());
        assert_eq!(root.uri_params.len(), 1);
        assert_eq!(root.uri_params[0].name, "subDomain");
        assert_eq!(root.uri_params[0].description.as_deref(), Some("Tenant subdomain"));
        assert!(!root.uri_params[0].synthesized);

        let get = root.resource("/things", Some("get")).unwrap();
        assert!(get.attributes.base_uri_params.is_empty());
    }

    #[test]
    fn test_missing_title_and_version_recorded() {
        let doc = "baseUri: http://example.com/{version}\n";
        let root = parse_raml_str(doc, &lenient()).unwrap();
        let kinds: Vec<_> = root.diagnostics().iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DiagnosticKind::MissingRequired, DiagnosticKind::MissingRequired]);
        assert_eq!(root.base_uri, "http://example.com/{version}");
        assert!(root.base_uri_params.is_empty());
    }

    #[test]
    fn test_explicit_protocols_are_upper_cased() {
        let doc = "title: T\nbaseUri: http://example.com\nprotocols: [http, https]\n";
        let root = parse_raml_str(doc, &lenient()).unwrap();
        assert_eq!(root.protocols, vec!["HTTP".to_string(), "HTTPS".to_string()]);
    }

    #[test]
    fn test_validate_fails_on_errors_only() {
        let doc = "title: T\nbaseUri: http://example.com\n/widgets:\n  is: [missing]\n  get:\n";
        let err = parse_raml_str(doc, &ParserConfig::default()).unwrap_err();
        match err {
            AppError::Invalid(invalid) => {
                assert_eq!(invalid.diagnostics.len(), 1);
                assert_eq!(invalid.diagnostics[0].kind, DiagnosticKind::Reference);
            }
            other => panic!("expected an invalid-document error, got {other}"),
        }
        let root = parse_raml_str(doc, &lenient()).unwrap();
        assert_eq!(root.diagnostics().len(), 1);
    }

    #[test]
    fn test_non_mapping_document_is_a_decode_error() {
        assert!(matches!(
            parse_raml_str("- just\n- a list\n", &ParserConfig::default()),
            Err(AppError::Decode(_))
        ));
        assert!(matches!(
            parse_raml_str("title: [unclosed\n", &ParserConfig::default()),
            Err(AppError::Decode(_))
        ));
    }

    #[test]
    fn test_schemas_and_documentation() {
        let doc = "title: T\nschemas:\n  - Widget: '{\"type\": \"object\"}'\ndocumentation:\n  - title: Home\n    content: Welcome\n";
        let root = parse_raml_str(doc, &ParserConfig::default()).unwrap();
        assert!(root.schemas["Widget"].as_json().is_some());
        assert_eq!(root.documentation[0].title, "Home");
    }

    #[test]
    fn test_custom_tag() {
        let doc = "title: T\nbaseUri: http://example.com\nresourceTypes:\n  - item:\n      get: {description: '<<resourcePathName | !shout>>'}\n/widgets:\n  type: item\n";
        let root = RamlParser::default()
            .with_tag("shout", |s| format!("{}!", s.to_uppercase()))
            .parse_str(doc)
            .unwrap();
        let get = root.resource("/widgets", Some("get")).unwrap();
        assert_eq!(get.attributes.description.as_deref(), Some("WIDGETS!"));
    }
}
