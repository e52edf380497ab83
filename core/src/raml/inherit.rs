//! # Attribute Resolution
//!
//! A node's attributes are drawn from up to six sources: the method data, the
//! assigned traits, the assigned resource type, the resource itself, the
//! parent resource and the root. Each attribute names the sources it consults
//! and in what order.
//!
//! Scalars take the first non-empty candidate. Structural attributes
//! (parameters, bodies, responses) are the deep merge of every candidate, the
//! more specific source winning conflicts.

use crate::error::DiagnosticKind;
use crate::raml::assign::{normalize_assignments, AssignmentShape};
use crate::raml::context::ParseContext;
use crate::raml::merge::merge_mappings;
use crate::raml::models::{Attributes, ParamKind};
use crate::raml::params::{reconcile_responses, ParamFactory};
use crate::raml::value::{get, get_string, is_empty, location, scalar_string, string_list, untag};
use crate::validation::Attribute;
use serde_yaml::{Mapping, Value};

/// Where a candidate value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// The method's own data (or a trait's body when resolving a trait).
    Method,
    /// The assigned traits, first assigned first.
    Traits,
    /// The assigned resource type: its method form, then its type-level data.
    ResourceType,
    /// The resource-level data.
    Resource,
    /// The resolved parent resource.
    Parent,
    /// The document root.
    Root,
}

/// Description and display name.
pub const DESCRIPTION: [Source; 3] = [Source::Method, Source::ResourceType, Source::Resource];
/// Protocols fall back through the parent to the root.
pub const PROTOCOLS: [Source; 6] = [
    Source::Method,
    Source::Traits,
    Source::ResourceType,
    Source::Resource,
    Source::Parent,
    Source::Root,
];
/// Media type and security skip the parent and go straight to the root.
pub const ROOT_DEFAULTED: [Source; 5] = [
    Source::Method,
    Source::Traits,
    Source::ResourceType,
    Source::Resource,
    Source::Root,
];
/// Headers, query, form, body and URI parameters.
pub const STRUCTURAL: [Source; 4] = [
    Source::Method,
    Source::Resource,
    Source::Traits,
    Source::ResourceType,
];
/// Responses declared by the node itself.
pub const OWN_RESPONSES: [Source; 2] = [Source::Method, Source::Resource];
/// Responses mixed in from templates.
pub const INHERITED_RESPONSES: [Source; 2] = [Source::Traits, Source::ResourceType];

/// Something already resolved that can answer attribute lookups.
pub trait AttributeSource {
    /// The resolved value of `key`, if any.
    fn attribute(&self, key: &str) -> Option<Value>;
}

impl AttributeSource for Mapping {
    fn attribute(&self, key: &str) -> Option<Value> {
        get(self, key).cloned()
    }
}

/// The candidate data for one node.
#[derive(Default)]
pub struct Candidates<'a> {
    /// Method data.
    pub method: Option<&'a Mapping>,
    /// Trait bodies in assignment order.
    pub traits: Vec<&'a Mapping>,
    /// The resource type's form for this method.
    pub type_method: Option<&'a Mapping>,
    /// The resource type's non-method data.
    pub type_level: Option<&'a Mapping>,
    /// Resource-level data.
    pub resource: Option<&'a Mapping>,
    /// The parent resource.
    pub parent: Option<&'a dyn AttributeSource>,
    /// The document root.
    pub root: Option<&'a dyn AttributeSource>,
}

impl<'a> Candidates<'a> {
    /// Every value `source` offers for `key`, most specific first.
    fn values(&self, source: Source, key: &str) -> Vec<Value> {
        let from_map = |map: Option<&'a Mapping>| map.and_then(|m| get(m, key)).cloned();
        match source {
            Source::Method => from_map(self.method).into_iter().collect(),
            Source::Traits => self.traits.iter().filter_map(|t| get(t, key).cloned()).collect(),
            Source::ResourceType => from_map(self.type_method)
                .into_iter()
                .chain(from_map(self.type_level))
                .collect(),
            Source::Resource => from_map(self.resource).into_iter().collect(),
            Source::Parent => self.parent.and_then(|p| p.attribute(key)).into_iter().collect(),
            Source::Root => self.root.and_then(|r| r.attribute(key)).into_iter().collect(),
        }
    }

    /// The first non-empty candidate for `key` in `order`.
    pub fn first_match(&self, key: &str, order: &[Source]) -> Option<Value> {
        order
            .iter()
            .flat_map(|source| self.values(*source, key))
            .find(|v| !is_empty(v))
    }

    /// [`Candidates::first_match`] with a fallback when no source matches.
    pub fn first_match_or(&self, key: &str, order: &[Source], default: Value) -> Value {
        self.first_match(key, order).unwrap_or(default)
    }

    /// Like [`Candidates::first_match`], rendered as a string.
    pub fn first_string(&self, key: &str, order: &[Source]) -> Option<String> {
        self.first_match(key, order).as_ref().and_then(scalar_string)
    }

    /// Deep merge of every mapping candidate for `key`.
    ///
    /// Earlier sources are treated as the child, so they win scalar
    /// conflicts. Non-mapping candidates are recorded and skipped.
    pub fn union(&self, key: &str, order: &[Source], ctx: &ParseContext<'_>, at: &str) -> Mapping {
        let here = location(&[at, key]);
        let mut merged: Option<Mapping> = None;
        for value in order.iter().flat_map(|source| self.values(*source, key)) {
            let Some(map) = untag(&value).as_mapping() else {
                ctx.diagnostics.record(
                    DiagnosticKind::Shape,
                    here.as_str(),
                    format!("expected a mapping for '{}'", key),
                );
                continue;
            };
            merged = Some(match merged {
                Some(child) => merge_mappings(&child, map, &here, ctx.diagnostics),
                None => map.clone(),
            });
        }
        merged.unwrap_or_default()
    }

    /// Resolves the attribute set shared by traits, resource types and
    /// resources.
    ///
    /// Protocols, media type and URI parameter ordering are left for the
    /// caller to finish; what is returned here is the plain inherited view.
    pub fn attributes(&self, ctx: &ParseContext<'_>, method: Option<&str>, at: &str) -> Attributes {
        let factory = ParamFactory::new(ctx);
        let params = |kind: ParamKind| {
            factory.parameters(&self.union(kind.attribute(), &STRUCTURAL, ctx, at), kind, method)
        };

        let inherited_responses = self.union("responses", &INHERITED_RESPONSES, ctx, at);
        let own_responses = self.union("responses", &OWN_RESPONSES, ctx, at);
        let responses = reconcile_responses(
            factory.responses(&inherited_responses, method, at),
            factory.responses(&own_responses, method, at),
        );

        let secured_by = self
            .first_match("securedBy", &ROOT_DEFAULTED)
            .map(|value| {
                normalize_assignments(
                    Some(&value),
                    AssignmentShape::List,
                    &location(&[at, "securedBy"]),
                    ctx.diagnostics,
                )
            })
            .unwrap_or_default();

        Attributes {
            display_name: self.first_string("displayName", &DESCRIPTION),
            description: self.first_string("description", &DESCRIPTION),
            headers: params(ParamKind::Header),
            query_params: params(ParamKind::Query),
            form_params: params(ParamKind::Form),
            uri_params: params(ParamKind::Uri),
            base_uri_params: factory.parameters(
                &self.union("baseUriParameters", &STRUCTURAL, ctx, at),
                ParamKind::Uri,
                method,
            ),
            body: factory.bodies(&self.union("body", &STRUCTURAL, ctx, at), method, at),
            responses,
            media_type: self.first_string("mediaType", &ROOT_DEFAULTED),
            protocols: string_list(self.first_match("protocols", &PROTOCOLS).as_ref())
                .into_iter()
                .map(|p| p.to_uppercase())
                .collect(),
            secured_by,
        }
    }
}

/// Hands every attribute of a finished set to the validator.
pub fn validate_attributes(ctx: &ParseContext<'_>, at: &str, attributes: &Attributes) {
    let sub = |key: &str| location(&[at, key]);
    ctx.validate(&sub("protocols"), Attribute::Protocols(&attributes.protocols));
    ctx.validate(&sub("mediaType"), Attribute::MediaType(attributes.media_type.as_deref()));
    ctx.validate(&sub("headers"), Attribute::Parameters(ParamKind::Header, &attributes.headers));
    ctx.validate(
        &sub("queryParameters"),
        Attribute::Parameters(ParamKind::Query, &attributes.query_params),
    );
    ctx.validate(
        &sub("formParameters"),
        Attribute::Parameters(ParamKind::Form, &attributes.form_params),
    );
    ctx.validate(&sub("uriParameters"), Attribute::Parameters(ParamKind::Uri, &attributes.uri_params));
    ctx.validate(
        &sub("baseUriParameters"),
        Attribute::Parameters(ParamKind::Uri, &attributes.base_uri_params),
    );
    ctx.validate(&sub("body"), Attribute::Bodies(&attributes.body));
    ctx.validate(&sub("responses"), Attribute::Responses(&attributes.responses));
}

/// `usage` is only meaningful on templates and is never inherited.
pub fn usage(raw: &Mapping) -> Option<String> {
    get_string(raw, "usage")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParserConfig;
    use crate::error::Diagnostics;
    use crate::raml::tags::TagRegistry;
    use crate::schema::DefaultSchemaLoader;
    use crate::validation::NoopValidator;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    fn map(src: &str) -> Mapping {
        serde_yaml::from_str(src).unwrap()
    }

    fn with_ctx(test: impl FnOnce(&ParseContext<'_>)) -> Diagnostics {
        let config = ParserConfig::default();
        let diagnostics = Diagnostics::new();
        let tags = TagRegistry::default();
        let schemas = IndexMap::new();
        {
            let ctx = ParseContext {
                config: &config,
                diagnostics: &diagnostics,
                tags: &tags,
                schema_loader: &DefaultSchemaLoader,
                validator: &NoopValidator,
                media_type: Some("application/json"),
                schemas: &schemas,
            };
            test(&ctx);
        }
        diagnostics
    }

    #[test]
    fn test_first_match_skips_missing_sources() {
        let trait_raw = map("description: X\n");
        let candidates = Candidates {
            traits: vec![&trait_raw],
            ..Default::default()
        };
        assert_eq!(
            candidates.first_string("description", &[Source::Method, Source::Traits]),
            Some("X".to_string())
        );
    }

    #[test]
    fn test_default_when_nothing_matches() {
        let candidates = Candidates::default();
        assert_eq!(
            candidates.first_match_or("mediaType", &ROOT_DEFAULTED, Value::String("text/plain".into())),
            Value::String("text/plain".into())
        );
    }

    #[test]
    fn test_empty_values_do_not_match() {
        let method = map("description: ''\nprotocols: []\n");
        let resource = map("description: Resource\nprotocols: [HTTP]\n");
        let candidates = Candidates {
            method: Some(&method),
            resource: Some(&resource),
            ..Default::default()
        };
        assert_eq!(candidates.first_string("description", &DESCRIPTION).as_deref(), Some("Resource"));
        assert!(candidates.first_match("protocols", &PROTOCOLS).is_some());
    }

    #[test]
    fn test_type_method_form_before_type_level() {
        let type_method = map("description: method form\n");
        let type_level = map("description: type form\n");
        let candidates = Candidates {
            type_method: Some(&type_method),
            type_level: Some(&type_level),
            ..Default::default()
        };
        assert_eq!(
            candidates.first_string("description", &DESCRIPTION).as_deref(),
            Some("method form")
        );
    }

    #[test]
    fn test_root_is_consulted_last() {
        let root = map("protocols: [HTTPS]\nmediaType: application/xml\n");
        let candidates = Candidates {
            root: Some(&root),
            ..Default::default()
        };
        assert_eq!(candidates.first_string("mediaType", &ROOT_DEFAULTED).as_deref(), Some("application/xml"));
        assert_eq!(candidates.first_string("mediaType", &DESCRIPTION), None);
    }

    #[test]
    fn test_union_prefers_more_specific() {
        let diags = with_ctx(|ctx| {
            let method = map("headers:\n  Accept: {description: method}\n");
            let trait_raw = map("headers:\n  Accept: {description: trait}\n  X-Page: {type: integer}\n");
            let candidates = Candidates {
                method: Some(&method),
                traits: vec![&trait_raw],
                ..Default::default()
            };
            let attrs = candidates.attributes(ctx, Some("get"), "/w.get");
            let got: Vec<_> = attrs
                .headers
                .iter()
                .map(|h| (h.name.as_str(), h.description.clone()))
                .collect();
            assert_eq!(
                got,
                vec![("Accept", Some("method".to_string())), ("X-Page", None)]
            );
            assert_eq!(attrs.headers[0].method.as_deref(), Some("get"));
        });
        let recorded = diags.into_vec();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].kind, DiagnosticKind::MergeConflict);
        assert_eq!(recorded[0].location, "/w.get.headers.Accept.description");
    }

    #[test]
    fn test_union_skips_non_mappings() {
        let diags = with_ctx(|ctx| {
            let method = map("headers: nope\n");
            let resource = map("headers:\n  Accept:\n");
            let candidates = Candidates {
                method: Some(&method),
                resource: Some(&resource),
                ..Default::default()
            };
            let merged = candidates.union("headers", &STRUCTURAL, ctx, "/w");
            assert_eq!(merged.len(), 1);
        });
        assert_eq!(diags.snapshot()[0].kind, DiagnosticKind::Shape);
    }

    #[test]
    fn test_responses_inherit_per_code() {
        with_ctx(|ctx| {
            let method = map("responses:\n  200:\n    body: {schema: Widget}\n");
            let type_method = map(
                "responses:\n  200:\n    description: ok\n    headers: {X-Rate: {type: integer}}\n  404: {description: gone}\n",
            );
            let candidates = Candidates {
                method: Some(&method),
                type_method: Some(&type_method),
                ..Default::default()
            };
            let attrs = candidates.attributes(ctx, Some("get"), "/w.get");
            let codes: Vec<_> = attrs.responses.iter().map(|r| r.code.to_string()).collect();
            assert_eq!(codes, vec!["404", "200"]);
            let ok = &attrs.responses[1];
            assert_eq!(ok.description.as_deref(), Some("ok"));
            assert_eq!(ok.headers[0].name, "X-Rate");
            assert_eq!(ok.body[0].mime_type, "application/json");
        });
    }

    #[test]
    fn test_secured_by_defaults_to_root() {
        with_ctx(|ctx| {
            let root = map("securedBy: [oauth_2_0, null]\n");
            let candidates = Candidates {
                root: Some(&root),
                ..Default::default()
            };
            let attrs = candidates.attributes(ctx, Some("get"), "/w.get");
            let names: Vec<_> = attrs.secured_by.iter().map(|a| a.name().to_string()).collect();
            assert_eq!(names, vec!["oauth_2_0", "null"]);
        });
    }
}
