//! # Resource Tree
//!
//! Walks every `/path` key depth-first and expands each resource into one node
//! per method. A resource whose type implies methods it does not declare still
//! gets nodes for them; a resource with no methods at all gets a single
//! method-less node.

use crate::error::DiagnosticKind;
use crate::raml::assign::{extend_unique, normalize_assignments, Assignment, AssignmentShape};
use crate::raml::inherit::{validate_attributes, AttributeSource, Candidates, Source, DESCRIPTION};
use crate::raml::models::{ResourceNode, ResourceTypeNode, SecurityScheme, TraitNode};
use crate::raml::params::{order_uri_parameters, reconcile};
use crate::raml::registry::{ResourceTypeRegistry, SecuritySchemeRegistry, TemplateEnv, TraitRegistry};
use crate::raml::root::RootDefaults;
use crate::raml::substitute::substitute_mapping;
use crate::raml::value::{get, location, scalar_string, untag};
use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};

impl AttributeSource for ResourceNode {
    fn attribute(&self, key: &str) -> Option<Value> {
        let attrs = &self.attributes;
        match key {
            "protocols" => Some(Value::Sequence(
                attrs.protocols.iter().cloned().map(Value::String).collect(),
            )),
            "mediaType" => attrs.media_type.clone().map(Value::String),
            "securedBy" => Some(Value::Sequence(
                attrs.secured_by.iter().map(Assignment::to_value).collect(),
            )),
            "description" => attrs.description.clone().map(Value::String),
            other => get(&self.raw, other).cloned(),
        }
    }
}

/// A resource's display name never comes from a template.
const DISPLAY_NAME: [Source; 2] = [Source::Method, Source::Resource];

/// Values substituted into every template applied to a resource.
pub fn reserved_params(path: &str, method: Option<&str>) -> IndexMap<String, String> {
    let path_name = path
        .split('/')
        .rev()
        .find(|segment| !segment.is_empty() && !segment.contains('{'))
        .unwrap_or_default();
    let mut params = IndexMap::new();
    params.insert("resourcePath".to_string(), path.to_string());
    params.insert("resourcePathName".to_string(), path_name.to_string());
    if let Some(method) = method {
        params.insert("methodName".to_string(), method.to_string());
    }
    params
}

/// Depth-first builder for [`ResourceNode`]s.
pub struct ResourceTreeBuilder<'e, 'c, 'a> {
    env: &'e TemplateEnv<'c, 'a>,
    root: &'e RootDefaults,
    traits: &'e TraitRegistry,
    types: &'e ResourceTypeRegistry,
    schemes: &'e SecuritySchemeRegistry,
    resources: Vec<ResourceNode>,
}

impl<'e, 'c, 'a> ResourceTreeBuilder<'e, 'c, 'a> {
    /// Creates a builder over fully built registries.
    pub fn new(
        env: &'e TemplateEnv<'c, 'a>,
        root: &'e RootDefaults,
        traits: &'e TraitRegistry,
        types: &'e ResourceTypeRegistry,
        schemes: &'e SecuritySchemeRegistry,
    ) -> Self {
        Self {
            env,
            root,
            traits,
            types,
            schemes,
            resources: Vec::new(),
        }
    }

    /// Expands every resource under `raw` (the document root).
    pub fn build(mut self, raw: &Mapping) -> Vec<ResourceNode> {
        self.walk(raw, None);
        tracing::debug!(nodes = self.resources.len(), "resource tree built");
        self.resources
    }

    fn walk(&mut self, raw: &Mapping, parent: Option<usize>) {
        for (k, v) in raw {
            let Some(segment) = scalar_string(k).filter(|s| s.starts_with('/')) else {
                continue;
            };
            let path = match parent {
                Some(idx) => format!("{}{}", self.resources[idx].path, segment),
                None => segment.clone(),
            };
            let data = match untag(v) {
                Value::Mapping(map) => map.clone(),
                Value::Null => Mapping::new(),
                _ => {
                    self.env.ctx.diagnostics.record(
                        DiagnosticKind::Shape,
                        path.as_str(),
                        "resource body must be a mapping",
                    );
                    Mapping::new()
                }
            };

            let methods = self.methods_for(&data, &path);
            tracing::trace!(path = %path, methods = ?methods, "expanding resource");
            let mut first = None;
            if methods.is_empty() {
                let node = self.build_node(&segment, &path, &data, None, parent);
                first = Some(self.push(node));
            }
            for method in &methods {
                let node = self.build_node(&segment, &path, &data, Some(method.as_str()), parent);
                let idx = self.push(node);
                first.get_or_insert(idx);
            }
            self.walk(&data, first);
        }
    }

    fn push(&mut self, node: ResourceNode) -> usize {
        self.resources.push(node);
        self.resources.len() - 1
    }

    /// Declared methods plus the non-optional methods of the assigned type,
    /// in configured order.
    fn methods_for(&self, data: &Mapping, path: &str) -> Vec<String> {
        let config = self.env.ctx.config;
        let mut methods: Vec<String> = data
            .keys()
            .filter_map(scalar_string)
            .filter(|k| config.is_method(k))
            .collect();
        let assigned = normalize_assignments(
            get(data, "type"),
            AssignmentShape::Single,
            &location(&[path, "type"]),
            self.env.ctx.diagnostics,
        );
        if let Some(assignment) = assigned.first() {
            for implied in self.types.implied_methods(assignment.name()) {
                if !methods.contains(&implied) {
                    methods.push(implied);
                }
            }
        }
        methods.sort_by_key(|m| config.method_rank(m));
        methods
    }

    fn build_node(
        &self,
        segment: &str,
        path: &str,
        data: &Mapping,
        method: Option<&str>,
        parent_idx: Option<usize>,
    ) -> ResourceNode {
        let ctx = self.env.ctx;
        let parent = parent_idx.and_then(|idx| self.resources.get(idx));
        let at = match method {
            Some(m) => location(&[path, m]),
            None => path.to_string(),
        };
        let method_raw = method.map(|m| match get(data, m).map(untag) {
            Some(Value::Mapping(map)) => map.clone(),
            _ => Mapping::new(),
        });

        let mut is = normalize_assignments(
            get(data, "is"),
            AssignmentShape::List,
            &location(&[path, "is"]),
            ctx.diagnostics,
        );
        if let Some(raw) = &method_raw {
            extend_unique(
                &mut is,
                normalize_assignments(get(raw, "is"), AssignmentShape::List, &location(&[&at, "is"]), ctx.diagnostics),
            );
        }
        let type_assignment = method_raw
            .as_ref()
            .and_then(|raw| get(raw, "type"))
            .or_else(|| get(data, "type"))
            .and_then(|value| {
                normalize_assignments(Some(value), AssignmentShape::Single, &location(&[&at, "type"]), ctx.diagnostics)
                    .into_iter()
                    .next()
            });

        let reserved = reserved_params(path, method);
        let resource_type = type_assignment
            .as_ref()
            .and_then(|a| self.specialize_type(a, method, &reserved, &at));

        let mut trait_assignments = is.clone();
        if let Some(rt) = &resource_type {
            extend_unique(&mut trait_assignments, rt.is.iter().cloned());
        }
        let traits: Vec<TraitNode> = trait_assignments
            .iter()
            .filter_map(|a| self.env.specialize_trait(self.traits, a, &reserved, &at))
            .collect();

        let candidates = Candidates {
            method: method_raw.as_ref(),
            traits: traits.iter().map(|t| &t.raw).collect(),
            type_method: resource_type.as_ref().map(|rt| &rt.raw),
            type_level: resource_type.as_ref().map(|rt| &rt.level),
            resource: Some(data),
            parent: parent.map(|p| p as &dyn AttributeSource),
            root: Some(self.root as &dyn AttributeSource),
        };
        let mut attributes = candidates.attributes(ctx, method, &at);

        let display_name = candidates
            .first_string("displayName", &DISPLAY_NAME)
            .unwrap_or_else(|| segment.to_string());
        attributes.display_name = Some(display_name.clone());
        attributes.description = candidates.first_string("description", &DESCRIPTION);
        if attributes.protocols.is_empty() {
            attributes.protocols = self.root.scheme_protocol().into_iter().collect();
        }
        if method.is_none() {
            attributes.media_type = None;
        }

        let inherited_uri = parent.map(|p| p.attributes.uri_params.clone()).unwrap_or_default();
        attributes.uri_params = order_uri_parameters(
            &[path],
            reconcile(inherited_uri, std::mem::take(&mut attributes.uri_params)),
            &self.root.base_params,
        );
        attributes.base_uri_params = order_uri_parameters(
            &[self.root.base_uri.as_str()],
            std::mem::take(&mut attributes.base_uri_params),
            &self.root.base_params,
        );

        let security_schemes = self.security_schemes(&attributes.secured_by, &at);
        validate_attributes(ctx, &at, &attributes);

        ResourceNode {
            name: segment.to_string(),
            display_name,
            method: method.map(str::to_string),
            path: path.to_string(),
            absolute_uri: self.absolute_uri(path, &attributes.protocols),
            attributes,
            is,
            traits,
            type_assignment,
            resource_type,
            security_schemes,
            parent: parent_idx,
            raw: data.clone(),
        }
    }

    /// Substitutes the flattened type with the reserved and assigned
    /// parameters, then materialises it for `method`.
    fn specialize_type(
        &self,
        assignment: &Assignment,
        method: Option<&str>,
        reserved: &IndexMap<String, String>,
        at: &str,
    ) -> Option<ResourceTypeNode> {
        let name = assignment.name();
        let Some(flat) = self.types.flattened(name) else {
            self.env.ctx.diagnostics.record(
                DiagnosticKind::Reference,
                at,
                format!("resource type '{}' is not declared", name),
            );
            return None;
        };
        let mut params = reserved.clone();
        if let Some(own) = assignment.params() {
            params.extend(own.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        let ctx = self.env.ctx;
        let data = substitute_mapping(&flat.data, &params, ctx.tags, ctx.diagnostics, at);
        Some(self.env.resource_type_node(
            self.traits,
            name,
            method,
            &data,
            &flat.chain,
            reserved,
            at,
        ))
    }

    fn security_schemes(&self, secured_by: &[Assignment], at: &str) -> Vec<SecurityScheme> {
        secured_by
            .iter()
            .filter(|a| !a.is_unsecured())
            .filter_map(|a| match self.schemes.get(a.name()) {
                Some(scheme) => Some(scheme.clone()),
                None => {
                    self.env.ctx.diagnostics.record(
                        DiagnosticKind::Reference,
                        location(&[at, "securedBy"]),
                        format!("security scheme '{}' is not declared", a.name()),
                    );
                    None
                }
            })
            .collect()
    }

    /// Base URI plus path, with the scheme swapped for the first protocol the
    /// resource shares with the root (or its own first protocol).
    fn absolute_uri(&self, path: &str, protocols: &[String]) -> String {
        let uri = format!("{}{}", self.root.base_uri, path);
        let chosen = protocols
            .iter()
            .find(|p| self.root.protocols.iter().any(|r| r.eq_ignore_ascii_case(p)))
            .or_else(|| protocols.first());
        match (chosen, uri.split_once("://")) {
            (Some(proto), Some((_, rest))) => format!("{}://{}", proto.to_lowercase(), rest),
            _ => uri,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reserved_params() {
        let params = reserved_params("/users/{userId}/keys", Some("get"));
        assert_eq!(params["resourcePath"], "/users/{userId}/keys");
        assert_eq!(params["resourcePathName"], "keys");
        assert_eq!(params["methodName"], "get");

        let params = reserved_params("/users/{userId}", None);
        assert_eq!(params["resourcePathName"], "users");
        assert!(!params.contains_key("methodName"));
    }
}
