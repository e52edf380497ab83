//! # Template Registries
//!
//! Name-indexed tables of security schemes, traits and resource types, built
//! from the root sections in declaration order.
//!
//! Resource types may chain to a parent type through their own `type` key.
//! Chains are flattened once at build time; the flattened data is what
//! resources specialise later, so a resource never walks a chain itself.
//!
//! Template nodes may still hold `<<placeholders>>`, so they are never handed
//! to the validator. Only a resource's resolved attributes are.

use crate::error::DiagnosticKind;
use crate::raml::assign::{extend_unique, normalize_assignments, Assignment, AssignmentShape};
use crate::raml::context::ParseContext;
use crate::raml::inherit::{usage, AttributeSource, Candidates};
use crate::raml::models::{ResourceTypeNode, SecurityScheme, TraitNode};
use crate::raml::params::ParamFactory;
use crate::raml::substitute::substitute_mapping;
use crate::raml::merge::merge_mappings;
use crate::raml::value::{get, location, mapping_or_empty, named_entries, scalar_string, untag};
use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};

/// Reads a template body, recording anything that is not a mapping.
fn template_body(section: &str, name: &str, value: &Value, ctx: &ParseContext<'_>) -> Mapping {
    match untag(value) {
        Value::Mapping(map) => map.clone(),
        Value::Null => Mapping::new(),
        _ => {
            ctx.diagnostics.record(
                DiagnosticKind::Shape,
                location(&[section, name]),
                "template body must be a mapping",
            );
            Mapping::new()
        }
    }
}

/// Declared security schemes.
#[derive(Debug, Clone, Default)]
pub struct SecuritySchemeRegistry {
    schemes: IndexMap<String, SecurityScheme>,
}

impl SecuritySchemeRegistry {
    /// Builds every scheme under `securitySchemes`.
    pub fn build(root: &Mapping, ctx: &ParseContext<'_>) -> Self {
        let factory = ParamFactory::new(ctx);
        let schemes = named_entries(root.get("securitySchemes"), "securitySchemes", ctx.diagnostics)
            .into_iter()
            .map(|(name, raw)| {
                let scheme = factory.security_scheme(&name, &raw);
                (name, scheme)
            })
            .collect();
        Self { schemes }
    }

    /// The scheme called `name`.
    pub fn get(&self, name: &str) -> Option<&SecurityScheme> {
        self.schemes.get(name)
    }

    /// Schemes in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &SecurityScheme> {
        self.schemes.values()
    }

    /// Number of schemes.
    pub fn len(&self) -> usize {
        self.schemes.len()
    }

    /// True when no scheme is declared.
    pub fn is_empty(&self) -> bool {
        self.schemes.is_empty()
    }
}

/// What template construction needs besides the data.
pub struct TemplateEnv<'c, 'a> {
    /// Parse context.
    pub ctx: &'c ParseContext<'a>,
    /// Root defaults.
    pub root: &'c dyn AttributeSource,
}

impl TemplateEnv<'_, '_> {
    /// Builds a trait node from (possibly substituted) trait data.
    pub fn trait_node(&self, name: &str, raw: Mapping, at: &str) -> TraitNode {
        let attributes = {
            let candidates = Candidates {
                method: Some(&raw),
                root: Some(self.root),
                ..Default::default()
            };
            candidates.attributes(self.ctx, None, at)
        };
        TraitNode {
            name: name.to_string(),
            usage: usage(&raw),
            raw,
            attributes,
        }
    }

    /// Looks up `assignment` in `traits` and specialises it with `reserved`
    /// plus the assignment's own parameters.
    pub fn specialize_trait(
        &self,
        traits: &TraitRegistry,
        assignment: &Assignment,
        reserved: &IndexMap<String, String>,
        at: &str,
    ) -> Option<TraitNode> {
        let name = assignment.name();
        let Some(declared) = traits.get(name) else {
            self.ctx.diagnostics.record(
                DiagnosticKind::Reference,
                at,
                format!("trait '{}' is not declared", name),
            );
            return None;
        };
        let mut params = reserved.clone();
        if let Some(own) = assignment.params() {
            params.extend(own.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        let raw = substitute_mapping(&declared.raw, &params, self.ctx.tags, self.ctx.diagnostics, at);
        Some(self.trait_node(name, raw, at))
    }

    /// Materialises one node of resource type `name` from flattened
    /// (possibly substituted) data.
    ///
    /// `method` selects the `method` or `method?` entry; everything that is
    /// not a method becomes the type-level data.
    #[allow(clippy::too_many_arguments)]
    pub fn resource_type_node(
        &self,
        traits: &TraitRegistry,
        name: &str,
        method: Option<&str>,
        data: &Mapping,
        chain: &[String],
        reserved: &IndexMap<String, String>,
        at: &str,
    ) -> ResourceTypeNode {
        let config = self.ctx.config;
        let mut method_form = None;
        let mut optional = false;
        let mut level = Mapping::new();
        for (k, v) in data {
            let key = scalar_string(k).unwrap_or_default();
            match config.method_key(&key) {
                Some((base, opt)) => {
                    if Some(base) == method && (method_form.is_none() || !opt) {
                        method_form = Some(untag(v).as_mapping().cloned().unwrap_or_default());
                        optional = opt;
                    }
                }
                None => {
                    level.insert(k.clone(), v.clone());
                }
            }
        }
        let raw = method_form.unwrap_or_default();

        let mut is = normalize_assignments(
            get(&level, "is"),
            AssignmentShape::List,
            &location(&[at, "is"]),
            self.ctx.diagnostics,
        );
        extend_unique(
            &mut is,
            normalize_assignments(
                get(&raw, "is"),
                AssignmentShape::List,
                &location(&[at, "is"]),
                self.ctx.diagnostics,
            ),
        );
        let type_traits: Vec<TraitNode> = is
            .iter()
            .filter_map(|a| self.specialize_trait(traits, a, reserved, at))
            .collect();

        let attributes = {
            let candidates = Candidates {
                method: Some(&raw),
                traits: type_traits.iter().map(|t| &t.raw).collect(),
                resource: Some(&level),
                root: Some(self.root),
                ..Default::default()
            };
            candidates.attributes(self.ctx, method, at)
        };

        ResourceTypeNode {
            name: name.to_string(),
            method: method.map(str::to_string),
            optional,
            usage: usage(&level),
            raw,
            level,
            chain: chain.to_vec(),
            is,
            attributes,
        }
    }
}

/// Declared traits.
#[derive(Debug, Clone, Default)]
pub struct TraitRegistry {
    traits: IndexMap<String, TraitNode>,
}

impl TraitRegistry {
    /// Builds every trait under `traits`, unsubstituted.
    pub fn build(root: &Mapping, env: &TemplateEnv<'_, '_>) -> Self {
        let traits = named_entries(root.get("traits"), "traits", env.ctx.diagnostics)
            .into_iter()
            .map(|(name, value)| {
                let raw = template_body("traits", &name, &value, env.ctx);
                let node = env.trait_node(&name, raw, &location(&["traits", &name]));
                (name, node)
            })
            .collect();
        Self { traits }
    }

    /// The trait called `name`.
    pub fn get(&self, name: &str) -> Option<&TraitNode> {
        self.traits.get(name)
    }

    /// Traits in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &TraitNode> {
        self.traits.values()
    }

    /// Number of traits.
    pub fn len(&self) -> usize {
        self.traits.len()
    }

    /// True when no trait is declared.
    pub fn is_empty(&self) -> bool {
        self.traits.is_empty()
    }
}

/// A resource type with its chain folded in.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatType {
    /// Own data unioned with every ancestor's.
    pub data: Mapping,
    /// Ancestor names, nearest first.
    pub chain: Vec<String>,
}

/// Declared resource types, one node per (type, method).
#[derive(Debug, Clone, Default)]
pub struct ResourceTypeRegistry {
    flattened: IndexMap<String, FlatType>,
    nodes: Vec<ResourceTypeNode>,
}

impl ResourceTypeRegistry {
    /// Builds every type under `resourceTypes`, flattening chains first.
    pub fn build(root: &Mapping, env: &TemplateEnv<'_, '_>, traits: &TraitRegistry) -> Self {
        let ctx = env.ctx;
        let declared: IndexMap<String, Mapping> =
            named_entries(root.get("resourceTypes"), "resourceTypes", ctx.diagnostics)
                .into_iter()
                .map(|(name, value)| {
                    let body = template_body("resourceTypes", &name, &value, ctx);
                    (name, body)
                })
                .collect();

        let mut flattener = Flattener {
            ctx,
            declared: &declared,
            done: IndexMap::new(),
        };
        for name in declared.keys() {
            flattener.flatten(name, &mut Vec::new());
        }
        let done = flattener.done;
        let flattened: IndexMap<String, FlatType> = declared
            .keys()
            .filter_map(|name| done.get(name).map(|flat| (name.clone(), flat.clone())))
            .collect();

        let no_params = IndexMap::new();
        let mut nodes = Vec::new();
        for (name, flat) in &flattened {
            let at = location(&["resourceTypes", name]);
            let methods = type_methods(ctx, &flat.data, &at);
            if methods.is_empty() {
                nodes.push(env.resource_type_node(traits, name, None, &flat.data, &flat.chain, &no_params, &at));
            }
            for (method, _) in methods {
                let here = location(&[&at, &method]);
                nodes.push(env.resource_type_node(
                    traits,
                    name,
                    Some(method.as_str()),
                    &flat.data,
                    &flat.chain,
                    &no_params,
                    &here,
                ));
            }
        }
        tracing::debug!(types = flattened.len(), nodes = nodes.len(), "resource types materialised");
        Self { flattened, nodes }
    }

    /// Every node materialised for `name`.
    pub fn get<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ResourceTypeNode> + 'a {
        self.nodes.iter().filter(move |n| n.name == name)
    }

    /// The node for `name` bound to `method`.
    pub fn node(&self, name: &str, method: Option<&str>) -> Option<&ResourceTypeNode> {
        self.nodes
            .iter()
            .find(|n| n.name == name && n.method.as_deref() == method)
    }

    /// Flattened data for `name`.
    pub fn flattened(&self, name: &str) -> Option<&FlatType> {
        self.flattened.get(name)
    }

    /// True when `name` is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.flattened.contains_key(name)
    }

    /// Methods a resource of type `name` gets even when it declares none.
    ///
    /// Optional (`?`) methods only apply when the resource declares them.
    pub fn implied_methods(&self, name: &str) -> Vec<String> {
        self.get(name)
            .filter(|n| !n.optional)
            .filter_map(|n| n.method.clone())
            .collect()
    }

    /// All materialised nodes in declaration order.
    pub fn nodes(&self) -> &[ResourceTypeNode] {
        &self.nodes
    }

    /// Number of declared types.
    pub fn len(&self) -> usize {
        self.flattened.len()
    }

    /// True when no type is declared.
    pub fn is_empty(&self) -> bool {
        self.flattened.is_empty()
    }
}

/// Method keys in a flattened type, deduplicated by base name.
///
/// A `get?` key under a version that has no optional methods is recorded and
/// ignored.
pub(crate) fn type_methods(ctx: &ParseContext<'_>, data: &Mapping, at: &str) -> Vec<(String, bool)> {
    let mut methods: Vec<(String, bool)> = Vec::new();
    for key in data.keys().filter_map(scalar_string) {
        match ctx.config.method_key(&key) {
            Some((base, optional)) => {
                if !methods.iter().any(|(m, _)| m == base) {
                    methods.push((base.to_string(), optional));
                }
            }
            None => {
                if let Some(base) = key.strip_suffix('?') {
                    if ctx.config.is_method(base) {
                        ctx.diagnostics.record(
                            DiagnosticKind::Shape,
                            location(&[at, &key]),
                            "optional methods are not supported by this RAML version",
                        );
                    }
                }
            }
        }
    }
    methods
}

struct Flattener<'c, 'a> {
    ctx: &'c ParseContext<'a>,
    declared: &'c IndexMap<String, Mapping>,
    done: IndexMap<String, FlatType>,
}

impl Flattener<'_, '_> {
    fn flatten(&mut self, name: &str, stack: &mut Vec<String>) -> FlatType {
        if let Some(flat) = self.done.get(name) {
            return flat.clone();
        }
        let own = self.declared.get(name).cloned().unwrap_or_default();
        let at = location(&["resourceTypes", name]);
        let parent = normalize_assignments(
            get(&own, "type"),
            AssignmentShape::Single,
            &location(&[&at, "type"]),
            self.ctx.diagnostics,
        )
        .into_iter()
        .next();

        let flat = match parent {
            None => FlatType {
                data: own,
                chain: Vec::new(),
            },
            Some(parent) => self.chain_to(name, own, &parent, stack, &at),
        };
        self.done.insert(name.to_string(), flat.clone());
        flat
    }

    fn chain_to(
        &mut self,
        name: &str,
        own: Mapping,
        parent: &Assignment,
        stack: &mut Vec<String>,
        at: &str,
    ) -> FlatType {
        let parent_name = parent.name();
        let unchained = |data: Mapping| FlatType {
            data,
            chain: Vec::new(),
        };

        if parent_name == name || stack.iter().any(|s| s == parent_name) {
            let mut cycle = stack.clone();
            cycle.push(name.to_string());
            cycle.push(parent_name.to_string());
            self.ctx.diagnostics.record(
                DiagnosticKind::Cycle,
                at,
                format!("resource type chain loops: {}", cycle.join(" -> ")),
            );
            return unchained(own);
        }
        if !self.declared.contains_key(parent_name) {
            self.ctx.diagnostics.record(
                DiagnosticKind::Reference,
                at,
                format!("parent resource type '{}' is not declared", parent_name),
            );
            return unchained(own);
        }

        stack.push(name.to_string());
        let ancestor = self.flatten(parent_name, stack);
        stack.pop();

        // Cached ancestors carry their full chain.
        if let Some(max) = self.ctx.config.version_policy().max_type_chain {
            if ancestor.chain.len() + 1 > max {
                self.ctx.diagnostics.record(
                    DiagnosticKind::Shape,
                    at,
                    format!("resource type chain deeper than {} levels is cut here", max),
                );
                return unchained(own);
            }
        }

        let ancestor_data = match parent.params() {
            Some(params) => substitute_mapping(
                &ancestor.data,
                params,
                self.ctx.tags,
                self.ctx.diagnostics,
                at,
            ),
            None => ancestor.data,
        };
        let mut chain = vec![parent_name.to_string()];
        chain.extend(ancestor.chain);
        FlatType {
            data: chain_union(self.ctx, &own, &ancestor_data, at),
            chain,
        }
    }
}

/// Union of a child type over its parent.
///
/// Non-method keys are shallow: the child's value wins outright. A method
/// both sides declare (as `get` or `get?`) is deep-merged with the child's
/// form as the merge child, and the merged data is stored under the child's
/// key, so a concrete child `get` drops the parent's optional flag.
fn chain_union(ctx: &ParseContext<'_>, child: &Mapping, parent: &Mapping, at: &str) -> Mapping {
    let config = ctx.config;
    let child_methods: IndexMap<String, Value> = child
        .keys()
        .filter_map(|k| {
            let key = scalar_string(k)?;
            let (base, _) = config.method_key(&key)?;
            Some((base.to_string(), k.clone()))
        })
        .collect();
    let mut out = child.clone();
    for (k, v) in parent {
        let key = scalar_string(k).unwrap_or_default();
        if let Some((base, _)) = config.method_key(&key) {
            if let Some(child_key) = child_methods.get(base) {
                let own = mapping_or_empty(out.get(child_key));
                let inherited = mapping_or_empty(Some(v));
                let merged = merge_mappings(&own, &inherited, &location(&[at, base]), ctx.diagnostics);
                out.insert(child_key.clone(), Value::Mapping(merged));
                continue;
            }
        }
        if !out.contains_key(k) {
            out.insert(k.clone(), v.clone());
        }
    }
    out
}
