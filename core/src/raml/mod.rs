//! # RAML Resolution
//!
//! Turns a decoded RAML document into a [`RootNode`] whose resources carry
//! every attribute they inherit from traits, resource types, parents and the
//! root.
//!
//! The pieces, bottom-up:
//! - [`merge`]: recursive child-wins mapping merge.
//! - [`assign`]: normalisation of `is` / `type` / `securedBy` assignments.
//! - [`substitute`] and [`tags`]: `<<param | !tag>>` template substitution.
//! - [`inherit`]: per-attribute precedence and structural unions.
//! - [`params`]: typed parameter, body and response construction.
//! - [`registry`]: trait, resource type and security scheme tables.
//! - [`resources`]: the depth-first resource expansion.
//! - [`root`]: orchestration and the public entry points.

/// Recursive mapping merge.
pub mod merge;

/// Assignment normalisation.
pub mod assign;

/// Substitution tag functions.
pub mod tags;

/// Template parameter substitution.
pub mod substitute;

/// Resolved model types.
pub mod models;

/// Shared parse state.
pub mod context;

/// Attribute precedence.
pub mod inherit;

/// Typed parameter objects.
pub mod params;

/// Template registries.
pub mod registry;

/// Resource tree expansion.
pub mod resources;

/// Root orchestration.
pub mod root;

pub(crate) mod value;

pub use assign::{normalize_assignments, Assignment, AssignmentShape};
pub use merge::{merge_mappings, merge_values};
pub use models::{
    Attributes, Body, DescribedBy, Documentation, ParamKind, Parameter, ResourceNode,
    ResourceTypeNode, Response, ResponseCode, RootNode, SecurityScheme, TraitNode,
};
pub use registry::{ResourceTypeRegistry, SecuritySchemeRegistry, TraitRegistry};
pub use root::{parse_raml, parse_raml_str, RamlParser};
pub use tags::TagRegistry;
