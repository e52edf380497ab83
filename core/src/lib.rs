#![deny(missing_docs)]

//! # RAML Core
//!
//! Resolves RAML API descriptions into a fully inherited resource model.
//!
//! Traits, resource types (including chained ones), parent resources and
//! root defaults are folded into every resource node, so consumers such as
//! documentation renderers or client generators can read a node's headers,
//! parameters, bodies and responses without walking any inheritance
//! themselves.
//!
//! Problems are collected as diagnostics rather than aborting the parse; see
//! [`ParserConfig::validate`] for turning errors into a failed parse.

/// Shared error and diagnostic types.
pub mod error;

/// Parser configuration.
pub mod config;

/// Schema and example loading.
pub mod schema;

/// Attribute validation.
pub mod validation;

/// RAML resolution.
pub mod raml;

pub use config::{ParserConfig, RamlVersion, VersionPolicy};
pub use error::{AppError, AppResult, Diagnostic, DiagnosticKind, Diagnostics, InvalidRamlError, Severity};
pub use raml::{parse_raml, parse_raml_str, RamlParser, ResourceNode, RootNode};
pub use schema::{DefaultSchemaLoader, LoadedSchema, SchemaLoader};
pub use validation::{Attribute, NoopValidator, StructuralValidator, Validator};
