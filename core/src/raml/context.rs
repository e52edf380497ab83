//! # Parse Context
//!
//! Everything a builder needs besides the data it is building from: the
//! configuration, the shared diagnostics accumulator and the pluggable
//! collaborators. Passed by reference into every constructor.

use crate::config::ParserConfig;
use crate::error::Diagnostics;
use crate::raml::tags::TagRegistry;
use crate::schema::{LoadedSchema, SchemaLoader};
use crate::validation::{Attribute, Validator};
use indexmap::IndexMap;

/// Shared state for one parse.
pub struct ParseContext<'a> {
    /// Parser options.
    pub config: &'a ParserConfig,
    /// Append-only diagnostics accumulator.
    pub diagnostics: &'a Diagnostics,
    /// Substitution tag functions.
    pub tags: &'a TagRegistry,
    /// Loader for schema and example blobs.
    pub schema_loader: &'a dyn SchemaLoader,
    /// Validator invoked once per constructed attribute.
    pub validator: &'a dyn Validator,
    /// Document default media type.
    pub media_type: Option<&'a str>,
    /// Named schemas declared at the root.
    pub schemas: &'a IndexMap<String, LoadedSchema>,
}

impl ParseContext<'_> {
    /// Hands an attribute to the validator.
    pub fn validate(&self, location: &str, attribute: Attribute<'_>) {
        self.validator.validate(location, &attribute, self.diagnostics);
    }
}
