#![deny(missing_docs)]

//! # Schema Loading
//!
//! Schema and example blobs are opaque to the resolver. They are handed to a
//! [`SchemaLoader`] and stored exactly as it returns them.

use serde_yaml::Value;

/// Result of loading a schema or example blob.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadedSchema {
    /// A blob that decoded into structured data.
    Structured(serde_json::Value),
    /// A blob kept as text (XML schemas, unparsable content, ...).
    Opaque(String),
}

impl LoadedSchema {
    /// The structured form, if the blob decoded.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            LoadedSchema::Structured(v) => Some(v),
            LoadedSchema::Opaque(_) => None,
        }
    }
}

/// Loads schema and example blobs.
pub trait SchemaLoader {
    /// Loads a raw blob.
    fn load(&self, raw: &Value) -> LoadedSchema;
}

/// Decodes JSON or YAML text and structured values; keeps everything else as
/// text.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultSchemaLoader;

impl SchemaLoader for DefaultSchemaLoader {
    fn load(&self, raw: &Value) -> LoadedSchema {
        match raw {
            Value::String(text) => load_text(text),
            Value::Tagged(tagged) => self.load(&tagged.value),
            other => match serde_json::to_value(other) {
                Ok(json) => LoadedSchema::Structured(json),
                Err(_) => LoadedSchema::Opaque(serde_yaml::to_string(other).unwrap_or_default()),
            },
        }
    }
}

fn load_text(text: &str) -> LoadedSchema {
    let trimmed = text.trim_start();
    if trimmed.starts_with('<') {
        return LoadedSchema::Opaque(text.to_string());
    }
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(text) {
        return LoadedSchema::Structured(json);
    }
    match serde_yaml::from_str::<serde_json::Value>(text) {
        Ok(json @ (serde_json::Value::Object(_) | serde_json::Value::Array(_))) => {
            LoadedSchema::Structured(json)
        }
        _ => LoadedSchema::Opaque(text.to_string()),
    }
}
