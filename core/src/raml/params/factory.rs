//! # Parameter Object Factory
//!
//! Turns resolved raw attribute maps into typed objects: named parameters,
//! bodies, responses, documentation entries and security schemes.

use crate::error::DiagnosticKind;
use crate::raml::context::ParseContext;
use crate::raml::models::{
    Body, DescribedBy, Documentation, ParamKind, Parameter, Response, ResponseCode, SecurityScheme,
};
use crate::raml::value::{
    get, get_mapping, get_string, location, mapping_or_empty, scalar_string, string_list, untag,
};
use crate::schema::LoadedSchema;
use serde_yaml::{Mapping, Value};

/// Body keys that describe the default media type's body when no mime type
/// is given.
const MIMELESS_BODY_KEYS: [&str; 4] = ["schema", "example", "type", "formParameters"];

/// Builds typed objects from raw attribute maps.
pub struct ParamFactory<'c, 'a> {
    ctx: &'c ParseContext<'a>,
}

impl<'c, 'a> ParamFactory<'c, 'a> {
    /// Creates a factory bound to a parse context.
    pub fn new(ctx: &'c ParseContext<'a>) -> Self {
        Self { ctx }
    }

    /// One parameter per key of `raw`.
    ///
    /// Defaults: `required` is true only for URI parameters, `display_name`
    /// is the key, `type` is `string`, `repeat` is false. A `name?` key marks
    /// an optional parameter.
    ///
    /// `name` and `name?` declared side by side fold into one parameter at the
    /// first one's position: the plain declaration's facets win, and the
    /// parameter is optional unless that declaration sets `required`.
    pub fn parameters(&self, raw: &Mapping, kind: ParamKind, method: Option<&str>) -> Vec<Parameter> {
        let mut params: Vec<Parameter> = Vec::new();
        for (k, v) in raw {
            let Some(key) = scalar_string(k) else {
                continue;
            };
            let mut param = self.parameter(&key, v, kind, method);
            let Some(existing) = params.iter_mut().find(|p| p.name == param.name) else {
                params.push(param);
                continue;
            };
            if key.ends_with('?') {
                if !declares_required(&existing.raw) {
                    existing.required = false;
                }
            } else {
                if !declares_required(&param.raw) {
                    param.required = false;
                }
                *existing = param;
            }
        }
        params
    }

    /// Builds a single parameter from its declaration.
    pub fn parameter(&self, key: &str, value: &Value, kind: ParamKind, method: Option<&str>) -> Parameter {
        let (name, optional_key) = match key.strip_suffix('?') {
            Some(base) if kind != ParamKind::Uri => (base, true),
            _ => (key, false),
        };
        let mut param = Parameter::new(kind, name);
        param.raw = value.clone();
        if kind == ParamKind::Header {
            param.method = method.map(str::to_string);
        }
        if optional_key {
            param.required = false;
        }

        let declaration = match untag(value) {
            Value::Mapping(map) => Some(map),
            // 0.8 allows several alternative declarations; the first one wins
            Value::Sequence(items) => items.iter().find_map(|i| untag(i).as_mapping()),
            other => {
                if let Some(shorthand) = scalar_string(other) {
                    param.param_type = shorthand;
                }
                None
            }
        };
        let Some(map) = declaration else {
            return param;
        };

        if let Some(display_name) = get_string(map, "displayName") {
            param.display_name = display_name;
        }
        param.description = get_string(map, "description");
        if let Some(param_type) = get_string(map, "type") {
            param.param_type = param_type;
        }
        if let Some(required) = get(map, "required").and_then(Value::as_bool) {
            param.required = required;
        }
        if let Some(repeat) = get(map, "repeat").and_then(Value::as_bool) {
            param.repeat = repeat;
        }
        param.default = get(map, "default").cloned();
        param.example = get(map, "example").cloned();
        param.enum_values = get(map, "enum").and_then(Value::as_sequence).cloned();
        param.pattern = get_string(map, "pattern");
        param.min_length = get(map, "minLength").and_then(Value::as_u64);
        param.max_length = get(map, "maxLength").and_then(Value::as_u64);
        param.minimum = get(map, "minimum").and_then(Value::as_f64);
        param.maximum = get(map, "maximum").and_then(Value::as_f64);
        param
    }

    /// Bodies keyed by mime type.
    ///
    /// `schema` / `example` (and friends) given without a mime type describe
    /// the document default media type's body.
    pub fn bodies(&self, raw: &Mapping, method: Option<&str>, at: &str) -> Vec<Body> {
        let mut bodies = Vec::new();
        let mut mimeless = Mapping::new();
        for (k, v) in raw {
            let Some(key) = scalar_string(k) else {
                continue;
            };
            if self.ctx.config.is_media_type(&key) {
                bodies.push(self.body(&key, v, method));
            } else if MIMELESS_BODY_KEYS.contains(&key.as_str()) {
                mimeless.insert(k.clone(), v.clone());
            } else {
                self.ctx.diagnostics.record(
                    DiagnosticKind::Shape,
                    location(&[at, "body"]),
                    format!("'{}' is neither a media type nor a body facet", key),
                );
            }
        }
        if !mimeless.is_empty() {
            match self.ctx.media_type {
                Some(default) => bodies.push(self.body(default, &Value::Mapping(mimeless), method)),
                None => self.ctx.diagnostics.record(
                    DiagnosticKind::MissingRequired,
                    location(&[at, "body"]),
                    "body omits its media type but the document declares no mediaType",
                ),
            }
        }
        bodies
    }

    /// A body for one mime type.
    pub fn body(&self, mime_type: &str, value: &Value, method: Option<&str>) -> Body {
        let data = mapping_or_empty(Some(value));
        let schema = get(&data, "schema")
            .or_else(|| get(&data, "type"))
            .map(|raw| self.load_schema(raw));
        let example = get(&data, "example").map(|raw| self.ctx.schema_loader.load(raw));
        let form_params = get_mapping(&data, "formParameters")
            .map(|raw| self.parameters(raw, ParamKind::Form, method))
            .unwrap_or_default();
        Body {
            mime_type: mime_type.to_string(),
            schema,
            example,
            form_params,
            raw: value.clone(),
        }
    }

    fn load_schema(&self, raw: &Value) -> LoadedSchema {
        if let Some(name) = raw.as_str() {
            if let Some(named) = self.ctx.schemas.get(name.trim()) {
                return named.clone();
            }
        }
        self.ctx.schema_loader.load(raw)
    }

    /// Responses keyed by status code, in declaration order.
    pub fn responses(&self, raw: &Mapping, method: Option<&str>, at: &str) -> Vec<Response> {
        raw.iter()
            .filter_map(|(k, v)| {
                let key = scalar_string(k)?;
                Some(self.response(&key, v, method, at))
            })
            .collect()
    }

    /// A single response. Textual codes are coerced to integers when they
    /// parse; anything else is kept for the validator to flag.
    pub fn response(&self, key: &str, value: &Value, method: Option<&str>, at: &str) -> Response {
        let data = mapping_or_empty(Some(value));
        let code = ResponseCode::from_key(key);
        let here = location(&[at, "responses", key]);
        let headers = get_mapping(&data, "headers")
            .map(|raw| self.parameters(raw, ParamKind::Header, method))
            .unwrap_or_default();
        let body = get_mapping(&data, "body")
            .map(|raw| self.bodies(raw, method, &here))
            .unwrap_or_default();
        Response {
            code,
            description: get_string(&data, "description"),
            headers,
            body,
            method: method.map(str::to_string),
            raw: value.clone(),
        }
    }

    /// Documentation entries; the attribute must be a list.
    pub fn documentation(&self, value: Option<&Value>, at: &str) -> Vec<Documentation> {
        let Some(value) = value else {
            return Vec::new();
        };
        let Some(items) = untag(value).as_sequence() else {
            self.ctx.diagnostics.record(
                DiagnosticKind::Shape,
                location(&[at, "documentation"]),
                "documentation must be a list of {title, content} entries",
            );
            return Vec::new();
        };
        items
            .iter()
            .map(|item| {
                let entry = mapping_or_empty(Some(item));
                Documentation {
                    title: get_string(&entry, "title").unwrap_or_default(),
                    content: get_string(&entry, "content").unwrap_or_default(),
                }
            })
            .collect()
    }

    /// A security scheme; its `describedBy` block goes back through this
    /// factory.
    pub fn security_scheme(&self, name: &str, value: &Value) -> SecurityScheme {
        let data = mapping_or_empty(Some(value));
        let at = location(&["securitySchemes", name]);
        let described = get_mapping(&data, "describedBy").cloned().unwrap_or_default();
        let param_map = |kind: ParamKind| {
            get_mapping(&described, kind.attribute())
                .map(|raw| self.parameters(raw, kind, None))
                .unwrap_or_default()
        };
        let described_by = DescribedBy {
            headers: param_map(ParamKind::Header),
            query_params: param_map(ParamKind::Query),
            uri_params: param_map(ParamKind::Uri),
            form_params: param_map(ParamKind::Form),
            body: get_mapping(&described, "body")
                .map(|raw| self.bodies(raw, None, &at))
                .unwrap_or_default(),
            responses: get_mapping(&described, "responses")
                .map(|raw| self.responses(raw, None, &at))
                .unwrap_or_default(),
            media_type: get_string(&described, "mediaType"),
            protocols: string_list(get(&described, "protocols")),
            usage: get_string(&described, "usage"),
            documentation: self.documentation(get(&described, "documentation"), &at),
        };
        SecurityScheme {
            name: name.to_string(),
            scheme_type: get_string(&data, "type"),
            description: get_string(&data, "description"),
            settings: get(&data, "settings").cloned(),
            described_by,
            raw: value.clone(),
        }
    }
}

fn declares_required(raw: &Value) -> bool {
    untag(raw)
        .as_mapping()
        .is_some_and(|map| get(map, "required").is_some())
}
