#![deny(missing_docs)]

//! # Attribute Validation
//!
//! The resolver hands every constructed attribute to a [`Validator`], which
//! appends zero or more diagnostics. Validators never abort construction.
//!
//! [`StructuralValidator`] covers the checks downstream consumers rely on:
//! - response codes must be numeric HTTP statuses;
//! - protocols must be among the configured ones;
//! - media types must look like `type/subtype`;
//! - documentation entries need both a title and content;
//! - parameter types must be known named-parameter types.

use crate::error::{DiagnosticKind, Diagnostics};
use crate::raml::models::{Body, Documentation, ParamKind, Parameter, Response, ResponseCode};

const PARAM_TYPES: [&str; 12] = [
    "string", "number", "integer", "date", "boolean", "file", "date-only", "time-only",
    "datetime-only", "datetime", "array", "object",
];

/// A constructed attribute offered for validation.
#[derive(Debug, Clone, Copy)]
pub enum Attribute<'a> {
    /// Resolved protocols.
    Protocols(&'a [String]),
    /// Resolved media type.
    MediaType(Option<&'a str>),
    /// Resolved named parameters.
    Parameters(ParamKind, &'a [Parameter]),
    /// Resolved bodies.
    Bodies(&'a [Body]),
    /// Resolved responses.
    Responses(&'a [Response]),
    /// Documentation entries.
    Documentation(&'a [Documentation]),
}

/// Checks constructed attributes.
pub trait Validator {
    /// Appends diagnostics for `attribute` found at `location`.
    fn validate(&self, location: &str, attribute: &Attribute<'_>, diagnostics: &Diagnostics);
}

/// Accepts everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopValidator;

impl Validator for NoopValidator {
    fn validate(&self, _location: &str, _attribute: &Attribute<'_>, _diagnostics: &Diagnostics) {}
}

/// Structural checks on resolved values.
#[derive(Debug, Clone)]
pub struct StructuralValidator {
    protocols: Vec<String>,
}

impl StructuralValidator {
    /// Creates a validator accepting the given protocols.
    pub fn new(protocols: Vec<String>) -> Self {
        Self { protocols }
    }
}

impl Default for StructuralValidator {
    fn default() -> Self {
        Self::new(vec!["HTTP".to_string(), "HTTPS".to_string()])
    }
}

impl Validator for StructuralValidator {
    fn validate(&self, location: &str, attribute: &Attribute<'_>, diagnostics: &Diagnostics) {
        match attribute {
            Attribute::Protocols(protocols) => {
                for proto in protocols.iter() {
                    if !self.protocols.iter().any(|p| p.eq_ignore_ascii_case(proto)) {
                        diagnostics.record(
                            DiagnosticKind::Validation,
                            location,
                            format!("unsupported protocol '{}'", proto),
                        );
                    }
                }
            }
            Attribute::MediaType(Some(media_type)) => {
                if !looks_like_media_type(media_type) {
                    diagnostics.record(
                        DiagnosticKind::Validation,
                        location,
                        format!("'{}' is not a valid media type", media_type),
                    );
                }
            }
            Attribute::MediaType(None) => {}
            Attribute::Parameters(_, params) => validate_parameters(params, location, diagnostics),
            Attribute::Bodies(bodies) => validate_bodies(bodies, location, diagnostics),
            Attribute::Responses(responses) => {
                for response in responses.iter() {
                    let context = format!("{}.{}", location, response.code);
                    match response.code {
                        ResponseCode::Code(code) if (100..=599).contains(&code) => {}
                        ResponseCode::Code(code) => diagnostics.record(
                            DiagnosticKind::Validation,
                            &context,
                            format!("response code {} is outside 100-599", code),
                        ),
                        ResponseCode::Other(ref key) => diagnostics.record(
                            DiagnosticKind::Validation,
                            &context,
                            format!("response code '{}' is not an integer", key),
                        ),
                    }
                    validate_parameters(&response.headers, &context, diagnostics);
                    validate_bodies(&response.body, &context, diagnostics);
                }
            }
            Attribute::Documentation(docs) => {
                for (idx, doc) in docs.iter().enumerate() {
                    if doc.title.trim().is_empty() || doc.content.trim().is_empty() {
                        diagnostics.record(
                            DiagnosticKind::Validation,
                            format!("{}[{}]", location, idx),
                            "documentation entries need a title and content",
                        );
                    }
                }
            }
        }
    }
}

fn validate_parameters(params: &[Parameter], location: &str, diagnostics: &Diagnostics) {
    for param in params {
        if !PARAM_TYPES.contains(&param.param_type.as_str()) {
            diagnostics.record(
                DiagnosticKind::Validation,
                format!("{}.{}", location, param.name),
                format!("unknown parameter type '{}'", param.param_type),
            );
        }
        if let (Some(min), Some(max)) = (param.min_length, param.max_length) {
            if min > max {
                diagnostics.record(
                    DiagnosticKind::Validation,
                    format!("{}.{}", location, param.name),
                    "minLength is greater than maxLength",
                );
            }
        }
    }
}

fn validate_bodies(bodies: &[Body], location: &str, diagnostics: &Diagnostics) {
    for body in bodies {
        if !looks_like_media_type(&body.mime_type) {
            diagnostics.record(
                DiagnosticKind::Validation,
                format!("{}.body", location),
                format!("'{}' is not a valid media type", body.mime_type),
            );
        }
        validate_parameters(&body.form_params, location, diagnostics);
    }
}

fn looks_like_media_type(value: &str) -> bool {
    match value.split_once('/') {
        Some((top, sub)) => {
            !top.is_empty() && !sub.is_empty() && !top.contains(char::is_whitespace) && !sub.contains(char::is_whitespace)
        }
        None => false,
    }
}
