//! # Parameter Objects
//!
//! Construction of typed parameters, bodies and responses, plus the rules for
//! reconciling inherited objects with a node's own.

pub mod factory;
pub mod uri;

pub use factory::ParamFactory;
pub use uri::{order_uri_parameters, template_placeholders};

use crate::raml::models::{Body, Parameter, Response};

/// Identity of an object within its list: parameter name, body mime type or
/// response code.
pub trait Discriminant {
    /// The key objects are matched on.
    fn discriminant(&self) -> String;
}

impl Discriminant for Parameter {
    fn discriminant(&self) -> String {
        self.name.clone()
    }
}

impl Discriminant for Body {
    fn discriminant(&self) -> String {
        self.mime_type.clone()
    }
}

impl Discriminant for Response {
    fn discriminant(&self) -> String {
        self.code.to_string()
    }
}

/// Inherited objects not overridden by an own object, followed by every own
/// object.
pub fn reconcile<T: Discriminant>(inherited: Vec<T>, own: Vec<T>) -> Vec<T> {
    let own_keys: Vec<String> = own.iter().map(Discriminant::discriminant).collect();
    inherited
        .into_iter()
        .filter(|item| !own_keys.contains(&item.discriminant()))
        .chain(own)
        .collect()
}

/// Folds an inherited response into an own response with the same code.
///
/// Own headers and bodies are reconciled over the inherited ones; a missing
/// description falls back to the inherited one.
pub fn merge_response(inherited: &Response, own: Response) -> Response {
    Response {
        description: own.description.or_else(|| inherited.description.clone()),
        headers: reconcile(inherited.headers.clone(), own.headers),
        body: reconcile(inherited.body.clone(), own.body),
        ..own
    }
}

/// Reconciles two response lists, folding same-code pairs with
/// [`merge_response`].
pub fn reconcile_responses(inherited: Vec<Response>, own: Vec<Response>) -> Vec<Response> {
    let own = own
        .into_iter()
        .map(|response| match inherited.iter().find(|i| i.code == response.code) {
            Some(base) => merge_response(base, response),
            None => response,
        })
        .collect();
    reconcile(inherited, own)
}
