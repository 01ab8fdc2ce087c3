//! Routing error definitions.
//!
//! # Design Decisions
//! - Registration errors are stored on the route and surface lazily
//! - Dispatch outcomes (not found, method mismatch) are `MatchError`s, never panics

use thiserror::Error;

/// Errors raised while registering a route or building a URL from it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// Malformed template: unbalanced braces, duplicate variable,
    /// capturing group, or an invalid embedded regex.
    #[error("bad template {template:?}: {reason}")]
    BadTemplate { template: String, reason: String },

    /// The name is already registered in the owning tree.
    #[error("route name {0:?} is already registered")]
    DuplicateName(String),

    /// The route already carries a name.
    #[error("route already has name {current:?}, can't set {requested:?}")]
    AlreadyNamed { current: String, requested: String },

    /// Method token rejected by the HTTP grammar.
    #[error("invalid method {0:?}")]
    InvalidMethod(String),

    /// Header name rejected by the HTTP grammar, or an invalid header regex.
    #[error("invalid header constraint {name:?}: {reason}")]
    InvalidHeader { name: String, reason: String },

    /// A declared variable has no value.
    #[error("missing route variable {0:?}")]
    MissingVariable(String),

    /// A supplied value violates the variable's constraint.
    #[error("variable {name:?} value {value:?} doesn't match, expected {pattern:?}")]
    VariableConstraint {
        name: String,
        value: String,
        pattern: String,
    },

    /// The route has no constraint of the requested kind.
    #[error("route doesn't have a {0}")]
    NoTemplate(&'static str),

    /// No metadata stored under the key.
    #[error("metadata key {0:?} not found")]
    MetadataKeyNotFound(String),

    /// The rendered parts do not form a valid URI.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl RouteError {
    pub(crate) fn bad_template(template: &str, reason: impl Into<String>) -> Self {
        Self::BadTemplate {
            template: template.to_string(),
            reason: reason.into(),
        }
    }
}

/// Why a request was not dispatched to a route.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    /// No route's structural constraints matched.
    #[error("no matching route was found")]
    NotFound,

    /// Structural constraints matched but no route allowed the method.
    #[error("method is not allowed")]
    MethodMismatch,

    /// Set by a custom matcher; carried through untouched.
    #[error("{0}")]
    Custom(String),
}
