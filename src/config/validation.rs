//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check route names are unique across the whole tree
//! - Check templates compile and methods are valid tokens
//! - Reject conflicting route fields
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::{HeaderName, Method};
use thiserror::Error;

use crate::config::schema::{RouteConfig, RouterConfig};
use crate::routing::error::RouteError;
use crate::routing::template::{CompiledPattern, PatternKind, PatternOptions};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("duplicate route name {0:?}")]
    DuplicateName(String),

    #[error("route {route}: path {path:?} must start with '/'")]
    PathWithoutSlash { route: String, path: String },

    #[error("route {0}: path and path_prefix are mutually exclusive")]
    PathAndPrefix(String),

    #[error("route {0}: nested routes and handler are mutually exclusive")]
    HandlerAndRoutes(String),

    #[error("route {route}: {error}")]
    Template { route: String, error: RouteError },

    #[error("route {route}: invalid method {method:?}")]
    InvalidMethod { route: String, method: String },

    #[error("route {route}: invalid header name {header:?}")]
    InvalidHeader { route: String, header: String },

    #[error("invalid address {0:?}")]
    InvalidAddress(String),

    #[error("listener.request_timeout_secs must be greater than zero")]
    ZeroTimeout,
}

/// Validate the whole configuration.
pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    let mut names = HashSet::new();
    validate_routes(&config.routes, "routes", &mut names, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_routes(
    routes: &[RouteConfig],
    prefix: &str,
    names: &mut HashSet<String>,
    errors: &mut Vec<ValidationError>,
) {
    for (index, route) in routes.iter().enumerate() {
        let position = format!("{prefix}[{index}]");
        let label = route.label(&position);

        if let Some(name) = &route.name {
            if !names.insert(name.clone()) {
                errors.push(ValidationError::DuplicateName(name.clone()));
            }
        }
        if route.path.is_some() && route.path_prefix.is_some() {
            errors.push(ValidationError::PathAndPrefix(label.clone()));
        }
        if route.handler.is_some() && !route.routes.is_empty() {
            errors.push(ValidationError::HandlerAndRoutes(label.clone()));
        }

        let paths = [
            (route.path.as_deref(), PatternKind::Path),
            (route.path_prefix.as_deref(), PatternKind::Prefix),
        ];
        for (path, kind) in paths {
            let Some(path) = path else { continue };
            if !path.starts_with('/') {
                errors.push(ValidationError::PathWithoutSlash {
                    route: label.clone(),
                    path: path.to_string(),
                });
                continue;
            }
            check_template(path, kind, &label, errors);
        }
        if let Some(host) = &route.host {
            check_template(host, PatternKind::Host, &label, errors);
        }
        for (key, value) in &route.queries {
            check_template(&format!("{key}={value}"), PatternKind::Query, &label, errors);
        }

        for method in &route.methods {
            if Method::from_bytes(method.to_ascii_uppercase().as_bytes()).is_err() {
                errors.push(ValidationError::InvalidMethod {
                    route: label.clone(),
                    method: method.clone(),
                });
            }
        }
        for header in route.headers.keys() {
            if HeaderName::from_bytes(header.as_bytes()).is_err() {
                errors.push(ValidationError::InvalidHeader {
                    route: label.clone(),
                    header: header.clone(),
                });
            }
        }

        validate_routes(&route.routes, &format!("{position}.routes"), names, errors);
    }
}

fn check_template(
    template: &str,
    kind: PatternKind,
    route: &str,
    errors: &mut Vec<ValidationError>,
) {
    if let Err(error) = CompiledPattern::compile(template, kind, PatternOptions::default()) {
        errors.push(ValidationError::Template {
            route: route.to_string(),
            error,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(name: &str, path: &str) -> RouteConfig {
        RouteConfig {
            name: Some(name.to_string()),
            path: Some(path.to_string()),
            handler: Some("ok".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_config() {
        let config = RouterConfig {
            routes: vec![route("a", "/a"), route("b", "/b/{id:[0-9]+}")],
            ..Default::default()
        };
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut nested = route("a", "/inner");
        nested.methods = vec!["BAD METHOD".to_string()];

        let mut parent = route("parent", "/p");
        parent.path_prefix = Some("/p".to_string());
        parent.routes = vec![nested];

        let config = RouterConfig {
            routes: vec![route("a", "no-slash"), route("b", "/{id"), parent],
            ..Default::default()
        };
        let errors = validate_config(&config).unwrap_err();

        assert!(errors.contains(&ValidationError::DuplicateName("a".into())));
        assert!(errors.contains(&ValidationError::PathWithoutSlash {
            route: "a".into(),
            path: "no-slash".into()
        }));
        assert!(errors.contains(&ValidationError::PathAndPrefix("parent".into())));
        assert!(errors.contains(&ValidationError::HandlerAndRoutes("parent".into())));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::Template { route, .. } if route == "b")));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidMethod { .. })));
    }

    #[test]
    fn test_listener_settings() {
        let mut config = RouterConfig::default();
        config.listener.bind_address = "not an address".to_string();
        config.listener.request_timeout_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.contains(&ValidationError::ZeroTimeout));
    }
}
