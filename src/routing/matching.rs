//! Per-request match state.

use std::collections::HashMap;

use crate::http::handler::BoxHandler;
use crate::routing::error::MatchError;
use crate::routing::router::{RouteId, RouterId};

/// Result of one match attempt against a route tree.
#[derive(Debug, Clone, Default)]
pub struct RouteMatch {
    pub route: Option<RouteId>,
    /// Router node that owns the matched route (or supplied the fallback handler).
    pub router: Option<RouterId>,
    pub handler: Option<BoxHandler>,
    pub vars: HashMap<String, String>,
    /// Most specific reason the attempt failed, if it did.
    pub error: Option<MatchError>,
    /// First strict-slash redirect target seen during the scan.
    pub redirect: Option<String>,
}

impl RouteMatch {
    /// True when a route matched without any recorded failure.
    pub fn is_match(&self) -> bool {
        self.route.is_some() && self.error.is_none()
    }
}

/// Outcome of one route (or router node) evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MatchStatus {
    NoMatch,
    Matched,
    /// A subrouter supplied its own not-found or method-not-allowed handler.
    Fallback,
}

/// Final routing decision for a request.
#[derive(Debug)]
pub enum Dispatch {
    /// A route matched; carries the full match record.
    Matched(RouteMatch),
    /// Answer with a permanent redirect.
    Redirect { location: String },
    MethodNotAllowed(RouteMatch),
    NotFound(RouteMatch),
}

impl Dispatch {
    /// Short label used in logs and metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            Dispatch::Matched(_) => "matched",
            Dispatch::Redirect { .. } => "redirect",
            Dispatch::MethodNotAllowed(_) => "method_not_allowed",
            Dispatch::NotFound(_) => "not_found",
        }
    }
}
