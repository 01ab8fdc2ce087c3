//! Route tree and dispatch policy.
//!
//! # Responsibilities
//! - Own every router node and route of one tree (arena, index links)
//! - Scan routes in registration order and pick the first full match
//! - Decide between redirect, method-not-allowed and not-found otherwise
//!
//! # Design Decisions
//! - Built single-threaded, then frozen behind `Arc` for serving
//! - Subrouters are nodes in the same arena, linked to their creating route
//! - One name registry per tree, so names are unique across subrouters
//!
//! # Data Flow
//! ```text
//! Request
//!     → dispatch (clean path: redirect GET/HEAD, rewrite others)
//!     → match_node(ROOT)
//!         → Route::match_request (matchers, strict slash, vars)
//!             → match_node(subrouter) ...
//!     → Matched | Redirect | MethodNotAllowed | NotFound
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Method, Request, Uri};
use axum::response::IntoResponse;
use tracing::debug;

use crate::http::handler::BoxHandler;
use crate::http::middleware::{apply_chain, Middleware, SharedMiddleware};
use crate::http::request::{decode_path, RequestParts};
use crate::observability::metrics;
use crate::routing::clean::{clean_path, encode_path, replace_uri_path};
use crate::routing::error::{MatchError, RouteError};
use crate::routing::matching::{Dispatch, MatchStatus, RouteMatch};
use crate::routing::route::{Route, RouteConf, RouteMut};

/// Index of a router node in its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouterId(pub(crate) usize);

impl RouterId {
    pub const ROOT: RouterId = RouterId(0);
}

/// Index of a route in its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteId(pub(crate) usize);

/// One router: the root or a subrouter.
pub struct RouterNode {
    routes: Vec<RouteId>,
    parent_route: Option<RouteId>,
    not_found: Option<BoxHandler>,
    method_not_allowed: Option<BoxHandler>,
    middlewares: Vec<SharedMiddleware>,
    omit_route_from_context: bool,
    omit_router_from_context: bool,
    pub(crate) conf: RouteConf,
}

impl RouterNode {
    fn root() -> Self {
        Self {
            routes: Vec::new(),
            parent_route: None,
            not_found: None,
            method_not_allowed: None,
            middlewares: Vec::new(),
            omit_route_from_context: false,
            omit_router_from_context: false,
            conf: RouteConf::default(),
        }
    }

    pub(crate) fn child(parent: RouteId, conf: RouteConf) -> Self {
        Self {
            parent_route: Some(parent),
            conf,
            ..Self::root()
        }
    }

    /// Routes in registration order.
    pub fn routes(&self) -> &[RouteId] {
        &self.routes
    }

    /// Route that created this subrouter; `None` for the root.
    pub fn parent_route(&self) -> Option<RouteId> {
        self.parent_route
    }

    pub fn not_found_handler(&self) -> Option<&BoxHandler> {
        self.not_found.as_ref()
    }

    pub fn method_not_allowed_handler(&self) -> Option<&BoxHandler> {
        self.method_not_allowed.as_ref()
    }

    pub fn strict_slash(&self) -> bool {
        self.conf.strict_slash
    }

    pub fn skip_clean(&self) -> bool {
        self.conf.skip_clean
    }

    pub fn use_encoded_path(&self) -> bool {
        self.conf.use_encoded_path
    }

    pub fn omit_route_from_context(&self) -> bool {
        self.omit_route_from_context
    }

    pub fn omit_router_from_context(&self) -> bool {
        self.omit_router_from_context
    }
}

impl fmt::Debug for RouterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterNode")
            .field("routes", &self.routes)
            .field("parent_route", &self.parent_route)
            .field("middlewares", &self.middlewares.len())
            .field("conf", &self.conf)
            .finish_non_exhaustive()
    }
}

/// A route tree.
pub struct Router {
    nodes: Vec<RouterNode>,
    pub(crate) routes: Vec<Route>,
    pub(crate) names: HashMap<String, RouteId>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("nodes", &self.nodes)
            .field("routes", &self.routes)
            .field("names", &self.names)
            .finish()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            nodes: vec![RouterNode::root()],
            routes: Vec::new(),
            names: HashMap::new(),
        }
    }

    /// Mutable handle to the root router.
    pub fn root(&mut self) -> RouterMut<'_> {
        RouterMut::new(self, RouterId::ROOT)
    }

    /// Mutable handle to any router node of this tree.
    pub fn at(&mut self, id: RouterId) -> Option<RouterMut<'_>> {
        (id.0 < self.nodes.len()).then(|| RouterMut::new(self, id))
    }

    /// Mutable handle to an existing route.
    pub fn route_mut(&mut self, id: RouteId) -> Option<RouteMut<'_>> {
        (id.0 < self.routes.len()).then(|| RouteMut::new(self, id))
    }

    pub fn route(&self, id: RouteId) -> Option<&Route> {
        self.routes.get(id.0)
    }

    pub fn node(&self, id: RouterId) -> Option<&RouterNode> {
        self.nodes.get(id.0)
    }

    /// `(omit_route, omit_router)` for requests answered by `id`. A flag set
    /// on the node or any of its ancestors applies.
    pub fn context_omissions(&self, id: RouterId) -> (bool, bool) {
        let (mut route, mut router) = (false, false);
        let mut current = self.node(id);
        while let Some(node) = current {
            route |= node.omit_route_from_context;
            router |= node.omit_router_from_context;
            current = node
                .parent_route
                .and_then(|r| self.route(r))
                .and_then(|r| self.node(r.owner()));
        }
        (route, router)
    }

    /// Route registered under `name`, anywhere in the tree.
    pub fn get(&self, name: &str) -> Option<&Route> {
        self.names.get(name).and_then(|id| self.route(*id))
    }

    /// Every deferred registration error, in route order.
    pub fn errors(&self) -> Vec<(RouteId, &RouteError)> {
        self.routes
            .iter()
            .filter_map(|r| r.error().map(|e| (r.id(), e)))
            .collect()
    }

    /// Visit every route depth-first in registration order. The callback
    /// gets the route, its owning node and the chain of ancestor routes.
    pub fn walk<F, E>(&self, mut f: F) -> Result<(), E>
    where
        F: FnMut(&Route, RouterId, &[RouteId]) -> Result<(), E>,
    {
        let mut ancestors = Vec::new();
        self.walk_node(RouterId::ROOT, &mut ancestors, &mut f)
    }

    fn walk_node<F, E>(
        &self,
        node: RouterId,
        ancestors: &mut Vec<RouteId>,
        f: &mut F,
    ) -> Result<(), E>
    where
        F: FnMut(&Route, RouterId, &[RouteId]) -> Result<(), E>,
    {
        for &id in &self.nodes[node.0].routes {
            let route = &self.routes[id.0];
            f(route, node, ancestors)?;
            if let Some(sub) = route.subrouter() {
                ancestors.push(id);
                self.walk_node(sub, ancestors, f)?;
                ancestors.pop();
            }
        }
        Ok(())
    }

    pub(crate) fn push_route(&mut self, node: RouterId) -> RouteId {
        let id = RouteId(self.routes.len());
        let conf = self.nodes[node.0].conf.clone();
        self.routes.push(Route::new(id, node, conf));
        self.nodes[node.0].routes.push(id);
        id
    }

    pub(crate) fn push_node(&mut self, node: RouterNode) -> RouterId {
        let id = RouterId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn new_route(&mut self) -> RouteMut<'_> {
        let id = self.push_route(RouterId::ROOT);
        RouteMut::new(self, id)
    }

    pub fn handle(&mut self, path: &str, handler: impl Into<BoxHandler>) -> RouteMut<'_> {
        self.new_route().path(path).handler(handler)
    }

    pub fn handle_fn<F, Fut, R>(&mut self, path: &str, f: F) -> RouteMut<'_>
    where
        F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse + 'static,
    {
        self.new_route().path(path).handler_fn(f)
    }

    pub fn path(&mut self, template: &str) -> RouteMut<'_> {
        self.new_route().path(template)
    }

    pub fn path_prefix(&mut self, template: &str) -> RouteMut<'_> {
        self.new_route().path_prefix(template)
    }

    pub fn host(&mut self, template: &str) -> RouteMut<'_> {
        self.new_route().host(template)
    }

    pub fn methods(&mut self, methods: &[&str]) -> RouteMut<'_> {
        self.new_route().methods(methods)
    }

    pub fn schemes(&mut self, schemes: &[&str]) -> RouteMut<'_> {
        self.new_route().schemes(schemes)
    }

    pub fn headers(&mut self, pairs: &[(&str, &str)]) -> RouteMut<'_> {
        self.new_route().headers(pairs)
    }

    pub fn queries(&mut self, pairs: &[(&str, &str)]) -> RouteMut<'_> {
        self.new_route().queries(pairs)
    }

    pub fn use_middleware(&mut self, middleware: impl Middleware) -> &mut Self {
        self.root().use_middleware(middleware);
        self
    }

    pub fn not_found_handler(&mut self, handler: impl Into<BoxHandler>) -> &mut Self {
        self.root().not_found_handler(handler);
        self
    }

    pub fn method_not_allowed_handler(&mut self, handler: impl Into<BoxHandler>) -> &mut Self {
        self.root().method_not_allowed_handler(handler);
        self
    }

    pub fn strict_slash(&mut self, value: bool) -> &mut Self {
        self.root().strict_slash(value);
        self
    }

    pub fn skip_clean(&mut self, value: bool) -> &mut Self {
        self.root().skip_clean(value);
        self
    }

    pub fn use_encoded_path(&mut self) -> &mut Self {
        self.root().use_encoded_path();
        self
    }

    pub fn omit_route_from_context(&mut self, value: bool) -> &mut Self {
        self.root().omit_route_from_context(value);
        self
    }

    pub fn omit_router_from_context(&mut self, value: bool) -> &mut Self {
        self.root().omit_router_from_context(value);
        self
    }

    /// Match without dispatching. A failed attempt always carries an error.
    pub fn match_request(&self, req: &Request<Body>) -> RouteMatch {
        let parts = RequestParts::new(req);
        let mut m = RouteMatch::default();
        let status = self.match_node(RouterId::ROOT, &parts, &mut m);
        if status == MatchStatus::NoMatch && m.error.is_none() {
            m.error = Some(MatchError::NotFound);
        }
        m
    }

    /// Scan one node's routes.
    pub(crate) fn match_node(
        &self,
        id: RouterId,
        req: &RequestParts<'_>,
        m: &mut RouteMatch,
    ) -> MatchStatus {
        let node = &self.nodes[id.0];
        // Failures recorded before entering this node belong to the caller.
        let inherited = m.error.take();

        for route in &node.routes {
            match self.routes[route.0].match_request(self, req, m) {
                MatchStatus::Matched => {
                    m.router.get_or_insert(id);
                    if let Some(handler) = m.handler.take() {
                        m.handler = Some(apply_chain(&node.middlewares, handler));
                    }
                    return MatchStatus::Matched;
                }
                MatchStatus::Fallback => return MatchStatus::Fallback,
                MatchStatus::NoMatch => {}
            }
        }

        if m.redirect.is_none() {
            if m.error == Some(MatchError::MethodMismatch) {
                if let Some(handler) = &node.method_not_allowed {
                    m.handler = Some(handler.clone());
                    m.router = Some(id);
                    return MatchStatus::Fallback;
                }
            } else if let Some(handler) = &node.not_found {
                m.handler = Some(handler.clone());
                m.router = Some(id);
                m.error.get_or_insert(MatchError::NotFound);
                return MatchStatus::Fallback;
            }
        }

        if m.error.is_none() {
            m.error = inherited;
        }
        MatchStatus::NoMatch
    }

    /// Methods declared by the routes of `node` that structurally match
    /// `req`. `None` when one of those routes declares no methods.
    pub fn matching_methods(&self, node: RouterId, req: &Request<Body>) -> Option<Vec<Method>> {
        let parts = RequestParts::new(req);
        let mut methods = Vec::new();
        for id in &self.nodes.get(node.0)?.routes {
            let route = &self.routes[id.0];
            let mut m = RouteMatch::default();
            let status = route.match_request(self, &parts, &mut m);
            if status == MatchStatus::Matched || m.error == Some(MatchError::MethodMismatch) {
                methods.extend_from_slice(route.methods().ok()?);
            }
        }
        Some(methods)
    }

    /// Route a request: path cleaning, then matching, then the fallback
    /// decision. Returns the request (possibly with a cleaned path).
    pub fn dispatch(&self, mut req: Request<Body>) -> (Request<Body>, Dispatch) {
        let root = &self.nodes[RouterId::ROOT.0].conf;

        if !root.skip_clean {
            let raw = req.uri().path();
            let path = if root.use_encoded_path {
                raw.to_string()
            } else {
                decode_path(raw).into_owned()
            };
            let cleaned = clean_path(&path);
            if cleaned != path {
                let encoded = if root.use_encoded_path {
                    cleaned
                } else {
                    encode_path(&cleaned)
                };
                let target = replace_uri_path(req.uri(), &encoded);
                if req.method() == Method::GET || req.method() == Method::HEAD {
                    debug!(path = %path, location = %target, "redirecting to clean path");
                    metrics::record_dispatch("clean_redirect");
                    return (req, Dispatch::Redirect { location: target });
                }
                match target.parse::<Uri>() {
                    Ok(uri) => *req.uri_mut() = uri,
                    Err(e) => debug!(error = %e, "cleaned path is not a valid uri"),
                }
            }
        }

        let start = Instant::now();
        let (status, mut m) = {
            let parts = RequestParts::new(&req);
            let mut m = RouteMatch::default();
            (self.match_node(RouterId::ROOT, &parts, &mut m), m)
        };
        metrics::record_match_duration(start.elapsed());

        let decision = if status == MatchStatus::Matched {
            Dispatch::Matched(m)
        } else if let Some(location) = m.redirect.take() {
            Dispatch::Redirect { location }
        } else if m.error == Some(MatchError::MethodMismatch) {
            Dispatch::MethodNotAllowed(m)
        } else {
            m.error.get_or_insert(MatchError::NotFound);
            Dispatch::NotFound(m)
        };

        debug!(
            method = %req.method(),
            path = %req.uri().path(),
            outcome = decision.outcome(),
            route = self.decision_route_name(&decision).unwrap_or("-"),
            "dispatch decision"
        );
        metrics::record_dispatch(decision.outcome());

        (req, decision)
    }

    fn decision_route_name(&self, decision: &Dispatch) -> Option<&str> {
        match decision {
            Dispatch::Matched(m) => m.route.and_then(|id| self.route(id)).and_then(Route::name),
            _ => None,
        }
    }
}

/// Mutable handle to one router node.
pub struct RouterMut<'a> {
    tree: &'a mut Router,
    id: RouterId,
}

impl<'a> RouterMut<'a> {
    pub(crate) fn new(tree: &'a mut Router, id: RouterId) -> Self {
        Self { tree, id }
    }

    pub fn id(&self) -> RouterId {
        self.id
    }

    fn node(&mut self) -> &mut RouterNode {
        &mut self.tree.nodes[self.id.0]
    }

    /// Register an empty route on this node.
    pub fn new_route(&mut self) -> RouteMut<'_> {
        let id = self.tree.push_route(self.id);
        RouteMut::new(self.tree, id)
    }

    pub fn handle(&mut self, path: &str, handler: impl Into<BoxHandler>) -> RouteMut<'_> {
        self.new_route().path(path).handler(handler)
    }

    pub fn handle_fn<F, Fut, R>(&mut self, path: &str, f: F) -> RouteMut<'_>
    where
        F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse + 'static,
    {
        self.new_route().path(path).handler_fn(f)
    }

    pub fn path(&mut self, template: &str) -> RouteMut<'_> {
        self.new_route().path(template)
    }

    pub fn path_prefix(&mut self, template: &str) -> RouteMut<'_> {
        self.new_route().path_prefix(template)
    }

    pub fn host(&mut self, template: &str) -> RouteMut<'_> {
        self.new_route().host(template)
    }

    pub fn methods(&mut self, methods: &[&str]) -> RouteMut<'_> {
        self.new_route().methods(methods)
    }

    pub fn schemes(&mut self, schemes: &[&str]) -> RouteMut<'_> {
        self.new_route().schemes(schemes)
    }

    pub fn headers(&mut self, pairs: &[(&str, &str)]) -> RouteMut<'_> {
        self.new_route().headers(pairs)
    }

    pub fn queries(&mut self, pairs: &[(&str, &str)]) -> RouteMut<'_> {
        self.new_route().queries(pairs)
    }

    /// Middleware for every route of this node, first registered outermost.
    pub fn use_middleware(&mut self, middleware: impl Middleware) -> &mut Self {
        self.node().middlewares.push(Arc::new(middleware));
        self
    }

    pub fn not_found_handler(&mut self, handler: impl Into<BoxHandler>) -> &mut Self {
        self.node().not_found = Some(handler.into());
        self
    }

    pub fn method_not_allowed_handler(&mut self, handler: impl Into<BoxHandler>) -> &mut Self {
        self.node().method_not_allowed = Some(handler.into());
        self
    }

    /// Applies to routes created after the call.
    pub fn strict_slash(&mut self, value: bool) -> &mut Self {
        self.node().conf.strict_slash = value;
        self
    }

    pub fn skip_clean(&mut self, value: bool) -> &mut Self {
        self.node().conf.skip_clean = value;
        self
    }

    pub fn use_encoded_path(&mut self) -> &mut Self {
        self.node().conf.use_encoded_path = true;
        self
    }

    pub fn omit_route_from_context(&mut self, value: bool) -> &mut Self {
        self.node().omit_route_from_context = value;
        self
    }

    pub fn omit_router_from_context(&mut self, value: bool) -> &mut Self {
        self.node().omit_router_from_context = value;
        self
    }
}
