//! Per-request context: matched route, router and variables.
//!
//! Values live in the request's extensions, so they travel with the request
//! through middleware and into the handler. Every lookup is `None` when the
//! value was never set.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::http::Request;

use crate::routing::route::Route;
use crate::routing::router::{RouteId, Router, RouterId, RouterNode};

/// The route that matched the request.
#[derive(Clone)]
pub struct CurrentRoute {
    tree: Arc<Router>,
    id: RouteId,
}

impl CurrentRoute {
    pub fn new(tree: Arc<Router>, id: RouteId) -> Self {
        Self { tree, id }
    }

    pub fn id(&self) -> RouteId {
        self.id
    }

    pub fn tree(&self) -> &Arc<Router> {
        &self.tree
    }

    pub fn route(&self) -> Option<&Route> {
        self.tree.route(self.id)
    }
}

impl fmt::Debug for CurrentRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurrentRoute").field("id", &self.id).finish()
    }
}

/// The router node that owns the matched route.
#[derive(Clone)]
pub struct CurrentRouter {
    tree: Arc<Router>,
    id: RouterId,
}

impl CurrentRouter {
    pub fn new(tree: Arc<Router>, id: RouterId) -> Self {
        Self { tree, id }
    }

    pub fn id(&self) -> RouterId {
        self.id
    }

    pub fn tree(&self) -> &Arc<Router> {
        &self.tree
    }

    pub fn node(&self) -> Option<&RouterNode> {
        self.tree.node(self.id)
    }
}

impl fmt::Debug for CurrentRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurrentRouter").field("id", &self.id).finish()
    }
}

/// Variables extracted by the match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteVars(pub HashMap<String, String>);

/// Route variables of the request, if any were set.
pub fn vars<B>(req: &Request<B>) -> Option<&HashMap<String, String>> {
    req.extensions().get::<RouteVars>().map(|v| &v.0)
}

/// Attach route variables, replacing any present. Handy for testing
/// handlers without a router.
pub fn set_url_vars<B>(mut req: Request<B>, vars: HashMap<String, String>) -> Request<B> {
    req.extensions_mut().insert(RouteVars(vars));
    req
}

pub fn current_route<B>(req: &Request<B>) -> Option<&CurrentRoute> {
    req.extensions().get::<CurrentRoute>()
}

pub fn current_router<B>(req: &Request<B>) -> Option<&CurrentRouter> {
    req.extensions().get::<CurrentRouter>()
}

pub(crate) fn set_current_route<B>(mut req: Request<B>, route: CurrentRoute) -> Request<B> {
    req.extensions_mut().insert(route);
    req
}

pub(crate) fn set_current_router<B>(mut req: Request<B>, router: CurrentRouter) -> Request<B> {
    req.extensions_mut().insert(router);
    req
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_absent_until_set() {
        let req = Request::builder().body(Body::default()).unwrap();
        assert!(vars(&req).is_none());
        assert!(current_route(&req).is_none());
        assert!(current_router(&req).is_none());

        let req = set_url_vars(req, HashMap::from([("id".to_string(), "7".to_string())]));
        assert_eq!(vars(&req).unwrap()["id"], "7");
    }

    #[test]
    fn test_current_route_resolves() {
        let mut router = Router::new();
        let id = router.new_route().path("/x").name("x").id();
        let tree = Arc::new(router);

        let req = Request::builder().body(Body::default()).unwrap();
        let req = set_current_route(req, CurrentRoute::new(Arc::clone(&tree), id));
        let req = set_current_router(req, CurrentRouter::new(tree, RouterId::ROOT));

        let route = current_route(&req).and_then(CurrentRoute::route).unwrap();
        assert_eq!(route.name(), Some("x"));
        assert!(current_router(&req).and_then(CurrentRouter::node).is_some());
    }
}
