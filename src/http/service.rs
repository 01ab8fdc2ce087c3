//! Tower service over a frozen route tree.
//!
//! # Responsibilities
//! - Run the dispatch decision for each request
//! - Publish route, router and variables into the request context
//! - Invoke the matched handler or the applicable fallback
//!
//! # Design Decisions
//! - The tree is shared via `Arc`; cloning the service is cheap
//! - Never fails: every outcome is a response (`Error = Infallible`)

use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;
use tower::Service;

use crate::http::handler::{method_not_allowed_handler, not_found_handler, redirect_response};
use crate::routing::context::{
    set_current_route, set_current_router, set_url_vars, CurrentRoute, CurrentRouter,
};
use crate::routing::{Dispatch, Router, RouterId};

/// Serves requests from a route tree.
#[derive(Debug, Clone)]
pub struct RouterService {
    tree: Arc<Router>,
}

impl RouterService {
    pub fn new(router: Router) -> Self {
        Self {
            tree: Arc::new(router),
        }
    }

    pub fn from_shared(tree: Arc<Router>) -> Self {
        Self { tree }
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.tree
    }

    /// Route and answer one request.
    pub async fn serve(&self, req: Request<Body>) -> Response {
        let (req, decision) = self.tree.dispatch(req);

        match decision {
            Dispatch::Matched(m) => {
                let (omit_route, omit_router) = self
                    .tree
                    .context_omissions(m.router.unwrap_or(RouterId::ROOT));

                let mut req = set_url_vars(req, m.vars);
                if let (Some(id), false) = (m.route, omit_route) {
                    req = set_current_route(req, CurrentRoute::new(Arc::clone(&self.tree), id));
                }
                if let (Some(id), false) = (m.router, omit_router) {
                    req = set_current_router(req, CurrentRouter::new(Arc::clone(&self.tree), id));
                }

                match m.handler {
                    Some(handler) => handler.call(req).await,
                    None => StatusCode::NOT_FOUND.into_response(),
                }
            }
            Dispatch::Redirect { location } => redirect_response(&location),
            Dispatch::MethodNotAllowed(m) => {
                let handler = m.handler.unwrap_or_else(method_not_allowed_handler);
                handler.call(req).await
            }
            Dispatch::NotFound(m) => {
                let handler = m.handler.unwrap_or_else(not_found_handler);
                handler.call(req).await
            }
        }
    }
}

impl From<Router> for RouterService {
    fn from(router: Router) -> Self {
        Self::new(router)
    }
}

impl Service<Request<Body>> for RouterService {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let this = self.clone();
        Box::pin(async move { Ok(this.serve(req).await) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::context::{current_route, vars};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_context_published_to_handler() {
        let mut router = Router::new();
        router
            .handle_fn("/items/{id}", |req: Request<Body>| async move {
                let name = current_route(&req)
                    .and_then(|c| c.route())
                    .and_then(|r| r.name())
                    .unwrap_or("-")
                    .to_string();
                let id = vars(&req).and_then(|v| v.get("id").cloned()).unwrap_or_default();
                format!("{name}:{id}")
            })
            .name("item");

        let svc = RouterService::new(router);
        let resp = svc
            .oneshot(Request::builder().uri("/items/9").body(Body::default()).unwrap())
            .await
            .unwrap();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"item:9");
    }

    #[tokio::test]
    async fn test_omit_route_from_context() {
        let mut router = Router::new();
        router.omit_route_from_context(true);
        router.handle_fn("/x", |req: Request<Body>| async move {
            if current_route(&req).is_some() {
                StatusCode::INTERNAL_SERVER_ERROR
            } else {
                StatusCode::OK
            }
        });

        let resp = RouterService::new(router)
            .serve(Request::builder().uri("/x").body(Body::default()).unwrap())
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_route_without_handler_is_not_found() {
        let mut router = Router::new();
        router.path("/bare");

        let resp = RouterService::new(router)
            .serve(Request::builder().uri("/bare").body(Body::default()).unwrap())
            .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
