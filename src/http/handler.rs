//! Handler abstraction invoked on a successful match.
//!
//! # Design Decisions
//! - Handlers are type-erased behind `Arc` so a route tree can be shared
//!   across worker tasks without cloning user state
//! - Any async closure returning `IntoResponse` is a handler

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::{json, Value};

use crate::routing::context::{current_route, vars};

/// Processes a request after routing.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, req: Request<Body>) -> BoxFuture<'static, Response>;
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + 'static,
{
    fn call(&self, req: Request<Body>) -> BoxFuture<'static, Response> {
        self(req).map(IntoResponse::into_response).boxed()
    }
}

/// Shared, type-erased handler.
#[derive(Clone)]
pub struct BoxHandler(Arc<dyn Handler>);

impl BoxHandler {
    pub fn new<H: Handler>(handler: H) -> Self {
        Self(Arc::new(handler))
    }

    /// Build from an async closure.
    pub fn from_fn<F, Fut, R>(f: F) -> Self
    where
        F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse + 'static,
    {
        Self::new(f)
    }

    pub fn call(&self, req: Request<Body>) -> BoxFuture<'static, Response> {
        self.0.call(req)
    }

    pub fn ptr_eq(&self, other: &BoxHandler) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<H: Handler> From<H> for BoxHandler {
    fn from(handler: H) -> Self {
        Self::new(handler)
    }
}

impl fmt::Debug for BoxHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BoxHandler")
    }
}

/// Empty-bodied response with the given status.
pub fn status_handler(status: StatusCode) -> BoxHandler {
    BoxHandler::from_fn(move |_req: Request<Body>| async move { status })
}

/// Default handler for unmatched requests.
pub fn not_found_handler() -> BoxHandler {
    status_handler(StatusCode::NOT_FOUND)
}

/// Default handler when only the method failed to match.
pub fn method_not_allowed_handler() -> BoxHandler {
    status_handler(StatusCode::METHOD_NOT_ALLOWED)
}

/// Permanent redirect to `location`.
pub fn redirect_response(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, value)]).into_response(),
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}

/// Handlers addressable by key from a route table.
///
/// - `ok`: empty 200
/// - `echo`: JSON with the method, path, matched route name and variables
pub fn builtin_handler(key: &str) -> Option<BoxHandler> {
    match key {
        "ok" => Some(status_handler(StatusCode::OK)),
        "echo" => Some(BoxHandler::from_fn(echo)),
        _ => None,
    }
}

async fn echo(req: Request<Body>) -> Json<Value> {
    let route = current_route(&req)
        .and_then(|c| c.route())
        .and_then(|r| r.name())
        .map(str::to_string);
    let vars = vars(&req).cloned().unwrap_or_default();
    Json(json!({
        "method": req.method().as_str(),
        "path": req.uri().path(),
        "route": route,
        "vars": vars,
    }))
}
