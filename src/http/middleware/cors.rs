//! CORS method advertisement.

use axum::body::Body;
use axum::http::{header, HeaderValue, Method, Request};

use crate::http::handler::BoxHandler;
use crate::http::middleware::Middleware;
use crate::routing::context::current_router;

/// Sets `Access-Control-Allow-Methods` to every method declared by the
/// routes of the current router that match the request, when `OPTIONS` is
/// among them.
///
/// Relies on the current router being published in the request context,
/// so it does nothing when the router is omitted from the context.
pub fn cors_method_middleware() -> impl Middleware {
    |next: BoxHandler| -> BoxHandler {
        BoxHandler::from_fn(move |req: Request<Body>| {
            let next = next.clone();
            async move {
                let allow = allowed_methods(&req);
                let mut resp = next.call(req).await;
                if let Some(value) = allow {
                    resp.headers_mut()
                        .insert(header::ACCESS_CONTROL_ALLOW_METHODS, value);
                }
                resp
            }
        })
    }
}

fn allowed_methods(req: &Request<Body>) -> Option<HeaderValue> {
    let current = current_router(req)?;
    let methods = current.tree().matching_methods(current.id(), req)?;
    if !methods.contains(&Method::OPTIONS) {
        return None;
    }
    let joined = methods
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(",");
    HeaderValue::from_str(&joined).ok()
}
