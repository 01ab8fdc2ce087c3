//! Shared utilities for integration testing.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use routemux::{BoxHandler, RouterService};

/// Build a request with an empty body.
#[allow(dead_code)]
pub fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Build a request carrying the given headers.
#[allow(dead_code)]
pub fn request_with_headers(method: &str, uri: &str, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::empty()).unwrap()
}

/// Handler answering 200 with `label` as the body.
#[allow(dead_code)]
pub fn tagged(label: &'static str) -> BoxHandler {
    BoxHandler::from_fn(move |_req: Request<Body>| async move { label })
}

/// Read a response body to a string.
#[allow(dead_code)]
pub async fn body_string(resp: Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Serve one request and return its status and body.
#[allow(dead_code)]
pub async fn send(service: &RouterService, req: Request<Body>) -> (StatusCode, String) {
    let resp = service.serve(req).await;
    let status = resp.status();
    (status, body_string(resp).await)
}
