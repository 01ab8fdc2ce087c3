//! Routing view over an incoming request.
//!
//! # Responsibilities
//! - Resolve scheme and host for relative (server-side) request URIs
//! - Percent-decode the path once, keep the escaped form alongside it
//! - Parse the query string once per match attempt
//!
//! # Design Decisions
//! - Borrowed view: matchers never see a mutable request
//! - Scheme defaults to `http` when the URI carries none
//! - Host is lowercased once here so host templates see one spelling

use std::borrow::Cow;

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, Uri};
use percent_encoding::percent_decode_str;

/// Everything a matcher may look at, computed once per request.
#[derive(Debug)]
pub struct RequestParts<'a> {
    request: &'a Request<Body>,
    scheme: String,
    host: String,
    path: String,
    query: Vec<(String, String)>,
}

impl<'a> RequestParts<'a> {
    pub fn new(request: &'a Request<Body>) -> Self {
        let uri = request.uri();

        let scheme = uri.scheme_str().unwrap_or("http").to_string();
        let host = match uri.authority() {
            Some(authority) => authority.as_str().to_ascii_lowercase(),
            None => request
                .headers()
                .get(header::HOST)
                .and_then(|h| h.to_str().ok())
                .unwrap_or_default()
                .to_ascii_lowercase(),
        };
        let path = decode_path(uri.path()).into_owned();
        let query = uri
            .query()
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default();

        Self {
            request,
            scheme,
            host,
            path,
            query,
        }
    }

    /// The underlying request, for custom matchers.
    pub fn request(&self) -> &'a Request<Body> {
        self.request
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn uri(&self) -> &Uri {
        self.request.uri()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Lowercased host including any port.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Percent-decoded path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path exactly as it appeared on the wire.
    pub fn raw_path(&self) -> &str {
        self.request.uri().path()
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// First value for `key`, if the key is present.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Percent-decode a path, replacing invalid UTF-8.
pub fn decode_path(path: &str) -> Cow<'_, str> {
    percent_decode_str(path).decode_utf8_lossy()
}
