//! Lexical path utilities.

use axum::http::Uri;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters escaped when a path is written back into a URI.
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Canonical form of `p`: rooted, no empty, `.` or `..` segments.
///
/// Purely lexical. A trailing slash on the input is kept, and the empty
/// path becomes `/`.
pub fn clean_path(p: &str) -> String {
    if p.is_empty() {
        return "/".to_string();
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in p.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let mut out = String::with_capacity(p.len() + 1);
    for segment in &segments {
        out.push('/');
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push('/');
    } else if p.ends_with('/') {
        out.push('/');
    }
    out
}

/// Percent-encode a decoded path for use in a URI.
pub fn encode_path(path: &str) -> String {
    utf8_percent_encode(path, PATH).to_string()
}

/// `uri` with its path replaced by the already-encoded `path`.
/// Scheme, authority and query are kept.
pub fn replace_uri_path(uri: &Uri, path: &str) -> String {
    let mut out = String::new();
    if let (Some(scheme), Some(authority)) = (uri.scheme_str(), uri.authority()) {
        out.push_str(scheme);
        out.push_str("://");
        out.push_str(authority.as_str());
    }
    out.push_str(path);
    if let Some(query) = uri.query() {
        out.push('?');
        out.push_str(query);
    }
    out
}
