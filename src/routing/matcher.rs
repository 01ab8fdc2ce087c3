//! Route matching predicates.
//!
//! # Responsibilities
//! - Match host, path and query against compiled templates
//! - Match method, scheme and header constraints
//! - Wrap caller-supplied predicates
//!
//! # Design Decisions
//! - Host and scheme matching are case-insensitive (RFC 9110)
//! - Method matching is case-sensitive; tokens are uppercased at registration
//! - Every matcher reports a `MatcherKey`; a later matcher with an equal
//!   overridable key replaces an earlier one on the same route at match time

use std::fmt;
use std::sync::Arc;

use axum::http::{HeaderName, Method};
use regex::Regex;

use crate::http::request::RequestParts;
use crate::routing::matching::RouteMatch;
use crate::routing::template::{CompiledPattern, PatternKind};

/// Identifies what a matcher constrains, for same-kind override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatcherKey {
    Path,
    Host,
    Method,
    Scheme,
    Header(HeaderName),
    Query(String),
    Custom,
}

impl MatcherKey {
    /// Path templates concatenate and custom predicates are opaque,
    /// so neither is ever replaced.
    pub fn is_overridable(&self) -> bool {
        !matches!(self, MatcherKey::Path | MatcherKey::Custom)
    }
}

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &RequestParts<'_>, m: &mut RouteMatch) -> bool;

    fn key(&self) -> MatcherKey {
        MatcherKey::Custom
    }
}

/// Pick the slice of the request a compiled pattern runs against.
pub(crate) fn pattern_subject<'r>(
    pattern: &CompiledPattern,
    req: &'r RequestParts<'_>,
) -> Option<&'r str> {
    match pattern.kind() {
        PatternKind::Path | PatternKind::Prefix => Some(if pattern.options().use_encoded_path {
            req.raw_path()
        } else {
            req.path()
        }),
        PatternKind::Host => {
            let host = req.host();
            if pattern.wildcard_host_port() {
                Some(host.split_once(':').map_or(host, |(h, _)| h))
            } else {
                Some(host)
            }
        }
        PatternKind::Query => req.query_value(pattern.query_key()?),
    }
}

/// Matches a host, path, prefix or query template.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    pattern: Arc<CompiledPattern>,
}

impl PatternMatcher {
    pub fn new(pattern: Arc<CompiledPattern>) -> Self {
        Self { pattern }
    }

    pub fn pattern(&self) -> &Arc<CompiledPattern> {
        &self.pattern
    }
}

impl Matcher for PatternMatcher {
    fn matches(&self, req: &RequestParts<'_>, _m: &mut RouteMatch) -> bool {
        pattern_subject(&self.pattern, req).is_some_and(|s| self.pattern.is_match(s))
    }

    fn key(&self) -> MatcherKey {
        match self.pattern.kind() {
            PatternKind::Path | PatternKind::Prefix => MatcherKey::Path,
            PatternKind::Host => MatcherKey::Host,
            PatternKind::Query => {
                MatcherKey::Query(self.pattern.query_key().unwrap_or_default().to_string())
            }
        }
    }
}

/// Matches the request method against a set.
#[derive(Debug, Clone)]
pub struct MethodMatcher {
    methods: Vec<Method>,
}

impl MethodMatcher {
    pub fn new(methods: Vec<Method>) -> Self {
        Self { methods }
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }
}

impl Matcher for MethodMatcher {
    fn matches(&self, req: &RequestParts<'_>, _m: &mut RouteMatch) -> bool {
        self.methods.contains(req.method())
    }

    fn key(&self) -> MatcherKey {
        MatcherKey::Method
    }
}

/// Matches the request scheme against a set.
#[derive(Debug, Clone)]
pub struct SchemeMatcher {
    schemes: Vec<String>,
}

impl SchemeMatcher {
    /// Schemes are normalized to lowercase.
    pub fn new<I, S>(schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            schemes: schemes
                .into_iter()
                .map(|s| s.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }
}

impl Matcher for SchemeMatcher {
    fn matches(&self, req: &RequestParts<'_>, _m: &mut RouteMatch) -> bool {
        let scheme = req.scheme();
        self.schemes.iter().any(|s| s.eq_ignore_ascii_case(scheme))
    }

    fn key(&self) -> MatcherKey {
        MatcherKey::Scheme
    }
}

/// How a header value is checked.
#[derive(Debug, Clone)]
pub enum HeaderValueMatch {
    /// The header only has to be present.
    Present,
    /// Some value of the header equals the literal.
    Exact(String),
    /// Some value of the header contains a match.
    Regex(Regex),
}

/// Matches one header.
#[derive(Debug, Clone)]
pub struct HeaderMatcher {
    name: HeaderName,
    value: HeaderValueMatch,
}

impl HeaderMatcher {
    pub fn new(name: HeaderName, value: HeaderValueMatch) -> Self {
        Self { name, value }
    }
}

impl Matcher for HeaderMatcher {
    fn matches(&self, req: &RequestParts<'_>, _m: &mut RouteMatch) -> bool {
        let mut values = req
            .headers()
            .get_all(&self.name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .peekable();

        match &self.value {
            HeaderValueMatch::Present => values.peek().is_some(),
            HeaderValueMatch::Exact(expected) => values.any(|v| v == expected),
            HeaderValueMatch::Regex(re) => values.any(|v| re.is_match(v)),
        }
    }

    fn key(&self) -> MatcherKey {
        MatcherKey::Header(self.name.clone())
    }
}

/// Wraps a caller-supplied predicate.
pub struct FnMatcher<F> {
    f: F,
}

impl<F> FnMatcher<F>
where
    F: Fn(&RequestParts<'_>) -> bool + Send + Sync + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> fmt::Debug for FnMatcher<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnMatcher")
    }
}

impl<F> Matcher for FnMatcher<F>
where
    F: Fn(&RequestParts<'_>) -> bool + Send + Sync + 'static,
{
    fn matches(&self, req: &RequestParts<'_>, _m: &mut RouteMatch) -> bool {
        (self.f)(req)
    }
}
