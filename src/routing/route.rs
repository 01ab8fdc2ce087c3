//! Routes: matcher chains, handlers and reverse building.
//!
//! # Responsibilities
//! - Hold the ordered matcher chain and the handler of one registration
//! - Evaluate the chain against a request, delegating to a subrouter
//! - Render URLs back out of the route's host, path and query templates
//!
//! # Design Decisions
//! - Registration errors are stored on the route; later builder calls are
//!   no-ops and every accessor reports the first error
//! - Same-kind matchers override at evaluation time: the list keeps every
//!   registration, superseded entries are skipped
//! - A route copies its owner's configuration when created; later changes
//!   to the owner don't reach existing routes

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderName, Method, Request, Uri};
use axum::response::IntoResponse;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::http::handler::BoxHandler;
use crate::http::middleware::{apply_chain, Middleware, SharedMiddleware};
use crate::http::request::RequestParts;
use crate::routing::clean::encode_path;
use crate::routing::error::{MatchError, RouteError};
use crate::routing::matcher::{
    pattern_subject, FnMatcher, HeaderMatcher, HeaderValueMatch, Matcher, MatcherKey,
    MethodMatcher, PatternMatcher, SchemeMatcher,
};
use crate::routing::matching::{MatchStatus, RouteMatch};
use crate::routing::router::{RouteId, Router, RouterId, RouterMut, RouterNode};
use crate::routing::template::{CompiledPattern, PatternKind, PatternOptions};

/// Hook applied to variables before a URL is built.
pub type BuildVarsFn =
    Arc<dyn Fn(HashMap<String, String>) -> HashMap<String, String> + Send + Sync>;

/// Templates used both for variable extraction and reverse building.
#[derive(Debug, Clone, Default)]
pub(crate) struct PatternGroup {
    pub host: Option<Arc<CompiledPattern>>,
    pub path: Option<Arc<CompiledPattern>>,
    pub queries: Vec<Arc<CompiledPattern>>,
}

/// Configuration shared between a router node and the routes it creates.
#[derive(Clone, Default)]
pub(crate) struct RouteConf {
    pub use_encoded_path: bool,
    pub strict_slash: bool,
    pub skip_clean: bool,
    pub patterns: PatternGroup,
    pub build_scheme: Option<String>,
    pub build_vars_fn: Option<BuildVarsFn>,
}

impl fmt::Debug for RouteConf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteConf")
            .field("use_encoded_path", &self.use_encoded_path)
            .field("strict_slash", &self.strict_slash)
            .field("skip_clean", &self.skip_clean)
            .field("patterns", &self.patterns)
            .field("build_scheme", &self.build_scheme)
            .field("build_vars_fn", &self.build_vars_fn.is_some())
            .finish()
    }
}

struct MatcherEntry {
    key: MatcherKey,
    matcher: Arc<dyn Matcher>,
    superseded: bool,
}

/// A registered route.
pub struct Route {
    id: RouteId,
    owner: RouterId,
    handler: Option<BoxHandler>,
    build_only: bool,
    name: Option<String>,
    err: Option<RouteError>,
    matchers: Vec<MatcherEntry>,
    middlewares: Vec<SharedMiddleware>,
    methods: Option<Vec<Method>>,
    metadata: HashMap<String, Value>,
    subrouter: Option<RouterId>,
    pub(crate) conf: RouteConf,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("err", &self.err)
            .field("matchers", &self.matchers.len())
            .field("subrouter", &self.subrouter)
            .finish_non_exhaustive()
    }
}

impl Route {
    pub(crate) fn new(id: RouteId, owner: RouterId, conf: RouteConf) -> Self {
        Self {
            id,
            owner,
            handler: None,
            build_only: false,
            name: None,
            err: None,
            matchers: Vec::new(),
            middlewares: Vec::new(),
            methods: None,
            metadata: HashMap::new(),
            subrouter: None,
            conf,
        }
    }

    pub fn id(&self) -> RouteId {
        self.id
    }

    /// Router node the route was registered on.
    pub fn owner(&self) -> RouterId {
        self.owner
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// First registration error, if any.
    pub fn error(&self) -> Option<&RouteError> {
        self.err.as_ref()
    }

    pub fn is_build_only(&self) -> bool {
        self.build_only
    }

    pub fn skip_clean(&self) -> bool {
        self.conf.skip_clean
    }

    pub fn subrouter(&self) -> Option<RouterId> {
        self.subrouter
    }

    pub fn handler(&self) -> Option<&BoxHandler> {
        self.handler.as_ref()
    }

    /// The handler wrapped in the route's own middleware.
    pub fn handler_with_middlewares(&self) -> Option<BoxHandler> {
        self.handler
            .clone()
            .map(|h| apply_chain(&self.middlewares, h))
    }

    fn check(&self) -> Result<(), RouteError> {
        match &self.err {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    pub fn path_template(&self) -> Result<&str, RouteError> {
        self.check()?;
        self.conf
            .patterns
            .path
            .as_deref()
            .map(CompiledPattern::template)
            .ok_or(RouteError::NoTemplate("path"))
    }

    pub fn path_regex(&self) -> Result<&str, RouteError> {
        self.check()?;
        self.conf
            .patterns
            .path
            .as_deref()
            .map(CompiledPattern::regex)
            .ok_or(RouteError::NoTemplate("path"))
    }

    pub fn host_template(&self) -> Result<&str, RouteError> {
        self.check()?;
        self.conf
            .patterns
            .host
            .as_deref()
            .map(CompiledPattern::template)
            .ok_or(RouteError::NoTemplate("host"))
    }

    pub fn queries_templates(&self) -> Result<Vec<&str>, RouteError> {
        self.check()?;
        let queries = &self.conf.patterns.queries;
        if queries.is_empty() {
            return Err(RouteError::NoTemplate("queries"));
        }
        Ok(queries.iter().map(|q| q.template()).collect())
    }

    pub fn queries_regex(&self) -> Result<Vec<&str>, RouteError> {
        self.check()?;
        let queries = &self.conf.patterns.queries;
        if queries.is_empty() {
            return Err(RouteError::NoTemplate("queries"));
        }
        Ok(queries.iter().map(|q| q.regex()).collect())
    }

    pub fn methods(&self) -> Result<&[Method], RouteError> {
        self.check()?;
        self.methods
            .as_deref()
            .ok_or(RouteError::NoTemplate("methods"))
    }

    /// Variable names declared by the host, path and query templates.
    pub fn var_names(&self) -> Result<Vec<&str>, RouteError> {
        self.check()?;
        let group = &self.conf.patterns;
        Ok(group
            .host
            .iter()
            .chain(group.path.iter())
            .chain(group.queries.iter())
            .flat_map(|p| p.var_names())
            .collect())
    }

    pub fn metadata(&self) -> &HashMap<String, Value> {
        &self.metadata
    }

    pub fn metadata_contains(&self, key: &str) -> bool {
        self.metadata.contains_key(key)
    }

    pub fn metadata_value(&self, key: &str) -> Result<&Value, RouteError> {
        self.metadata
            .get(key)
            .ok_or_else(|| RouteError::MetadataKeyNotFound(key.to_string()))
    }

    pub fn metadata_value_or(&self, key: &str, default: Value) -> Value {
        self.metadata.get(key).cloned().unwrap_or(default)
    }

    /// Explicit pairs passed through the build-vars hook.
    pub fn build_vars(&self, pairs: &[(&str, &str)]) -> HashMap<String, String> {
        let vars = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        match &self.conf.build_vars_fn {
            Some(f) => f(vars),
            None => vars,
        }
    }

    /// Render a full URL from the host, path and query templates.
    ///
    /// Scheme and authority are only present when the route has a host
    /// template.
    pub fn build_url(&self, pairs: &[(&str, &str)]) -> Result<Uri, RouteError> {
        self.check()?;
        let group = &self.conf.patterns;
        if group.host.is_none() && group.path.is_none() {
            return Err(RouteError::NoTemplate("host or path"));
        }
        let values = self.build_vars(pairs);

        let mut url = String::new();
        if let Some(host) = &group.host {
            url.push_str(self.conf.build_scheme.as_deref().unwrap_or("http"));
            url.push_str("://");
            url.push_str(&host.render(&values)?);
        }
        let path = match &group.path {
            Some(path) => encode_path(&path.render(&values)?),
            None => String::new(),
        };
        if path.is_empty() && group.host.is_none() {
            url.push('/');
        }
        url.push_str(&path);

        let queries = group
            .queries
            .iter()
            .map(|q| q.render(&values))
            .collect::<Result<Vec<_>, _>>()?;
        if !queries.is_empty() {
            url.push('?');
            url.push_str(&queries.join("&"));
        }

        url.parse::<Uri>()
            .map_err(|e| RouteError::InvalidUrl(e.to_string()))
    }

    /// Render only the path template, percent-encoded.
    pub fn build_path(&self, pairs: &[(&str, &str)]) -> Result<String, RouteError> {
        self.check()?;
        let path = self
            .conf
            .patterns
            .path
            .as_ref()
            .ok_or(RouteError::NoTemplate("path"))?;
        Ok(encode_path(&path.render(&self.build_vars(pairs))?))
    }

    /// Render only the host template.
    pub fn build_host(&self, pairs: &[(&str, &str)]) -> Result<String, RouteError> {
        self.check()?;
        let host = self
            .conf
            .patterns
            .host
            .as_ref()
            .ok_or(RouteError::NoTemplate("host"))?;
        host.render(&self.build_vars(pairs))
    }

    /// Evaluate this route against a request.
    pub(crate) fn match_request(
        &self,
        tree: &Router,
        req: &RequestParts<'_>,
        m: &mut RouteMatch,
    ) -> MatchStatus {
        if self.build_only || self.err.is_some() {
            return MatchStatus::NoMatch;
        }

        let mut method_mismatch = false;
        for entry in self.matchers.iter().filter(|e| !e.superseded) {
            if entry.matcher.matches(req, m) {
                continue;
            }
            if entry.key == MatcherKey::Method {
                method_mismatch = true;
                continue;
            }
            return MatchStatus::NoMatch;
        }

        if method_mismatch {
            return match self.subrouter {
                Some(node) => self.match_nested_after_mismatch(tree, node, req, m),
                None => {
                    m.error = Some(MatchError::MethodMismatch);
                    MatchStatus::NoMatch
                }
            };
        }

        if let Some(location) = self.slash_redirect(req) {
            if m.redirect.is_none() {
                m.redirect = Some(location);
            }
            return MatchStatus::NoMatch;
        }

        let vars = self.extract_vars(req);

        if let Some(node) = self.subrouter {
            let saved = m.vars.clone();
            m.vars.extend(vars);
            let status = tree.match_node(node, req, m);
            if status == MatchStatus::NoMatch {
                m.vars = saved;
            }
            return status;
        }

        m.vars.extend(vars);
        m.route = Some(self.id);
        m.handler = self.handler_with_middlewares();
        m.error = None;
        MatchStatus::Matched
    }

    /// Only this route's method failed. The method mismatch stands only if
    /// something under the subrouter matches the request structurally;
    /// otherwise the request is not found here.
    fn match_nested_after_mismatch(
        &self,
        tree: &Router,
        node: RouterId,
        req: &RequestParts<'_>,
        m: &mut RouteMatch,
    ) -> MatchStatus {
        let mut nested = m.clone();
        nested.error = None;
        nested.vars.extend(self.extract_vars(req));

        match tree.match_node(node, req, &mut nested) {
            MatchStatus::Fallback => {
                // The subrouter answers with its own handler.
                *m = nested;
                MatchStatus::Fallback
            }
            MatchStatus::Matched => {
                m.redirect = nested.redirect;
                m.error = Some(MatchError::MethodMismatch);
                MatchStatus::NoMatch
            }
            MatchStatus::NoMatch => {
                m.redirect = nested.redirect;
                if nested.error == Some(MatchError::MethodMismatch) {
                    m.error = Some(MatchError::MethodMismatch);
                }
                MatchStatus::NoMatch
            }
        }
    }

    /// Target of a strict-slash redirect when the request's trailing slash
    /// disagrees with the path template.
    fn slash_redirect(&self, req: &RequestParts<'_>) -> Option<String> {
        let path = self.conf.patterns.path.as_ref()?;
        if path.kind() != PatternKind::Path || !path.options().strict_slash {
            return None;
        }
        let subject = pattern_subject(path, req)?;
        let wants_slash = path.template().ends_with('/');
        if subject.ends_with('/') == wants_slash {
            return None;
        }

        let target = match subject.strip_suffix('/') {
            Some(trimmed) if !wants_slash => trimmed.to_string(),
            _ => format!("{subject}/"),
        };
        let mut location = if path.options().use_encoded_path {
            target
        } else {
            encode_path(&target)
        };
        if let Some(query) = req.uri().query() {
            location.push('?');
            location.push_str(query);
        }
        Some(location)
    }

    fn extract_vars(&self, req: &RequestParts<'_>) -> HashMap<String, String> {
        let mut vars = HashMap::new();
        let group = &self.conf.patterns;
        for pattern in group
            .host
            .iter()
            .chain(group.path.iter())
            .chain(group.queries.iter())
        {
            if let Some(subject) = pattern_subject(pattern, req) {
                pattern.captures_into(subject, &mut vars);
            }
        }
        vars
    }

    fn push_matcher(&mut self, matcher: Arc<dyn Matcher>) {
        let key = matcher.key();
        if key.is_overridable() {
            for entry in self.matchers.iter_mut().filter(|e| e.key == key) {
                entry.superseded = true;
            }
        }
        self.matchers.push(MatcherEntry {
            key,
            matcher,
            superseded: false,
        });
    }

    fn add_pattern(&mut self, template: &str, kind: PatternKind) -> Result<(), RouteError> {
        let mut template = template.to_string();
        if matches!(kind, PatternKind::Path | PatternKind::Prefix) {
            if !template.is_empty() && !template.starts_with('/') {
                return Err(RouteError::bad_template(
                    &template,
                    "path must start with a slash",
                ));
            }
            if let Some(prev) = &self.conf.patterns.path {
                template = format!("{}{}", prev.template().trim_end_matches('/'), template);
            }
        }

        let options = PatternOptions {
            strict_slash: self.conf.strict_slash,
            use_encoded_path: self.conf.use_encoded_path,
        };
        let pattern = Arc::new(CompiledPattern::compile(&template, kind, options)?);
        self.check_unique_vars(&pattern)?;

        let group = &mut self.conf.patterns;
        match kind {
            PatternKind::Host => group.host = Some(Arc::clone(&pattern)),
            PatternKind::Path | PatternKind::Prefix => group.path = Some(Arc::clone(&pattern)),
            PatternKind::Query => {
                match group
                    .queries
                    .iter_mut()
                    .find(|q| q.query_key() == pattern.query_key())
                {
                    Some(slot) => *slot = Arc::clone(&pattern),
                    None => group.queries.push(Arc::clone(&pattern)),
                }
            }
        }

        self.push_matcher(Arc::new(PatternMatcher::new(pattern)));
        Ok(())
    }

    /// A variable may only be declared once across the templates that stay
    /// active after `pattern` is installed.
    fn check_unique_vars(&self, pattern: &CompiledPattern) -> Result<(), RouteError> {
        let group = &self.conf.patterns;
        let kind = pattern.kind();

        let mut others: Vec<&Arc<CompiledPattern>> = group
            .queries
            .iter()
            .filter(|q| kind != PatternKind::Query || q.query_key() != pattern.query_key())
            .collect();
        if kind != PatternKind::Host {
            others.extend(group.host.iter());
        }
        if !matches!(kind, PatternKind::Path | PatternKind::Prefix) {
            others.extend(group.path.iter());
        }

        for name in pattern.var_names() {
            if others.iter().any(|o| o.var_names().any(|n| n == name)) {
                return Err(RouteError::bad_template(
                    pattern.template(),
                    format!("duplicate variable {name:?}"),
                ));
            }
        }
        Ok(())
    }
}

/// Mutable handle to a route inside its tree. Builder methods chain.
pub struct RouteMut<'a> {
    tree: &'a mut Router,
    id: RouteId,
}

impl<'a> RouteMut<'a> {
    pub(crate) fn new(tree: &'a mut Router, id: RouteId) -> Self {
        Self { tree, id }
    }

    pub fn id(&self) -> RouteId {
        self.id
    }

    /// Read access to the route being built.
    pub fn get(&self) -> &Route {
        &self.tree.routes[self.id.0]
    }

    fn route(&mut self) -> &mut Route {
        &mut self.tree.routes[self.id.0]
    }

    fn is_errored(&self) -> bool {
        self.get().err.is_some()
    }

    fn fail(&mut self, err: RouteError) {
        let route = self.route();
        if route.err.is_none() {
            warn!(route = route.id.0, error = %err, "route registration failed");
            route.err = Some(err);
        }
    }

    fn with(mut self, f: impl FnOnce(&mut Route) -> Result<(), RouteError>) -> Self {
        if self.is_errored() {
            return self;
        }
        if let Err(err) = f(self.route()) {
            self.fail(err);
        }
        self
    }

    /// Match the whole path. Repeated calls concatenate.
    pub fn path(self, template: &str) -> Self {
        self.with(|r| r.add_pattern(template, PatternKind::Path))
    }

    /// Match a path prefix. Repeated calls concatenate.
    pub fn path_prefix(self, template: &str) -> Self {
        self.with(|r| r.add_pattern(template, PatternKind::Prefix))
    }

    pub fn host(self, template: &str) -> Self {
        self.with(|r| r.add_pattern(template, PatternKind::Host))
    }

    /// Each `(key, value)` pair is a `key=value` query template.
    pub fn queries(self, pairs: &[(&str, &str)]) -> Self {
        self.with(|r| {
            for (key, value) in pairs {
                r.add_pattern(&format!("{key}={value}"), PatternKind::Query)?;
            }
            Ok(())
        })
    }

    /// Method tokens are uppercased before matching.
    pub fn methods(self, methods: &[&str]) -> Self {
        self.with(|r| {
            let methods = methods
                .iter()
                .map(|m| {
                    Method::from_bytes(m.to_ascii_uppercase().as_bytes())
                        .map_err(|_| RouteError::InvalidMethod(m.to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            r.methods = Some(methods.clone());
            r.push_matcher(Arc::new(MethodMatcher::new(methods)));
            Ok(())
        })
    }

    /// A single scheme also becomes the scheme of built URLs.
    pub fn schemes(self, schemes: &[&str]) -> Self {
        self.with(|r| {
            if let [only] = schemes {
                r.conf.build_scheme = Some(only.to_ascii_lowercase());
            }
            r.push_matcher(Arc::new(SchemeMatcher::new(schemes)));
            Ok(())
        })
    }

    /// Exact header values; an empty value only requires presence.
    pub fn headers(self, pairs: &[(&str, &str)]) -> Self {
        self.with(|r| {
            for (name, value) in pairs {
                let value = if value.is_empty() {
                    HeaderValueMatch::Present
                } else {
                    HeaderValueMatch::Exact(value.to_string())
                };
                r.push_matcher(Arc::new(HeaderMatcher::new(header_name(name)?, value)));
            }
            Ok(())
        })
    }

    /// Header values matched by unanchored regexes; an empty pattern only
    /// requires presence.
    pub fn headers_regex(self, pairs: &[(&str, &str)]) -> Self {
        self.with(|r| {
            for (name, pattern) in pairs {
                let value = if pattern.is_empty() {
                    HeaderValueMatch::Present
                } else {
                    let re = Regex::new(pattern).map_err(|e| RouteError::InvalidHeader {
                        name: name.to_string(),
                        reason: e.to_string(),
                    })?;
                    HeaderValueMatch::Regex(re)
                };
                r.push_matcher(Arc::new(HeaderMatcher::new(header_name(name)?, value)));
            }
            Ok(())
        })
    }

    /// Add a custom predicate.
    pub fn match_fn<F>(self, f: F) -> Self
    where
        F: Fn(&RequestParts<'_>) -> bool + Send + Sync + 'static,
    {
        self.matcher(FnMatcher::new(f))
    }

    pub fn matcher<M: Matcher + 'static>(self, matcher: M) -> Self {
        self.with(|r| {
            r.push_matcher(Arc::new(matcher));
            Ok(())
        })
    }

    /// Register the route under `name` in the tree's registry.
    pub fn name(mut self, name: &str) -> Self {
        if let Some(current) = self.get().name.clone() {
            self.fail(RouteError::AlreadyNamed {
                current,
                requested: name.to_string(),
            });
            return self;
        }
        if self.is_errored() {
            return self;
        }
        if self.tree.names.contains_key(name) {
            self.fail(RouteError::DuplicateName(name.to_string()));
            return self;
        }
        let id = self.id;
        self.tree.names.insert(name.to_string(), id);
        self.route().name = Some(name.to_string());
        self
    }

    pub fn handler(self, handler: impl Into<BoxHandler>) -> Self {
        let handler = handler.into();
        self.with(|r| {
            r.handler = Some(handler);
            Ok(())
        })
    }

    pub fn handler_fn<F, Fut, R>(self, f: F) -> Self
    where
        F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse + 'static,
    {
        self.handler(BoxHandler::from_fn(f))
    }

    /// The route is used for URL building only and never matches.
    pub fn build_only(mut self) -> Self {
        self.route().build_only = true;
        self
    }

    /// Transform variables before building. A second hook runs after the first.
    pub fn build_vars_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(HashMap<String, String>) -> HashMap<String, String> + Send + Sync + 'static,
    {
        let route = self.route();
        let hook: BuildVarsFn = match route.conf.build_vars_fn.take() {
            Some(prev) => Arc::new(move |vars| f(prev(vars))),
            None => Arc::new(f),
        };
        route.conf.build_vars_fn = Some(hook);
        self
    }

    pub fn metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.route().metadata.insert(key.to_string(), value.into());
        self
    }

    /// Middleware around this route's handler only, inside any router
    /// middleware.
    pub fn use_middleware(mut self, middleware: impl Middleware) -> Self {
        self.route().middlewares.push(Arc::new(middleware));
        self
    }

    /// Nested router evaluated after this route's matchers pass.
    /// Calling it again returns the same node.
    pub fn subrouter(self) -> RouterMut<'a> {
        let RouteMut { tree, id } = self;
        if let Some(node) = tree.routes[id.0].subrouter {
            return RouterMut::new(tree, node);
        }
        let conf = tree.routes[id.0].conf.clone();
        let node = tree.push_node(RouterNode::child(id, conf));
        tree.routes[id.0].subrouter = Some(node);
        RouterMut::new(tree, node)
    }
}

fn header_name(name: &str) -> Result<HeaderName, RouteError> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|e| RouteError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parts_match(router: &Router, method: &str, uri: &str) -> RouteMatch {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::default())
            .unwrap();
        router.match_request(&req)
    }

    #[test]
    fn test_error_is_sticky() {
        let mut router = Router::new();
        let id = router
            .new_route()
            .path("/{id")
            .path("/fine")
            .methods(&["GET"])
            .id();
        let route = router.route(id).unwrap();

        assert!(matches!(route.error(), Some(RouteError::BadTemplate { .. })));
        assert!(route.path_template().is_err());
        assert!(route.methods().is_err());
        assert!(!parts_match(&router, "GET", "/fine").is_match());
    }

    #[test]
    fn test_path_must_start_with_slash() {
        let mut router = Router::new();
        let id = router.new_route().path("items").id();
        assert!(matches!(
            router.route(id).unwrap().error(),
            Some(RouteError::BadTemplate { .. })
        ));
    }

    #[test]
    fn test_var_names_unique_across_templates() {
        let mut router = Router::new();
        let id = router.new_route().host("{v}.example.com").path("/{v}").id();
        assert!(router.route(id).unwrap().error().is_some());

        let ok = router
            .new_route()
            .host("{sub}.example.com")
            .path("/{id}")
            .queries(&[("page", "{page}")])
            .id();
        let names = router.route(ok).unwrap().var_names().unwrap();
        assert_eq!(names, vec!["sub", "id", "page"]);
    }

    #[test]
    fn test_invalid_method_and_header() {
        let mut router = Router::new();
        let bad_method = router.new_route().methods(&["GE T"]).id();
        let bad_header = router.new_route().headers(&[("bad header", "x")]).id();

        assert_eq!(
            router.route(bad_method).unwrap().error(),
            Some(&RouteError::InvalidMethod("GE T".into()))
        );
        assert!(matches!(
            router.route(bad_header).unwrap().error(),
            Some(RouteError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn test_methods_uppercased() {
        let mut router = Router::new();
        let id = router.new_route().path("/x").methods(&["get", "Post"]).id();
        assert_eq!(
            router.route(id).unwrap().methods().unwrap(),
            &[Method::GET, Method::POST]
        );
        assert!(parts_match(&router, "POST", "/x").is_match());
    }

    #[test]
    fn test_path_concatenation_on_one_route() {
        let mut router = Router::new();
        let id = router.new_route().path_prefix("/before").path_prefix("/after").id();
        assert_eq!(router.route(id).unwrap().path_template().unwrap(), "/before/after");
        assert!(parts_match(&router, "GET", "/before/after/x").is_match());
        assert!(!parts_match(&router, "GET", "/before/x").is_match());
    }

    #[test]
    fn test_template_accessors_report_missing() {
        let mut router = Router::new();
        let id = router.new_route().path("/x").id();
        let route = router.route(id).unwrap();

        assert_eq!(route.path_template().unwrap(), "/x");
        assert_eq!(route.path_regex().unwrap(), "^/x$");
        assert_eq!(route.host_template(), Err(RouteError::NoTemplate("host")));
        assert_eq!(route.queries_templates(), Err(RouteError::NoTemplate("queries")));
        assert_eq!(route.methods(), Err(RouteError::NoTemplate("methods")));
    }

    #[test]
    fn test_queries_override_same_key() {
        let mut router = Router::new();
        let id = router
            .new_route()
            .path("/search")
            .queries(&[("q", "first")])
            .queries(&[("q", "{term}")])
            .id();
        let route = router.route(id).unwrap();
        assert_eq!(route.queries_templates().unwrap(), vec!["q={term}"]);

        let m = parts_match(&router, "GET", "/search?q=rust");
        assert!(m.is_match());
        assert_eq!(m.vars["term"], "rust");
    }

    #[test]
    fn test_metadata() {
        let mut router = Router::new();
        let id = router
            .new_route()
            .path("/x")
            .metadata("owner", "team-a")
            .metadata("weight", 3)
            .id();
        let route = router.route(id).unwrap();

        assert!(route.metadata_contains("owner"));
        assert_eq!(route.metadata_value("weight").unwrap(), &json!(3));
        assert_eq!(
            route.metadata_value("missing"),
            Err(RouteError::MetadataKeyNotFound("missing".into()))
        );
        assert_eq!(route.metadata_value_or("missing", json!("dflt")), json!("dflt"));
    }

    #[test]
    fn test_name_once_and_unique() {
        let mut router = Router::new();
        let first = router.new_route().path("/a").name("a").id();
        let dup = router.new_route().path("/b").name("a").id();
        let twice = router.new_route().path("/c").name("c").name("c2").id();

        assert_eq!(router.get("a").map(Route::id), Some(first));
        assert_eq!(
            router.route(dup).unwrap().error(),
            Some(&RouteError::DuplicateName("a".into()))
        );
        assert!(matches!(
            router.route(twice).unwrap().error(),
            Some(RouteError::AlreadyNamed { .. })
        ));
    }

    #[test]
    fn test_build_vars_fn_chains() {
        let mut router = Router::new();
        let id = router
            .new_route()
            .path("/{lang}/{page}")
            .build_vars_fn(|mut vars| {
                vars.entry("lang".into()).or_insert_with(|| "en".into());
                vars
            })
            .build_vars_fn(|mut vars| {
                if let Some(page) = vars.get_mut("page") {
                    *page = page.to_lowercase();
                }
                vars
            })
            .id();
        let route = router.route(id).unwrap();
        assert_eq!(route.build_path(&[("page", "About")]).unwrap(), "/en/about");
    }

    #[test]
    fn test_build_url_parts() {
        let mut router = Router::new();
        let id = router
            .new_route()
            .schemes(&["https"])
            .host("{sub}.example.com")
            .path("/items/{id:[0-9]+}")
            .queries(&[("q", "{q}")])
            .id();
        let route = router.route(id).unwrap();

        let url = route
            .build_url(&[("sub", "api"), ("id", "7"), ("q", "a b")])
            .unwrap();
        assert_eq!(url.to_string(), "https://api.example.com/items/7?q=a+b");
        assert_eq!(route.build_host(&[("sub", "api")]).unwrap(), "api.example.com");
        assert!(matches!(
            route.build_path(&[("id", "x")]),
            Err(RouteError::VariableConstraint { .. })
        ));
        assert_eq!(
            route.build_path(&[]),
            Err(RouteError::MissingVariable("id".into()))
        );
    }

    #[test]
    fn test_build_url_without_templates() {
        let mut router = Router::new();
        let id = router.new_route().methods(&["GET"]).id();
        assert_eq!(
            router.route(id).unwrap().build_url(&[]),
            Err(RouteError::NoTemplate("host or path"))
        );
    }

    #[test]
    fn test_build_only_never_matches() {
        let mut router = Router::new();
        let id = router.new_route().path("/static").build_only().id();
        assert!(!parts_match(&router, "GET", "/static").is_match());
        assert_eq!(
            router.route(id).unwrap().build_url(&[]).unwrap().to_string(),
            "/static"
        );
    }
}
