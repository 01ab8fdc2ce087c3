//! Route template compilation.
//!
//! # Responsibilities
//! - Parse `{name}` and `{name:regex}` placeholders out of a template
//! - Generate the matching expression with anchors suited to the template kind
//! - Keep the reverse template used to render URLs back out of variables
//!
//! # Design Decisions
//! - Literal text is escaped; constraint fragments are inserted verbatim
//! - Only named variables capture: user capture groups are rejected
//! - Compiled once at registration and shared via `Arc` afterwards

use std::collections::HashMap;

use regex::Regex;

use crate::routing::error::RouteError;

/// What part of the request a template describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// Whole path, anchored at both ends.
    Path,
    /// Path prefix, anchored at the start only.
    Prefix,
    /// Host, segments separated by `.`.
    Host,
    /// Value side of a `key=value` query pair.
    Query,
}

impl PatternKind {
    fn default_pattern(self) -> &'static str {
        match self {
            PatternKind::Path | PatternKind::Prefix => "[^/]+",
            PatternKind::Host => "[^.]+",
            PatternKind::Query => ".*",
        }
    }
}

/// Options inherited from the owning route at compile time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternOptions {
    /// Accept the opposite trailing-slash form (path kind only).
    pub strict_slash: bool,
    /// Match against the escaped path instead of the decoded one.
    pub use_encoded_path: bool,
}

#[derive(Debug)]
struct Variable {
    name: String,
    constraint: Regex,
}

/// An immutable, compiled template.
#[derive(Debug)]
pub struct CompiledPattern {
    template: String,
    kind: PatternKind,
    options: PatternOptions,
    regex: Regex,
    // Literal runs around the variables; always one more than `vars`.
    literals: Vec<String>,
    vars: Vec<Variable>,
    query_key: Option<String>,
    wildcard_host_port: bool,
}

impl CompiledPattern {
    /// Compile `template` for the given kind.
    ///
    /// Query templates are `key=value` pairs; only the value side becomes a
    /// pattern. An empty query value accepts any value.
    pub fn compile(
        template: &str,
        kind: PatternKind,
        mut options: PatternOptions,
    ) -> Result<Self, RouteError> {
        if kind != PatternKind::Path {
            options.strict_slash = false;
        }

        let (query_key, mut source) = match kind {
            PatternKind::Query => match template.split_once('=') {
                Some((key, value)) => (Some(key.to_string()), value),
                None => {
                    return Err(RouteError::bad_template(
                        template,
                        "query template must be a key=value pair",
                    ))
                }
            },
            _ => (None, template),
        };

        let end_slash = options.strict_slash && source.ends_with('/');
        if end_slash {
            source = &source[..source.len() - 1];
        }

        let spans = brace_spans(source)
            .ok_or_else(|| RouteError::bad_template(template, "unbalanced braces"))?;

        let mut pattern = String::from("^");
        let mut literals = Vec::with_capacity(spans.len() + 1);
        let mut vars: Vec<Variable> = Vec::with_capacity(spans.len());
        let mut end = 0;

        for (index, &(start, stop)) in spans.iter().enumerate() {
            let raw = &source[end..start];
            end = stop;

            let inner = &source[start + 1..stop - 1];
            let (name, constraint) = inner
                .split_once(':')
                .unwrap_or((inner, kind.default_pattern()));
            if name.is_empty() || constraint.is_empty() {
                return Err(RouteError::bad_template(
                    template,
                    format!("missing name or pattern in {:?}", &source[start..stop]),
                ));
            }
            if vars.iter().any(|v| v.name == name) {
                return Err(RouteError::bad_template(
                    template,
                    format!("duplicate variable {name:?}"),
                ));
            }

            pattern.push_str(&literal_pattern(raw, kind));
            pattern.push_str(&format!("(?P<v{index}>{constraint})"));
            literals.push(raw.to_string());

            let constraint = Regex::new(&format!("^(?:{constraint})$"))
                .map_err(|e| RouteError::bad_template(template, e.to_string()))?;
            vars.push(Variable {
                name: name.to_string(),
                constraint,
            });
        }

        let raw = &source[end..];
        pattern.push_str(&literal_pattern(raw, kind));
        if options.strict_slash {
            pattern.push_str("[/]?");
        }
        if kind == PatternKind::Query && source.is_empty() {
            pattern.push_str(kind.default_pattern());
        }
        if kind != PatternKind::Prefix {
            pattern.push('$');
        }

        let mut tail = raw.to_string();
        if end_slash {
            tail.push('/');
        }
        literals.push(tail);

        let regex =
            Regex::new(&pattern).map_err(|e| RouteError::bad_template(template, e.to_string()))?;
        if regex.captures_len() - 1 != vars.len() {
            return Err(RouteError::bad_template(
                template,
                "capturing groups are not allowed, use (?:pattern) instead of (pattern)",
            ));
        }

        let wildcard_host_port =
            kind == PatternKind::Host && !literals.iter().any(|l| l.contains(':'));

        Ok(Self {
            template: template.to_string(),
            kind,
            options,
            regex,
            literals,
            vars,
            query_key,
            wildcard_host_port,
        })
    }

    /// The unmodified template.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// The generated expression.
    pub fn regex(&self) -> &str {
        self.regex.as_str()
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    pub fn options(&self) -> PatternOptions {
        self.options
    }

    /// Literal key of a query template.
    pub fn query_key(&self) -> Option<&str> {
        self.query_key.as_deref()
    }

    /// Whether a port in the request host is ignored.
    pub fn wildcard_host_port(&self) -> bool {
        self.wildcard_host_port
    }

    /// Declared variable names, in template order.
    pub fn var_names(&self) -> impl Iterator<Item = &str> {
        self.vars.iter().map(|v| v.name.as_str())
    }

    pub fn is_match(&self, subject: &str) -> bool {
        self.regex.is_match(subject)
    }

    /// Insert every variable captured from `subject` into `vars`.
    /// Returns false when the subject does not match.
    pub fn captures_into(&self, subject: &str, vars: &mut HashMap<String, String>) -> bool {
        let Some(caps) = self.regex.captures(subject) else {
            return false;
        };
        for (index, var) in self.vars.iter().enumerate() {
            let value = caps
                .name(&format!("v{index}"))
                .map(|m| m.as_str())
                .unwrap_or_default();
            vars.insert(var.name.clone(), value.to_string());
        }
        true
    }

    /// Render the reverse template with `values`.
    ///
    /// Every variable must be present and satisfy its own constraint. Query
    /// values are form-encoded; the result of a query template is `key=value`.
    pub fn render(&self, values: &HashMap<String, String>) -> Result<String, RouteError> {
        let mut out = String::new();
        if let Some(key) = &self.query_key {
            out.push_str(key);
            out.push('=');
        }

        for (literal, var) in self.literals.iter().zip(&self.vars) {
            out.push_str(literal);
            let value = values
                .get(&var.name)
                .ok_or_else(|| RouteError::MissingVariable(var.name.clone()))?;
            if !var.constraint.is_match(value) {
                return Err(RouteError::VariableConstraint {
                    name: var.name.clone(),
                    value: value.clone(),
                    pattern: var.constraint.as_str().to_string(),
                });
            }
            if self.kind == PatternKind::Query {
                out.extend(url::form_urlencoded::byte_serialize(value.as_bytes()));
            } else {
                out.push_str(value);
            }
        }
        if let Some(tail) = self.literals.last() {
            out.push_str(tail);
        }

        Ok(out)
    }
}

/// Host literals compare case-insensitively.
fn literal_pattern(raw: &str, kind: PatternKind) -> String {
    let escaped = regex::escape(raw);
    if kind == PatternKind::Host && !escaped.is_empty() {
        format!("(?i:{escaped})")
    } else {
        escaped
    }
}

/// Byte spans of the top-level `{...}` groups, closing brace included.
/// Nested braces (regex repetition counts) stay inside their group.
fn brace_spans(s: &str) -> Option<Vec<(usize, usize)>> {
    let mut level = 0usize;
    let mut start = 0;
    let mut spans = Vec::new();

    for (i, b) in s.bytes().enumerate() {
        match b {
            b'{' => {
                level += 1;
                if level == 1 {
                    start = i;
                }
            }
            b'}' => {
                if level == 0 {
                    return None;
                }
                level -= 1;
                if level == 0 {
                    spans.push((start, i + 1));
                }
            }
            _ => {}
        }
    }

    (level == 0).then_some(spans)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(tpl: &str, kind: PatternKind) -> CompiledPattern {
        CompiledPattern::compile(tpl, kind, PatternOptions::default()).unwrap()
    }

    #[test]
    fn test_path_variables() {
        let p = compile("/items/{id:[0-9]+}/{slug}", PatternKind::Path);
        assert_eq!(p.var_names().collect::<Vec<_>>(), vec!["id", "slug"]);

        let mut vars = HashMap::new();
        assert!(p.captures_into("/items/42/hello", &mut vars));
        assert_eq!(vars["id"], "42");
        assert_eq!(vars["slug"], "hello");

        assert!(!p.is_match("/items/abc/hello"));
        assert!(!p.is_match("/items/42/hello/extra"));
        assert!(!p.is_match("/items/42/a/b"));
    }

    #[test]
    fn test_literals_are_escaped() {
        let p = compile("/files/v1.0+beta", PatternKind::Path);
        assert!(p.is_match("/files/v1.0+beta"));
        assert!(!p.is_match("/files/v1x0+beta"));
    }

    #[test]
    fn test_prefix_anchored_at_start_only() {
        let p = compile("/api", PatternKind::Prefix);
        assert!(p.is_match("/api"));
        assert!(p.is_match("/api/users"));
        assert!(!p.is_match("/v1/api"));
    }

    #[test]
    fn test_host_default_pattern() {
        let p = compile("{sub}.example.com", PatternKind::Host);
        assert!(p.wildcard_host_port());
        let mut vars = HashMap::new();
        assert!(p.captures_into("www.example.com", &mut vars));
        assert_eq!(vars["sub"], "www");
        assert!(!p.is_match("a.b.example.com"));

        let with_port = compile("localhost:8080", PatternKind::Host);
        assert!(!with_port.wildcard_host_port());
    }

    #[test]
    fn test_host_literals_ignore_case() {
        let p = compile("API.example.com", PatternKind::Host);
        assert!(p.is_match("api.example.com"));
        assert!(p.is_match("Api.Example.COM"));
        assert_eq!(p.template(), "API.example.com");

        // Paths stay case-sensitive.
        assert!(!compile("/Items", PatternKind::Path).is_match("/items"));
    }

    #[test]
    fn test_nested_braces_in_constraint() {
        let p = compile("/code/{code:[A-Z]{2,3}}", PatternKind::Path);
        assert!(p.is_match("/code/AB"));
        assert!(p.is_match("/code/ABC"));
        assert!(!p.is_match("/code/ABCD"));
    }

    #[test]
    fn test_bad_templates() {
        let opts = PatternOptions::default();
        for tpl in ["/{id", "/id}", "/{}", "/{id:}", "/{a}/{a}", "/{id:(\\d+)}", "/{id:[}"] {
            let err = CompiledPattern::compile(tpl, PatternKind::Path, opts).unwrap_err();
            assert!(
                matches!(err, RouteError::BadTemplate { .. }),
                "{tpl} should be rejected, got {err:?}"
            );
        }
        let err = CompiledPattern::compile("novalue", PatternKind::Query, opts).unwrap_err();
        assert!(matches!(err, RouteError::BadTemplate { .. }));
    }

    #[test]
    fn test_strict_slash_accepts_both_forms() {
        let opts = PatternOptions {
            strict_slash: true,
            ..Default::default()
        };
        let p = CompiledPattern::compile("/path/", PatternKind::Path, opts).unwrap();
        assert!(p.is_match("/path/"));
        assert!(p.is_match("/path"));
        assert_eq!(p.render(&HashMap::new()).unwrap(), "/path/");

        // Only paths honour strict slash.
        let prefix = CompiledPattern::compile("/p/", PatternKind::Prefix, opts).unwrap();
        assert!(!prefix.options().strict_slash);
    }

    #[test]
    fn test_query_value_side() {
        let p = compile("page={page:[0-9]+}", PatternKind::Query);
        assert_eq!(p.query_key(), Some("page"));
        assert!(p.is_match("10"));
        assert!(!p.is_match("ten"));

        let any = compile("token=", PatternKind::Query);
        assert!(any.is_match(""));
        assert!(any.is_match("anything"));
    }

    #[test]
    fn test_render() {
        let p = compile("/items/{id:[0-9]+}", PatternKind::Path);
        let mut values = HashMap::new();
        assert_eq!(
            p.render(&values).unwrap_err(),
            RouteError::MissingVariable("id".into())
        );

        values.insert("id".to_string(), "abc".to_string());
        assert!(matches!(
            p.render(&values).unwrap_err(),
            RouteError::VariableConstraint { .. }
        ));

        values.insert("id".to_string(), "42".to_string());
        assert_eq!(p.render(&values).unwrap(), "/items/42");

        let q = compile("q={term}", PatternKind::Query);
        values.insert("term".to_string(), "a b&c".to_string());
        assert_eq!(q.render(&values).unwrap(), "q=a+b%26c");
    }
}
