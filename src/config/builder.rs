//! Route table → route tree.

use crate::config::loader::ConfigError;
use crate::config::schema::{RouteConfig, RouterConfig};
use crate::http::handler::BoxHandler;
use crate::routing::{Router, RouterMut};

/// Build a route tree from a validated configuration.
///
/// `resolver` maps handler keys to handlers; an unknown key is an error.
/// Deferred registration errors are reported for the first failing route.
pub fn build_router<F>(config: &RouterConfig, resolver: F) -> Result<Router, ConfigError>
where
    F: Fn(&str) -> Option<BoxHandler>,
{
    let mut router = Router::new();
    {
        let flags = &config.router;
        let mut root = router.root();
        root.strict_slash(flags.strict_slash)
            .skip_clean(flags.skip_clean)
            .omit_route_from_context(flags.omit_route_from_context)
            .omit_router_from_context(flags.omit_router_from_context);
        if flags.use_encoded_path {
            root.use_encoded_path();
        }
        add_routes(&mut root, &config.routes, &resolver)?;
    }

    if let Some((id, error)) = router.errors().first() {
        let route = router
            .route(*id)
            .and_then(|r| r.name())
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{}", id.0));
        return Err(ConfigError::Route {
            route,
            source: (*error).clone(),
        });
    }

    Ok(router)
}

fn add_routes<F>(
    node: &mut RouterMut<'_>,
    routes: &[RouteConfig],
    resolver: &F,
) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<BoxHandler>,
{
    for rc in routes {
        let mut route = node.new_route();

        // Named first so a failing template still reports the table name.
        if let Some(name) = &rc.name {
            route = route.name(name);
        }
        if let Some(host) = &rc.host {
            route = route.host(host);
        }
        if let Some(prefix) = &rc.path_prefix {
            route = route.path_prefix(prefix);
        }
        if let Some(path) = &rc.path {
            route = route.path(path);
        }
        if !rc.methods.is_empty() {
            let methods: Vec<&str> = rc.methods.iter().map(String::as_str).collect();
            route = route.methods(&methods);
        }
        if !rc.schemes.is_empty() {
            let schemes: Vec<&str> = rc.schemes.iter().map(String::as_str).collect();
            route = route.schemes(&schemes);
        }
        if !rc.headers.is_empty() {
            route = route.headers(&pairs(&rc.headers));
        }
        if !rc.queries.is_empty() {
            route = route.queries(&pairs(&rc.queries));
        }
        if rc.build_only {
            route = route.build_only();
        }
        for (key, value) in &rc.metadata {
            route = route.metadata(key, value.clone());
        }
        if let Some(key) = &rc.handler {
            let handler = resolver(key).ok_or_else(|| ConfigError::UnknownHandler(key.clone()))?;
            route = route.handler(handler);
        }
        if !rc.routes.is_empty() {
            let mut sub = route.subrouter();
            add_routes(&mut sub, &rc.routes, resolver)?;
        }
    }
    Ok(())
}

fn pairs(map: &std::collections::BTreeMap<String, String>) -> Vec<(&str, &str)> {
    map.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::from_toml_str;
    use axum::body::Body;
    use axum::http::Request;

    fn resolver(key: &str) -> Option<BoxHandler> {
        (key == "ok").then(|| BoxHandler::from_fn(|_req: Request<Body>| async { "ok" }))
    }

    #[test]
    fn test_builds_nested_tree() {
        let config = from_toml_str(
            r#"
            [[routes]]
            name = "api"
            host = "{sub}.example.com"
            path_prefix = "/api"

            [[routes.routes]]
            name = "item"
            path = "/items/{id:[0-9]+}"
            methods = ["get"]
            handler = "ok"
            "#,
        )
        .unwrap();
        let router = build_router(&config, resolver).unwrap();

        let item = router.get("item").unwrap();
        assert_eq!(item.path_template().unwrap(), "/api/items/{id:[0-9]+}");
        assert_eq!(
            item.build_url(&[("sub", "v1"), ("id", "5")]).unwrap().to_string(),
            "http://v1.example.com/api/items/5"
        );

        let req = Request::builder()
            .uri("http://v1.example.com/api/items/5")
            .body(Body::default())
            .unwrap();
        let m = router.match_request(&req);
        assert!(m.is_match());
        assert_eq!(m.vars["sub"], "v1");
    }

    #[test]
    fn test_unknown_handler() {
        let config = from_toml_str(
            r#"
            [[routes]]
            path = "/x"
            handler = "missing"
            "#,
        )
        .unwrap();
        assert!(matches!(
            build_router(&config, resolver),
            Err(ConfigError::UnknownHandler(key)) if key == "missing"
        ));
    }

    #[test]
    fn test_duplicate_var_surfaces_as_route_error() {
        // Passes per-template validation, fails when templates combine.
        let config = from_toml_str(
            r#"
            [[routes]]
            name = "clash"
            host = "{id}.example.com"
            path = "/{id}"
            "#,
        )
        .unwrap();
        assert!(matches!(
            build_router(&config, resolver),
            Err(ConfigError::Route { route, .. }) if route == "clash"
        ));

        let nested = from_toml_str(
            r#"
            [[routes]]
            name = "api"
            path_prefix = "/api/{id}"

            [[routes.routes]]
            name = "inner"
            queries = { id = "{id}" }
            "#,
        )
        .unwrap();
        assert!(matches!(
            build_router(&nested, resolver),
            Err(ConfigError::Route { route, .. }) if route == "inner"
        ));
    }
}
