//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::RouterConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::routing::error::RouteError;

/// Error type for configuration loading and route table construction.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("unknown handler {0:?}")]
    UnknownHandler(String),

    #[error("route {route}: {source}")]
    Route {
        route: String,
        #[source]
        source: RouteError,
    },
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<RouterConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    from_toml_str(&content)
}

/// Parse and validate configuration from TOML text.
pub fn from_toml_str(content: &str) -> Result<RouterConfig, ConfigError> {
    let config: RouterConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogFormat;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = from_toml_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
        assert!(config.routes.is_empty());
    }

    #[test]
    fn test_nested_routes() {
        let config = from_toml_str(
            r#"
            [router]
            strict_slash = true

            [observability]
            log_format = "json"

            [[routes]]
            name = "api"
            path_prefix = "/api"

            [[routes.routes]]
            name = "item"
            path = "/items/{id:[0-9]+}"
            methods = ["GET"]
            handler = "echo"
            metadata = { owner = "team-a" }
            "#,
        )
        .unwrap();

        assert!(config.router.strict_slash);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        let nested = &config.routes[0].routes[0];
        assert_eq!(nested.name.as_deref(), Some("item"));
        assert_eq!(nested.metadata["owner"], serde_json::json!("team-a"));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(from_toml_str("routes = 3"), Err(ConfigError::Parse(_))));

        let err = from_toml_str(
            r#"
            [[routes]]
            path = "/{id"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref e) if e.len() == 1));
        assert!(err.to_string().starts_with("Validation failed: "));

        assert!(matches!(
            load_config(Path::new("/definitely/not/here.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
