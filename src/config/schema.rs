//! Configuration schema definitions.
//!
//! This module defines the declarative route table and the settings of the
//! `routemux` binary. All types derive Serde traits for deserialization
//! from TOML.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouterConfig {
    /// Root router flags.
    pub router: RouterFlags,

    /// Listener configuration for `serve`.
    pub listener: ListenerConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Route table, in priority order.
    pub routes: Vec<RouteConfig>,
}

/// Flags applied to the root router before any route is registered.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouterFlags {
    pub strict_slash: bool,
    pub skip_clean: bool,
    pub use_encoded_path: bool,
    pub omit_route_from_context: bool,
    pub omit_router_from_context: bool,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Install the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// One route. Nested `routes` turn it into a subrouter prefix.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouteConfig {
    /// Unique name for reverse building.
    pub name: Option<String>,

    /// Host template, e.g. "{sub}.example.com".
    pub host: Option<String>,

    /// Full path template.
    pub path: Option<String>,

    /// Path prefix template.
    pub path_prefix: Option<String>,

    pub methods: Vec<String>,

    pub schemes: Vec<String>,

    /// Header name to exact value; empty value means presence only.
    pub headers: BTreeMap<String, String>,

    /// Query key to value template.
    pub queries: BTreeMap<String, String>,

    /// Key of a built-in or resolver-provided handler.
    pub handler: Option<String>,

    /// Only used for URL building.
    pub build_only: bool,

    pub metadata: BTreeMap<String, serde_json::Value>,

    /// Routes of the subrouter created under this route.
    pub routes: Vec<RouteConfig>,
}

impl RouteConfig {
    /// Name used in diagnostics.
    pub fn label(&self, fallback: &str) -> String {
        self.name.clone().unwrap_or_else(|| fallback.to_string())
    }
}
