//! routemux command-line tool.
//!
//! ```text
//! routes.toml
//!     → config (load, validate, build_router with built-in handlers)
//!     → routes | match | url     (inspect the table offline)
//!     → serve                    (HttpServer over RouterService)
//! ```

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::error::Error;
use std::path::PathBuf;

use axum::body::Body;
use axum::http::{Method, Request};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::net::TcpListener;

use routemux::config::{build_router, load_config, RouterConfig};
use routemux::http::handler::builtin_handler;
use routemux::observability::{logging, metrics};
use routemux::routing::{Dispatch, Router};
use routemux::{HttpServer, RouterService};

#[derive(Parser)]
#[command(name = "routemux")]
#[command(about = "Inspect and serve a declarative route table", long_about = None)]
struct Cli {
    /// Route table to load
    #[arg(short, long, default_value = "routes.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every route in the table
    Routes,
    /// Show where a request would be dispatched
    Match {
        method: String,
        url: String,
        /// Request header, as name:value
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
    },
    /// Build a URL for a named route
    Url {
        name: String,
        /// Variables, as key=value
        vars: Vec<String>,
    },
    /// Serve the table over HTTP
    Serve,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    let router = build_router(&config, builtin_handler)?;

    match cli.command {
        Commands::Routes => print_routes(&router)?,
        Commands::Match {
            method,
            url,
            headers,
        } => {
            let req = build_request(&method, &url, &headers)?;
            let (_, decision) = router.dispatch(req);
            let report = DispatchReport::new(&router, decision);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Url { name, vars } => {
            let route = router
                .get(&name)
                .ok_or_else(|| format!("no route named {name:?}"))?;
            let pairs = vars
                .iter()
                .map(|v| {
                    v.split_once('=')
                        .ok_or_else(|| format!("expected key=value, got {v:?}"))
                })
                .collect::<Result<Vec<_>, _>>()?;
            println!("{}", route.build_url(&pairs)?);
        }
        Commands::Serve => serve(config, router).await?,
    }

    Ok(())
}

async fn serve(config: RouterConfig, router: Router) -> Result<(), Box<dyn Error>> {
    logging::init_logging(&config.observability)?;
    tracing::info!("routemux v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::install_exporter(addr)?;
        tracing::info!(metrics_address = %addr, "Prometheus exporter installed");
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        routes = config.routes.len(),
        request_timeout_secs = config.listener.request_timeout_secs,
        "Listening for connections"
    );

    HttpServer::new(RouterService::new(router), &config.listener)
        .run(listener)
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_request(
    method: &str,
    url: &str,
    headers: &[String],
) -> Result<Request<Body>, Box<dyn Error>> {
    let mut builder = Request::builder()
        .method(method.to_ascii_uppercase().as_str())
        .uri(url);
    for header in headers {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| format!("expected name:value, got {header:?}"))?;
        builder = builder.header(name.trim(), value.trim());
    }
    Ok(builder.body(Body::empty())?)
}

fn print_routes(router: &Router) -> Result<(), Infallible> {
    router.walk(|route, _node, ancestors| {
        let indent = "  ".repeat(ancestors.len());
        let methods = route
            .methods()
            .map(|m| m.iter().map(Method::as_str).collect::<Vec<_>>().join(","))
            .unwrap_or_else(|_| "*".to_string());
        let host = route.host_template().unwrap_or_default();
        let path = route.path_template().unwrap_or_default();
        let mut line = format!(
            "{indent}{:<20} {:<16} {host}{path}",
            route.name().unwrap_or("-"),
            methods
        );
        if route.subrouter().is_some() {
            line.push_str(" [subrouter]");
        }
        if let Some(err) = route.error() {
            line.push_str(&format!(" (error: {err})"));
        }
        println!("{line}");
        Ok(())
    })
}

/// JSON view of a dispatch decision.
#[derive(Debug, Default, Serialize)]
struct DispatchReport {
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    route: Option<String>,
    vars: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl DispatchReport {
    fn new(router: &Router, decision: Dispatch) -> Self {
        let outcome = decision.outcome();
        match decision {
            Dispatch::Redirect { location } => Self {
                outcome,
                location: Some(location),
                ..Default::default()
            },
            Dispatch::Matched(m) | Dispatch::MethodNotAllowed(m) | Dispatch::NotFound(m) => Self {
                outcome,
                route: m
                    .route
                    .and_then(|id| router.route(id))
                    .and_then(|r| r.name())
                    .map(str::to_string),
                vars: m.vars.into_iter().collect(),
                location: None,
                error: m.error.map(|e| e.to_string()),
            },
        }
    }
}
