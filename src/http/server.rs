//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Wrap a `RouterService` in tracing and timeout layers
//! - Bind the service to a listener
//! - Shut down gracefully on Ctrl+C

use std::time::Duration;

use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ListenerConfig;
use crate::http::service::RouterService;

/// HTTP host for a route tree.
pub struct HttpServer {
    app: axum::Router,
}

impl HttpServer {
    pub fn new(service: RouterService, config: &ListenerConfig) -> Self {
        Self {
            app: Self::build_app(service, config),
        }
    }

    /// Every request falls through to the route tree.
    #[allow(deprecated)]
    fn build_app(service: RouterService, config: &ListenerConfig) -> axum::Router {
        axum::Router::new()
            .fallback_service(service)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.request_timeout_secs,
            )))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.app.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
