//! HTTP-facing pieces around the routing engine.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum host, trace and timeout layers)
//!     → service.rs (RouterService: dispatch, publish context)
//!     → request.rs (routing view: scheme, host, decoded path, query)
//!     → middleware/ (router and route middleware around the handler)
//!     → handler.rs (matched handler or 404/405/redirect fallback)
//! ```

pub mod handler;
pub mod middleware;
pub mod request;
pub mod server;
pub mod service;

pub use handler::{BoxHandler, Handler};
pub use middleware::Middleware;
pub use request::RequestParts;
pub use server::HttpServer;
pub use service::RouterService;
