//! Request router with templated matchers, nested subrouters and reverse
//! URL building.

pub mod config;
pub mod http;
pub mod observability;
pub mod routing;

pub use config::schema::RouterConfig;
pub use http::{BoxHandler, HttpServer, RouterService};
pub use routing::{Route, RouteError, RouteMatch, Router};
