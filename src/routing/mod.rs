//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (single-threaded setup):
//!     Router / RouterMut / RouteMut builders
//!     → template.rs (compile host, path, query templates)
//!     → matcher.rs (one predicate per constraint)
//!     → Freeze as Arc<Router>
//!
//! Incoming Request:
//!     → router.rs (clean path, scan routes, recurse into subrouters)
//!     → route.rs (evaluate matcher chain, strict slash, extract vars)
//!     → matching.rs (RouteMatch, Dispatch decision)
//!     → context.rs (publish route, router and vars to the handler)
//! ```
//!
//! # Design Decisions
//! - Routes are immutable once serving starts (thread-safe without locks)
//! - Deterministic: registration order is priority order, first match wins
//! - Registration errors are deferred onto the route, never panics

pub mod clean;
pub mod context;
pub mod error;
pub mod matcher;
pub mod matching;
pub mod route;
pub mod router;
pub mod template;

pub use clean::{clean_path, replace_uri_path};
pub use context::{current_route, current_router, set_url_vars, vars, CurrentRoute, CurrentRouter, RouteVars};
pub use error::{MatchError, RouteError};
pub use matcher::{Matcher, MatcherKey};
pub use matching::{Dispatch, RouteMatch};
pub use route::{Route, RouteMut};
pub use router::{RouteId, Router, RouterId, RouterMut, RouterNode};
pub use template::{CompiledPattern, PatternKind, PatternOptions};
