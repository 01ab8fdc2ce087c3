//! Handler middleware.
//!
//! Middleware wraps the resolved handler after matching. A router node's
//! middleware applies to every route it owns, in registration order with the
//! first registered being outermost.

pub mod cors;

use std::sync::Arc;

use crate::http::handler::BoxHandler;

pub use cors::cors_method_middleware;

/// Transforms a handler into another handler.
pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, next: BoxHandler) -> BoxHandler;
}

impl<F> Middleware for F
where
    F: Fn(BoxHandler) -> BoxHandler + Send + Sync + 'static,
{
    fn wrap(&self, next: BoxHandler) -> BoxHandler {
        self(next)
    }
}

pub type SharedMiddleware = Arc<dyn Middleware>;

/// Wrap `handler` so that `chain[0]` runs first.
pub fn apply_chain(chain: &[SharedMiddleware], handler: BoxHandler) -> BoxHandler {
    chain.iter().rev().fold(handler, |next, mw| mw.wrap(next))
}
