//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RouterConfig (validated, immutable)
//!     → builder.rs (register routes, resolve handler keys)
//!     → Router
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod builder;
pub mod loader;
pub mod schema;
pub mod validation;

pub use builder::build_router;
pub use loader::{from_toml_str, load_config, ConfigError};
pub use schema::{ListenerConfig, LogFormat, ObservabilityConfig, RouteConfig, RouterConfig, RouterFlags};
