//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (read & deserialize, defaults when absent)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → handed by value/reference to bootstrap
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the proxy topology lives in the store, not here
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, ConfigError, ConfigSource};
pub use schema::{
    AppConfig, DatabaseConfig, LogFormat, ManagerConfig, ObservabilityConfig, UpstreamConfig,
};
