//! Crate-level error types.

use thiserror::Error;

use crate::config::ConfigError;
use crate::observability::logging::LoggingError;
use crate::store::StoreError;

/// Failures of topology-mutating and listing operations.
///
/// `Display` is the message returned to admin API clients.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicated port {0}")]
    DuplicatedPort(u16),

    #[error("proxy server not found")]
    ProxyNotFound,

    #[error("duplicated location.src")]
    DuplicatedLocation,

    #[error("can not found the location.src")]
    LocationNotFound,

    #[error("duplicated backend")]
    DuplicatedBackend,

    #[error("can not found the backends")]
    BackendNotFound,

    /// The store failed; details are logged, clients only see the generic text.
    #[error("system error")]
    Storage(#[from] StoreError),
}

/// Fatal errors before the process starts serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to initialise logging: {0}")]
    Logging(#[from] LoggingError),

    #[error("failed to open topology store: {0}")]
    Store(#[source] StoreError),

    #[error("failed to load topology: {0}")]
    Load(#[source] StoreError),

    #[error("failed to install metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to bind manager listener on {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
