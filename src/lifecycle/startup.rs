//! Startup orchestration.
//!
//! # Responsibilities
//! - Install the metrics exporter when enabled
//! - Open the topology store and start every persisted proxy
//! - Bind the admin listener
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - The admin listener binds last

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use crate::admin::setup_admin_router;
use crate::config::AppConfig;
use crate::error::StartupError;
use crate::observability::metrics;
use crate::proxy::{InstanceOptions, TracingEvents};
use crate::registry::ProxyRegistry;
use crate::store::ConfigStore;

/// A bootstrapped process: running proxies plus a bound admin listener.
#[derive(Debug)]
pub struct Application {
    pub registry: Arc<ProxyRegistry>,
    listener: TcpListener,
    router: Router,
}

impl Application {
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve the admin API until `shutdown` resolves, then close every proxy.
    pub async fn serve<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.listener.local_addr()?;
        tracing::info!(address = %addr, "Manager server listening");

        let result = axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await;

        self.registry.shutdown();
        tracing::info!("Manager server stopped");
        result
    }
}

pub async fn bootstrap(config: &AppConfig) -> Result<Application, StartupError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let store = ConfigStore::open(&config.database).map_err(StartupError::Store)?;
    tracing::info!(path = %config.database.path.display(), "Topology store opened");

    let options = InstanceOptions {
        threads: None,
        connect_timeout: config.upstream.connect_timeout(),
        events: Arc::new(TracingEvents),
    };
    let registry = Arc::new(ProxyRegistry::startup(store, options).map_err(StartupError::Load)?);

    let router = setup_admin_router(Arc::clone(&registry), config.manager.max_body_size);
    let listener = TcpListener::bind(&config.manager.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.manager.bind_address.clone(),
            source,
        })?;

    Ok(Application {
        registry,
        listener,
        router,
    })
}
