//! aproxy manager server.
//!
//! Loads the configuration, restores every persisted proxy and serves the
//! admin API until SIGINT/SIGTERM.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use aproxy::config::{load_or_default, ConfigSource};
use aproxy::error::StartupError;
use aproxy::lifecycle::{bootstrap, shutdown_signal};
use aproxy::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "aproxy", version, about = "Multi-tenant HTTP reverse-proxy manager")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "APROXY_CONFIG", default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            eprintln!("aproxy: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), StartupError> {
    let (config, source) = load_or_default(&cli.config)?;
    let _log_guard = init_logging(&config.observability)?;

    tracing::info!("aproxy v{} starting", env!("CARGO_PKG_VERSION"));
    match &source {
        ConfigSource::File(path) => {
            tracing::info!(path = %path.display(), "Configuration loaded")
        }
        ConfigSource::Defaults(path) => {
            tracing::warn!(path = %path.display(), "Configuration file not found, using defaults")
        }
    }
    tracing::info!(
        manager = %config.manager.bind_address,
        database = %config.database.path.display(),
        log_dir = ?config.observability.log_dir,
        metrics_enabled = config.observability.metrics_enabled,
        "Configuration in effect"
    );

    let app = bootstrap(&config).await?;
    app.serve(shutdown_signal()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
