//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global `tracing` subscriber
//! - Select pretty or JSON output on stdout
//! - Optionally mirror events to a daily rolling file in `log_dir`
//! - Apply the configured level unless `RUST_LOG` is set

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// Log files are named `log.YYYY-MM-DD.log`.
const LOG_FILE_PREFIX: &str = "log";
const LOG_FILE_SUFFIX: &str = "log";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to open log directory: {0}")]
    Appender(#[from] InitError),

    #[error(transparent)]
    Init(#[from] TryInitError),
}

/// Install the global subscriber. Fails if one is already installed.
///
/// When `log_dir` is set the returned guard flushes the file writer on drop;
/// keep it alive for the life of the process.
pub fn init_logging(config: &ObservabilityConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = config.log_level.to_ascii_lowercase();
        EnvFilter::new(format!("{level},aproxy={level},tower_http={level}"))
    });

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(LOG_FILE_PREFIX)
                .filename_suffix(LOG_FILE_SUFFIX)
                .build(dir)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    match config.log_format {
        LogFormat::Pretty => registry.with(fmt::layer()).try_init()?,
        LogFormat::Json => registry.with(fmt::layer().json()).try_init()?,
    }
    Ok(guard)
}
