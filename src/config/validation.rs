//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (readers > 0, map size, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::AppConfig;

/// Smallest accepted LMDB map size.
pub const MIN_MAP_SIZE: usize = 1024 * 1024;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.manager.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "manager.bind_address",
            format!("'{}' is not a socket address", config.manager.bind_address),
        ));
    }
    if config.manager.max_body_size == 0 {
        errors.push(ValidationError::new("manager.max_body_size", "must be > 0"));
    }

    if config.database.path.as_os_str().is_empty() {
        errors.push(ValidationError::new("database.path", "must not be empty"));
    }
    if config.database.max_readers == 0 {
        errors.push(ValidationError::new("database.max_readers", "must be > 0"));
    }
    if config.database.map_size < MIN_MAP_SIZE {
        errors.push(ValidationError::new(
            "database.map_size",
            format!("must be at least {} bytes", MIN_MAP_SIZE),
        ));
    }

    if config.upstream.connect_timeout_secs == 0 {
        errors.push(ValidationError::new("upstream.connect_timeout_secs", "must be > 0"));
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
    }
    if config
        .observability
        .log_dir
        .as_ref()
        .is_some_and(|dir| dir.as_os_str().is_empty())
    {
        errors.push(ValidationError::new("observability.log_dir", "must not be empty"));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
