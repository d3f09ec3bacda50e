//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (pool size > 0, ceiling > 0)
//! - Check the bind address is parseable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServerConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("workers.pool_size must be greater than zero")]
    ZeroPoolSize,

    #[error("workers.queue_capacity must be greater than zero")]
    ZeroQueueCapacity,

    #[error("listener.max_connections must be greater than zero")]
    ZeroMaxConnections,

    #[error("invalid bind address {0:?}")]
    InvalidBindAddress(String),

    #[error("limits.max_header_line and limits.max_header_size must be greater than zero")]
    ZeroHeaderLimit,

    #[error("storage.web_root must not be empty")]
    EmptyWebRoot,

    #[error("unknown log format {0:?} (expected \"pretty\" or \"json\")")]
    UnknownLogFormat(String),
}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.workers.pool_size == 0 {
        errors.push(ValidationError::ZeroPoolSize);
    }
    if config.workers.queue_capacity == 0 {
        errors.push(ValidationError::ZeroQueueCapacity);
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }

    let bind_address = config.listener.bind_address();
    if bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(bind_address));
    }

    if config.limits.max_header_line == 0 || config.limits.max_header_size == 0 {
        errors.push(ValidationError::ZeroHeaderLimit);
    }

    if config.storage.web_root.as_os_str().is_empty() {
        errors.push(ValidationError::EmptyWebRoot);
    }

    match config.observability.log_format.as_str() {
        "pretty" | "json" => {}
        other => errors.push(ValidationError::UnknownLogFormat(other.to_string())),
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
