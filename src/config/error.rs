//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid listen address: {0}")]
    InvalidAddress(String),

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Mailbox capacity must be at least 1")]
    InvalidMailboxCapacity,

    #[error("Maximum message size must be at least 1 byte")]
    InvalidMessageSize,

    #[error("Write deadline must be between 1 and 300 seconds")]
    InvalidWriteWait,

    #[error("Liveness timeout must be between 2 and 3600 seconds")]
    InvalidPongWait,
}
