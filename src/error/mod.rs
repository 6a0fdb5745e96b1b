//! Error handling module for vidops

use thiserror::Error;

use crate::domain::errors::DomainError;

/// Application-level error for configuration, logging and CLI plumbing
#[derive(Error, Debug)]
pub enum VidopsError {
    /// Error raised by the engine itself
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Configuration file or value rejected
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Logging could not be initialized
    #[error("Failed to initialize logging: {message}")]
    LoggingError { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

/// Result type alias for vidops operations
pub type VidopsResult<T> = std::result::Result<T, VidopsError>;
