//! Error types for the landing zone components.

use lz_core::{CoreError, DeclarationError};
use thiserror::Error;

/// Result type alias for landing zone operations.
pub type ZoneResult<T> = Result<T, ZoneError>;

/// Errors that can occur while building a landing zone.
#[derive(Error, Debug)]
pub enum ZoneError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Declaration error: {0}")]
    Declaration(#[from] DeclarationError),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

/// Problems with the stack configuration, all fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required configuration value `{0}`")]
    Missing(&'static str),

    #[error("invalid value for `{key}`: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
