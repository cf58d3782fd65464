/// Daemon error types
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DaemonError>;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration file already exists: {0:?}")]
    ConfigExists(PathBuf),

    #[error("{what} not found: {path:?}")]
    MissingPath { what: &'static str, path: PathBuf },

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for DaemonError {
    fn from(e: config::ConfigError) -> Self {
        DaemonError::Config(e.to_string())
    }
}
