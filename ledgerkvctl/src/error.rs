//! CLI error types.

use ledgerkv_db::ConfigError;
use ledgerkv_store::StoreError;
use thiserror::Error;

/// CLI-level errors.
#[derive(Debug, Error)]
pub enum CtlError {
    /// Store error
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Bad command line
    #[error("Usage: {0}")]
    Usage(String),

    /// Writing output failed
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding output failed
    #[error("Encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for CLI operations.
pub type CtlResult<T> = Result<T, CtlError>;
