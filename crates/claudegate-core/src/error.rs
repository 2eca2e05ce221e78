//! Unified error types for Claudegate Core.

use claudegate_types::{BridgeError, ConfigError};
use serde::Serialize;
use thiserror::Error;

/// Infrastructure error type for everything outside a single bridged exchange.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    /// Network request failed (HTTP client).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// File system I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation failed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A bridged exchange failed.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// Logging could not be initialized.
    #[error("Logging error: {0}")]
    Logging(String),
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

/// Result type alias for Claudegate operations.
pub type AppResult<T> = Result<T, AppError>;
