//! Configuration-related errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Config read error at {path}: {message}")]
    ReadError {
        /// Filesystem path that was read
        path: String,
        /// Underlying IO failure
        message: String,
    },

    /// Config file parse error (JSON)
    #[error("Config parse error: {message}")]
    ParseError {
        /// Description of the parse failure
        message: String,
    },

    /// Config validation error (invalid values)
    #[error("Config validation error for {field}: {message}")]
    ValidationError {
        /// Name of the field that failed validation
        field: String,
        /// Description of the validation failure
        message: String,
    },
}

impl ConfigError {
    /// Create a parse error from a serde_json error.
    pub fn from_json_error(e: &serde_json::Error) -> Self {
        Self::ParseError { message: e.to_string() }
    }

    /// Create a read error from an IO error.
    pub fn from_io_error(path: &std::path::Path, e: &std::io::Error) -> Self {
        Self::ReadError { path: path.display().to_string(), message: e.to_string() }
    }

    /// Flatten validator output into the first offending field.
    pub fn from_validation(errors: &validator::ValidationErrors) -> Self {
        let (field, message) = errors
            .errors()
            .iter()
            .next()
            .map(|(field, kind)| (field.to_string(), format!("{:?}", kind)))
            .unwrap_or_else(|| ("<unknown>".to_string(), errors.to_string()));
        Self::ValidationError { field, message }
    }
}
