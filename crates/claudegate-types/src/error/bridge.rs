//! Errors raised by the request/response bridging transformer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure taxonomy of a single bridged exchange.
///
/// Only tool-choice repair is recovered locally; every other failure is
/// surfaced to the caller through one of these variants.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum BridgeError {
    /// Structurally invalid inbound message or content block.
    #[error("Invalid request: {message}")]
    Parse { message: String },

    /// An internal invariant was violated after every repair step ran.
    #[error("Request assembly failed: {message}")]
    Assembly { message: String },

    /// The backend call failed or returned an error status.
    #[error("Backend error{}: {message}", status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    Backend { status: Option<u16>, message: String },
}

impl BridgeError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse { message: message.into() }
    }

    pub fn assembly(message: impl Into<String>) -> Self {
        Self::Assembly { message: message.into() }
    }

    pub fn backend(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Backend { status, message: message.into() }
    }

    /// Check if this is a client error (4xx equivalent).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }

    /// Get HTTP status code for this error.
    ///
    /// Backend statuses are passed through when they are real HTTP error codes.
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Parse { .. } => 400,
            Self::Assembly { .. } => 500,
            Self::Backend { status: Some(s), .. } if (400..=599).contains(s) => *s,
            Self::Backend { .. } => 502,
        }
    }

    /// OpenAI-style `error.type` string.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "invalid_request_error",
            Self::Assembly { .. } => "internal_error",
            Self::Backend { .. } => "upstream_error",
        }
    }

    /// The bare diagnostic without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Parse { message } | Self::Assembly { message } | Self::Backend { message, .. } => {
                message
            }
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        Self::parse(e.to_string())
    }
}

/// Result type alias for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
