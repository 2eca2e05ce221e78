//! Typed error definitions for Claudegate.
//!
//! - **Serializable** for API responses via serde
//! - **Displayable** for logging via Display trait
//! - **Matchable** for error handling logic via enum variants

mod bridge;
mod config;

pub use bridge::{BridgeError, BridgeResult};
pub use config::ConfigError;
