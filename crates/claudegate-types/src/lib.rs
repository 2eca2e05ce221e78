//! # Claudegate Types
//!
//! Error taxonomy and configuration models shared by the gateway crates.
//!
//! - **`error`** - `BridgeError` (parse / assembly / backend) and `ConfigError`
//! - **`models`** - `GatewayConfig` and its nested backend/thinking sections
//!
//! ## Architecture Role
//!
//! ```text
//!        claudegate-types (this crate)
//!                │
//!                ▼
//!        claudegate-core
//!                │
//!                ▼
//!        claudegate-server
//! ```

pub mod error;
pub mod models;

pub use error::{BridgeError, BridgeResult, ConfigError};
pub use models::{BackendConfig, BackendKind, GatewayConfig, ThinkingPolicy};
