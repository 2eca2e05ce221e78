//! Domain models for Claudegate.

pub mod config;

pub use config::{
    BackendConfig, BackendKind, GatewayConfig, ThinkingPolicy, VERTEX_SUPPORTED_BETAS,
};
