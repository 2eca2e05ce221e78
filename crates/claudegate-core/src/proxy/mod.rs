//! Proxy module - OpenAI chat-completions front end for Claude
//!
//! - `mappers`: content model, wire types and the bridge pipeline
//! - `upstream`: backend trait and the Vertex / Anthropic client
//! - `handlers` + `server`: the axum surface

pub mod common;
pub mod handlers;
pub mod mappers;
pub mod observer;
pub mod server;
pub mod upstream;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use observer::{
    ExchangeContext, FanoutObserver, JsonlObserver, NoopObserver, TracingObserver, TransformObserver,
};
pub use server::{build_proxy_router, AppState, AxumServer, ServerStartConfig};
pub use upstream::{Backend, UpstreamClient};
