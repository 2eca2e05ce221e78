//! # Claudegate Core
//!
//! OpenAI chat-completions gateway in front of Claude (Vertex AI or the
//! Anthropic Messages API).
//!
//! ```text
//! claudegate-core/src/
//! ├── modules/          # config loading, logging setup
//! └── proxy/
//!     ├── mappers/      # content model, wire types, the bridge pipeline
//!     ├── upstream/     # Backend trait + reqwest client
//!     ├── handlers/     # axum handlers
//!     ├── observer.rs   # transform observability sink
//!     └── server.rs     # router + server
//! ```

#![allow(
    clippy::too_many_arguments,
    reason = "Protocol transformation functions take many independent inputs"
)]
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing,
        clippy::float_cmp
    )
)]

pub mod error;
pub mod modules;
pub mod proxy;

// Re-export commonly used types
pub use error::{AppError, AppResult};
pub use proxy::mappers::bridge::Bridge;
pub use proxy::{build_proxy_router, AppState, AxumServer};
