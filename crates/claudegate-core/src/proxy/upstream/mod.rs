//! Upstream module - the backend collaborator behind the bridge

pub mod client;

use async_trait::async_trait;
use claudegate_types::BridgeResult;

use crate::proxy::mappers::claude::{MessagesRequest, MessagesResponse};

pub use client::UpstreamClient;

/// Something that can complete an assembled backend request.
///
/// Non-success replies surface as `BridgeError::Backend` with the backend's
/// status and body intact. Implementations do not retry.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn send(&self, request: &MessagesRequest) -> BridgeResult<MessagesResponse>;
}
