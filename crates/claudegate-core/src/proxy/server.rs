use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::proxy::handlers;
use crate::proxy::mappers::bridge::Bridge;
use crate::proxy::upstream::Backend;

/// Request bodies above this size are rejected before parsing.
const MAX_BODY_BYTES: usize = 100 * 1024 * 1024;

/// Axum application state.
#[derive(Clone)]
pub struct AppState {
    pub bridge: Arc<Bridge>,
    pub backend: Arc<dyn Backend>,
    /// Ids advertised on `/v1/models`.
    pub models: Arc<Vec<String>>,
}

impl AppState {
    pub fn new(bridge: Bridge, backend: Arc<dyn Backend>, models: Vec<String>) -> Self {
        Self { bridge: Arc::new(bridge), backend, models: Arc::new(models) }
    }
}

/// Build the gateway router.
pub fn build_proxy_router(state: AppState) -> Router<()> {
    Router::new()
        // OpenAI Protocol
        .route("/v1/models", get(handlers::models::handle_list_models))
        .route("/v1/chat/completions", post(handlers::chat::handle_chat_completions))
        .route("/chat/completions", post(handlers::chat::handle_chat_completions))
        // Utility
        .route("/health", get(handlers::handle_health))
        .route("/healthz", get(handlers::handle_health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Configuration for starting the Axum server
pub struct ServerStartConfig {
    pub host: String,
    pub port: u16,
    pub state: AppState,
}

/// Axum server instance
pub struct AxumServer {
    config: ServerStartConfig,
}

impl AxumServer {
    pub fn new(config: ServerStartConfig) -> Self {
        Self { config }
    }

    /// Bind and serve with an extra layer applied by the caller (CORS etc.).
    pub async fn run_with<F>(self, wrap: F) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        F: FnOnce(Router<()>) -> Router<()>,
    {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        tracing::info!("Starting Axum server on {}", addr);

        let app = wrap(build_proxy_router(self.config.state));
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.run_with(|router| router).await
    }
}
