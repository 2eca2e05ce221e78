use async_trait::async_trait;
use claudegate_types::{BackendConfig, BackendKind, BridgeError, BridgeResult, ConfigError};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client;
use tracing::{debug, warn};

use super::Backend;
use crate::error::AppResult;
use crate::proxy::mappers::claude::{MessagesRequest, MessagesResponse};

const ANTHROPIC_VERSION_HEADER: &str = "anthropic-version";
const ANTHROPIC_BETA_HEADER: &str = "anthropic-beta";
const API_KEY_HEADER: &str = "x-api-key";

/// reqwest-backed client for Claude on Vertex AI or the Anthropic API.
pub struct UpstreamClient {
    http_client: Client,
    config: BackendConfig,
    base_url: String,
    base_headers: HeaderMap,
}

/// Fully prepared HTTP call.
#[derive(Debug)]
pub struct PreparedCall {
    pub url: String,
    pub headers: HeaderMap,
    pub body: MessagesRequest,
}

impl UpstreamClient {
    /// Accepts a pre-built `reqwest::Client` so tests can share one.
    pub fn new(http_client: Client, config: BackendConfig) -> AppResult<Self> {
        let base_url = config.resolved_base_url();
        if let Err(e) = url::Url::parse(&base_url) {
            return Err(ConfigError::ValidationError {
                field: "backend.base_url".to_string(),
                message: format!("'{}' is not a valid URL: {}", base_url, e),
            }
            .into());
        }

        let mut base_headers = HeaderMap::new();
        base_headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
            let (name, value) = match config.kind {
                BackendKind::Vertex => (header::AUTHORIZATION, format!("Bearer {}", key)),
                BackendKind::Anthropic => (header::HeaderName::from_static(API_KEY_HEADER), key.to_string()),
            };
            let value = HeaderValue::from_str(&value).map_err(|e| ConfigError::ValidationError {
                field: "backend.api_key".to_string(),
                message: e.to_string(),
            })?;
            base_headers.insert(name, value);
        } else {
            warn!("No backend credential configured; requests are sent unauthenticated");
        }
        if config.kind == BackendKind::Anthropic {
            let version = HeaderValue::from_str(&config.resolved_anthropic_version()).map_err(|e| {
                ConfigError::ValidationError {
                    field: "backend.anthropic_version".to_string(),
                    message: e.to_string(),
                }
            })?;
            base_headers.insert(ANTHROPIC_VERSION_HEADER, version);
        }

        Ok(Self { http_client, config, base_url, base_headers })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Endpoint for a backend model id.
    pub fn endpoint(&self, model: &str) -> BridgeResult<String> {
        match self.config.kind {
            BackendKind::Vertex => {
                let project = self
                    .config
                    .project_id
                    .as_deref()
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| BridgeError::backend(None, "vertex backend has no project_id"))?;
                Ok(format!(
                    "{}/v1/projects/{}/locations/{}/publishers/anthropic/models/{}:rawPredict",
                    self.base_url, project, self.config.region, model
                ))
            }
            BackendKind::Anthropic => Ok(format!("{}/v1/messages", self.base_url)),
        }
    }

    /// Apply the flavor-specific wire rules to an assembled request.
    ///
    /// Vertex: model moves into the URL, version and betas go in the body.
    /// Anthropic: model stays, version and betas go in headers.
    pub fn prepare(&self, request: &MessagesRequest) -> BridgeResult<PreparedCall> {
        let model = request
            .model
            .clone()
            .filter(|m| !m.is_empty())
            .ok_or_else(|| BridgeError::assembly("backend request has no model"))?;
        let url = self.endpoint(&model)?;
        let mut headers = self.base_headers.clone();
        let mut body = request.clone();

        match self.config.kind {
            BackendKind::Vertex => {
                body.model = None;
                body.anthropic_version = Some(self.config.resolved_anthropic_version());
                body.anthropic_beta = (!request.betas.is_empty()).then(|| request.betas.clone());
            }
            BackendKind::Anthropic => {
                body.anthropic_version = None;
                body.anthropic_beta = None;
                if !request.betas.is_empty() {
                    let value = HeaderValue::from_str(&request.betas.join(","))
                        .map_err(|e| BridgeError::assembly(format!("invalid beta flag: {}", e)))?;
                    headers.insert(ANTHROPIC_BETA_HEADER, value);
                }
            }
        }
        Ok(PreparedCall { url, headers, body })
    }
}

fn transport_error(e: &reqwest::Error) -> BridgeError {
    if e.is_timeout() {
        BridgeError::backend(Some(504), format!("backend timed out: {}", e))
    } else {
        BridgeError::backend(None, format!("backend unreachable: {}", e))
    }
}

#[async_trait]
impl Backend for UpstreamClient {
    async fn send(&self, request: &MessagesRequest) -> BridgeResult<MessagesResponse> {
        let call = self.prepare(request)?;
        debug!(url = %call.url, kind = %self.config.kind, "Calling backend");

        let response = self
            .http_client
            .post(&call.url)
            .headers(call.headers)
            .json(&call.body)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| transport_error(&e))?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "Backend returned an error status");
            return Err(BridgeError::backend(Some(status.as_u16()), text));
        }

        serde_json::from_str::<MessagesResponse>(&text).map_err(|e| {
            BridgeError::backend(Some(status.as_u16()), format!("unparseable backend reply: {}", e))
        })
    }
}
