//! Gateway, backend and thinking-policy configuration models.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use validator::{Validate, ValidationError};

/// Beta flags known to be accepted by Claude on Vertex AI.
///
/// Other betas (prompt caching, effort, files API, ...) are rejected there.
pub const VERTEX_SUPPORTED_BETAS: [&str; 4] = [
    "tool-search-tool-2025-10-19",
    "web-search-2025-03-05",
    "computer-use-2024-10-22",
    "computer-use-2025-01-24",
];

// ============================================================================
// Enums
// ============================================================================

/// Which wire flavor the backend speaks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Claude on Vertex AI (`:rawPredict`, model in the URL)
    #[default]
    Vertex,
    /// Anthropic Messages API (`/v1/messages`)
    Anthropic,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Vertex => write!(f, "vertex"),
            BackendKind::Anthropic => write!(f, "anthropic"),
        }
    }
}

impl BackendKind {
    /// Parse from string.
    pub fn from_string(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vertex" | "vertex_ai" => Some(BackendKind::Vertex),
            "anthropic" => Some(BackendKind::Anthropic),
            _ => None,
        }
    }
}

// ============================================================================
// Backend Configuration
// ============================================================================

/// Backend endpoint and credential wiring.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[validate(schema(function = "validate_backend"))]
pub struct BackendConfig {
    /// Backend flavor
    #[serde(default)]
    pub kind: BackendKind,
    /// Override for the base URL (scheme + host, no trailing path)
    #[serde(default)]
    pub base_url: Option<String>,
    /// Google Cloud project (Vertex only)
    #[serde(default)]
    pub project_id: Option<String>,
    /// Google Cloud region (Vertex only)
    #[validate(length(min = 1))]
    #[serde(default = "default_region")]
    pub region: String,
    /// Bearer token (Vertex) or `x-api-key` (Anthropic)
    #[serde(default)]
    pub api_key: Option<String>,
    /// Override for `anthropic_version` / `anthropic-version`
    #[serde(default)]
    pub anthropic_version: Option<String>,
    /// Beta flags the backend accepts; anything else is never forwarded
    #[serde(default = "default_supported_betas")]
    pub supported_betas: Vec<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            base_url: None,
            project_id: None,
            region: default_region(),
            api_key: None,
            anthropic_version: None,
            supported_betas: default_supported_betas(),
        }
    }
}

impl BackendConfig {
    /// Base URL with defaults applied per backend flavor.
    pub fn resolved_base_url(&self) -> String {
        if let Some(url) = self.base_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            return url.trim_end_matches('/').to_string();
        }
        match self.kind {
            BackendKind::Vertex if self.region == "global" => {
                "https://aiplatform.googleapis.com".to_string()
            }
            BackendKind::Vertex => format!("https://{}-aiplatform.googleapis.com", self.region),
            BackendKind::Anthropic => "https://api.anthropic.com".to_string(),
        }
    }

    /// Version string the backend expects.
    pub fn resolved_anthropic_version(&self) -> String {
        if let Some(v) = self.anthropic_version.as_deref().filter(|v| !v.is_empty()) {
            return v.to_string();
        }
        match self.kind {
            BackendKind::Vertex => "vertex-2023-10-16".to_string(),
            BackendKind::Anthropic => "2023-06-01".to_string(),
        }
    }
}

fn validate_backend(backend: &BackendConfig) -> Result<(), ValidationError> {
    if backend.kind == BackendKind::Vertex
        && backend.project_id.as_deref().map(str::trim).unwrap_or_default().is_empty()
    {
        let mut err = ValidationError::new("project_id_required");
        err.message = Some("vertex backend requires backend.project_id".into());
        return Err(err);
    }
    Ok(())
}

// ============================================================================
// Thinking Policy
// ============================================================================

/// Budget heuristics for extended thinking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct ThinkingPolicy {
    /// `max_tokens` used when the client sends none
    #[validate(range(min = 1))]
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,
    /// Share of `max_tokens` given to thinking
    #[validate(range(min = 0.05, max = 0.95))]
    #[serde(default = "default_budget_ratio")]
    pub budget_ratio: f32,
    /// Smallest budget the backend accepts
    #[serde(default = "default_min_budget_tokens")]
    pub min_budget_tokens: u32,
    /// Tokens always left for the visible answer
    #[serde(default = "default_response_headroom")]
    pub response_headroom: u32,
}

impl Default for ThinkingPolicy {
    fn default() -> Self {
        Self {
            default_max_tokens: default_max_tokens(),
            budget_ratio: default_budget_ratio(),
            min_budget_tokens: default_min_budget_tokens(),
            response_headroom: default_response_headroom(),
        }
    }
}

// ============================================================================
// Main Configuration
// ============================================================================

/// Full gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct GatewayConfig {
    /// Interface to bind
    #[validate(length(min = 1))]
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[validate(range(min = 1))]
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory for daily-rolling log files (stdout only when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// JSONL file receiving one entry per bridged exchange
    #[serde(default)]
    pub request_log: Option<PathBuf>,
    /// Backend call timeout in seconds
    #[validate(range(min = 1, max = 3600))]
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Backend configuration
    #[serde(default)]
    #[validate(nested)]
    pub backend: BackendConfig,
    /// Thinking budget heuristics
    #[serde(default)]
    #[validate(nested)]
    pub thinking: ThinkingPolicy,
    /// Client model id -> backend model id
    #[serde(default)]
    pub model_mapping: HashMap<String, String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_dir: None,
            request_log: None,
            request_timeout_secs: default_request_timeout(),
            backend: BackendConfig::default(),
            thinking: ThinkingPolicy::default(),
            model_mapping: HashMap::new(),
        }
    }
}

impl GatewayConfig {
    /// Get the full bind socket address.
    pub fn get_socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Copy with credentials masked, for printing.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if let Some(key) = copy.backend.api_key.as_mut() {
            let visible: String = key.chars().take(4).collect();
            *key = format!("{}****", visible);
        }
        copy
    }
}

// ============================================================================
// Default Value Functions
// ============================================================================

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    4000
}

fn default_request_timeout() -> u64 {
    300
}

fn default_region() -> String {
    "us-east5".to_string()
}

fn default_supported_betas() -> Vec<String> {
    VERTEX_SUPPORTED_BETAS.iter().map(|b| (*b).to_string()).collect()
}

fn default_max_tokens() -> u32 {
    8000
}

fn default_budget_ratio() -> f32 {
    0.5
}

fn default_min_budget_tokens() -> u32 {
    1024
}

fn default_response_headroom() -> u32 {
    100
}
