//! Transform observability.
//!
//! The bridge reports each stage of an exchange to an injected
//! `TransformObserver`. Implementations here: a no-op, structured `tracing`
//! events, and an append-only JSONL exchange log.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use claudegate_types::BridgeError;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::AppResult;
use crate::proxy::mappers::claude::MessagesRequest;
use crate::proxy::mappers::content::{Request, WireFormat};
use crate::proxy::mappers::openai::ChatResponse;

/// Per-exchange identity handed to every observer hook.
#[derive(Debug, Clone)]
pub struct ExchangeContext {
    pub request_id: String,
    pub started_at: Instant,
    /// Raw `anthropic-beta` request header, if any.
    pub beta_header: Option<String>,
}

impl ExchangeContext {
    pub fn new(beta_header: Option<String>) -> Self {
        Self {
            request_id: format!("req_{}", uuid::Uuid::new_v4().simple()),
            started_at: Instant::now(),
            beta_header,
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }
}

/// Hooks called by the bridge. All default to no-ops.
///
/// Every exchange that reaches `on_inbound` ends in exactly one of
/// `on_response`, `on_error` or `on_cancelled`.
pub trait TransformObserver: Send + Sync {
    /// Body as received, before any parsing.
    fn on_inbound(&self, _ctx: &ExchangeContext, _raw: &[u8]) {}

    /// Inbound request parsed into the content model.
    fn before_transform(&self, _ctx: &ExchangeContext, _request: &Request) {}

    /// Outbound backend request assembled and verified.
    fn after_transform(&self, _ctx: &ExchangeContext, _format: WireFormat, _request: &MessagesRequest) {}

    fn on_response(&self, _ctx: &ExchangeContext, _response: &ChatResponse) {}

    fn on_error(&self, _ctx: &ExchangeContext, _error: &BridgeError) {}

    /// The exchange was dropped before it settled (client went away).
    fn on_cancelled(&self, _ctx: &ExchangeContext) {}
}

/// Observer that records nothing.
pub struct NoopObserver;

impl TransformObserver for NoopObserver {}

/// Structured `tracing` events for every stage, including per-message dumps at `debug`.
pub struct TracingObserver;

impl TransformObserver for TracingObserver {
    fn on_inbound(&self, ctx: &ExchangeContext, raw: &[u8]) {
        debug!(request_id = %ctx.request_id, bytes = raw.len(), "Inbound chat completion body");
    }

    fn before_transform(&self, ctx: &ExchangeContext, request: &Request) {
        info!(
            request_id = %ctx.request_id,
            model = %request.model_id,
            messages = request.messages.len(),
            tools = request.tools.len(),
            stream = request.stream,
            "Bridging chat completion"
        );
        for (idx, msg) in request.messages.iter().enumerate() {
            debug!(request_id = %ctx.request_id, "[Before] Msg[{}]: {}", idx, msg.describe());
        }
    }

    fn after_transform(&self, ctx: &ExchangeContext, format: WireFormat, request: &MessagesRequest) {
        info!(
            request_id = %ctx.request_id,
            format = format.as_str(),
            backend_model = request.model.as_deref().unwrap_or_default(),
            thinking = request.thinking.is_some(),
            tools = request.tools.as_ref().map_or(0, Vec::len),
            "Assembled backend request"
        );
        for (idx, msg) in request.messages.iter().enumerate() {
            let kinds: Vec<&str> = msg.content.iter().map(block_kind).collect();
            debug!(request_id = %ctx.request_id, "[After] Msg[{}]: role={}, content={:?}", idx, msg.role, kinds);
        }
    }

    fn on_response(&self, ctx: &ExchangeContext, response: &ChatResponse) {
        let finish = response.choices.first().and_then(|c| c.finish_reason.as_deref());
        info!(
            request_id = %ctx.request_id,
            finish_reason = finish.unwrap_or("none"),
            elapsed_ms = ctx.elapsed_ms(),
            "Exchange completed"
        );
    }

    fn on_error(&self, ctx: &ExchangeContext, err: &BridgeError) {
        match err {
            BridgeError::Assembly { .. } => {
                error!(request_id = %ctx.request_id, elapsed_ms = ctx.elapsed_ms(), "Exchange failed: {}", err)
            }
            BridgeError::Parse { .. } | BridgeError::Backend { .. } => {
                warn!(request_id = %ctx.request_id, elapsed_ms = ctx.elapsed_ms(), "Exchange failed: {}", err)
            }
        }
    }

    fn on_cancelled(&self, ctx: &ExchangeContext) {
        warn!(request_id = %ctx.request_id, elapsed_ms = ctx.elapsed_ms(), "Exchange cancelled before completion");
    }
}

fn block_kind(block: &crate::proxy::mappers::claude::ContentBlock) -> &'static str {
    use crate::proxy::mappers::claude::ContentBlock;
    match block {
        ContentBlock::Text { .. } => "text",
        ContentBlock::Thinking { .. } => "thinking",
        ContentBlock::RedactedThinking { .. } => "redacted_thinking",
        ContentBlock::Image { .. } => "image",
        ContentBlock::ToolUse { .. } => "tool_use",
        ContentBlock::ToolResult { .. } => "tool_result",
        ContentBlock::ServerToolUse { .. } => "server_tool_use",
        ContentBlock::WebSearchToolResult { .. } => "web_search_tool_result",
    }
}

/// Fans every hook out to several observers, in order.
pub struct FanoutObserver {
    observers: Vec<Arc<dyn TransformObserver>>,
}

impl FanoutObserver {
    pub fn new(observers: Vec<Arc<dyn TransformObserver>>) -> Self {
        Self { observers }
    }
}

impl TransformObserver for FanoutObserver {
    fn on_inbound(&self, ctx: &ExchangeContext, raw: &[u8]) {
        self.observers.iter().for_each(|o| o.on_inbound(ctx, raw));
    }

    fn before_transform(&self, ctx: &ExchangeContext, request: &Request) {
        self.observers.iter().for_each(|o| o.before_transform(ctx, request));
    }

    fn after_transform(&self, ctx: &ExchangeContext, format: WireFormat, request: &MessagesRequest) {
        self.observers.iter().for_each(|o| o.after_transform(ctx, format, request));
    }

    fn on_response(&self, ctx: &ExchangeContext, response: &ChatResponse) {
        self.observers.iter().for_each(|o| o.on_response(ctx, response));
    }

    fn on_error(&self, ctx: &ExchangeContext, err: &BridgeError) {
        self.observers.iter().for_each(|o| o.on_error(ctx, err));
    }

    fn on_cancelled(&self, ctx: &ExchangeContext) {
        self.observers.iter().for_each(|o| o.on_cancelled(ctx));
    }
}

// ============================================================================
// JSONL exchange log
// ============================================================================

/// One line of the exchange log.
#[derive(Debug, Clone, Serialize)]
pub struct ExchangeRecord {
    pub timestamp: String,
    pub request_id: String,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<&'static str>,
    pub request: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_request: Option<Value>,
    pub response: ExchangeOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExchangeOutcome {
    pub status_code: u16,
    pub body: Value,
}

/// Status recorded for exchanges the client abandoned (nginx's 499).
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

#[derive(Debug, Default)]
struct PendingRecord {
    model: Option<String>,
    format: Option<&'static str>,
    request: Value,
    backend_request: Option<Value>,
}

/// Appends one JSON object per finished exchange to a file.
///
/// Stages of an in-flight exchange are held by request id until its response,
/// error or cancellation arrives; each of those writes the line and releases
/// the entry.
pub struct JsonlObserver {
    path: PathBuf,
    file: Mutex<File>,
    pending: Mutex<HashMap<String, PendingRecord>>,
}

impl JsonlObserver {
    /// Open (or create) the log file in append mode.
    pub fn open(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        info!("Exchange log: {}", path.display());
        Ok(Self { path: path.to_path_buf(), file: Mutex::new(file), pending: Mutex::new(HashMap::new()) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Exchanges seen but not yet written.
    pub fn in_flight(&self) -> usize {
        self.pending.lock().len()
    }

    fn finish(&self, ctx: &ExchangeContext, outcome: ExchangeOutcome) {
        let pending = self.pending.lock().remove(&ctx.request_id).unwrap_or_default();
        let record = ExchangeRecord {
            timestamp: chrono::Utc::now().to_rfc3339(),
            request_id: ctx.request_id.clone(),
            duration_ms: ctx.elapsed_ms(),
            model: pending.model,
            format: pending.format,
            request: pending.request,
            backend_request: pending.backend_request,
            response: outcome,
        };
        if let Err(e) = self.append(&record) {
            warn!("Failed to write exchange log {}: {}", self.path.display(), e);
        }
    }

    fn append(&self, record: &ExchangeRecord) -> AppResult<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        let mut file = self.file.lock();
        file.write_all(&line)?;
        file.flush()?;
        Ok(())
    }
}

impl TransformObserver for JsonlObserver {
    fn on_inbound(&self, ctx: &ExchangeContext, raw: &[u8]) {
        // Unparseable bodies are kept as text so bad requests stay inspectable.
        let body = serde_json::from_slice::<Value>(raw)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(raw).into_owned()));
        self.pending
            .lock()
            .insert(ctx.request_id.clone(), PendingRecord { request: body, ..PendingRecord::default() });
    }

    fn before_transform(&self, ctx: &ExchangeContext, request: &Request) {
        self.pending.lock().entry(ctx.request_id.clone()).or_default().model = Some(request.model_id.clone());
    }

    fn after_transform(&self, ctx: &ExchangeContext, format: WireFormat, request: &MessagesRequest) {
        let mut pending = self.pending.lock();
        let entry = pending.entry(ctx.request_id.clone()).or_default();
        entry.format = Some(format.as_str());
        entry.backend_request = serde_json::to_value(request).ok();
    }

    fn on_response(&self, ctx: &ExchangeContext, response: &ChatResponse) {
        let body = serde_json::to_value(response).unwrap_or(Value::Null);
        self.finish(ctx, ExchangeOutcome { status_code: 200, body });
    }

    fn on_error(&self, ctx: &ExchangeContext, err: &BridgeError) {
        let body = serde_json::json!({"error": {"type": err.error_type(), "message": err.message()}});
        self.finish(ctx, ExchangeOutcome { status_code: err.http_status_code(), body });
    }

    fn on_cancelled(&self, ctx: &ExchangeContext) {
        let body = serde_json::json!({
            "error": {"type": "cancelled", "message": "client disconnected before the exchange finished"}
        });
        self.finish(ctx, ExchangeOutcome { status_code: CLIENT_CLOSED_REQUEST, body });
    }
}
