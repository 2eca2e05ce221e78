//! The bridge pipeline.
//!
//! ```text
//! bytes -> parse -> detect -> strip -> sanitize -> decide/plan -> assemble
//!       -> backend -> translate -> render -> bytes
//! ```
//!
//! `Bridge` owns only immutable settings and an injected observer; every call
//! works on its own copies.

pub mod assemble;
pub mod detect;
pub mod invariants;
pub mod strip;
pub mod thinking;
pub mod tool_choice;
pub mod translate;

#[cfg(test)]
mod properties;
#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::Arc;

use claudegate_types::{BackendKind, BridgeResult, GatewayConfig, ThinkingPolicy};
use tracing::debug;

use crate::proxy::common::model_mapping::{resolve_model, ModelRoute};
use crate::proxy::mappers::claude::{MessagesRequest, MessagesResponse};
use crate::proxy::mappers::content::{Request, WireFormat};
use crate::proxy::mappers::openai::{self, ChatResponse};
use crate::proxy::observer::{ExchangeContext, NoopObserver, TransformObserver};
use crate::proxy::upstream::Backend;

pub use assemble::{assemble, AssemblyInput};
pub use detect::detect;
pub use strip::strip;
pub use thinking::{decide, ThinkingPlan};
pub use tool_choice::sanitize;
pub use translate::{translate, translate_content};

/// Immutable pipeline settings.
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    pub thinking: ThinkingPolicy,
    pub model_mapping: HashMap<String, String>,
    pub backend_kind: BackendKind,
    pub supported_betas: Vec<String>,
}

impl BridgeSettings {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            thinking: config.thinking.clone(),
            model_mapping: config.model_mapping.clone(),
            backend_kind: config.backend.kind,
            supported_betas: config.backend.supported_betas.clone(),
        }
    }
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self::from_config(&GatewayConfig::default())
    }
}

/// An assembled request plus what is needed to render its reply.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub format: WireFormat,
    pub stream: bool,
    /// Model id as the client sent it; echoed back in the reply.
    pub client_model: String,
    pub route: ModelRoute,
    pub thinking: ThinkingPlan,
    pub backend_request: MessagesRequest,
}

/// Result of a full exchange.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub prepared: PreparedRequest,
    pub response: ChatResponse,
}

pub struct Bridge {
    settings: BridgeSettings,
    observer: Arc<dyn TransformObserver>,
}

impl Bridge {
    pub fn new(settings: BridgeSettings, observer: Arc<dyn TransformObserver>) -> Self {
        Self { settings, observer }
    }

    /// Bridge with default settings and no observer.
    pub fn headless() -> Self {
        Self::new(BridgeSettings::default(), Arc::new(NoopObserver))
    }

    pub fn settings(&self) -> &BridgeSettings {
        &self.settings
    }

    /// Parse the inbound body and run every transform stage.
    pub fn prepare(&self, body: &[u8], ctx: &ExchangeContext) -> BridgeResult<PreparedRequest> {
        self.observer.on_inbound(ctx, body);
        let request = openai::parse_chat_request(body).and_then(openai::to_content_request)?;
        self.observer.before_transform(ctx, &request);
        self.transform(request, ctx)
    }

    /// Run the transform stages on an already parsed request.
    pub fn transform(&self, request: Request, ctx: &ExchangeContext) -> BridgeResult<PreparedRequest> {
        let Request { model_id, messages, tools, tool_choice, explicit_thinking, thinking_budget, stream, options } =
            request;

        let format = detect(&messages);
        let tools_present = !tools.is_empty();
        let messages = strip(messages, tools_present);
        let tool_choice = sanitize(tool_choice);

        let beta_hint = thinking::beta_requests_thinking(ctx.beta_header.as_deref());
        let requested = decide(&tools, explicit_thinking, &model_id, beta_hint);
        let max_tokens = options.max_tokens.unwrap_or(self.settings.thinking.default_max_tokens);
        let plan = thinking::plan(requested, &messages, max_tokens, thinking_budget, &self.settings.thinking);

        let route = resolve_model(&model_id, &self.settings.model_mapping, self.settings.backend_kind);
        debug!(
            client_model = %model_id,
            backend_model = %route.backend_model,
            route = route.source.as_str(),
            format = format.as_str(),
            "Resolved model route"
        );

        let backend_request = assemble(AssemblyInput {
            format,
            messages,
            tool_choice,
            thinking: plan,
            tools: &tools,
            model_id: &route.backend_model,
            options: &options,
            default_max_tokens: self.settings.thinking.default_max_tokens,
            supported_betas: &self.settings.supported_betas,
        })?;
        self.observer.after_transform(ctx, format, &backend_request);

        Ok(PreparedRequest { format, stream, client_model: model_id, route, thinking: plan, backend_request })
    }

    /// Translate a backend reply for the caller of `prepared`.
    pub fn complete(
        &self,
        prepared: &PreparedRequest,
        reply: MessagesResponse,
        ctx: &ExchangeContext,
    ) -> BridgeResult<ChatResponse> {
        let created = chrono::Utc::now().timestamp();
        let response = translate(reply, prepared.format, &prepared.client_model, created)?;
        self.observer.on_response(ctx, &response);
        Ok(response)
    }

    /// Full exchange: inbound bytes through the backend and back.
    ///
    /// Dropping the returned future before it resolves reports
    /// `on_cancelled` to the observer.
    pub async fn exchange(
        &self,
        body: &[u8],
        ctx: &ExchangeContext,
        backend: &dyn Backend,
    ) -> BridgeResult<Exchange> {
        let mut in_flight = InFlight { observer: self.observer.as_ref(), ctx, settled: false };
        let result = self.run(body, ctx, backend).await;
        in_flight.settled = true;
        if let Err(e) = &result {
            self.observer.on_error(ctx, e);
        }
        result
    }

    async fn run(&self, body: &[u8], ctx: &ExchangeContext, backend: &dyn Backend) -> BridgeResult<Exchange> {
        let prepared = self.prepare(body, ctx)?;
        let reply = backend.send(&prepared.backend_request).await?;
        let response = self.complete(&prepared, reply, ctx)?;
        Ok(Exchange { prepared, response })
    }
}

/// Lives across the backend await; a drop while unsettled means the caller
/// abandoned the exchange.
struct InFlight<'a> {
    observer: &'a dyn TransformObserver,
    ctx: &'a ExchangeContext,
    settled: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.observer.on_cancelled(self.ctx);
        }
    }
}
