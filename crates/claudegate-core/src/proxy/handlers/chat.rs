//! `/v1/chat/completions`: one bridged exchange per call.
//!
//! The backend is always called without streaming; `stream: true` callers get
//! the finished reply replayed as SSE chunks.

use axum::{
    body::Body,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use claudegate_types::{BridgeError, BridgeResult};
use serde::Serialize;
use tracing::debug;

use super::errors::error_response;
use crate::proxy::mappers::bridge::Exchange;
use crate::proxy::mappers::openai::{render_chunks, ChatResponse};
use crate::proxy::observer::ExchangeContext;
use crate::proxy::server::AppState;

const BETA_HEADER: &str = "anthropic-beta";

pub async fn handle_chat_completions(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let beta_header = headers.get(BETA_HEADER).and_then(|v| v.to_str().ok()).map(str::to_string);
    let ctx = ExchangeContext::new(beta_header);
    debug!(request_id = %ctx.request_id, bytes = body.len(), "Received chat completion");

    match state.bridge.exchange(&body, &ctx, state.backend.as_ref()).await {
        Ok(exchange) if exchange.prepared.stream => sse_response(&exchange, &ctx),
        Ok(exchange) => {
            let headers = exchange_headers(&exchange, &ctx);
            (headers, Json(exchange.response)).into_response()
        }
        Err(e) => error_response(&e, &ctx.request_id),
    }
}

fn exchange_headers(exchange: &Exchange, ctx: &ExchangeContext) -> [(&'static str, String); 3] {
    [
        ("X-Request-Id", ctx.request_id.clone()),
        ("X-Mapped-Model", exchange.prepared.route.backend_model.clone()),
        ("X-Bridge-Format", exchange.prepared.format.as_str().to_string()),
    ]
}

fn sse_response(exchange: &Exchange, ctx: &ExchangeContext) -> Response {
    let frames = match sse_frames(&exchange.response) {
        Ok(frames) => frames,
        Err(e) => return error_response(&e, &ctx.request_id),
    };
    let stream = futures::stream::iter(frames.into_iter().map(Ok::<Bytes, std::convert::Infallible>));
    let [request_id, mapped_model, format] = exchange_headers(exchange, ctx);
    (
        [
            ("Content-Type", "text/event-stream".to_string()),
            ("Cache-Control", "no-cache".to_string()),
            ("Connection", "keep-alive".to_string()),
            request_id,
            mapped_model,
            format,
        ],
        Body::from_stream(stream),
    )
        .into_response()
}

/// `data: {chunk}` frames for a finished reply, closed by `data: [DONE]`.
pub fn sse_frames(response: &ChatResponse) -> BridgeResult<Vec<Bytes>> {
    encode_frames(&render_chunks(response))
}

/// Every chunk is encoded before anything is sent; one failure fails the reply.
fn encode_frames<T: Serialize>(chunks: &[T]) -> BridgeResult<Vec<Bytes>> {
    let mut frames = Vec::with_capacity(chunks.len() + 1);
    for chunk in chunks {
        let json = serde_json::to_string(chunk)
            .map_err(|e| BridgeError::assembly(format!("stream chunk not encodable: {}", e)))?;
        frames.push(Bytes::from(format!("data: {}\n\n", json)));
    }
    frames.push(Bytes::from_static(b"data: [DONE]\n\n"));
    Ok(frames)
}
