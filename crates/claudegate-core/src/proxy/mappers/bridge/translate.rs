//! Response translator: backend reply -> content model -> caller shape.

use claudegate_types::{BridgeError, BridgeResult};
use tracing::{debug, warn};

use crate::proxy::mappers::claude::{self, MessagesResponse};
use crate::proxy::mappers::content::{ContentBlock, FinishReason, Response, Usage, WireFormat};
use crate::proxy::mappers::openai::{render_chat_response, ChatResponse};

/// Map a backend reply into the content model.
///
/// Identifiers are passed through verbatim; a tool call without an id cannot
/// be answered by the client and is rejected rather than regenerated.
pub fn translate_content(resp: MessagesResponse) -> BridgeResult<Response> {
    for block in &resp.content {
        match block {
            claude::ContentBlock::ToolUse { id, name, .. } if id.is_empty() => {
                return Err(BridgeError::backend(
                    None,
                    format!("backend returned tool_use '{}' without an id", name),
                ));
            }
            claude::ContentBlock::ServerToolUse { id, name, .. } if id.is_empty() => {
                return Err(BridgeError::backend(
                    None,
                    format!("backend returned server_tool_use '{}' without an id", name),
                ));
            }
            _ => {}
        }
    }

    let has_tool_use = resp.content.iter().any(|b| matches!(b, claude::ContentBlock::ToolUse { .. }));
    let finish_reason = finish_reason(resp.stop_reason.as_deref(), has_tool_use);
    debug!(
        stop_reason = ?resp.stop_reason,
        finish_reason = finish_reason.as_openai_str(),
        blocks = resp.content.len(),
        "Translated backend reply"
    );

    Ok(Response {
        id: resp.id,
        model: resp.model,
        content: resp.content.into_iter().map(ContentBlock::from).collect(),
        finish_reason,
        usage: Usage { input_tokens: resp.usage.input_tokens, output_tokens: resp.usage.output_tokens },
    })
}

/// Translate and render in one step.
pub fn translate(
    resp: MessagesResponse,
    format: WireFormat,
    client_model: &str,
    created: i64,
) -> BridgeResult<ChatResponse> {
    let response = translate_content(resp)?;
    Ok(render_chat_response(&response, format, client_model, created))
}

/// Tool invocations decide `ToolCalls` regardless of the stated stop reason.
pub fn finish_reason(stop_reason: Option<&str>, has_tool_use: bool) -> FinishReason {
    if has_tool_use {
        return FinishReason::ToolCalls;
    }
    match stop_reason {
        None | Some("end_turn" | "stop_sequence" | "pause_turn") => FinishReason::Stop,
        Some("max_tokens") => FinishReason::Length,
        Some("refusal") => FinishReason::Error,
        Some("tool_use") => {
            warn!("[Translate] stop_reason tool_use without tool_use blocks; finishing as stop");
            FinishReason::Stop
        }
        Some(other) => {
            warn!("[Translate] Unknown stop_reason '{}'", other);
            FinishReason::Error
        }
    }
}
