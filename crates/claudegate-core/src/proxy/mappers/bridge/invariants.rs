//! Post-assembly checks on the outbound request.
//!
//! Run after every repair step; any violation here is a defect in the bridge
//! itself and aborts the exchange.

use std::collections::HashSet;

use claudegate_types::{BridgeError, BridgeResult};
use tracing::{error, warn};

use crate::proxy::mappers::claude::{ContentBlock, MessagesRequest, ToolChoice};

/// Validate a fully assembled request.
///
/// `sources[i]` is the inbound index the i-th outbound message was built from.
pub fn check(request: &MessagesRequest, sources: &[usize]) -> BridgeResult<()> {
    check_tool_links(request)
        .and_then(|()| check_thinking_exclusion(request))
        .and_then(|()| check_tool_choice(request))
        .and_then(|()| check_order(request, sources))
        .inspect_err(|e| error!("[Assembly] {}", e))?;
    warn_consecutive_assistants(request);
    Ok(())
}

/// Every tool result answers exactly one earlier invocation.
fn check_tool_links(request: &MessagesRequest) -> BridgeResult<()> {
    let mut invoked: HashSet<&str> = HashSet::new();
    for (idx, msg) in request.messages.iter().enumerate() {
        for block in &msg.content {
            match block {
                ContentBlock::ToolUse { id, .. } => {
                    if id.is_empty() {
                        return Err(BridgeError::assembly(format!("messages[{}]: tool_use without id", idx)));
                    }
                    if !invoked.insert(id.as_str()) {
                        return Err(BridgeError::assembly(format!(
                            "messages[{}]: duplicate tool_use id '{}'",
                            idx, id
                        )));
                    }
                }
                ContentBlock::ToolResult { tool_use_id, .. } => {
                    if !invoked.contains(tool_use_id.as_str()) {
                        return Err(BridgeError::assembly(format!(
                            "messages[{}]: tool_result '{}' has no preceding tool_use",
                            idx, tool_use_id
                        )));
                    }
                }
                ContentBlock::Text { .. }
                | ContentBlock::Thinking { .. }
                | ContentBlock::RedactedThinking { .. }
                | ContentBlock::Image { .. }
                | ContentBlock::ServerToolUse { .. }
                | ContentBlock::WebSearchToolResult { .. } => {}
            }
        }
    }
    Ok(())
}

/// No thinking, in config or history, while tools are declared.
fn check_thinking_exclusion(request: &MessagesRequest) -> BridgeResult<()> {
    if !request.has_tools() {
        return Ok(());
    }
    if request.thinking.is_some() {
        return Err(BridgeError::assembly("thinking enabled while tools are present"));
    }
    let offending = request.messages.iter().position(|m| {
        m.content
            .iter()
            .any(|b| matches!(b, ContentBlock::Thinking { .. } | ContentBlock::RedactedThinking { .. }))
    });
    match offending {
        Some(idx) => Err(BridgeError::assembly(format!(
            "messages[{}]: thinking block sent alongside tools",
            idx
        ))),
        None => Ok(()),
    }
}

fn check_tool_choice(request: &MessagesRequest) -> BridgeResult<()> {
    let Some(choice) = &request.tool_choice else {
        return Ok(());
    };
    let tools = request.tools.as_deref().unwrap_or_default();
    match choice {
        ToolChoice::Auto | ToolChoice::None => Ok(()),
        ToolChoice::Any if tools.is_empty() => {
            Err(BridgeError::assembly("tool_choice 'any' requires at least one tool"))
        }
        ToolChoice::Any => Ok(()),
        ToolChoice::Tool { name } if name.trim().is_empty() => {
            Err(BridgeError::assembly("forced tool_choice without a name"))
        }
        ToolChoice::Tool { name } if tools.is_empty() => Err(BridgeError::assembly(format!(
            "tool_choice forces '{}' but no tools were declared",
            name
        ))),
        ToolChoice::Tool { name } if !tools.iter().any(|t| &t.name == name) => Err(
            BridgeError::assembly(format!("tool_choice forces unknown tool '{}'", name)),
        ),
        ToolChoice::Tool { .. } => Ok(()),
    }
}

/// Outbound messages map to strictly increasing inbound positions.
fn check_order(request: &MessagesRequest, sources: &[usize]) -> BridgeResult<()> {
    if sources.len() != request.messages.len() {
        return Err(BridgeError::assembly(format!(
            "message provenance mismatch: {} messages, {} sources",
            request.messages.len(),
            sources.len()
        )));
    }
    match sources.windows(2).position(|w| w[0] >= w[1]) {
        Some(idx) => Err(BridgeError::assembly(format!(
            "messages[{}]: conversation order changed during assembly",
            idx + 1
        ))),
        None => Ok(()),
    }
}

fn warn_consecutive_assistants(request: &MessagesRequest) {
    for (idx, pair) in request.messages.windows(2).enumerate() {
        if pair[0].role == "assistant" && pair[1].role == "assistant" {
            warn!(
                "[Assembly] Consecutive assistant messages at {} and {}; the backend may reject them",
                idx,
                idx + 1
            );
        }
    }
}
