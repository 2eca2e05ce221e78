//! Request assembler: content model -> one backend `MessagesRequest`.
//!
//! Pure and deterministic. All wire encoding happens here; the result
//! is verified by `invariants::check` before it is returned.

use claudegate_types::{BridgeError, BridgeResult};
use serde_json::{json, Value};
use tracing::debug;

use super::invariants;
use super::thinking::ThinkingPlan;
use crate::proxy::mappers::claude::{self, Metadata, MessagesRequest, ThinkingConfig};
use crate::proxy::mappers::content::{
    ContentBlock, Message, Role, SamplingOptions, ToolChoice, ToolKind, ToolSpec, WireFormat,
};

/// Everything the assembler needs, already stripped and sanitized.
#[derive(Debug, Clone)]
pub struct AssemblyInput<'a> {
    /// Detected inbound convention; both encode to the same backend shape.
    pub format: WireFormat,
    pub messages: Vec<Message>,
    pub tool_choice: Option<ToolChoice>,
    pub thinking: ThinkingPlan,
    pub tools: &'a [ToolSpec],
    /// Backend model id (after mapping).
    pub model_id: &'a str,
    pub options: &'a SamplingOptions,
    pub default_max_tokens: u32,
    pub supported_betas: &'a [String],
}

/// Build the outbound request and verify it.
pub fn assemble(input: AssemblyInput<'_>) -> BridgeResult<MessagesRequest> {
    let system = lift_system(&input.messages)?;
    let (messages, sources) = encode_conversation(&input.messages)?;
    debug!(
        "[Assembly] {} conversation: {} inbound -> {} outbound message(s)",
        input.format.as_str(),
        input.messages.len(),
        messages.len()
    );

    let tools: Vec<claude::Tool> = input.tools.iter().map(convert_tool).collect();
    let tool_choice = match input.tool_choice {
        Some(ToolChoice::Auto | ToolChoice::None) if tools.is_empty() => None,
        other => other.map(convert_tool_choice),
    };

    let options = input.options;
    let request = MessagesRequest {
        model: Some(input.model_id.to_string()),
        anthropic_version: None,
        anthropic_beta: None,
        messages,
        system,
        tool_choice,
        max_tokens: options.max_tokens.unwrap_or(input.default_max_tokens),
        temperature: options.temperature,
        top_p: options.top_p,
        top_k: options.top_k,
        stop_sequences: (!options.stop.is_empty()).then(|| options.stop.clone()),
        thinking: match input.thinking {
            ThinkingPlan::Enabled { budget_tokens } => Some(ThinkingConfig::enabled(budget_tokens)),
            ThinkingPlan::Disabled => None,
        },
        metadata: options.user.clone().map(|user_id| Metadata { user_id: Some(user_id) }),
        betas: derive_betas(input.tools, input.supported_betas),
        tools: (!tools.is_empty()).then_some(tools),
    };

    invariants::check(&request, &sources)?;
    Ok(request)
}

/// System turns become the top-level `system` field, in order.
fn lift_system(messages: &[Message]) -> BridgeResult<Option<String>> {
    let mut parts = Vec::new();
    for msg in messages.iter().filter(|m| m.role == Role::System) {
        for block in &msg.content {
            match block {
                ContentBlock::Text { text } => parts.push(text.as_str()),
                other => {
                    return Err(BridgeError::assembly(format!(
                        "system message carries a '{}' block",
                        other.kind()
                    )))
                }
            }
        }
    }
    if parts.is_empty() {
        return Ok(None);
    }
    Ok(Some(parts.join("\n\n")))
}

/// Encode non-system turns, returning each outbound message's inbound index.
///
/// Runs of `tool` turns collapse into one `user` turn of results, whichever
/// shape the results arrived in.
fn encode_conversation(messages: &[Message]) -> BridgeResult<(Vec<claude::Message>, Vec<usize>)> {
    let mut out = Vec::with_capacity(messages.len());
    let mut sources = Vec::with_capacity(messages.len());
    let mut pending: Option<(usize, Vec<claude::ContentBlock>)> = None;

    for (idx, msg) in messages.iter().enumerate() {
        match msg.role {
            Role::System => continue,
            Role::Tool => {
                let blocks = tool_message_blocks(msg)?;
                match pending.as_mut() {
                    Some((_, batch)) => batch.extend(blocks),
                    None => pending = Some((idx, blocks)),
                }
                continue;
            }
            Role::User | Role::Assistant => {}
        }
        if let Some((source, batch)) = pending.take() {
            out.push(claude::Message::user(batch));
            sources.push(source);
        }

        let encoded = if msg.role == Role::Assistant {
            claude::Message::assistant(assistant_blocks(msg))
        } else {
            claude::Message::user(msg.content.iter().map(claude::ContentBlock::from).collect())
        };
        out.push(encoded);
        sources.push(idx);
    }

    if let Some((source, batch)) = pending.take() {
        out.push(claude::Message::user(batch));
        sources.push(source);
    }
    Ok((out, sources))
}

/// Leading thinking traces, then content, then side-channel tool calls.
fn assistant_blocks(msg: &Message) -> Vec<claude::ContentBlock> {
    let mut blocks: Vec<claude::ContentBlock> =
        msg.thinking_blocks.iter().map(claude::ContentBlock::from).collect();
    blocks.extend(msg.content.iter().map(claude::ContentBlock::from));

    for call in &msg.tool_calls {
        let already_inline = msg.content.iter().any(
            |b| matches!(b, ContentBlock::ToolInvocation { id, .. } if id == &call.id),
        );
        if !already_inline {
            blocks.push(claude::ContentBlock::ToolUse {
                id: call.id.clone(),
                name: call.name.clone(),
                input: call.arguments.clone(),
            });
        }
    }
    blocks
}

/// Blocks for a `tool` turn.
///
/// A `tool_call_id` not already answered inline wraps the remaining content
/// into a `tool_result`; inline results are forwarded as they are.
fn tool_message_blocks(msg: &Message) -> BridgeResult<Vec<claude::ContentBlock>> {
    let answered_inline = |id: &str| {
        msg.content
            .iter()
            .any(|b| matches!(b, ContentBlock::ToolResult { tool_call_id, .. } if tool_call_id == id))
    };

    match msg.tool_call_id.as_deref() {
        Some(id) if !answered_inline(id) => {
            let (results, rest): (Vec<&ContentBlock>, Vec<&ContentBlock>) =
                msg.content.iter().partition(|b| matches!(b, ContentBlock::ToolResult { .. }));
            let mut blocks = vec![claude::ContentBlock::ToolResult {
                tool_use_id: id.to_string(),
                content: tool_result_content(&rest)?,
                is_error: None,
            }];
            blocks.extend(results.into_iter().map(claude::ContentBlock::from));
            Ok(blocks)
        }
        Some(_) => Ok(msg.content.iter().map(claude::ContentBlock::from).collect()),
        None if msg.content.iter().any(|b| matches!(b, ContentBlock::ToolResult { .. })) => {
            Ok(msg.content.iter().map(claude::ContentBlock::from).collect())
        }
        None => Err(BridgeError::assembly("tool message has neither tool_call_id nor tool_result blocks")),
    }
}

/// Plain text stays a string; anything richer becomes a block array.
fn tool_result_content(blocks: &[&ContentBlock]) -> BridgeResult<Value> {
    let all_text = blocks.iter().all(|b| matches!(b, ContentBlock::Text { .. }));
    if all_text {
        let text: Vec<&str> = blocks
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        return Ok(Value::String(text.join("\n")));
    }
    let wire: Vec<claude::ContentBlock> = blocks.iter().map(|b| claude::ContentBlock::from(*b)).collect();
    serde_json::to_value(wire)
        .map_err(|e| BridgeError::assembly(format!("tool result content not encodable: {}", e)))
}

fn convert_tool(spec: &ToolSpec) -> claude::Tool {
    match &spec.kind {
        ToolKind::Function => claude::Tool {
            type_: None,
            name: spec.name.clone(),
            description: spec.description.clone(),
            input_schema: Some(
                spec.parameter_schema
                    .clone()
                    .unwrap_or_else(|| json!({"type": "object", "properties": {}})),
            ),
            extra: serde_json::Map::new(),
        },
        ToolKind::Native { tool_type, options } => claude::Tool {
            type_: Some(tool_type.clone()),
            name: spec.name.clone(),
            description: spec.description.clone(),
            input_schema: spec.parameter_schema.clone(),
            extra: options.clone(),
        },
    }
}

fn convert_tool_choice(choice: ToolChoice) -> claude::ToolChoice {
    match choice {
        ToolChoice::Auto => claude::ToolChoice::Auto,
        ToolChoice::None => claude::ToolChoice::None,
        ToolChoice::Any => claude::ToolChoice::Any,
        ToolChoice::Specific { name } => claude::ToolChoice::Tool { name },
    }
}

/// Beta flag a native server tool needs, if any.
pub fn beta_for_tool_type(tool_type: &str) -> Option<&'static str> {
    if tool_type.starts_with("web_search") {
        Some("web-search-2025-03-05")
    } else if tool_type == "computer_20241022" {
        Some("computer-use-2024-10-22")
    } else if tool_type == "computer_20250124" {
        Some("computer-use-2025-01-24")
    } else if tool_type.starts_with("tool_search_tool") {
        Some("tool-search-tool-2025-10-19")
    } else {
        None
    }
}

fn derive_betas(tools: &[ToolSpec], supported: &[String]) -> Vec<String> {
    let mut betas: Vec<String> = Vec::new();
    for beta in tools.iter().filter_map(ToolSpec::native_type).filter_map(beta_for_tool_type) {
        if supported.iter().any(|s| s == beta) && !betas.iter().any(|b| b == beta) {
            betas.push(beta.to_string());
        }
    }
    betas
}
