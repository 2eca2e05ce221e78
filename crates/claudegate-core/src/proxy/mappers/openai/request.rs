//! Inbound parser: OpenAI chat request bytes -> content model.
//!
//! Every structural defect is a `BridgeError::Parse`; nothing unrecognized is
//! passed through.

use claudegate_types::{BridgeError, BridgeResult};
use serde_json::{Map, Value};

use super::models::{ChatContentPart, ChatMessage, ChatRequest, ThinkingParam, ToolCall};
use crate::proxy::mappers::content::{
    self, ContentBlock, ImageSource, Message, Request, Role, SamplingOptions, ToolChoice,
    ToolKind, ToolSpec,
};

/// Deserialize the raw request body.
pub fn parse_chat_request(body: &[u8]) -> BridgeResult<ChatRequest> {
    serde_json::from_slice(body)
        .map_err(|e| BridgeError::parse(format!("malformed chat completion body: {}", e)))
}

/// Convert a wire request into the content model.
pub fn to_content_request(req: ChatRequest) -> BridgeResult<Request> {
    if req.model.trim().is_empty() {
        return Err(BridgeError::parse("model must not be empty"));
    }
    if req.messages.is_empty() {
        return Err(BridgeError::parse("messages must not be empty"));
    }

    let messages = req
        .messages
        .into_iter()
        .enumerate()
        .map(|(idx, msg)| convert_message(idx, msg))
        .collect::<BridgeResult<Vec<_>>>()?;

    let tools = match req.tools {
        Some(tools) => tools
            .iter()
            .enumerate()
            .map(|(idx, t)| parse_tool(idx, t))
            .collect::<BridgeResult<Vec<_>>>()?,
        None => Vec::new(),
    };

    let tool_choice = match req.tool_choice {
        Some(value) => parse_tool_choice(&value)?,
        None => None,
    };

    let (explicit_thinking, thinking_budget) = match req.thinking {
        Some(param) => parse_thinking(&param)?,
        None => (None, None),
    };

    let stop = match req.stop {
        Some(value) => parse_stop(&value)?,
        None => Vec::new(),
    };

    Ok(Request {
        model_id: req.model,
        messages,
        tools,
        tool_choice,
        explicit_thinking,
        thinking_budget,
        stream: req.stream,
        options: SamplingOptions {
            max_tokens: req.max_tokens.or(req.max_completion_tokens),
            temperature: req.temperature,
            top_p: req.top_p,
            top_k: req.top_k,
            stop,
            user: req.user,
        },
    })
}

fn convert_message(idx: usize, msg: ChatMessage) -> BridgeResult<Message> {
    let role = Role::parse(&msg.role)
        .ok_or_else(|| BridgeError::parse(format!("messages[{}]: unknown role '{}'", idx, msg.role)))?;

    let content = match msg.content {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(text)) if text.is_empty() => Vec::new(),
        Some(Value::String(text)) => vec![ContentBlock::Text { text }],
        Some(Value::Array(parts)) => parts
            .into_iter()
            .enumerate()
            .map(|(part_idx, part)| convert_part(idx, part_idx, part))
            .collect::<BridgeResult<Vec<_>>>()?,
        Some(other) => {
            return Err(BridgeError::parse(format!(
                "messages[{}].content must be a string or an array, got {}",
                idx,
                json_kind(&other)
            )))
        }
    };

    let tool_calls = msg
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| convert_tool_call(idx, call))
        .collect::<BridgeResult<Vec<_>>>()?;

    let thinking_blocks = msg
        .thinking_blocks
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(part_idx, part)| {
            let block = convert_part(idx, part_idx, part)?;
            if block.is_thinking() {
                Ok(block)
            } else {
                Err(BridgeError::parse(format!(
                    "messages[{}].thinking_blocks[{}]: expected a thinking block, got '{}'",
                    idx,
                    part_idx,
                    block.kind()
                )))
            }
        })
        .collect::<BridgeResult<Vec<_>>>()?;

    let message = Message {
        role,
        content,
        tool_calls,
        tool_call_id: msg.tool_call_id.filter(|id| !id.is_empty()),
        thinking_blocks,
    };
    check_role_shape(idx, &message)?;
    Ok(message)
}

/// Reject blocks that cannot appear under the message's role.
fn check_role_shape(idx: usize, msg: &Message) -> BridgeResult<()> {
    let assistant = msg.role == Role::Assistant;
    for block in &msg.content {
        let allowed = match block {
            ContentBlock::Thinking { .. }
            | ContentBlock::RedactedThinking { .. }
            | ContentBlock::ToolInvocation { .. }
            | ContentBlock::ServerToolUse { .. }
            | ContentBlock::ServerToolResult { .. } => assistant,
            ContentBlock::ToolResult { .. } => matches!(msg.role, Role::User | Role::Tool),
            ContentBlock::Text { .. } => true,
            ContentBlock::Image { .. } => matches!(msg.role, Role::User | Role::Tool),
        };
        if !allowed {
            return Err(BridgeError::parse(format!(
                "messages[{}]: '{}' block is not allowed in a {} message",
                idx,
                block.kind(),
                msg.role.as_str()
            )));
        }
    }
    if !assistant && (!msg.tool_calls.is_empty() || !msg.thinking_blocks.is_empty()) {
        return Err(BridgeError::parse(format!(
            "messages[{}]: tool_calls and thinking_blocks are only valid on assistant messages",
            idx
        )));
    }
    if msg.role == Role::Tool
        && msg.tool_call_id.is_none()
        && !msg.content.iter().any(|b| matches!(b, ContentBlock::ToolResult { .. }))
    {
        return Err(BridgeError::parse(format!("messages[{}]: tool message without tool_call_id", idx)));
    }
    Ok(())
}

fn convert_part(idx: usize, part_idx: usize, part: Value) -> BridgeResult<ContentBlock> {
    let part: ChatContentPart = serde_json::from_value(part).map_err(|e| {
        BridgeError::parse(format!("messages[{}].content[{}]: {}", idx, part_idx, e))
    })?;
    let block = match part {
        ChatContentPart::Text { text } => ContentBlock::Text { text },
        ChatContentPart::ImageUrl { image_url } => ContentBlock::Image {
            source: parse_image_url(&image_url.url).map_err(|reason| {
                BridgeError::parse(format!("messages[{}].content[{}]: {}", idx, part_idx, reason))
            })?,
        },
        ChatContentPart::Image { source } => ContentBlock::Image { source: source.into() },
        ChatContentPart::ToolUse { id, name, input } => {
            if id.is_empty() {
                return Err(BridgeError::parse(format!(
                    "messages[{}].content[{}]: tool_use without id",
                    idx, part_idx
                )));
            }
            ContentBlock::ToolInvocation { id, name, arguments: input }
        }
        ChatContentPart::ToolResult { tool_use_id, content, is_error } => {
            if tool_use_id.is_empty() {
                return Err(BridgeError::parse(format!(
                    "messages[{}].content[{}]: tool_result without tool_use_id",
                    idx, part_idx
                )));
            }
            ContentBlock::ToolResult { tool_call_id: tool_use_id, content, is_error }
        }
        ChatContentPart::Thinking { thinking, signature } => ContentBlock::Thinking { thinking, signature },
        ChatContentPart::RedactedThinking { data } => ContentBlock::RedactedThinking { data },
        ChatContentPart::ServerToolUse { id, name, input } => ContentBlock::ServerToolUse { id, name, input },
        ChatContentPart::WebSearchToolResult { tool_use_id, content } => {
            ContentBlock::ServerToolResult { tool_use_id, content }
        }
    };
    Ok(block)
}

/// `data:image/png;base64,...` becomes an inline image; http(s) URLs are referenced.
fn parse_image_url(url: &str) -> Result<ImageSource, String> {
    if let Some(rest) = url.strip_prefix("data:") {
        let (media_and_enc, data) =
            rest.split_once(',').ok_or_else(|| "data URI without payload".to_string())?;
        let media_with_params = media_and_enc
            .strip_suffix(";base64")
            .ok_or_else(|| "only base64 data URIs are supported".to_string())?;
        let media_type = media_with_params.split_once(';').map_or(media_with_params, |(mime, _)| mime);
        if !media_type.starts_with("image/") {
            return Err(format!("unsupported image media type '{}'", media_type));
        }
        return Ok(ImageSource::Base64 { media_type: media_type.to_string(), data: data.to_string() });
    }
    if url.starts_with("https://") || url.starts_with("http://") {
        return Ok(ImageSource::Url { url: url.to_string() });
    }
    Err("image_url must be a data URI or an http(s) URL".to_string())
}

fn convert_tool_call(idx: usize, call: ToolCall) -> BridgeResult<content::ToolCall> {
    if call.id.is_empty() {
        return Err(BridgeError::parse(format!("messages[{}]: tool call without id", idx)));
    }
    if call.function.name.is_empty() {
        return Err(BridgeError::parse(format!(
            "messages[{}]: tool call '{}' without function name",
            idx, call.id
        )));
    }
    let arguments = parse_tool_arguments(&call.function.arguments).map_err(|reason| {
        BridgeError::parse(format!("messages[{}]: tool call '{}' {}", idx, call.id, reason))
    })?;
    Ok(content::ToolCall {
        id: call.id,
        name: call.function.name,
        arguments,
    })
}

/// Tool arguments arrive JSON-encoded; an empty string means no arguments.
pub fn parse_tool_arguments(raw: &str) -> Result<Value, String> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(other) => Err(format!("arguments must encode a JSON object, got {}", json_kind(&other))),
        Err(e) => Err(format!("has invalid JSON arguments: {}", e)),
    }
}

/// Accepts OpenAI `{"type":"function","function":{...}}`, bare
/// `{name, input_schema}` and native server tools `{"type":"web_search_20250305",...}`.
fn parse_tool(idx: usize, tool: &Value) -> BridgeResult<ToolSpec> {
    let obj = tool
        .as_object()
        .ok_or_else(|| BridgeError::parse(format!("tools[{}] must be an object", idx)))?;
    let tool_type = obj.get("type").and_then(Value::as_str);

    if tool_type == Some("function") {
        let func = obj
            .get("function")
            .and_then(Value::as_object)
            .ok_or_else(|| BridgeError::parse(format!("tools[{}]: function tool without 'function'", idx)))?;
        return Ok(ToolSpec {
            name: required_name(idx, func)?,
            description: func.get("description").and_then(Value::as_str).map(String::from),
            parameter_schema: func.get("parameters").cloned(),
            kind: ToolKind::Function,
        });
    }

    let name = required_name(idx, obj)?;
    let description = obj.get("description").and_then(Value::as_str).map(String::from);
    let parameter_schema = obj.get("input_schema").cloned();
    match tool_type {
        None | Some("custom") => Ok(ToolSpec { name, description, parameter_schema, kind: ToolKind::Function }),
        Some(native) => {
            let options = obj
                .iter()
                .filter(|(k, _)| !matches!(k.as_str(), "type" | "name" | "description" | "input_schema"))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            Ok(ToolSpec {
                name,
                description,
                parameter_schema,
                kind: ToolKind::Native { tool_type: native.to_string(), options },
            })
        }
    }
}

fn required_name(idx: usize, obj: &Map<String, Value>) -> BridgeResult<String> {
    obj.get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.trim().is_empty())
        .map(String::from)
        .ok_or_else(|| BridgeError::parse(format!("tools[{}] has no name", idx)))
}

/// Map every accepted wire spelling onto `ToolChoice`.
///
/// A forced choice with a missing name yields `Specific { name: "" }` so the
/// sanitizer can drop it.
pub fn parse_tool_choice(value: &Value) -> BridgeResult<Option<ToolChoice>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => match s.as_str() {
            "auto" => Ok(Some(ToolChoice::Auto)),
            "none" => Ok(Some(ToolChoice::None)),
            "required" | "any" => Ok(Some(ToolChoice::Any)),
            other => Err(BridgeError::parse(format!("unsupported tool_choice '{}'", other))),
        },
        Value::Object(obj) => {
            let kind = obj
                .get("type")
                .and_then(Value::as_str)
                .ok_or_else(|| BridgeError::parse("tool_choice object without 'type'"))?;
            let nested_name = |key: &str| {
                obj.get(key)
                    .and_then(|v| v.get("name"))
                    .and_then(Value::as_str)
                    .map(String::from)
            };
            match kind {
                "auto" => Ok(Some(ToolChoice::Auto)),
                "none" => Ok(Some(ToolChoice::None)),
                "any" | "required" => Ok(Some(ToolChoice::Any)),
                "function" => Ok(Some(ToolChoice::Specific {
                    name: nested_name("function").unwrap_or_default(),
                })),
                "tool" => {
                    let name = obj
                        .get("name")
                        .and_then(Value::as_str)
                        .map(String::from)
                        .or_else(|| nested_name("tool"))
                        .unwrap_or_default();
                    Ok(Some(ToolChoice::Specific { name }))
                }
                other => Err(BridgeError::parse(format!("unsupported tool_choice type '{}'", other))),
            }
        }
        other => Err(BridgeError::parse(format!(
            "tool_choice must be a string or an object, got {}",
            json_kind(other)
        ))),
    }
}

fn parse_thinking(param: &ThinkingParam) -> BridgeResult<(Option<bool>, Option<u32>)> {
    match param.type_.as_str() {
        "enabled" => Ok((Some(true), param.budget_tokens)),
        "disabled" => Ok((Some(false), None)),
        other => Err(BridgeError::parse(format!("unsupported thinking type '{}'", other))),
    }
}

fn parse_stop(value: &Value) -> BridgeResult<Vec<String>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(String::from)
                    .ok_or_else(|| BridgeError::parse("stop entries must be strings"))
            })
            .collect(),
        other => Err(BridgeError::parse(format!(
            "stop must be a string or an array, got {}",
            json_kind(other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
