//! Outbound renderer: content-model response -> OpenAI chat completion.

use tracing::debug;

use super::models::{
    ChatChunk, ChatResponse, ChatUsage, Choice, ChunkChoice, ChunkDelta, ChunkToolCall,
    ResponseContent, ResponseMessage, ToolCall,
};
use crate::proxy::mappers::claude;
use crate::proxy::mappers::content::{ContentBlock, Response, WireFormat};

/// Render a translated response in the shape the caller's format expects.
///
/// `model` is the id the client asked for, not the backend id.
pub fn render_chat_response(
    response: &Response,
    format: WireFormat,
    model: &str,
    created: i64,
) -> ChatResponse {
    let message = match format {
        WireFormat::Foreign => render_foreign_message(&response.content),
        WireFormat::Native => ResponseMessage {
            role: "assistant".to_string(),
            content: Some(ResponseContent::Blocks(
                response.content.iter().map(claude::ContentBlock::from).collect(),
            )),
            reasoning_content: None,
            thinking_blocks: None,
            tool_calls: None,
        },
    };

    ChatResponse {
        id: response.id.clone(),
        object: "chat.completion".to_string(),
        created,
        model: model.to_string(),
        choices: vec![Choice {
            index: 0,
            message,
            finish_reason: Some(response.finish_reason.as_openai_str().to_string()),
        }],
        usage: Some(ChatUsage::new(response.usage.input_tokens, response.usage.output_tokens)),
    }
}

fn render_foreign_message(blocks: &[ContentBlock]) -> ResponseMessage {
    let mut text = String::new();
    let mut reasoning = String::new();
    let mut thinking_blocks = Vec::new();
    let mut tool_calls = Vec::new();

    for block in blocks {
        match block {
            ContentBlock::Text { text: t } => text.push_str(t),
            ContentBlock::Thinking { thinking, .. } => {
                reasoning.push_str(thinking);
                thinking_blocks.push(claude::ContentBlock::from(block));
            }
            ContentBlock::RedactedThinking { .. } => {
                thinking_blocks.push(claude::ContentBlock::from(block));
            }
            ContentBlock::ToolInvocation { id, name, arguments } => {
                tool_calls.push(ToolCall::function(id.clone(), name.clone(), arguments.to_string()));
            }
            ContentBlock::ServerToolUse { .. }
            | ContentBlock::ServerToolResult { .. }
            | ContentBlock::Image { .. }
            | ContentBlock::ToolResult { .. } => {
                debug!(kind = block.kind(), "Block has no chat.completion representation, omitted");
            }
        }
    }

    let content = if !text.is_empty() {
        Some(ResponseContent::Text(text))
    } else if !reasoning.is_empty() {
        // Some clients only display `content`; surface the reasoning there.
        Some(ResponseContent::Text(reasoning.clone()))
    } else if tool_calls.is_empty() {
        Some(ResponseContent::Text(String::new()))
    } else {
        None
    };

    ResponseMessage {
        role: "assistant".to_string(),
        content,
        reasoning_content: (!reasoning.is_empty()).then_some(reasoning),
        thinking_blocks: (!thinking_blocks.is_empty()).then_some(thinking_blocks),
        tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
    }
}

/// Replay a finished completion as `chat.completion.chunk` events.
///
/// Order: role, reasoning, content, one chunk per tool call, finish (with usage).
pub fn render_chunks(response: &ChatResponse) -> Vec<ChatChunk> {
    let Some(choice) = response.choices.first() else {
        return Vec::new();
    };
    let message = &choice.message;

    let mut deltas = vec![ChunkDelta { role: Some("assistant".to_string()), ..ChunkDelta::default() }];
    if let Some(reasoning) = &message.reasoning_content {
        deltas.push(ChunkDelta { reasoning_content: Some(reasoning.clone()), ..ChunkDelta::default() });
    }
    match &message.content {
        Some(ResponseContent::Text(text)) if text.is_empty() => {}
        Some(content) => {
            deltas.push(ChunkDelta { content: Some(content.clone()), ..ChunkDelta::default() });
        }
        None => {}
    }
    for (index, call) in message.tool_calls.iter().flatten().enumerate() {
        deltas.push(ChunkDelta {
            tool_calls: Some(vec![ChunkToolCall {
                index: index as u32,
                id: call.id.clone(),
                r#type: call.r#type.clone(),
                function: call.function.clone(),
            }]),
            ..ChunkDelta::default()
        });
    }

    let chunk = |delta: ChunkDelta, finish_reason: Option<String>, usage: Option<ChatUsage>| ChatChunk {
        id: response.id.clone(),
        object: "chat.completion.chunk".to_string(),
        created: response.created,
        model: response.model.clone(),
        choices: vec![ChunkChoice { index: 0, delta, finish_reason }],
        usage,
    };

    let mut chunks: Vec<ChatChunk> = deltas.into_iter().map(|d| chunk(d, None, None)).collect();
    chunks.push(chunk(ChunkDelta::default(), choice.finish_reason.clone(), response.usage.clone()));
    chunks
}
