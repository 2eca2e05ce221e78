//! OpenAI API data models for the inbound request and the rendered reply.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::proxy::mappers::claude;

/// OpenAI chat completion request.
///
/// `content`, `tools`, `tool_choice` and `stop` stay loosely typed here; the
/// inbound parser validates them with precise error messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ChatRequest {
    /// Model identifier (e.g., "claude-sonnet-4-5-thinking").
    pub model: String,
    /// Conversation messages.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    /// Enable streaming response.
    #[serde(default)]
    pub stream: bool,
    /// Maximum tokens in response.
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Newer spelling of `max_tokens`.
    #[serde(default)]
    pub max_completion_tokens: Option<u32>,
    /// Sampling temperature.
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Nucleus sampling parameter.
    #[serde(default)]
    pub top_p: Option<f32>,
    /// Top-k sampling parameter (extension).
    #[serde(default)]
    pub top_k: Option<u32>,
    /// Stop sequences (string or array).
    #[serde(default)]
    pub stop: Option<Value>,
    /// Tool definitions, generic or native.
    #[serde(default)]
    pub tools: Option<Vec<Value>>,
    /// Tool choice strategy.
    #[serde(default)]
    pub tool_choice: Option<Value>,
    /// Explicit extended thinking directive (extension).
    #[serde(default)]
    pub thinking: Option<ThinkingParam>,
    /// End-user identifier.
    #[serde(default)]
    pub user: Option<String>,
}

/// `{"type": "enabled", "budget_tokens": n}` or `{"type": "disabled"}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[non_exhaustive]
pub struct ThinkingParam {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub budget_tokens: Option<u32>,
}

/// Message in OpenAI conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ChatMessage {
    /// Role (system, developer, user, assistant, tool).
    pub role: String,
    /// String or array of content parts.
    #[serde(default)]
    pub content: Option<Value>,
    /// Tool calls made by assistant.
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Tool call ID for tool responses.
    #[serde(default)]
    pub tool_call_id: Option<String>,
    /// Function name for tool messages.
    #[serde(default)]
    pub name: Option<String>,
    /// Signed thinking traces replayed by the client.
    #[serde(default)]
    pub thinking_blocks: Option<Vec<Value>>,
    /// Reasoning text echoed back by some clients; informational only.
    #[serde(default)]
    pub reasoning_content: Option<String>,
}

/// One element of an array-form `content`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
#[non_exhaustive]
pub enum ChatContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
    #[serde(rename = "image")]
    Image { source: claude::ImageSource },
    #[serde(rename = "tool_use")]
    ToolUse { id: String, name: String, input: Value },
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        #[serde(default)]
        content: Value,
        #[serde(default)]
        is_error: Option<bool>,
    },
    #[serde(rename = "thinking")]
    Thinking {
        thinking: String,
        #[serde(default)]
        signature: Option<String>,
    },
    #[serde(rename = "redacted_thinking")]
    RedactedThinking { data: String },
    #[serde(rename = "server_tool_use")]
    ServerToolUse { id: String, name: String, input: Value },
    #[serde(rename = "web_search_tool_result")]
    WebSearchToolResult { tool_use_id: String, content: Value },
}

/// Image URL with optional detail level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[non_exhaustive]
pub struct ImageUrl {
    /// Image URL (data URI or HTTP URL).
    pub url: String,
    /// Detail level ("low", "high", "auto").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Tool call made by assistant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[non_exhaustive]
pub struct ToolCall {
    /// Unique tool call identifier.
    pub id: String,
    /// Tool type (always "function").
    #[serde(default = "default_tool_type")]
    pub r#type: String,
    /// Function call details.
    pub function: ToolFunction,
}

impl ToolCall {
    pub fn function(id: impl Into<String>, name: impl Into<String>, arguments: String) -> Self {
        Self {
            id: id.into(),
            r#type: default_tool_type(),
            function: ToolFunction { name: name.into(), arguments },
        }
    }
}

/// Function call details in tool call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[non_exhaustive]
pub struct ToolFunction {
    /// Function name.
    pub name: String,
    /// JSON-encoded function arguments.
    #[serde(default)]
    pub arguments: String,
}

fn default_tool_type() -> String {
    "function".to_string()
}

// ============================================================================
// Response
// ============================================================================

/// OpenAI chat completion response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[non_exhaustive]
pub struct ChatResponse {
    /// Response identifier (the backend message id).
    pub id: String,
    /// Object type ("chat.completion").
    pub object: String,
    /// Unix timestamp of creation.
    pub created: i64,
    /// Model id the client asked for.
    pub model: String,
    /// Completion choices.
    pub choices: Vec<Choice>,
    /// Token usage statistics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<ChatUsage>,
}

/// Single completion choice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[non_exhaustive]
pub struct Choice {
    pub index: u32,
    pub message: ResponseMessage,
    /// stop, tool_calls, length or content_filter.
    pub finish_reason: Option<String>,
}

/// Assistant message in a completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[non_exhaustive]
pub struct ResponseMessage {
    pub role: String,
    /// Joined text, or the native block array for native-format clients.
    pub content: Option<ResponseContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_blocks: Option<Vec<claude::ContentBlock>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

/// Message content as rendered back to the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ResponseContent {
    Text(String),
    Blocks(Vec<claude::ContentBlock>),
}

/// Token usage statistics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[non_exhaustive]
pub struct ChatUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl ChatUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

// ============================================================================
// Streaming
// ============================================================================

/// One `chat.completion.chunk` SSE payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[non_exhaustive]
pub struct ChatChunk {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<ChatUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[non_exhaustive]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: ChunkDelta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[non_exhaustive]
pub struct ChunkDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<ResponseContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ChunkToolCall>>,
}

/// Tool call fragment inside a streaming delta.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[non_exhaustive]
pub struct ChunkToolCall {
    pub index: u32,
    pub id: String,
    pub r#type: String,
    pub function: ToolFunction,
}

// ============================================================================
// Model listing
// ============================================================================

/// `GET /v1/models` body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[non_exhaustive]
pub struct ModelList {
    pub object: String,
    pub data: Vec<ModelEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[non_exhaustive]
pub struct ModelEntry {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

impl ModelList {
    pub fn from_ids<I: IntoIterator<Item = String>>(ids: I, created: i64) -> Self {
        Self {
            object: "list".to_string(),
            data: ids
                .into_iter()
                .map(|id| ModelEntry {
                    id,
                    object: "model".to_string(),
                    created,
                    owned_by: "anthropic".to_string(),
                })
                .collect(),
        }
    }
}
