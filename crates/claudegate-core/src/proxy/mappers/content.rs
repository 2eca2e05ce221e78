//! Typed content model shared by every bridge stage.
//!
//! Messages and blocks are closed tagged unions: every consumer matches
//! exhaustively, so an unrecognized block can never slip through a stage.

use serde_json::{Map, Value};

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    /// Parse a wire role; `developer` is OpenAI's newer spelling of `system`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "system" | "developer" => Some(Role::System),
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            "tool" => Some(Role::Tool),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// Where image bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Base64 { media_type: String, data: String },
    Url { url: String },
}

/// One block of message content.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Image {
        source: ImageSource,
    },
    /// Model-issued call to an external tool; `id` is unique within the conversation.
    ToolInvocation {
        id: String,
        name: String,
        arguments: Value,
    },
    /// Caller's answer to an earlier `ToolInvocation`.
    ToolResult {
        tool_call_id: String,
        content: Value,
        is_error: Option<bool>,
    },
    Thinking {
        thinking: String,
        signature: Option<String>,
    },
    RedactedThinking {
        data: String,
    },
    /// Backend-executed tool call (web search and friends).
    ServerToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ServerToolResult {
        tool_use_id: String,
        content: Value,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn is_thinking(&self) -> bool {
        matches!(self, ContentBlock::Thinking { .. } | ContentBlock::RedactedThinking { .. })
    }

    /// Whether this block only exists in the provider-native wire shape.
    pub fn is_native(&self) -> bool {
        match self {
            ContentBlock::ToolInvocation { .. }
            | ContentBlock::ToolResult { .. }
            | ContentBlock::Thinking { .. }
            | ContentBlock::RedactedThinking { .. } => true,
            ContentBlock::Text { .. }
            | ContentBlock::Image { .. }
            | ContentBlock::ServerToolUse { .. }
            | ContentBlock::ServerToolResult { .. } => false,
        }
    }

    /// Short tag used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            ContentBlock::Text { .. } => "text",
            ContentBlock::Image { .. } => "image",
            ContentBlock::ToolInvocation { .. } => "tool_use",
            ContentBlock::ToolResult { .. } => "tool_result",
            ContentBlock::Thinking { .. } => "thinking",
            ContentBlock::RedactedThinking { .. } => "redacted_thinking",
            ContentBlock::ServerToolUse { .. } => "server_tool_use",
            ContentBlock::ServerToolResult { .. } => "web_search_tool_result",
        }
    }
}

/// Generic (OpenAI-style) tool call carried beside an assistant turn's content.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// A conversation turn.
///
/// `content` holds the block sequence; `tool_calls`, `tool_call_id` and
/// `thinking_blocks` are the generic side channel a foreign-format client uses
/// instead of native blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
    pub tool_calls: Vec<ToolCall>,
    pub tool_call_id: Option<String>,
    pub thinking_blocks: Vec<ContentBlock>,
}

impl Message {
    pub fn new(role: Role, content: Vec<ContentBlock>) -> Self {
        Self {
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
            thinking_blocks: Vec::new(),
        }
    }

    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self::new(role, vec![ContentBlock::text(text)])
    }

    /// Whether this turn carries a thinking trace in either representation.
    pub fn has_thinking(&self) -> bool {
        !self.thinking_blocks.is_empty() || self.content.iter().any(ContentBlock::is_thinking)
    }

    /// One-line summary for transform dumps.
    pub fn describe(&self) -> String {
        let kinds: Vec<&str> = self.content.iter().map(ContentBlock::kind).collect();
        let mut out = format!("role={}, content={:?}", self.role.as_str(), kinds);
        if !self.tool_calls.is_empty() {
            let names: Vec<&str> = self.tool_calls.iter().map(|c| c.name.as_str()).collect();
            out.push_str(&format!(", tool_calls={:?}", names));
        }
        if let Some(id) = &self.tool_call_id {
            out.push_str(&format!(", tool_call_id={}", id));
        }
        if !self.thinking_blocks.is_empty() {
            out.push_str(&format!(", thinking_blocks={}", self.thinking_blocks.len()));
        }
        out
    }
}

/// How a tool definition is expressed on the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolKind {
    /// Caller-executed function tool.
    Function,
    /// Backend server tool such as `web_search_20250305`, with its extra options.
    Native { tool_type: String, options: Map<String, Value> },
}

/// Caller-supplied tool definition. Read-only to the bridge.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: Option<String>,
    pub parameter_schema: Option<Value>,
    pub kind: ToolKind,
}

impl ToolSpec {
    pub fn function(name: impl Into<String>, parameter_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: None,
            parameter_schema: Some(parameter_schema),
            kind: ToolKind::Function,
        }
    }

    pub fn native_type(&self) -> Option<&str> {
        match &self.kind {
            ToolKind::Native { tool_type, .. } => Some(tool_type),
            ToolKind::Function => None,
        }
    }
}

/// Caller's tool-selection directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolChoice {
    /// Model decides.
    Auto,
    /// No tool use.
    None,
    /// Model must call some tool.
    Any,
    /// Force one named tool. An empty name is invalid.
    Specific { name: String },
}

/// Which wire convention an inbound conversation already uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// Provider-native blocks are present; forward without re-encoding.
    Native,
    /// Generic tool-calling shape; needs full normalization.
    Foreign,
}

impl WireFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            WireFormat::Native => "native",
            WireFormat::Foreign => "foreign",
        }
    }
}

/// Sampling knobs forwarded to the backend as-is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SamplingOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
    pub stop: Vec<String>,
    pub user: Option<String>,
}

/// Parsed inbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub model_id: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolSpec>,
    pub tool_choice: Option<ToolChoice>,
    /// `Some` when the caller sent an explicit `thinking` directive.
    pub explicit_thinking: Option<bool>,
    pub thinking_budget: Option<u32>,
    pub stream: bool,
    pub options: SamplingOptions,
}

/// Terminal signal of a translated turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// Final answer, no pending tool calls.
    Stop,
    /// One or more tool invocations await caller-side execution.
    ToolCalls,
    Length,
    Error,
}

impl FinishReason {
    pub fn as_openai_str(&self) -> &'static str {
        match self {
            FinishReason::Stop => "stop",
            FinishReason::ToolCalls => "tool_calls",
            FinishReason::Length => "length",
            FinishReason::Error => "content_filter",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Translated backend reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub id: String,
    pub model: String,
    pub content: Vec<ContentBlock>,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}
