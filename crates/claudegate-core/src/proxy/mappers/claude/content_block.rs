//! Backend content block types.
//!
//! Wire shapes of the Anthropic Messages API, plus lossless conversions to and
//! from the bridge content model.

use serde::{Deserialize, Serialize};

use crate::proxy::mappers::content;

/// Content block types for backend messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    /// Plain text content block.
    #[serde(rename = "text")]
    Text {
        /// The text content.
        text: String,
    },

    /// Thinking/reasoning content block (extended thinking feature).
    #[serde(rename = "thinking")]
    Thinking {
        /// The thinking/reasoning text.
        thinking: String,
        /// Cryptographic signature the backend checks on replay.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },

    /// Redacted thinking block (content hidden for safety).
    #[serde(rename = "redacted_thinking")]
    RedactedThinking {
        /// Opaque data representing redacted content.
        data: String,
    },

    /// Image content block.
    #[serde(rename = "image")]
    Image {
        /// Base64 payload or remote URL.
        source: ImageSource,
    },

    /// Tool use request from the model.
    #[serde(rename = "tool_use")]
    ToolUse {
        /// Unique identifier for this tool use.
        id: String,
        /// Name of the tool being called.
        name: String,
        /// Input arguments for the tool.
        input: serde_json::Value,
    },

    /// Result from a tool execution.
    #[serde(rename = "tool_result")]
    ToolResult {
        /// ID of the tool use this result corresponds to.
        tool_use_id: String,
        /// The result content from the tool.
        #[serde(default)]
        content: serde_json::Value,
        /// Whether the tool execution resulted in an error.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },

    /// Server-side tool use.
    #[serde(rename = "server_tool_use")]
    ServerToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },

    /// Web search tool result.
    #[serde(rename = "web_search_tool_result")]
    WebSearchToolResult {
        tool_use_id: String,
        content: serde_json::Value,
    },
}

/// Source information for image content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageSource {
    Base64 { media_type: String, data: String },
    Url { url: String },
}

impl From<&content::ImageSource> for ImageSource {
    fn from(source: &content::ImageSource) -> Self {
        match source {
            content::ImageSource::Base64 { media_type, data } => ImageSource::Base64 {
                media_type: media_type.clone(),
                data: data.clone(),
            },
            content::ImageSource::Url { url } => ImageSource::Url { url: url.clone() },
        }
    }
}

impl From<ImageSource> for content::ImageSource {
    fn from(source: ImageSource) -> Self {
        match source {
            ImageSource::Base64 { media_type, data } => {
                content::ImageSource::Base64 { media_type, data }
            }
            ImageSource::Url { url } => content::ImageSource::Url { url },
        }
    }
}

impl From<&content::ContentBlock> for ContentBlock {
    fn from(block: &content::ContentBlock) -> Self {
        match block {
            content::ContentBlock::Text { text } => ContentBlock::Text { text: text.clone() },
            content::ContentBlock::Image { source } => {
                ContentBlock::Image { source: source.into() }
            }
            content::ContentBlock::ToolInvocation { id, name, arguments } => ContentBlock::ToolUse {
                id: id.clone(),
                name: name.clone(),
                input: arguments.clone(),
            },
            content::ContentBlock::ToolResult { tool_call_id, content, is_error } => {
                ContentBlock::ToolResult {
                    tool_use_id: tool_call_id.clone(),
                    content: content.clone(),
                    is_error: *is_error,
                }
            }
            content::ContentBlock::Thinking { thinking, signature } => ContentBlock::Thinking {
                thinking: thinking.clone(),
                signature: signature.clone(),
            },
            content::ContentBlock::RedactedThinking { data } => {
                ContentBlock::RedactedThinking { data: data.clone() }
            }
            content::ContentBlock::ServerToolUse { id, name, input } => ContentBlock::ServerToolUse {
                id: id.clone(),
                name: name.clone(),
                input: input.clone(),
            },
            content::ContentBlock::ServerToolResult { tool_use_id, content } => {
                ContentBlock::WebSearchToolResult {
                    tool_use_id: tool_use_id.clone(),
                    content: content.clone(),
                }
            }
        }
    }
}

impl From<ContentBlock> for content::ContentBlock {
    fn from(block: ContentBlock) -> Self {
        match block {
            ContentBlock::Text { text } => content::ContentBlock::Text { text },
            ContentBlock::Image { source } => content::ContentBlock::Image { source: source.into() },
            ContentBlock::ToolUse { id, name, input } => {
                content::ContentBlock::ToolInvocation { id, name, arguments: input }
            }
            ContentBlock::ToolResult { tool_use_id, content, is_error } => {
                content::ContentBlock::ToolResult { tool_call_id: tool_use_id, content, is_error }
            }
            ContentBlock::Thinking { thinking, signature } => {
                content::ContentBlock::Thinking { thinking, signature }
            }
            ContentBlock::RedactedThinking { data } => content::ContentBlock::RedactedThinking { data },
            ContentBlock::ServerToolUse { id, name, input } => {
                content::ContentBlock::ServerToolUse { id, name, input }
            }
            ContentBlock::WebSearchToolResult { tool_use_id, content } => {
                content::ContentBlock::ServerToolResult { tool_use_id, content }
            }
        }
    }
}
