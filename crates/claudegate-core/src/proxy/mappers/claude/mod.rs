// Backend (Anthropic Messages / Vertex rawPredict) wire types

pub mod claude_models;
pub mod claude_response;
pub mod content_block;

pub use claude_models::{Message, MessagesRequest, ThinkingConfig, ToolChoice};
pub use claude_response::{Metadata, MessagesResponse, Tool, Usage};
pub use content_block::{ContentBlock, ImageSource};
