// OpenAI chat-completions surface
// Inbound parsing into the content model and outbound rendering

pub mod models;
pub mod request;
pub mod response;


pub use models::*;
pub use request::{parse_chat_request, parse_tool_arguments, parse_tool_choice, to_content_request};
pub use response::{render_chat_response, render_chunks};
