pub mod bridge;
pub mod claude;
pub mod content;
pub mod openai;
