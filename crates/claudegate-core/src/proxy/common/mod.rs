// Common utilities shared by the proxy layers

pub mod client_builder;
pub mod model_mapping;

pub use client_builder::build_http_client;
pub use model_mapping::{listed_models, resolve_model, strip_thinking_tag, ModelRoute, RouteSource};
