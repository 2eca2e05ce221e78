//! Client model id -> backend model id resolution.

use std::collections::HashMap;
use std::sync::LazyLock;

use claudegate_types::BackendKind;

/// Cursor-style ids mapped to Claude on Vertex publisher model ids.
static VERTEX_ALIASES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("claude-sonnet-4.5", "claude-sonnet-4-5@20250929"),
        ("claude-4.5-sonnet", "claude-sonnet-4-5@20250929"),
        ("claude-sonnet-4-5", "claude-sonnet-4-5@20250929"),
        ("claude-opus-4.5", "claude-opus-4-5@20251101"),
        ("claude-4.5-opus", "claude-opus-4-5@20251101"),
        ("claude-opus-4-5", "claude-opus-4-5@20251101"),
        ("claude-haiku-4.5", "claude-haiku-4-5@20251001"),
        ("claude-4.5-haiku", "claude-haiku-4-5@20251001"),
        ("claude-haiku-4-5", "claude-haiku-4-5@20251001"),
        ("claude-opus-4.1", "claude-opus-4-1@20250805"),
        ("claude-opus-4-1", "claude-opus-4-1@20250805"),
        ("claude-sonnet-4", "claude-sonnet-4@20250514"),
        ("claude-4-sonnet", "claude-sonnet-4@20250514"),
        ("claude-opus-4", "claude-opus-4@20250514"),
        ("claude-3.7-sonnet", "claude-3-7-sonnet@20250219"),
        ("claude-3-7-sonnet", "claude-3-7-sonnet@20250219"),
    ])
});

const THINKING_SUFFIX: &str = "-thinking";

/// How a backend model id was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteSource {
    Configured,
    BuiltIn,
    Passthrough,
}

impl RouteSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteSource::Configured => "configured",
            RouteSource::BuiltIn => "built-in",
            RouteSource::Passthrough => "passthrough",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRoute {
    pub backend_model: String,
    pub source: RouteSource,
}

/// Drop a trailing `-thinking` tag (any case).
#[must_use]
pub fn strip_thinking_tag(model: &str) -> &str {
    let split = model.len().saturating_sub(THINKING_SUFFIX.len());
    match model.get(split..) {
        Some(tail) if split > 0 && tail.eq_ignore_ascii_case(THINKING_SUFFIX) => &model[..split],
        _ => model,
    }
}

/// Resolve a client model id.
///
/// Configured mappings win over built-in aliases; each is tried with the exact
/// id, then with the thinking tag removed. Unknown ids pass through untagged.
#[must_use]
pub fn resolve_model(
    client_model: &str,
    custom: &HashMap<String, String>,
    kind: BackendKind,
) -> ModelRoute {
    let untagged = strip_thinking_tag(client_model);

    for candidate in [client_model, untagged] {
        if let Some(mapped) = custom.get(candidate) {
            return ModelRoute { backend_model: mapped.clone(), source: RouteSource::Configured };
        }
    }
    if kind == BackendKind::Vertex {
        for candidate in [client_model, untagged] {
            if let Some(mapped) = VERTEX_ALIASES.get(candidate) {
                return ModelRoute {
                    backend_model: (*mapped).to_owned(),
                    source: RouteSource::BuiltIn,
                };
            }
        }
    }
    ModelRoute { backend_model: untagged.to_owned(), source: RouteSource::Passthrough }
}

/// Model ids advertised on `/v1/models`, sorted.
#[must_use]
pub fn listed_models(custom: &HashMap<String, String>, kind: BackendKind) -> Vec<String> {
    let mut ids: Vec<String> = custom.keys().cloned().collect();
    if kind == BackendKind::Vertex {
        ids.extend(VERTEX_ALIASES.keys().map(|key| (*key).to_owned()));
    }
    ids.sort();
    ids.dedup();
    ids
}
