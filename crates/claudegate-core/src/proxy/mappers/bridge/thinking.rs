//! Thinking-mode arbitration and budget planning.
//!
//! Extended thinking and tool use are mutually exclusive per request: tools
//! always win. When thinking is requested it must also pass the history gate
//! and the budget gate before it is actually enabled.

use claudegate_types::ThinkingPolicy;
use tracing::{debug, warn};

use crate::proxy::mappers::content::{Message, Role, ToolSpec};

const THINKING_TAG: &str = "thinking";

/// Outcome fed to the assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThinkingPlan {
    Disabled,
    Enabled { budget_tokens: u32 },
}

impl ThinkingPlan {
    pub fn is_enabled(&self) -> bool {
        matches!(self, ThinkingPlan::Enabled { .. })
    }
}

/// Decide whether extended thinking is requested.
///
/// Precedence: tools present, then the explicit flag, then the model-id tag or
/// beta hint.
pub fn decide(tools: &[ToolSpec], explicit: Option<bool>, model_id: &str, beta_hint: bool) -> bool {
    if !tools.is_empty() {
        if explicit == Some(true) || model_has_thinking_tag(model_id) {
            debug!("[Thinking] Requested but disabled: {} tool(s) present", tools.len());
        }
        return false;
    }
    if let Some(flag) = explicit {
        return flag;
    }
    model_has_thinking_tag(model_id) || beta_hint
}

pub fn model_has_thinking_tag(model_id: &str) -> bool {
    model_id.to_ascii_lowercase().contains(THINKING_TAG)
}

/// `anthropic-beta` header values such as `interleaved-thinking-2025-05-14`.
pub fn beta_requests_thinking(header: Option<&str>) -> bool {
    header.is_some_and(|h| h.to_ascii_lowercase().contains(THINKING_TAG))
}

/// Every assistant turn before the final message must already carry thinking.
///
/// The backend rejects a thinking-enabled request whose replayed assistant
/// turns do not start with a thinking block.
pub fn history_supports_thinking(messages: &[Message]) -> bool {
    let Some((_, earlier)) = messages.split_last() else {
        return true;
    };
    earlier.iter().filter(|m| m.role == Role::Assistant).all(Message::has_thinking)
}

/// Turn a thinking request into a concrete plan.
pub fn plan(
    requested: bool,
    messages: &[Message],
    max_tokens: u32,
    explicit_budget: Option<u32>,
    policy: &ThinkingPolicy,
) -> ThinkingPlan {
    if !requested {
        return ThinkingPlan::Disabled;
    }
    if !history_supports_thinking(messages) {
        warn!("[Thinking] Skipped: assistant history lacks thinking blocks");
        return ThinkingPlan::Disabled;
    }

    let cap = max_tokens.saturating_sub(policy.response_headroom);
    let raw = explicit_budget.unwrap_or((max_tokens as f32 * policy.budget_ratio) as u32);
    let budget = raw.max(policy.min_budget_tokens).min(cap);
    if budget < policy.min_budget_tokens {
        warn!(
            "[Thinking] Skipped: max_tokens {} leaves no room for the minimum budget of {}",
            max_tokens, policy.min_budget_tokens
        );
        return ThinkingPlan::Disabled;
    }

    debug!("[Thinking] Enabled with budget_tokens={} (max_tokens={})", budget, max_tokens);
    ThinkingPlan::Enabled { budget_tokens: budget }
}
