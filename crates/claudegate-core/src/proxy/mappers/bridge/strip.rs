use tracing::debug;

use crate::proxy::mappers::content::{Message, Role};

/// Remove thinking traces from assistant turns when tools are in play.
///
/// Emptied turns keep their role with empty content; other roles and block
/// order are untouched. Idempotent.
pub fn strip(mut messages: Vec<Message>, tools_present: bool) -> Vec<Message> {
    if !tools_present {
        return messages;
    }

    let mut removed = 0usize;
    for msg in messages.iter_mut().filter(|m| m.role == Role::Assistant) {
        let before = msg.content.len() + msg.thinking_blocks.len();
        msg.content.retain(|block| !block.is_thinking());
        msg.thinking_blocks.clear();
        removed += before - msg.content.len();
    }

    if removed > 0 {
        debug!("[Thinking-Strip] Removed {} thinking block(s) from assistant history", removed);
    }
    messages
}

/// Whether any assistant turn still carries a thinking trace.
pub fn has_thinking(messages: &[Message]) -> bool {
    messages.iter().any(Message::has_thinking)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::mappers::content::ContentBlock;
    use serde_json::json;

    fn history() -> Vec<Message> {
        let mut assistant = Message::new(
            Role::Assistant,
            vec![
                ContentBlock::Thinking { thinking: "plan".into(), signature: Some("sig".into()) },
                ContentBlock::text("calling"),
                ContentBlock::ToolInvocation { id: "toolu_1".into(), name: "calc".into(), arguments: json!({}) },
            ],
        );
        assistant.thinking_blocks.push(ContentBlock::RedactedThinking { data: "x".into() });
        vec![
            Message::text(Role::User, "2+2?"),
            assistant,
            Message::new(Role::Assistant, vec![ContentBlock::RedactedThinking { data: "y".into() }]),
        ]
    }

    #[test]
    fn test_no_tools_is_identity() {
        let messages = history();
        assert_eq!(strip(messages.clone(), false), messages);
    }

    #[test]
    fn test_strips_and_keeps_order() {
        let stripped = strip(history(), true);
        assert_eq!(stripped.len(), 3);
        let kinds: Vec<&str> = stripped[1].content.iter().map(ContentBlock::kind).collect();
        assert_eq!(kinds, vec!["text", "tool_use"]);
        assert!(stripped[1].thinking_blocks.is_empty());
        assert!(!has_thinking(&stripped));
    }

    #[test]
    fn test_emptied_turn_survives() {
        let stripped = strip(history(), true);
        assert_eq!(stripped[2].role, Role::Assistant);
        assert!(stripped[2].content.is_empty());
    }

    #[test]
    fn test_idempotent() {
        let once = strip(history(), true);
        let twice = strip(once.clone(), true);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_user_turns_untouched() {
        let user = Message::new(Role::User, vec![ContentBlock::text("hi")]);
        assert_eq!(strip(vec![user.clone()], true), vec![user]);
    }
}
