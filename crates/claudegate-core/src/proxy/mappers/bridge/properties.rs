use proptest::collection::vec;
use proptest::prelude::*;
use serde_json::json;

use super::*;
use crate::proxy::mappers::claude;
use crate::proxy::mappers::content::{ContentBlock, Message, Role, SamplingOptions, ToolCall, ToolSpec};

fn arb_text() -> impl Strategy<Value = String> {
    "[a-z ]{1,16}"
}

fn arb_thinking() -> impl Strategy<Value = ContentBlock> {
    prop_oneof![
        (arb_text(), proptest::option::of("[a-z0-9]{4,8}"))
            .prop_map(|(thinking, signature)| ContentBlock::Thinking { thinking, signature }),
        "[a-z0-9]{4,8}".prop_map(|data| ContentBlock::RedactedThinking { data }),
    ]
}

/// Any block; ids come from a small pool so orphans and duplicates show up.
fn arb_block() -> impl Strategy<Value = ContentBlock> {
    prop_oneof![
        arb_text().prop_map(ContentBlock::text),
        arb_thinking(),
        (0u8..4).prop_map(|n| ContentBlock::ToolInvocation {
            id: format!("call_{n}"),
            name: "calc".into(),
            arguments: json!({}),
        }),
        (0u8..4).prop_map(|n| ContentBlock::ToolResult {
            tool_call_id: format!("call_{n}"),
            content: json!("ok"),
            is_error: None,
        }),
    ]
}

fn arb_role() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::User), Just(Role::Assistant), Just(Role::Tool), Just(Role::System)]
}

/// Unconstrained conversations, valid or not.
fn arb_messages() -> impl Strategy<Value = Vec<Message>> {
    vec(
        (arb_role(), vec(arb_block(), 0..4), vec(arb_thinking(), 0..2)).prop_map(
            |(role, content, thinking_blocks)| Message { thinking_blocks, ..Message::new(role, content) },
        ),
        0..8,
    )
}

#[derive(Debug, Clone, Copy)]
enum ResultShape {
    /// One `tool` turn per call, answered through `tool_call_id`.
    ToolTurns,
    /// One `tool` turn per call holding a native `tool_result` block.
    InlineToolTurns,
    /// A single `user` turn with every `tool_result` block.
    UserBlocks,
}

#[derive(Debug, Clone)]
enum Turn {
    User(String),
    Reply { text: String, thinking: Option<ContentBlock>, side_channel_thinking: bool },
    ToolRound {
        calls: usize,
        native_calls: bool,
        results: ResultShape,
        thinking: Option<ContentBlock>,
        side_channel_thinking: bool,
    },
}

fn arb_turn() -> impl Strategy<Value = Turn> {
    let shape = prop_oneof![Just(ResultShape::ToolTurns), Just(ResultShape::InlineToolTurns), Just(ResultShape::UserBlocks)];
    prop_oneof![
        arb_text().prop_map(Turn::User),
        (arb_text(), proptest::option::of(arb_thinking()), any::<bool>()).prop_map(
            |(text, thinking, side_channel_thinking)| Turn::Reply { text, thinking, side_channel_thinking }
        ),
        (1usize..4, any::<bool>(), shape, proptest::option::of(arb_thinking()), any::<bool>()).prop_map(
            |(calls, native_calls, results, thinking, side_channel_thinking)| Turn::ToolRound {
                calls,
                native_calls,
                results,
                thinking,
                side_channel_thinking,
            }
        ),
    ]
}

fn with_thinking(mut msg: Message, thinking: Option<ContentBlock>, side_channel: bool) -> Message {
    if let Some(block) = thinking {
        if side_channel {
            msg.thinking_blocks.push(block);
        } else {
            msg.content.insert(0, block);
        }
    }
    msg
}

/// Well-linked conversation: every result answers a call made just before it.
fn build_conversation(turns: &[Turn]) -> Vec<Message> {
    let mut out = vec![Message::text(Role::User, "start")];
    let mut next_id = 0usize;
    for turn in turns {
        match turn {
            Turn::User(text) => out.push(Message::text(Role::User, text.clone())),
            Turn::Reply { text, thinking, side_channel_thinking } => out.push(with_thinking(
                Message::text(Role::Assistant, text.clone()),
                thinking.clone(),
                *side_channel_thinking,
            )),
            Turn::ToolRound { calls, native_calls, results, thinking, side_channel_thinking } => {
                let ids: Vec<String> = (0..*calls)
                    .map(|_| {
                        next_id += 1;
                        format!("call_{next_id}")
                    })
                    .collect();

                let mut assistant = Message::new(Role::Assistant, Vec::new());
                if *native_calls {
                    assistant.content.extend(ids.iter().map(|id| ContentBlock::ToolInvocation {
                        id: id.clone(),
                        name: "calc".into(),
                        arguments: json!({}),
                    }));
                } else {
                    assistant.tool_calls = ids
                        .iter()
                        .map(|id| ToolCall { id: id.clone(), name: "calc".into(), arguments: json!({}) })
                        .collect();
                }
                out.push(with_thinking(assistant, thinking.clone(), *side_channel_thinking));

                let result = |id: &String| ContentBlock::ToolResult {
                    tool_call_id: id.clone(),
                    content: json!("ok"),
                    is_error: None,
                };
                match results {
                    ResultShape::ToolTurns => out.extend(ids.iter().map(|id| Message {
                        tool_call_id: Some(id.clone()),
                        ..Message::text(Role::Tool, "ok")
                    })),
                    ResultShape::InlineToolTurns => {
                        out.extend(ids.iter().map(|id| Message::new(Role::Tool, vec![result(id)])))
                    }
                    ResultShape::UserBlocks => out.push(Message::new(Role::User, ids.iter().map(result).collect())),
                }
            }
        }
    }
    out
}

/// Call and result ids in conversation order, from either representation.
fn inbound_links(messages: &[Message]) -> (Vec<String>, Vec<String>) {
    let mut calls = Vec::new();
    let mut results = Vec::new();
    for msg in messages {
        for block in &msg.content {
            match block {
                ContentBlock::ToolInvocation { id, .. } => calls.push(id.clone()),
                ContentBlock::ToolResult { tool_call_id, .. } => results.push(tool_call_id.clone()),
                _ => {}
            }
        }
        calls.extend(msg.tool_calls.iter().map(|c| c.id.clone()));
        if msg.role == Role::Tool {
            results.extend(msg.tool_call_id.clone());
        }
    }
    (calls, results)
}

fn outbound_links(request: &claude::MessagesRequest) -> (Vec<String>, Vec<String>) {
    let mut calls = Vec::new();
    let mut results = Vec::new();
    for block in request.messages.iter().flat_map(|m| m.content.iter()) {
        match block {
            claude::ContentBlock::ToolUse { id, .. } => calls.push(id.clone()),
            claude::ContentBlock::ToolResult { tool_use_id, .. } => results.push(tool_use_id.clone()),
            _ => {}
        }
    }
    (calls, results)
}

fn has_thinking_block(request: &claude::MessagesRequest) -> bool {
    request.messages.iter().flat_map(|m| m.content.iter()).any(|b| {
        matches!(b, claude::ContentBlock::Thinking { .. } | claude::ContentBlock::RedactedThinking { .. })
    })
}

fn request(messages: Vec<Message>, with_tools: bool) -> Request {
    Request {
        model_id: "claude-sonnet-4.5-thinking".into(),
        messages,
        tools: if with_tools { vec![ToolSpec::function("calc", json!({"type": "object"}))] } else { Vec::new() },
        tool_choice: None,
        explicit_thinking: Some(true),
        thinking_budget: None,
        stream: false,
        options: SamplingOptions::default(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_strip_is_idempotent(messages in arb_messages(), tools_present in any::<bool>()) {
        let once = strip(messages.clone(), tools_present);
        let twice = strip(once.clone(), tools_present);
        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(once.len(), messages.len());
        if tools_present {
            prop_assert!(!once.iter().filter(|m| m.role == Role::Assistant).any(Message::has_thinking));
        } else {
            prop_assert_eq!(&once, &messages);
        }
    }

    #[test]
    fn prop_tools_exclude_thinking_for_any_input(messages in arb_messages()) {
        let outcome = Bridge::headless().transform(request(messages, true), &ExchangeContext::new(None));
        if let Ok(prepared) = outcome {
            prop_assert!(prepared.backend_request.thinking.is_none());
            prop_assert!(!has_thinking_block(&prepared.backend_request));
        }
    }

    #[test]
    fn prop_linked_conversations_stay_linked(turns in vec(arb_turn(), 0..8)) {
        let messages = build_conversation(&turns);
        let (calls_in, results_in) = inbound_links(&messages);

        let prepared = Bridge::headless()
            .transform(request(messages, true), &ExchangeContext::new(None))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let backend = &prepared.backend_request;

        prop_assert!(backend.thinking.is_none());
        prop_assert!(!has_thinking_block(backend));

        let (calls_out, results_out) = outbound_links(backend);
        prop_assert_eq!(calls_out, calls_in);
        prop_assert_eq!(results_out, results_in);

        let mut seen = std::collections::HashSet::new();
        for block in backend.messages.iter().flat_map(|m| m.content.iter()) {
            match block {
                claude::ContentBlock::ToolUse { id, .. } => {
                    seen.insert(id.clone());
                }
                claude::ContentBlock::ToolResult { tool_use_id, .. } => {
                    prop_assert!(seen.contains(tool_use_id), "result {} precedes its call", tool_use_id);
                }
                _ => {}
            }
        }
        prop_assert!(backend.messages.iter().all(|m| m.role == "user" || m.role == "assistant"));
    }
}
