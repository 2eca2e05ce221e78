use std::sync::Arc;

use async_trait::async_trait;
use claudegate_types::{BridgeError, BridgeResult};
use parking_lot::Mutex;
use serde_json::{json, Value};

use super::*;
use crate::proxy::mappers::claude::{self, ContentBlock, MessagesRequest, MessagesResponse, ToolChoice};
use crate::proxy::observer::{ExchangeContext, FanoutObserver, JsonlObserver, TransformObserver, CLIENT_CLOSED_REQUEST};

fn bridge() -> Bridge {
    Bridge::headless()
}

fn ctx() -> ExchangeContext {
    ExchangeContext::new(None)
}

fn prepare(body: Value) -> BridgeResult<PreparedRequest> {
    bridge().prepare(&serde_json::to_vec(&body).unwrap(), &ctx())
}

fn calc_tool() -> Value {
    json!({"type": "function", "function": {"name": "calc", "parameters": {"type": "object", "properties": {"expr": {"type": "string"}}}}})
}

fn round_trip_body() -> Value {
    json!({
        "model": "claude-sonnet-4.5",
        "messages": [
            {"role": "user", "content": "2+2?"},
            {"role": "assistant", "content": "", "tool_calls": [
                {"id": "call_1", "type": "function", "function": {"name": "calc", "arguments": "{\"expr\":\"2+2\"}"}}
            ]},
            {"role": "tool", "tool_call_id": "call_1", "content": "4"}
        ],
        "tools": [calc_tool()]
    })
}

#[test]
fn test_round_trip_scenario_keeps_order_and_ids() {
    let prepared = prepare(round_trip_body()).unwrap();
    let req = &prepared.backend_request;

    assert_eq!(prepared.format, WireFormat::Foreign);
    assert_eq!(req.messages.len(), 3);
    let roles: Vec<&str> = req.messages.iter().map(|m| m.role.as_str()).collect();
    assert_eq!(roles, vec!["user", "assistant", "user"]);
    assert_eq!(
        req.messages[1].content,
        vec![ContentBlock::ToolUse { id: "call_1".into(), name: "calc".into(), input: json!({"expr": "2+2"}) }]
    );
    assert_eq!(
        req.messages[2].content,
        vec![ContentBlock::ToolResult { tool_use_id: "call_1".into(), content: json!("4"), is_error: None }]
    );
    assert!(req.thinking.is_none());
    assert_eq!(req.model.as_deref(), Some("claude-sonnet-4-5@20250929"));
}

#[test]
fn test_final_answer_translates_to_stop() {
    let b = bridge();
    let c = ctx();
    let prepared = b.prepare(&serde_json::to_vec(&round_trip_body()).unwrap(), &c).unwrap();
    let reply = MessagesResponse {
        id: "msg_1".into(),
        type_: "message".into(),
        role: "assistant".into(),
        model: "claude-sonnet-4-5".into(),
        content: vec![ContentBlock::Text { text: "2+2 = 4".into() }],
        stop_reason: Some("end_turn".into()),
        stop_sequence: None,
        usage: claude::Usage::default(),
    };
    let response = b.complete(&prepared, reply, &c).unwrap();
    assert_eq!(response.choices[0].finish_reason.as_deref(), Some("stop"));
    assert_eq!(response.model, "claude-sonnet-4.5");
    assert!(response.choices[0].message.tool_calls.is_none());
}

#[test]
fn test_tools_disable_explicit_thinking_and_strip_history() {
    let prepared = prepare(json!({
        "model": "claude-sonnet-4.5-thinking",
        "thinking": {"type": "enabled", "budget_tokens": 4096},
        "messages": [
            {"role": "user", "content": "hi"},
            {"role": "assistant", "content": "hello", "thinking_blocks": [
                {"type": "thinking", "thinking": "greet", "signature": "sig"}
            ]},
            {"role": "user", "content": "compute"}
        ],
        "tools": [calc_tool()]
    }))
    .unwrap();

    let req = &prepared.backend_request;
    assert!(req.thinking.is_none());
    assert_eq!(prepared.thinking, ThinkingPlan::Disabled);
    assert_eq!(req.messages[1].content, vec![ContentBlock::Text { text: "hello".into() }]);
}

#[test]
fn test_native_history_stripped_when_tools_present() {
    let prepared = prepare(json!({
        "model": "claude-sonnet-4.5",
        "messages": [
            {"role": "user", "content": "read it"},
            {"role": "assistant", "content": [
                {"type": "thinking", "thinking": "plan", "signature": "sig"},
                {"type": "tool_use", "id": "toolu_1", "name": "read", "input": {"path": "a"}}
            ]},
            {"role": "user", "content": [{"type": "tool_result", "tool_use_id": "toolu_1", "content": "body"}]}
        ],
        "tools": [{"name": "read", "input_schema": {"type": "object"}}]
    }))
    .unwrap();

    assert_eq!(prepared.format, WireFormat::Native);
    let assistant = &prepared.backend_request.messages[1];
    assert_eq!(assistant.content.len(), 1);
    assert!(matches!(&assistant.content[0], ContentBlock::ToolUse { id, .. } if id == "toolu_1"));
}

#[test]
fn test_thinking_enabled_without_tools() {
    let prepared = prepare(json!({
        "model": "claude-4.5-sonnet-thinking",
        "max_tokens": 8000,
        "messages": [{"role": "user", "content": "think hard"}]
    }))
    .unwrap();
    let req = &prepared.backend_request;
    assert_eq!(req.thinking, Some(claude::ThinkingConfig::enabled(4000)));
    assert_eq!(prepared.route.backend_model, "claude-sonnet-4-5@20250929");
}

#[test]
fn test_beta_header_requests_thinking() {
    let body = serde_json::to_vec(&json!({
        "model": "claude-sonnet-4.5",
        "messages": [{"role": "user", "content": "hi"}]
    }))
    .unwrap();
    let context = ExchangeContext::new(Some("interleaved-thinking-2025-05-14".into()));
    let prepared = bridge().prepare(&body, &context).unwrap();
    assert!(prepared.backend_request.thinking.is_some());
}

#[test]
fn test_history_without_thinking_skips_thinking() {
    let prepared = prepare(json!({
        "model": "claude-sonnet-4.5-thinking",
        "messages": [
            {"role": "user", "content": "hi"},
            {"role": "assistant", "content": "plain answer"},
            {"role": "user", "content": "again"}
        ]
    }))
    .unwrap();
    assert!(prepared.backend_request.thinking.is_none());
}

#[test]
fn test_orphan_tool_result_is_assembly_error() {
    let err = prepare(json!({
        "model": "claude-sonnet-4.5",
        "messages": [
            {"role": "user", "content": "hi"},
            {"role": "tool", "tool_call_id": "call_missing", "content": "4"}
        ],
        "tools": [calc_tool()]
    }))
    .unwrap_err();
    assert!(matches!(err, BridgeError::Assembly { .. }));
    assert_eq!(err.http_status_code(), 500);
}

#[test]
fn test_nameless_forced_choice_dropped() {
    let prepared = prepare(json!({
        "model": "claude-sonnet-4.5",
        "messages": [{"role": "user", "content": "hi"}],
        "tools": [calc_tool()],
        "tool_choice": {"type": "tool"}
    }))
    .unwrap();
    assert_eq!(prepared.backend_request.tool_choice, None);
}

#[test]
fn test_forced_choice_passes_through() {
    let prepared = prepare(json!({
        "model": "claude-sonnet-4.5",
        "messages": [{"role": "user", "content": "hi"}],
        "tools": [calc_tool()],
        "tool_choice": {"type": "function", "function": {"name": "calc"}}
    }))
    .unwrap();
    assert_eq!(prepared.backend_request.tool_choice, Some(ToolChoice::Tool { name: "calc".into() }));
}

#[test]
fn test_forced_choice_without_tools_is_assembly_error() {
    let err = prepare(json!({
        "model": "claude-sonnet-4.5",
        "messages": [{"role": "user", "content": "hi"}],
        "tool_choice": {"type": "function", "function": {"name": "calc"}}
    }))
    .unwrap_err();
    assert!(matches!(err, BridgeError::Assembly { .. }));
}

#[test]
fn test_forced_unknown_tool_is_assembly_error() {
    let err = prepare(json!({
        "model": "claude-sonnet-4.5",
        "messages": [{"role": "user", "content": "hi"}],
        "tools": [calc_tool()],
        "tool_choice": {"type": "function", "function": {"name": "search"}}
    }))
    .unwrap_err();
    assert!(err.message().contains("search"));
}

#[test]
fn test_auto_choice_omitted_without_tools() {
    let prepared = prepare(json!({
        "model": "claude-sonnet-4.5",
        "messages": [{"role": "user", "content": "hi"}],
        "tool_choice": "auto"
    }))
    .unwrap();
    assert_eq!(prepared.backend_request.tool_choice, None);
    assert!(prepared.backend_request.tools.is_none());
}

#[test]
fn test_system_lifted_and_consecutive_tools_merged() {
    let prepared = prepare(json!({
        "model": "claude-sonnet-4.5",
        "messages": [
            {"role": "system", "content": "You are terse."},
            {"role": "user", "content": "two calls"},
            {"role": "assistant", "content": "ok", "tool_calls": [
                {"id": "call_a", "type": "function", "function": {"name": "calc", "arguments": "{}"}},
                {"id": "call_b", "type": "function", "function": {"name": "calc", "arguments": "{}"}}
            ]},
            {"role": "tool", "tool_call_id": "call_a", "content": "1"},
            {"role": "tool", "tool_call_id": "call_b", "content": "2"},
            {"role": "developer", "content": "Answer in English."}
        ],
        "tools": [calc_tool()]
    }))
    .unwrap();

    let req = &prepared.backend_request;
    assert_eq!(req.system.as_deref(), Some("You are terse.\n\nAnswer in English."));
    assert_eq!(req.messages.len(), 3);
    let kinds: Vec<&str> = req.messages[1]
        .content
        .iter()
        .map(|b| match b {
            ContentBlock::Text { .. } => "text",
            ContentBlock::ToolUse { .. } => "tool_use",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, vec!["text", "tool_use", "tool_use"]);
    assert_eq!(req.messages[2].content.len(), 2);
}

#[test]
fn test_native_tool_role_relabelled_user() {
    let prepared = prepare(json!({
        "model": "claude-sonnet-4.5",
        "messages": [
            {"role": "assistant", "content": [{"type": "tool_use", "id": "toolu_1", "name": "calc", "input": {}}]},
            {"role": "tool", "content": [{"type": "tool_result", "tool_use_id": "toolu_1", "content": "4"}]}
        ],
        "tools": [calc_tool()]
    }))
    .unwrap();
    let req = &prepared.backend_request;
    assert_eq!(req.messages.len(), 2);
    assert_eq!(req.messages[1].role, "user");
    assert!(matches!(&req.messages[1].content[0], ContentBlock::ToolResult { tool_use_id, .. } if tool_use_id == "toolu_1"));
}

#[test]
fn test_native_parallel_results_merged_into_one_user_turn() {
    let prepared = prepare(json!({
        "model": "claude-sonnet-4.5",
        "messages": [
            {"role": "user", "content": "both"},
            {"role": "assistant", "content": [
                {"type": "tool_use", "id": "toolu_1", "name": "calc", "input": {}},
                {"type": "tool_use", "id": "toolu_2", "name": "calc", "input": {}}
            ]},
            {"role": "tool", "content": [{"type": "tool_result", "tool_use_id": "toolu_1", "content": "1"}]},
            {"role": "tool", "content": [{"type": "tool_result", "tool_use_id": "toolu_2", "content": "2"}]}
        ],
        "tools": [calc_tool()]
    }))
    .unwrap();

    assert_eq!(prepared.format, WireFormat::Native);
    let req = &prepared.backend_request;
    assert_eq!(req.messages.len(), 3);
    assert_eq!(req.messages[2].role, "user");
    let ids: Vec<&str> = req.messages[2]
        .content
        .iter()
        .filter_map(|b| match b {
            ContentBlock::ToolResult { tool_use_id, .. } => Some(tool_use_id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(ids, vec!["toolu_1", "toolu_2"]);
}

/// Earlier native thinking makes the conversation native while the latest
/// round still arrives through `tool_calls` and `tool` messages.
#[test]
fn test_native_thinking_with_side_channel_tool_round() {
    let prepared = prepare(json!({
        "model": "claude-sonnet-4.5",
        "messages": [
            {"role": "user", "content": "look up a and b"},
            {"role": "assistant", "content": [
                {"type": "thinking", "thinking": "need both lookups", "signature": "sig_1"},
                {"type": "text", "text": "checking"}
            ]},
            {"role": "user", "content": "go on"},
            {"role": "assistant", "content": "", "tool_calls": [
                {"id": "call_a", "type": "function", "function": {"name": "calc", "arguments": "{\"expr\":\"a\"}"}},
                {"id": "call_b", "type": "function", "function": {"name": "calc", "arguments": "{\"expr\":\"b\"}"}}
            ]},
            {"role": "tool", "tool_call_id": "call_a", "content": "A"},
            {"role": "tool", "tool_call_id": "call_b", "content": "B"}
        ],
        "tools": [calc_tool()]
    }))
    .unwrap();

    assert_eq!(prepared.format, WireFormat::Native);
    let req = &prepared.backend_request;
    let roles: Vec<&str> = req.messages.iter().map(|m| m.role.as_str()).collect();
    assert_eq!(roles, vec!["user", "assistant", "user", "assistant", "user"]);

    assert_eq!(req.messages[1].content, vec![ContentBlock::Text { text: "checking".into() }]);
    let uses: Vec<&str> = req.messages[3]
        .content
        .iter()
        .filter_map(|b| match b {
            ContentBlock::ToolUse { id, .. } => Some(id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(uses, vec!["call_a", "call_b"]);
    assert_eq!(
        req.messages[4].content,
        vec![
            ContentBlock::ToolResult { tool_use_id: "call_a".into(), content: json!("A"), is_error: None },
            ContentBlock::ToolResult { tool_use_id: "call_b".into(), content: json!("B"), is_error: None },
        ]
    );
    assert!(req
        .messages
        .iter()
        .flat_map(|m| m.content.iter())
        .all(|b| !matches!(b, ContentBlock::Thinking { .. } | ContentBlock::RedactedThinking { .. })));
    assert!(req.thinking.is_none());
}

#[test]
fn test_native_server_tool_adds_supported_beta() {
    let prepared = prepare(json!({
        "model": "claude-sonnet-4.5",
        "messages": [{"role": "user", "content": "news?"}],
        "tools": [
            {"type": "web_search_20250305", "name": "web_search", "max_uses": 2},
            {"type": "text_editor_20250124", "name": "str_replace_editor"}
        ]
    }))
    .unwrap();
    let req = &prepared.backend_request;
    assert_eq!(req.betas, vec!["web-search-2025-03-05".to_string()]);
    let tools = serde_json::to_value(req.tools.as_ref().unwrap()).unwrap();
    assert_eq!(tools[0]["type"], "web_search_20250305");
    assert_eq!(tools[0]["max_uses"], 2);
}

#[test]
fn test_sampling_options_forwarded() {
    let prepared = prepare(json!({
        "model": "claude-sonnet-4.5",
        "messages": [{"role": "user", "content": "hi"}],
        "temperature": 0.2,
        "top_k": 5,
        "stop": ["END", "STOP"],
        "user": "dev-1"
    }))
    .unwrap();
    let req = &prepared.backend_request;
    assert_eq!(req.max_tokens, 8000);
    assert_eq!(req.temperature, Some(0.2));
    assert_eq!(req.top_k, Some(5));
    assert_eq!(req.stop_sequences, Some(vec!["END".to_string(), "STOP".to_string()]));
    assert_eq!(req.metadata.as_ref().and_then(|m| m.user_id.as_deref()), Some("dev-1"));
}

#[test]
fn test_parse_error_surfaces() {
    let err = bridge().prepare(b"{\"model\": 3}", &ctx()).unwrap_err();
    assert!(err.is_client_error());
}

// ============================================================================
// Full exchange with a stub backend
// ============================================================================

struct StubBackend {
    reply: BridgeResult<MessagesResponse>,
    seen: Mutex<Vec<MessagesRequest>>,
}

#[async_trait]
impl Backend for StubBackend {
    async fn send(&self, request: &MessagesRequest) -> BridgeResult<MessagesResponse> {
        self.seen.lock().push(request.clone());
        self.reply.clone()
    }
}

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<&'static str>>,
}

impl TransformObserver for RecordingObserver {
    fn on_inbound(&self, _ctx: &ExchangeContext, _raw: &[u8]) {
        self.events.lock().push("inbound");
    }
    fn before_transform(&self, _ctx: &ExchangeContext, _request: &Request) {
        self.events.lock().push("before");
    }
    fn after_transform(&self, _ctx: &ExchangeContext, _format: WireFormat, _request: &MessagesRequest) {
        self.events.lock().push("after");
    }
    fn on_response(&self, _ctx: &ExchangeContext, _response: &openai::ChatResponse) {
        self.events.lock().push("response");
    }
    fn on_error(&self, _ctx: &ExchangeContext, _error: &BridgeError) {
        self.events.lock().push("error");
    }
    fn on_cancelled(&self, _ctx: &ExchangeContext) {
        self.events.lock().push("cancelled");
    }
}

#[tokio::test]
async fn test_exchange_tool_call_reply() {
    let observer = Arc::new(RecordingObserver::default());
    let b = Bridge::new(BridgeSettings::default(), observer.clone());
    let backend = StubBackend {
        reply: Ok(MessagesResponse {
            id: "msg_2".into(),
            type_: "message".into(),
            role: "assistant".into(),
            model: "claude-sonnet-4-5".into(),
            content: vec![ContentBlock::ToolUse { id: "toolu_7".into(), name: "calc".into(), input: json!({"expr": "3*3"}) }],
            stop_reason: Some("tool_use".into()),
            stop_sequence: None,
            usage: claude::Usage::default(),
        }),
        seen: Mutex::new(Vec::new()),
    };

    let body = serde_json::to_vec(&json!({
        "model": "claude-sonnet-4.5",
        "messages": [{"role": "user", "content": "3*3?"}],
        "tools": [calc_tool()]
    }))
    .unwrap();
    let exchange = b.exchange(&body, &ctx(), &backend).await.unwrap();

    let message = &exchange.response.choices[0].message;
    let calls = message.tool_calls.as_ref().unwrap();
    assert_eq!(calls[0].id, "toolu_7");
    assert_eq!(exchange.response.choices[0].finish_reason.as_deref(), Some("tool_calls"));
    assert_eq!(backend.seen.lock().len(), 1);
    assert_eq!(*observer.events.lock(), vec!["inbound", "before", "after", "response"]);
}

#[tokio::test]
async fn test_exchange_backend_error_reported() {
    let observer = Arc::new(RecordingObserver::default());
    let b = Bridge::new(BridgeSettings::default(), observer.clone());
    let backend = StubBackend {
        reply: Err(BridgeError::backend(Some(429), "{\"error\":\"rate\"}")),
        seen: Mutex::new(Vec::new()),
    };
    let body = serde_json::to_vec(&json!({
        "model": "claude-sonnet-4.5",
        "messages": [{"role": "user", "content": "hi"}]
    }))
    .unwrap();

    let err = b.exchange(&body, &ctx(), &backend).await.unwrap_err();
    assert_eq!(err.http_status_code(), 429);
    assert_eq!(err.message(), "{\"error\":\"rate\"}");
    assert_eq!(*observer.events.lock(), vec!["inbound", "before", "after", "error"]);
}

/// Backend that never answers, like a client hanging up mid-call.
struct HangingBackend;

#[async_trait]
impl Backend for HangingBackend {
    async fn send(&self, _request: &MessagesRequest) -> BridgeResult<MessagesResponse> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_dropped_exchanges_are_logged_and_released() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("exchanges.jsonl");
    let log = Arc::new(JsonlObserver::open(&path).unwrap());
    let recorder = Arc::new(RecordingObserver::default());
    let observer: Arc<dyn TransformObserver> = Arc::new(FanoutObserver::new(vec![
        log.clone() as Arc<dyn TransformObserver>,
        recorder.clone() as Arc<dyn TransformObserver>,
    ]));
    let b = Bridge::new(BridgeSettings::default(), observer);

    let body = serde_json::to_vec(&json!({
        "model": "claude-sonnet-4.5",
        "messages": [{"role": "user", "content": "hi"}]
    }))
    .unwrap();
    for _ in 0..3 {
        let context = ctx();
        let outcome =
            tokio::time::timeout(std::time::Duration::from_millis(10), b.exchange(&body, &context, &HangingBackend)).await;
        assert!(outcome.is_err());
    }

    assert_eq!(log.in_flight(), 0);
    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<Value> = content.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(lines.len(), 3);
    for line in &lines {
        assert_eq!(line["response"]["status_code"], CLIENT_CLOSED_REQUEST);
        assert_eq!(line["request"]["model"], "claude-sonnet-4.5");
    }
    let events = recorder.events.lock().clone();
    assert_eq!(events.len(), 12);
    assert!(events.chunks(4).all(|round| round == ["inbound", "before", "after", "cancelled"]));
}

#[tokio::test]
async fn test_unparseable_body_is_logged_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("exchanges.jsonl");
    let log = Arc::new(JsonlObserver::open(&path).unwrap());
    let b = Bridge::new(BridgeSettings::default(), log.clone());
    let backend = StubBackend { reply: Err(BridgeError::backend(Some(500), "unused")), seen: Mutex::new(Vec::new()) };

    let body = serde_json::to_vec(&json!({
        "model": "claude-sonnet-4.5",
        "messages": [{"role": "user", "content": [{"type": "bogus"}]}]
    }))
    .unwrap();
    let err = b.exchange(&body, &ctx(), &backend).await.unwrap_err();
    assert!(err.is_client_error());
    assert!(backend.seen.lock().is_empty());

    let content = std::fs::read_to_string(&path).unwrap();
    let line: Value = serde_json::from_str(content.trim()).unwrap();
    assert_eq!(line["request"]["messages"][0]["content"][0]["type"], "bogus");
    assert_eq!(line["response"]["status_code"], 400);
    assert_eq!(log.in_flight(), 0);
}
