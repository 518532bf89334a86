//! Event builders shared by the domain tests.

use parley_protocol::ProtocolEvent;
use serde_json::{Value, json};

use crate::domain::effect::Effect;
use crate::domain::reduce::apply_event_to_state;
use crate::domain::state::SessionState;

pub fn event(value: Value) -> ProtocolEvent {
    ProtocolEvent::from_value(value)
}

pub fn feed(
    state: &mut SessionState,
    events: impl IntoIterator<Item = ProtocolEvent>,
) -> Vec<Effect> {
    events
        .into_iter()
        .flat_map(|e| apply_event_to_state(state, e))
        .collect()
}

pub fn runtime(phase: &str) -> ProtocolEvent {
    event(json!({"type": "session_runtime_updated", "runtime": {"phase": phase}}))
}

pub fn agent_text(order: u64, id: &str, text: &str) -> ProtocolEvent {
    event(json!({
        "type": "agent_message",
        "order": order,
        "id": id,
        "message": {"kind": "assistant", "content": [{"type": "text", "text": text}]}
    }))
}

pub fn agent_tool_use(order: u64, id: &str, tool_use_id: &str, input: Value) -> ProtocolEvent {
    event(json!({
        "type": "agent_message",
        "order": order,
        "id": id,
        "message": {
            "kind": "assistant",
            "content": [{"type": "tool_use", "id": tool_use_id, "name": "Bash", "input": input}]
        }
    }))
}

pub fn tool_start(order: u64, tool_use_id: &str) -> ProtocolEvent {
    event(json!({
        "type": "agent_message",
        "order": order,
        "message": {"kind": "tool_use_start", "toolUseId": tool_use_id, "name": "Bash"}
    }))
}

pub fn input_delta(order: u64, tool_use_id: &str, fragment: &str) -> ProtocolEvent {
    event(json!({
        "type": "agent_message",
        "order": order,
        "message": {"kind": "input_json_delta", "toolUseId": tool_use_id, "partialJson": fragment}
    }))
}

pub fn thinking(order: u64, index: u32, text: &str) -> ProtocolEvent {
    event(json!({
        "type": "agent_message",
        "order": order,
        "message": {"kind": "thinking_delta", "index": index, "thinking": text}
    }))
}

pub fn tool_result(order: u64, tool_use_id: &str) -> ProtocolEvent {
    event(json!({
        "type": "agent_message",
        "order": order,
        "id": format!("result-{tool_use_id}"),
        "message": {"kind": "tool_result", "toolUseId": tool_use_id, "content": "ok"}
    }))
}

pub fn turn_finished() -> ProtocolEvent {
    event(json!({
        "type": "agent_message",
        "order": 0,
        "message": {"kind": "result", "subtype": "success"}
    }))
}

pub fn accepted(id: &str, text: &str, order: Option<u64>) -> ProtocolEvent {
    event(json!({
        "type": "message_state_changed",
        "messageId": id,
        "state": "accepted",
        "userMessage": {"text": text, "order": order}
    }))
}

pub fn state_changed(id: &str, state: &str, error: Option<&str>) -> ProtocolEvent {
    event(json!({
        "type": "message_state_changed",
        "messageId": id,
        "state": state,
        "errorMessage": error
    }))
}

pub fn permission(request_id: &str, tool_name: &str) -> ProtocolEvent {
    event(json!({
        "type": "permission_request",
        "request": {"requestId": request_id, "toolName": tool_name, "input": {}}
    }))
}

pub fn question(request_id: &str) -> ProtocolEvent {
    event(json!({
        "type": "user_question",
        "request": {
            "requestId": request_id,
            "questions": [{"question": "Which file?", "options": [{"label": "a.rs"}]}]
        }
    }))
}

pub fn permission_cancelled(request_id: &str) -> ProtocolEvent {
    event(json!({"type": "permission_cancelled", "requestId": request_id}))
}

pub fn progress(tool_use_id: &str, elapsed_seconds: f64) -> ProtocolEvent {
    event(json!({
        "type": "tool_progress",
        "toolUseId": tool_use_id,
        "elapsedSeconds": elapsed_seconds
    }))
}

pub fn summary(tool_use_ids: &[&str]) -> ProtocolEvent {
    event(json!({
        "type": "tool_use_summary",
        "summary": "done",
        "precedingToolUseIds": tool_use_ids
    }))
}

pub fn user_uuid(uuid: &str) -> ProtocolEvent {
    event(json!({"type": "user_message_uuid", "uuid": uuid}))
}

pub fn session_error(message: &str) -> ProtocolEvent {
    event(json!({"type": "error", "message": message}))
}

pub fn snapshot(load_request_id: Option<&str>, messages: Value) -> ProtocolEvent {
    event(json!({
        "type": "session_snapshot",
        "loadRequestId": load_request_id,
        "messages": messages
    }))
}
