//! Maps each parsed protocol event to at most one [`Action`].

use parley_protocol::inbound::{AgentMessageEvent, SessionSnapshotEvent};
use parley_protocol::{AgentPayload, MessageId, ProtocolEvent};

use crate::domain::action::{Action, SessionSnapshot};
use crate::domain::lifecycle::{QueuedMessage, Transition};
use crate::domain::message::{ChatMessage, MessagePayload, MessageSource, derived_message_id};
use crate::domain::state::TaskNotification;

pub fn classify(event: ProtocolEvent) -> Option<Action> {
    let action = match event {
        ProtocolEvent::SessionRuntimeSnapshot(e) => Action::RuntimeSnapshot { runtime: e.runtime },
        ProtocolEvent::SessionRuntimeUpdated(e) => Action::RuntimeUpdated { runtime: e.runtime },
        ProtocolEvent::AgentMessage(e) => classify_agent_message(e)?,
        ProtocolEvent::Error(e) => Action::SessionError {
            message: e.message,
            timestamp: e.timestamp,
        },
        ProtocolEvent::PermissionRequest(e) => Action::PermissionRequested { request: e.request },
        ProtocolEvent::PermissionCancelled(e) => Action::PermissionCancelled {
            request_id: e.request_id,
        },
        ProtocolEvent::UserQuestion(e) => Action::QuestionAsked { request: e.request },
        ProtocolEvent::SessionSnapshot(e) => classify_snapshot(e),
        ProtocolEvent::SessionReplayBatch(e) => Action::ReplayBatchReceived {
            load_request_id: e.load_request_id,
            events: e.events,
        },
        ProtocolEvent::MessageStateChanged(e) => Action::MessageStateChanged {
            transition: Transition::parse(&e.state),
            message_id: e.message_id,
            user_message: e.user_message,
            error_message: e.error_message,
        },
        ProtocolEvent::ToolProgress(e) => Action::ToolProgress {
            tool_use_id: e.tool_use_id,
            elapsed_seconds: e.elapsed_seconds,
            locations: e.locations,
            kind: e.kind,
        },
        ProtocolEvent::ToolUseSummary(e) => Action::ToolUseSummary {
            summary: e.summary,
            preceding_tool_use_ids: e.preceding_tool_use_ids,
        },
        ProtocolEvent::CompactBoundary(e) => Action::CompactBoundary {
            message: ChatMessage {
                id: MessageId(format!("compact-{}", e.order)),
                order: e.order,
                source: MessageSource::Agent,
                payload: MessagePayload::CompactBoundary {
                    trigger: e.trigger,
                    pre_tokens: e.pre_tokens,
                },
                timestamp: e.timestamp,
            },
        },
        ProtocolEvent::HookStarted(e) => Action::HookStarted {
            hook_id: e.hook_id,
            name: e.hook_name,
            event: e.hook_event,
        },
        ProtocolEvent::HookResponse(e) => Action::HookFinished {
            hook_id: e.hook_id,
            name: e.hook_name,
            event: e.hook_event,
            exit_code: e.exit_code,
            output: e.output,
            outcome: e.outcome,
        },
        ProtocolEvent::TaskNotification(e) => Action::TaskNotification(TaskNotification {
            task_id: e.task_id,
            status: e.status,
            summary: e.summary,
        }),
        ProtocolEvent::SlashCommands(e) => Action::SlashCommandsUpdated {
            commands: e.commands,
        },
        ProtocolEvent::UserMessageUuid(e) => Action::UserMessageUuid {
            uuid: e.uuid,
            message_id: e.message_id,
        },
        ProtocolEvent::ConfigOptionsUpdate(e) => {
            Action::ConfigOptionsUpdated { options: e.options }
        }
        ProtocolEvent::RewindPreview(e) => Action::RewindPreviewReceived {
            target_message_id: e.target_message_id,
            request_nonce: e.request_nonce,
            affected_files: e.affected_files,
            error: e.error,
        },
        ProtocolEvent::RewindResult(e) => Action::RewindResultReceived {
            target_message_id: e.target_message_id,
            request_nonce: e.request_nonce,
            success: e.success,
            error: e.error,
        },
        ProtocolEvent::Unrecognized { tag } => {
            tracing::debug!(target: "parley.classify", "No action for event type {}", tag);
            return None;
        }
        ProtocolEvent::Invalid { tag, reason } => {
            tracing::debug!(
                target: "parley.classify",
                "No action for invalid event {:?}: {}",
                tag,
                reason
            );
            return None;
        }
    };
    Some(action)
}

fn classify_agent_message(event: AgentMessageEvent) -> Option<Action> {
    let AgentMessageEvent {
        order,
        id,
        timestamp,
        message,
    } = event;

    let action = match message {
        AgentPayload::ToolUseStart { tool_use_id, name } => Action::ToolUseStarted {
            order,
            message_id: id,
            tool_use_id,
            name,
            timestamp,
        },
        AgentPayload::InputJsonDelta {
            tool_use_id,
            partial_json,
        } => Action::ToolInputDelta {
            tool_use_id,
            fragment: partial_json,
        },
        AgentPayload::ThinkingDelta { index, thinking } => Action::ThinkingDelta {
            order,
            message_id: id,
            index,
            text: thinking,
            timestamp,
        },
        AgentPayload::Result { is_error, .. } => Action::TurnFinished { is_error },
        complete => {
            let uuid = match &complete {
                AgentPayload::User { uuid, .. } => uuid.clone(),
                _ => None,
            };
            let (source, payload) = MessagePayload::from_agent_payload(complete)?;
            Action::AgentMessageReceived {
                message: ChatMessage {
                    id: id.unwrap_or_else(|| derived_message_id(source, order)),
                    order,
                    source,
                    payload,
                    timestamp,
                },
                uuid,
            }
        }
    };
    Some(action)
}

fn classify_snapshot(event: SessionSnapshotEvent) -> Action {
    Action::SnapshotReceived {
        load_request_id: event.load_request_id,
        snapshot: SessionSnapshot {
            messages: event
                .messages
                .into_iter()
                .filter_map(ChatMessage::from_wire)
                .collect(),
            queue: event.queue.into_iter().map(QueuedMessage::from).collect(),
            pending_request: event.pending_request.into(),
            runtime: event.runtime,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pending_request::PendingRequest;
    use parley_protocol::{MessageState, Order, ToolUseId};
    use serde_json::json;

    fn classify_json(value: serde_json::Value) -> Option<Action> {
        classify(ProtocolEvent::from_value(value))
    }

    #[test]
    fn unknown_and_invalid_events_have_no_action() {
        assert_eq!(classify_json(json!({"type": "telemetry", "n": 1})), None);
        assert_eq!(classify_json(json!({"type": "agent_message"})), None);
        assert_eq!(classify_json(json!({"no_type": true})), None);
    }

    #[test]
    fn agent_payload_kinds_split_into_actions() {
        let start = classify_json(json!({
            "type": "agent_message",
            "order": 3,
            "message": {"kind": "tool_use_start", "toolUseId": "t1", "name": "Read"}
        }));
        assert!(matches!(
            start,
            Some(Action::ToolUseStarted { order: Order(3), ref tool_use_id, .. })
                if tool_use_id == &ToolUseId::from("t1")
        ));

        let delta = classify_json(json!({
            "type": "agent_message",
            "order": 3,
            "message": {"kind": "input_json_delta", "toolUseId": "t1", "partialJson": "{\"a\""}
        }));
        assert_eq!(
            delta,
            Some(Action::ToolInputDelta {
                tool_use_id: ToolUseId::from("t1"),
                fragment: "{\"a\"".to_string(),
            })
        );

        let result = classify_json(json!({
            "type": "agent_message",
            "order": 4,
            "message": {"kind": "result", "isError": true}
        }));
        assert_eq!(result, Some(Action::TurnFinished { is_error: true }));
    }

    #[test]
    fn complete_message_without_id_gets_derived_id() {
        let action = classify_json(json!({
            "type": "agent_message",
            "order": 9,
            "message": {"kind": "user", "text": "hi", "uuid": "uuid-9"}
        }));
        let Some(Action::AgentMessageReceived { message, uuid }) = action else {
            panic!("expected agent message");
        };
        assert_eq!(message.id.as_str(), "user-9");
        assert_eq!(message.source, MessageSource::User);
        assert_eq!(uuid.as_ref().map(|u| u.as_str()), Some("uuid-9"));
    }

    #[test]
    fn message_state_parses_known_and_unknown_names() {
        let known = classify_json(json!({
            "type": "message_state_changed", "messageId": "m1", "state": "COMMITTED"
        }));
        assert!(matches!(
            known,
            Some(Action::MessageStateChanged {
                transition: Transition::Known(MessageState::Committed),
                ..
            })
        ));

        let unknown = classify_json(json!({
            "type": "message_state_changed", "messageId": "m1", "state": "paused"
        }));
        assert!(matches!(
            unknown,
            Some(Action::MessageStateChanged {
                transition: Transition::Unrecognized(_),
                ..
            })
        ));
    }

    #[test]
    fn snapshot_keeps_only_complete_messages() {
        let action = classify_json(json!({
            "type": "session_snapshot",
            "loadRequestId": "load-1",
            "messages": [
                {"id": "m2", "order": 2, "message": {"kind": "system", "text": "ready"}},
                {"id": "m3", "order": 3,
                 "message": {"kind": "thinking_delta", "index": 0, "thinking": "x"}}
            ],
            "queue": [{"id": "q1", "text": "next", "queuedAt": 5}],
            "pendingRequest": {"kind": "question", "requestId": "r1", "questions": []}
        }));

        let Some(Action::SnapshotReceived {
            load_request_id,
            snapshot,
        }) = action
        else {
            panic!("expected snapshot");
        };
        assert_eq!(load_request_id.as_ref().map(|id| id.as_str()), Some("load-1"));
        assert_eq!(snapshot.messages.len(), 1);
        assert_eq!(snapshot.queue.len(), 1);
        assert!(matches!(snapshot.pending_request, PendingRequest::Question(_)));
    }
}
