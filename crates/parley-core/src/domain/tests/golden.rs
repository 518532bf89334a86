#[cfg(test)]
mod tests {
    use parley_protocol::{
        LoadRequestId, MessageId, OutboundMessage, RequestId, SessionPhase, ToolUseId,
    };
    use serde_json::json;

    use crate::domain::action::Action;
    use crate::domain::effect::Effect;
    use crate::domain::hydration::HydrationGuard;
    use crate::domain::message::MessagePayload;
    use crate::domain::pending_request::{EXIT_PLAN_MODE_TOOL, PendingRequest};
    use crate::domain::reduce::{apply, reduce};
    use crate::domain::state::SessionState;
    use crate::domain::tests::support::*;

    fn orders(state: &SessionState) -> Vec<u64> {
        state.messages.iter().map(|m| m.order.0).collect()
    }

    #[test]
    fn gap_is_filled_and_redelivery_is_idempotent() {
        let mut state = SessionState::new();
        feed(&mut state, [agent_text(1, "a1", "one"), agent_text(3, "a3", "three")]);

        feed(&mut state, [agent_text(2, "a2", "two")]);
        assert_eq!(orders(&state), vec![1, 2, 3]);

        feed(&mut state, [agent_text(2, "a2", "two")]);
        assert_eq!(orders(&state), vec![1, 2, 3]);
        assert_eq!(state.messages.len(), 3);
    }

    #[test]
    fn untagged_snapshot_is_dropped_while_loading() {
        let mut state = SessionState::new();
        let effects = reduce(
            &mut state,
            Action::LoadSession {
                load_request_id: LoadRequestId::from("load-7"),
            },
        );
        assert_eq!(
            effects,
            vec![Effect::Send(OutboundMessage::LoadSession {
                load_request_id: LoadRequestId::from("load-7")
            })]
        );
        assert_eq!(state.status.phase, SessionPhase::Loading);

        let untagged = json!([{"id": "x", "order": 1, "message": {"kind": "system", "text": "x"}}]);
        feed(&mut state, [snapshot(None, untagged)]);
        assert_eq!(
            state.hydration,
            HydrationGuard::Awaiting(LoadRequestId::from("load-7"))
        );
        assert!(state.messages.is_empty());
        assert_eq!(state.status.phase, SessionPhase::Loading);

        let answer = json!([{"id": "m1", "order": 1, "message": {"kind": "system", "text": "hi"}}]);
        feed(&mut state, [snapshot(Some("load-7"), answer)]);
        assert_eq!(state.hydration, HydrationGuard::Idle);
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.status.phase, SessionPhase::Ready);

        // A duplicate answer to the finished load is late.
        feed(&mut state, [snapshot(Some("load-7"), json!([]))]);
        assert_eq!(state.messages.len(), 1);
    }

    #[test]
    fn tagged_replay_batch_rebuilds_state() {
        let mut state = SessionState::new();
        feed(&mut state, [agent_text(1, "old", "before reconnect")]);
        reduce(
            &mut state,
            Action::LoadSession {
                load_request_id: LoadRequestId::from("load-2"),
            },
        );

        feed(
            &mut state,
            [event(json!({
                "type": "session_replay_batch",
                "loadRequestId": "load-2",
                "events": [
                    {"type": "agent_message", "order": 1, "id": "a1",
                     "message": {"kind": "system", "text": "hello"}},
                    {"type": "permission_request",
                     "request": {"requestId": "p1", "toolName": "Bash"}}
                ]
            }))],
        );

        let ids: Vec<_> = state.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a1"]);
        assert_eq!(state.pending_request.request_id(), Some(&RequestId::from("p1")));
        assert_eq!(state.status.phase, SessionPhase::Ready);
    }

    #[test]
    fn rejected_send_restores_draft() {
        let mut state = SessionState::new();
        let effects = reduce(
            &mut state,
            Action::SendMessage {
                message_id: MessageId::from("m1"),
                text: "fix bug".to_string(),
                attachments: vec![],
                timestamp: 100,
            },
        );
        assert!(matches!(
            effects.as_slice(),
            [Effect::Send(OutboundMessage::UserMessage { .. })]
        ));

        feed(&mut state, [accepted("m1", "fix bug", Some(4))]);
        assert_eq!(state.messages.len(), 1);
        assert!(state.pending_messages.is_empty());

        let effects = feed(&mut state, [state_changed("m1", "rejected", Some("rate limited"))]);

        let rejected = state.last_rejected_message.clone().unwrap();
        assert_eq!(rejected.text, "fix bug");
        assert_eq!(rejected.error.as_deref(), Some("rate limited"));
        assert!(state.messages.is_empty());
        assert!(state.queued_messages.is_empty());
        assert_eq!(
            effects,
            vec![Effect::DraftRejected {
                message_id: MessageId::from("m1")
            }]
        );

        reduce(&mut state, Action::ClearRejectedMessage);
        assert!(state.last_rejected_message.is_none());
    }

    #[test]
    fn accepted_message_already_visible_is_only_queued() {
        let mut state = SessionState::new();
        let committed = json!([
            {"id": "m1", "order": 2, "message": {"kind": "user", "text": "hi"}}
        ]);
        feed(&mut state, [snapshot(None, committed)]);

        feed(&mut state, [accepted("m1", "hi", None)]);
        assert_eq!(state.messages.len(), 1);
        assert!(state.queued_messages.contains_key(&MessageId::from("m1")));

        feed(&mut state, [state_changed("m1", "committed", None)]);
        assert!(state.queued_messages.is_empty());
        assert_eq!(state.messages.len(), 1);
    }

    #[test]
    fn streamed_tool_use_is_replaced_by_final_message() {
        let mut state = SessionState::new();
        feed(
            &mut state,
            [
                runtime("running"),
                tool_start(5, "t1"),
                input_delta(5, "t1", r#"{"command":"#),
                input_delta(5, "t1", r#" "cargo test"}"#),
                progress("t1", 1.5),
            ],
        );

        let id = ToolUseId::from("t1");
        let streamed = state.messages[0].tool_use(&id).unwrap();
        assert!(streamed.streaming);
        assert_eq!(streamed.input, json!({"command": "cargo test"}));
        assert!(state.tool_progress.contains_key(&id));

        feed(
            &mut state,
            [
                agent_tool_use(5, "a5", "t1", json!({"command": "cargo test"})),
                tool_result(6, "t1"),
                turn_finished(),
            ],
        );

        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[0].id.as_str(), "a5");
        assert!(!state.messages[0].tool_use(&id).unwrap().streaming);
        assert!(state.tool_progress.is_empty());
        assert_eq!(state.status.phase, SessionPhase::Ready);
    }

    #[test]
    fn session_error_appends_entry_and_ends_loading() {
        let mut state = SessionState::new();
        feed(&mut state, [agent_text(4, "a4", "working")]);
        reduce(
            &mut state,
            Action::LoadSession {
                load_request_id: LoadRequestId::from("load-1"),
            },
        );

        feed(&mut state, [session_error("backend unavailable")]);

        let last = state.messages.last().unwrap();
        assert_eq!(last.order.0, 5);
        assert_eq!(last.id.as_str(), "error-5");
        assert!(matches!(
            &last.payload,
            MessagePayload::Error { message } if message == "backend unavailable"
        ));
        assert_eq!(state.status.phase, SessionPhase::Ready);
    }

    #[test]
    fn session_error_survives_next_agent_message() {
        let mut state = SessionState::new();
        feed(
            &mut state,
            [
                agent_text(1, "a1", "one"),
                session_error("boom"),
                agent_text(2, "a2", "two"),
            ],
        );

        let ids: Vec<_> = state.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "error-2", "a2"]);
        assert_eq!(orders(&state), vec![1, 2, 2]);

        // Redelivering the agent message still leaves the error alone.
        feed(&mut state, [agent_text(2, "a2", "two, again")]);
        assert_eq!(state.messages.len(), 3);
        assert!(matches!(
            &state.messages[1].payload,
            MessagePayload::Error { message } if message == "boom"
        ));
    }

    #[test]
    fn snapshot_with_unknown_entries_still_finishes_loading() {
        let mut state = SessionState::new();
        reduce(
            &mut state,
            Action::LoadSession {
                load_request_id: LoadRequestId::from("load-1"),
            },
        );

        let messages = json!([
            {"id": "m1", "order": 1, "message": {"kind": "system", "text": "hi"}},
            {"id": "m2", "order": 2, "message": {"kind": "image_generation"}},
            {"id": "m3", "order": 3, "message": {"kind": "assistant", "content": [
                {"type": "text", "text": "see chart"},
                {"type": "chart", "series": [1, 2]}
            ]}}
        ]);
        feed(&mut state, [snapshot(Some("load-1"), messages)]);

        assert_eq!(state.hydration, HydrationGuard::Idle);
        assert_eq!(state.status.phase, SessionPhase::Ready);
        let ids: Vec<_> = state.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m3"]);
        assert_eq!(state.messages[1].blocks().len(), 1);
    }

    #[test]
    fn approving_exit_plan_mode_disables_plan_mode() {
        let mut state = SessionState::new();
        state.settings.plan_mode = true;
        let effects = feed(&mut state, [permission("p1", EXIT_PLAN_MODE_TOOL)]);
        assert_eq!(
            effects,
            vec![Effect::InteractiveRequest {
                request_id: RequestId::from("p1")
            }]
        );

        let (next, effects) = apply(
            &state,
            Action::RespondPermission {
                request_id: RequestId::from("p1"),
                approved: true,
                option_id: None,
            },
        );

        assert!(state.settings.plan_mode, "apply must not touch its input");
        assert!(!next.settings.plan_mode);
        assert!(next.pending_request.is_none());
        assert_eq!(effects.len(), 1);
    }

    #[test]
    fn stale_response_is_dropped() {
        let mut state = SessionState::new();
        feed(&mut state, [permission("p1", "Bash"), question("q2")]);

        let effects = reduce(
            &mut state,
            Action::RespondPermission {
                request_id: RequestId::from("p1"),
                approved: true,
                option_id: None,
            },
        );
        assert!(effects.is_empty());
        assert!(matches!(state.pending_request, PendingRequest::Question(_)));

        feed(&mut state, [permission_cancelled("q2-other")]);
        assert!(matches!(state.pending_request, PendingRequest::Question(_)));
    }

    #[test]
    fn rewind_round_trip_through_events() {
        let mut state = SessionState::new();
        feed(&mut state, [user_uuid("uuid-1"), accepted("m1", "refactor", Some(1))]);

        let effects = reduce(
            &mut state,
            Action::RequestRewindPreview {
                target_message_id: MessageId::from("m1"),
                request_nonce: "n1".into(),
            },
        );
        assert!(matches!(
            effects.as_slice(),
            [Effect::Send(OutboundMessage::RewindPreview { target_uuid, .. })]
                if target_uuid.as_str() == "uuid-1"
        ));

        feed(
            &mut state,
            [event(json!({
                "type": "rewind_preview",
                "targetMessageId": "m1",
                "requestNonce": "n1",
                "affectedFiles": ["src/main.rs"]
            }))],
        );
        let preview = state.rewind.clone().unwrap();
        assert_eq!(preview.affected_files, Some(vec!["src/main.rs".to_string()]));

        reduce(
            &mut state,
            Action::ExecuteRewind {
                target_message_id: MessageId::from("m1"),
                request_nonce: "n2".into(),
            },
        );
        feed(
            &mut state,
            [event(json!({
                "type": "rewind_result",
                "targetMessageId": "m1",
                "requestNonce": "n2",
                "success": true
            }))],
        );
        assert!(state.rewind.is_none());
    }
}
