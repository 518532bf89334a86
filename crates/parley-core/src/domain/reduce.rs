use parley_protocol::{
    MessageUuid, OutboundMessage, ProtocolEvent, RequestId, SessionPhase, ToolUseId,
};

use crate::domain::action::Action;
use crate::domain::classify::classify;
use crate::domain::effect::Effect;
use crate::domain::hydration::Admission;
use crate::domain::lifecycle;
use crate::domain::message::{ChatMessage, ContentBlock, MessagePayload};
use crate::domain::ordering;
use crate::domain::pending_request::PendingRequest;
use crate::domain::replay;
use crate::domain::rewind;
use crate::domain::state::{HookRun, HookStatus, SessionState};
use crate::domain::tool_calls;

pub fn reduce(state: &mut SessionState, action: Action) -> Vec<Effect> {
    match action {
        Action::RuntimeSnapshot { runtime } | Action::RuntimeUpdated { runtime } => {
            state.status = runtime.into();
            vec![]
        }

        Action::AgentMessageReceived { message, uuid } => {
            handle_agent_message(state, message, uuid)
        }

        Action::ToolUseStarted {
            order,
            message_id,
            tool_use_id,
            name,
            timestamp,
        } => {
            tool_calls::on_tool_use_started(
                &mut state.messages,
                &mut state.tool_use_index,
                order,
                message_id,
                tool_use_id,
                name,
                timestamp,
            );
            vec![]
        }

        Action::ToolInputDelta {
            tool_use_id,
            fragment,
        } => {
            tool_calls::on_partial_input(
                &mut state.messages,
                &mut state.tool_use_index,
                &tool_use_id,
                &fragment,
            );
            vec![]
        }

        Action::ThinkingDelta {
            order,
            message_id,
            index,
            text,
            timestamp,
        } => {
            tool_calls::on_thinking_delta(
                &mut state.messages,
                order,
                message_id,
                index,
                &text,
                timestamp,
            );
            vec![]
        }

        Action::TurnFinished { is_error } => handle_turn_finished(state, is_error),

        Action::SessionError { message, timestamp } => {
            handle_session_error(state, message, timestamp)
        }

        Action::PermissionRequested { request } => {
            let request_id = request.request_id.clone();
            state.pending_request.set_permission(request);
            vec![Effect::InteractiveRequest { request_id }]
        }

        Action::PermissionCancelled { request_id } => {
            state.pending_request.cancel_if_matches(&request_id);
            vec![]
        }

        Action::QuestionAsked { request } => {
            let request_id = request.request_id.clone();
            state.pending_request.set_question(request);
            vec![Effect::InteractiveRequest { request_id }]
        }

        Action::SnapshotReceived {
            load_request_id,
            snapshot,
        } => {
            if state.hydration.admit(load_request_id.as_ref()) == Admission::Accept {
                replay::apply_snapshot(state, snapshot);
            }
            vec![]
        }

        Action::ReplayBatchReceived {
            load_request_id,
            events,
        } => {
            if state.hydration.admit(load_request_id.as_ref()) == Admission::Accept {
                replay::replay(state, events);
            }
            vec![]
        }

        Action::MessageStateChanged {
            message_id,
            transition,
            user_message,
            error_message,
        } => {
            lifecycle::apply_transition(state, message_id, transition, user_message, error_message)
        }

        Action::ToolProgress {
            tool_use_id,
            elapsed_seconds,
            locations,
            kind,
        } => {
            tool_calls::on_progress(
                &mut state.tool_progress,
                tool_use_id,
                elapsed_seconds,
                locations,
                kind,
            );
            vec![]
        }

        Action::ToolUseSummary {
            summary,
            preceding_tool_use_ids,
        } => {
            tool_calls::on_summary(&mut state.tool_progress, &preceding_tool_use_ids);
            if !summary.is_empty() {
                state.last_tool_summary = Some(summary);
            }
            vec![]
        }

        Action::CompactBoundary { message } => {
            ordering::insert(&mut state.messages, message);
            state.tool_progress.clear();
            vec![]
        }

        Action::HookStarted {
            hook_id,
            name,
            event,
        } => {
            state.hooks.insert(
                hook_id.clone(),
                HookRun {
                    hook_id,
                    name,
                    event,
                    status: HookStatus::Running,
                },
            );
            vec![]
        }

        Action::HookFinished {
            hook_id,
            name,
            event,
            exit_code,
            output,
            outcome,
        } => {
            let status = HookStatus::Finished {
                exit_code,
                output,
                outcome,
            };
            match state.hooks.get_mut(&hook_id) {
                Some(run) => run.status = status,
                None => {
                    state.hooks.insert(
                        hook_id.clone(),
                        HookRun {
                            hook_id,
                            name,
                            event,
                            status,
                        },
                    );
                }
            }
            vec![]
        }

        Action::TaskNotification(notification) => {
            state
                .task_notifications
                .insert(notification.task_id.clone(), notification);
            vec![]
        }

        Action::SlashCommandsUpdated { commands } => {
            state.slash_commands = commands;
            vec![]
        }

        Action::UserMessageUuid { uuid, message_id } => {
            lifecycle::bind_uuid(state, uuid, message_id);
            vec![]
        }

        Action::ConfigOptionsUpdated { options } => {
            state.settings.apply(&options, &state.capabilities);
            vec![]
        }

        Action::RewindPreviewReceived {
            target_message_id,
            request_nonce,
            affected_files,
            error,
        } => {
            rewind::on_preview(
                state,
                &target_message_id,
                &request_nonce,
                affected_files,
                error,
            );
            vec![]
        }

        Action::RewindResultReceived {
            target_message_id,
            request_nonce,
            success,
            error,
        } => {
            rewind::on_result(state, &target_message_id, &request_nonce, success, error);
            vec![]
        }

        Action::SendMessage {
            message_id,
            text,
            attachments,
            timestamp,
        } => lifecycle::record_send(state, message_id, text, attachments, timestamp),

        Action::RespondPermission {
            request_id,
            approved,
            option_id,
        } => {
            let awaited = matches!(
                &state.pending_request,
                PendingRequest::Permission(req) if req.request_id == request_id
            );
            if !awaited {
                return stale_response(state, &request_id);
            }
            let answered = state.pending_request.respond();
            if approved && answered.is_exit_plan_mode() {
                state.settings.plan_mode = false;
            }
            vec![Effect::Send(OutboundMessage::PermissionResponse {
                request_id,
                approved,
                option_id,
            })]
        }

        Action::RespondQuestion {
            request_id,
            answers,
        } => {
            let awaited = matches!(
                &state.pending_request,
                PendingRequest::Question(req) if req.request_id == request_id
            );
            if !awaited {
                return stale_response(state, &request_id);
            }
            state.pending_request.respond();
            vec![Effect::Send(OutboundMessage::QuestionResponse {
                request_id,
                answers,
            })]
        }

        Action::Stop => {
            if matches!(
                state.status.phase,
                SessionPhase::Running | SessionPhase::Starting
            ) {
                state.status.phase = SessionPhase::Stopping;
            }
            vec![Effect::Send(OutboundMessage::Stop)]
        }

        Action::LoadSession { load_request_id } => {
            state.hydration.begin(load_request_id.clone());
            state.status.phase = SessionPhase::Loading;
            vec![Effect::Send(OutboundMessage::LoadSession { load_request_id })]
        }

        Action::RequestRewindPreview {
            target_message_id,
            request_nonce,
        } => rewind::request_preview(state, target_message_id, request_nonce),

        Action::ExecuteRewind {
            target_message_id,
            request_nonce,
        } => rewind::execute(state, target_message_id, request_nonce),

        Action::DismissRewind => {
            state.rewind = None;
            vec![]
        }

        Action::UpdateSettings { options } => {
            let applied = state.settings.apply(&options, &state.capabilities);
            if applied.is_empty() {
                vec![]
            } else {
                vec![Effect::Send(OutboundMessage::SetConfigOptions { options: applied })]
            }
        }

        Action::ClearRejectedMessage => {
            state.last_rejected_message = None;
            vec![]
        }
    }
}

/// Copy-on-write form of [`reduce`]: `state` is left untouched.
pub fn apply(state: &SessionState, action: Action) -> (SessionState, Vec<Effect>) {
    let mut next = state.clone();
    let effects = reduce(&mut next, action);
    (next, effects)
}

/// The single-event step shared by live delivery and replay.
pub fn apply_event_to_state(state: &mut SessionState, event: ProtocolEvent) -> Vec<Effect> {
    match classify(event) {
        Some(action) => reduce(state, action),
        None => vec![],
    }
}

fn handle_agent_message(
    state: &mut SessionState,
    message: ChatMessage,
    uuid: Option<MessageUuid>,
) -> Vec<Effect> {
    if let MessagePayload::ToolResult { tool_use_id, .. } = &message.payload {
        state.tool_progress.remove(tool_use_id);
    }

    let message_id = message.id.clone();
    let tool_use_ids: Vec<ToolUseId> = message
        .blocks()
        .iter()
        .filter_map(|block| match block {
            ContentBlock::ToolUse(tool_use) => Some(tool_use.tool_use_id.clone()),
            _ => None,
        })
        .collect();

    let position = ordering::insert(&mut state.messages, message).position();
    for tool_use_id in tool_use_ids {
        state
            .tool_use_index
            .record(tool_use_id, position, message_id.clone());
    }

    if let Some(uuid) = uuid
        && !state.message_uuids.contains_key(&message_id)
    {
        state.message_uuids.insert(message_id, uuid);
    }
    vec![]
}

fn handle_turn_finished(state: &mut SessionState, is_error: bool) -> Vec<Effect> {
    tool_calls::close_all_streaming(&mut state.messages);
    if matches!(
        state.status.phase,
        SessionPhase::Running | SessionPhase::Stopping | SessionPhase::Loading
    ) {
        state.status.phase = SessionPhase::Ready;
    }
    if is_error {
        tracing::debug!(target: "parley.lifecycle", "Turn finished with an error");
    }
    vec![]
}

fn handle_session_error(state: &mut SessionState, message: String, timestamp: u64) -> Vec<Effect> {
    tracing::warn!(target: "parley.lifecycle", "Session error: {}", message);
    let order = ordering::next_order(&state.messages);
    ordering::insert(
        &mut state.messages,
        ChatMessage::error_entry(order, message, timestamp),
    );
    state.status.finish_loading();
    vec![]
}

fn stale_response(state: &SessionState, request_id: &RequestId) -> Vec<Effect> {
    tracing::warn!(
        target: "parley.pending_request",
        "Dropping response to {}: pending request is {:?}",
        request_id,
        state.pending_request.request_id().map(|id| id.as_str())
    );
    vec![]
}

