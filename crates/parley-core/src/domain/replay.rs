//! Hydration: applying admitted snapshots and replaying event batches.

use parley_protocol::ProtocolEvent;

use crate::domain::action::SessionSnapshot;
use crate::domain::ordering;
use crate::domain::reduce::apply_event_to_state;
use crate::domain::state::SessionState;

/// Replace session-scoped state with an admitted snapshot.
pub fn apply_snapshot(state: &mut SessionState, snapshot: SessionSnapshot) {
    let SessionSnapshot {
        messages,
        queue,
        pending_request,
        runtime,
    } = snapshot;

    state.messages = ordering::from_unsorted(messages);
    state.tool_use_index.rebuild(&state.messages);
    state
        .tool_progress
        .retain(|tool_use_id, _| state.tool_use_index.contains(tool_use_id));
    state.queued_messages = queue
        .into_iter()
        .map(|queued| (queued.id.clone(), queued))
        .collect();
    state.pending_request = pending_request;
    if let Some(runtime) = runtime {
        state.status = runtime.into();
    }

    // Sends the server already knows about are no longer optimistic.
    state.pending_messages.retain(|id, _| {
        !ordering::contains(&state.messages, id) && !state.queued_messages.contains_key(id)
    });
    state.message_uuids.retain(|id, _| {
        ordering::contains(&state.messages, id) || state.queued_messages.contains_key(id)
    });
    if state
        .rewind
        .as_ref()
        .is_some_and(|rewind| !ordering::contains(&state.messages, &rewind.target_message_id))
    {
        state.rewind = None;
    }

    tracing::debug!(
        target: "parley.hydration",
        "Applied snapshot: {} messages, {} queued",
        state.messages.len(),
        state.queued_messages.len()
    );
    state.status.finish_loading();
}

/// Clear session-scoped fields, keeping local intent (pending and queued
/// sends, the rejected draft) and client-side configuration.
pub fn reset_for_replay(state: &mut SessionState) {
    let base = SessionState {
        status: state.status.clone(),
        pending_messages: std::mem::take(&mut state.pending_messages),
        queued_messages: std::mem::take(&mut state.queued_messages),
        last_rejected_message: state.last_rejected_message.take(),
        slash_commands: std::mem::take(&mut state.slash_commands),
        settings: std::mem::take(&mut state.settings),
        capabilities: std::mem::take(&mut state.capabilities),
        ..SessionState::default()
    };
    *state = base;
}

/// Rebuild state from a recorded event log. Returns the number of events
/// folded.
pub fn replay(state: &mut SessionState, events: Vec<ProtocolEvent>) -> usize {
    reset_for_replay(state);

    let mut applied = 0;
    for event in events {
        if event.is_replay_batch() {
            tracing::warn!(target: "parley.replay", "Skipping nested replay batch");
            continue;
        }
        // Effects were already carried out when the events happened live.
        let _ = apply_event_to_state(state, event);
        applied += 1;
    }

    tracing::debug!(target: "parley.replay", "Replayed {} events", applied);
    state.status.finish_loading();
    applied
}
