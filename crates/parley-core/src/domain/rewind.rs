use parley_protocol::{MessageId, OutboundMessage, RequestNonce};

use crate::domain::effect::Effect;
use crate::domain::state::SessionState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewindPreviewState {
    pub target_message_id: MessageId,
    pub request_nonce: RequestNonce,
    pub is_loading: bool,
    pub is_executing: bool,
    pub affected_files: Option<Vec<String>>,
    pub error: Option<String>,
}

impl RewindPreviewState {
    fn loading(target_message_id: MessageId, request_nonce: RequestNonce) -> Self {
        Self {
            target_message_id,
            request_nonce,
            is_loading: true,
            is_executing: false,
            affected_files: None,
            error: None,
        }
    }

    pub fn matches(&self, target_message_id: &MessageId, request_nonce: &RequestNonce) -> bool {
        &self.target_message_id == target_message_id && &self.request_nonce == request_nonce
    }

    /// A preview for this target has loaded without error.
    pub fn is_ready(&self) -> bool {
        !self.is_loading && !self.is_executing && self.error.is_none()
    }
}

pub fn request_preview(
    state: &mut SessionState,
    target_message_id: MessageId,
    request_nonce: RequestNonce,
) -> Vec<Effect> {
    let Some(target_uuid) = state.message_uuids.get(&target_message_id).cloned() else {
        tracing::warn!(
            target: "parley.rewind",
            "Cannot preview rewind to {}: no server uuid bound",
            target_message_id
        );
        state.rewind = Some(RewindPreviewState {
            is_loading: false,
            error: Some(format!(
                "message {target_message_id} cannot be rewound yet"
            )),
            ..RewindPreviewState::loading(target_message_id, request_nonce)
        });
        return vec![];
    };

    state.rewind = Some(RewindPreviewState::loading(
        target_message_id.clone(),
        request_nonce.clone(),
    ));
    vec![Effect::Send(OutboundMessage::RewindPreview {
        target_message_id,
        target_uuid,
        request_nonce,
    })]
}

pub fn execute(
    state: &mut SessionState,
    target_message_id: MessageId,
    request_nonce: RequestNonce,
) -> Vec<Effect> {
    let ready = state
        .rewind
        .as_ref()
        .is_some_and(|preview| {
            preview.target_message_id == target_message_id && preview.is_ready()
        });
    let target_uuid = state.message_uuids.get(&target_message_id).cloned();

    let (true, Some(target_uuid), Some(preview)) = (ready, target_uuid, state.rewind.as_mut())
    else {
        tracing::warn!(
            target: "parley.rewind",
            "Ignoring rewind execute for {} without a loaded preview",
            target_message_id
        );
        return vec![];
    };

    preview.request_nonce = request_nonce.clone();
    preview.is_executing = true;
    vec![Effect::Send(OutboundMessage::RewindExecute {
        target_message_id,
        target_uuid,
        request_nonce,
    })]
}

pub fn on_preview(
    state: &mut SessionState,
    target_message_id: &MessageId,
    request_nonce: &RequestNonce,
    affected_files: Option<Vec<String>>,
    error: Option<String>,
) {
    match state.rewind.as_mut() {
        Some(preview) if preview.matches(target_message_id, request_nonce) => {
            preview.is_loading = false;
            preview.affected_files = affected_files;
            preview.error = error;
        }
        _ => stale("preview", target_message_id, request_nonce),
    }
}

pub fn on_result(
    state: &mut SessionState,
    target_message_id: &MessageId,
    request_nonce: &RequestNonce,
    success: bool,
    error: Option<String>,
) {
    match state.rewind.as_mut() {
        Some(preview)
            if preview.is_executing && preview.matches(target_message_id, request_nonce) =>
        {
            if success {
                tracing::debug!(target: "parley.rewind", "Rewound to {}", target_message_id);
                state.rewind = None;
            } else {
                preview.is_executing = false;
                preview.error = Some(error.unwrap_or_else(|| "rewind failed".to_string()));
            }
        }
        _ => stale("result", target_message_id, request_nonce),
    }
}

fn stale(kind: &str, target_message_id: &MessageId, request_nonce: &RequestNonce) {
    tracing::warn!(
        target: "parley.rewind",
        "Dropping stale rewind {} for {} (nonce {})",
        kind,
        target_message_id,
        request_nonce
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_protocol::MessageUuid;

    fn state_with_uuid() -> SessionState {
        let mut state = SessionState::default();
        state
            .message_uuids
            .insert(MessageId::from("m1"), MessageUuid::from("uuid-1"));
        state
    }

    #[test]
    fn preview_needs_a_bound_uuid() {
        let mut state = SessionState::default();
        let effects = request_preview(&mut state, MessageId::from("m1"), RequestNonce::from("n1"));

        assert!(effects.is_empty());
        let preview = state.rewind.unwrap();
        assert!(!preview.is_loading);
        assert!(preview.error.is_some());
    }

    #[test]
    fn stale_nonce_is_rejected() {
        let mut state = state_with_uuid();
        request_preview(&mut state, MessageId::from("m1"), RequestNonce::from("n1"));
        request_preview(&mut state, MessageId::from("m1"), RequestNonce::from("n2"));

        on_preview(
            &mut state,
            &MessageId::from("m1"),
            &RequestNonce::from("n1"),
            Some(vec!["old.rs".to_string()]),
            None,
        );
        assert!(state.rewind.as_ref().unwrap().is_loading);

        on_preview(
            &mut state,
            &MessageId::from("m1"),
            &RequestNonce::from("n2"),
            Some(vec!["src/lib.rs".to_string()]),
            None,
        );
        let preview = state.rewind.as_ref().unwrap();
        assert!(!preview.is_loading);
        assert_eq!(preview.affected_files, Some(vec!["src/lib.rs".to_string()]));
    }

    #[test]
    fn execute_then_succeed_clears_preview() {
        let mut state = state_with_uuid();
        request_preview(&mut state, MessageId::from("m1"), RequestNonce::from("n1"));

        let early = execute(&mut state, MessageId::from("m1"), RequestNonce::from("n2"));
        assert!(early.is_empty());

        on_preview(&mut state, &MessageId::from("m1"), &RequestNonce::from("n1"), None, None);
        let effects = execute(&mut state, MessageId::from("m1"), RequestNonce::from("n2"));
        assert!(matches!(
            effects.as_slice(),
            [Effect::Send(OutboundMessage::RewindExecute { .. })]
        ));
        assert!(state.rewind.as_ref().unwrap().is_executing);

        on_result(&mut state, &MessageId::from("m1"), &RequestNonce::from("n1"), true, None);
        assert!(state.rewind.is_some());

        on_result(&mut state, &MessageId::from("m1"), &RequestNonce::from("n2"), true, None);
        assert!(state.rewind.is_none());
    }

    #[test]
    fn result_before_execute_is_ignored() {
        let mut state = state_with_uuid();
        request_preview(&mut state, MessageId::from("m1"), RequestNonce::from("n1"));
        on_preview(&mut state, &MessageId::from("m1"), &RequestNonce::from("n1"), None, None);

        on_result(&mut state, &MessageId::from("m1"), &RequestNonce::from("n1"), true, None);

        let preview = state.rewind.as_ref().unwrap();
        assert!(preview.is_ready());
        assert!(!preview.is_executing);
    }

    #[test]
    fn failed_result_keeps_error() {
        let mut state = state_with_uuid();
        request_preview(&mut state, MessageId::from("m1"), RequestNonce::from("n1"));
        on_preview(&mut state, &MessageId::from("m1"), &RequestNonce::from("n1"), None, None);
        execute(&mut state, MessageId::from("m1"), RequestNonce::from("n2"));

        on_result(
            &mut state,
            &MessageId::from("m1"),
            &RequestNonce::from("n2"),
            false,
            Some("checkpoint missing".to_string()),
        );
        let preview = state.rewind.as_ref().unwrap();
        assert!(!preview.is_executing);
        assert_eq!(preview.error.as_deref(), Some("checkpoint missing"));
    }
}
