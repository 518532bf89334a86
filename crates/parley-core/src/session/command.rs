use parley_protocol::{
    Attachment, ConfigOptions, LoadRequestId, MessageId, OptionId, QuestionAnswer, RequestId,
    RequestNonce,
};
use uuid::Uuid;

use crate::domain::action::Action;
use crate::utils::current_timestamp;

/// What the UI can ask the session to do.
///
/// Unlike [`Action`], commands carry no generated values: message ids, load
/// tokens, nonces and timestamps are minted when the command becomes an
/// action, so the reducer stays deterministic.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SendMessage {
        text: String,
        attachments: Vec<Attachment>,
    },
    RespondPermission {
        request_id: RequestId,
        approved: bool,
        option_id: Option<OptionId>,
    },
    RespondQuestion {
        request_id: RequestId,
        answers: Vec<QuestionAnswer>,
    },
    Stop,
    LoadSession,
    RequestRewindPreview {
        target_message_id: MessageId,
    },
    ExecuteRewind {
        target_message_id: MessageId,
    },
    DismissRewind,
    UpdateSettings(ConfigOptions),
    ClearRejectedMessage,
}

fn fresh_token() -> String {
    Uuid::new_v4().to_string()
}

impl Command {
    pub fn into_action(self) -> Action {
        self.into_action_at(current_timestamp())
    }

    pub fn into_action_at(self, timestamp: u64) -> Action {
        match self {
            Command::SendMessage { text, attachments } => Action::SendMessage {
                message_id: MessageId::from_string(format!("msg_{}", fresh_token())),
                text,
                attachments,
                timestamp,
            },
            Command::RespondPermission {
                request_id,
                approved,
                option_id,
            } => Action::RespondPermission {
                request_id,
                approved,
                option_id,
            },
            Command::RespondQuestion {
                request_id,
                answers,
            } => Action::RespondQuestion {
                request_id,
                answers,
            },
            Command::Stop => Action::Stop,
            Command::LoadSession => Action::LoadSession {
                load_request_id: LoadRequestId::from_string(fresh_token()),
            },
            Command::RequestRewindPreview { target_message_id } => Action::RequestRewindPreview {
                target_message_id,
                request_nonce: RequestNonce::from_string(fresh_token()),
            },
            Command::ExecuteRewind { target_message_id } => Action::ExecuteRewind {
                target_message_id,
                request_nonce: RequestNonce::from_string(fresh_token()),
            },
            Command::DismissRewind => Action::DismissRewind,
            Command::UpdateSettings(options) => Action::UpdateSettings { options },
            Command::ClearRejectedMessage => Action::ClearRejectedMessage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_unique() {
        let first = Command::LoadSession.into_action_at(0);
        let second = Command::LoadSession.into_action_at(0);
        assert_ne!(first, second);
        assert!(first.is_command());
    }

    #[test]
    fn send_carries_timestamp() {
        let action = Command::SendMessage {
            text: "hi".to_string(),
            attachments: vec![],
        }
        .into_action_at(42);

        let Action::SendMessage {
            message_id,
            timestamp,
            ..
        } = action
        else {
            panic!("expected send");
        };
        assert!(message_id.as_str().starts_with("msg_"));
        assert_eq!(timestamp, 42);
    }
}
