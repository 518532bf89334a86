//! Send, accept and reject handling for user messages.
//!
//! A sent message lives in up to three views at once: the optimistic
//! `pending_messages` entry written on send, the `queued_messages` entry the
//! server confirmed on `accepted`, and the visible entry in `messages`. Every
//! transition below keeps those views consistent.

use std::str::FromStr;

use parley_protocol::{
    Attachment, MessageId, MessageState, MessageUuid, Order, OutboundMessage, WireQueuedMessage,
    WireUserMessage,
};

use crate::domain::effect::Effect;
use crate::domain::message::{ChatMessage, MessagePayload};
use crate::domain::ordering;
use crate::domain::state::SessionState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage {
    pub id: MessageId,
    pub text: String,
    pub attachments: Vec<Attachment>,
    pub order: Option<Order>,
    pub queued_at: u64,
}

impl From<WireQueuedMessage> for QueuedMessage {
    fn from(wire: WireQueuedMessage) -> Self {
        Self {
            id: wire.id,
            text: wire.text,
            attachments: wire.attachments,
            order: wire.order,
            queued_at: wire.queued_at,
        }
    }
}

/// What the user typed, kept until the server confirms the send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMessageContent {
    pub text: String,
    pub attachments: Vec<Attachment>,
    pub created_at: u64,
}

/// Draft to restore into the input box after the server refused a send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedMessageInfo {
    pub message_id: MessageId,
    pub text: String,
    pub attachments: Vec<Attachment>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Known(MessageState),
    /// A state this client predates; logged and ignored.
    Unrecognized(String),
}

impl Transition {
    pub fn parse(raw: &str) -> Self {
        match MessageState::from_str(raw) {
            Ok(state) => Transition::Known(state),
            Err(_) => Transition::Unrecognized(raw.to_string()),
        }
    }
}

struct AcceptedContent {
    text: String,
    attachments: Vec<Attachment>,
    order: Option<Order>,
    uuid: Option<MessageUuid>,
    timestamp: u64,
}

/// Record an optimistic send and produce the message to put on the wire.
pub fn record_send(
    state: &mut SessionState,
    message_id: MessageId,
    text: String,
    attachments: Vec<Attachment>,
    timestamp: u64,
) -> Vec<Effect> {
    tracing::debug!(target: "parley.lifecycle", "Sending message {}", message_id);
    state.pending_messages.insert(
        message_id.clone(),
        PendingMessageContent {
            text: text.clone(),
            attachments: attachments.clone(),
            created_at: timestamp,
        },
    );
    vec![Effect::Send(OutboundMessage::UserMessage {
        message_id,
        text,
        attachments,
    })]
}

pub fn apply_transition(
    state: &mut SessionState,
    message_id: MessageId,
    transition: Transition,
    user_message: Option<WireUserMessage>,
    error_message: Option<String>,
) -> Vec<Effect> {
    let message_state = match transition {
        Transition::Known(message_state) => message_state,
        Transition::Unrecognized(raw) => {
            tracing::warn!(
                target: "parley.lifecycle",
                "Unrecognized state {:?} for message {}",
                raw,
                message_id
            );
            return vec![];
        }
    };

    tracing::debug!(
        target: "parley.lifecycle",
        "Message {} -> {}",
        message_id,
        message_state
    );

    match message_state {
        MessageState::Accepted => {
            on_accepted(state, message_id, user_message);
            vec![]
        }
        MessageState::Dispatched | MessageState::Committed | MessageState::Complete => {
            state.queued_messages.shift_remove(&message_id);
            vec![]
        }
        MessageState::Cancelled => {
            state.queued_messages.shift_remove(&message_id);
            state.pending_messages.shift_remove(&message_id);
            ordering::remove(&mut state.messages, &message_id);
            state.message_uuids.remove(&message_id);
            vec![]
        }
        MessageState::Rejected | MessageState::Failed => {
            on_rejected(state, message_id, error_message)
        }
    }
}

fn accepted_content(
    state: &SessionState,
    message_id: &MessageId,
    user_message: Option<WireUserMessage>,
) -> Option<AcceptedContent> {
    if let Some(wire) = user_message {
        return Some(AcceptedContent {
            text: wire.text,
            attachments: wire.attachments,
            order: wire.order,
            uuid: wire.uuid,
            timestamp: wire.timestamp,
        });
    }
    if let Some(pending) = state.pending_messages.get(message_id) {
        return Some(AcceptedContent {
            text: pending.text.clone(),
            attachments: pending.attachments.clone(),
            order: None,
            uuid: None,
            timestamp: pending.created_at,
        });
    }
    let visible = &state.messages[ordering::position_of(&state.messages, message_id)?];
    match &visible.payload {
        MessagePayload::User { text, attachments } => Some(AcceptedContent {
            text: text.clone(),
            attachments: attachments.clone(),
            order: Some(visible.order),
            uuid: None,
            timestamp: visible.timestamp,
        }),
        _ => None,
    }
}

fn on_accepted(
    state: &mut SessionState,
    message_id: MessageId,
    user_message: Option<WireUserMessage>,
) {
    let Some(content) = accepted_content(state, &message_id, user_message) else {
        tracing::warn!(
            target: "parley.lifecycle",
            "Accepted message {} has no content to show",
            message_id
        );
        return;
    };

    // The committed copy may already be visible if a snapshot won the race.
    let order = match ordering::position_of(&state.messages, &message_id) {
        Some(position) => state.messages[position].order,
        None => {
            let order = content
                .order
                .unwrap_or_else(|| ordering::next_order(&state.messages));
            ordering::insert(
                &mut state.messages,
                ChatMessage::user(
                    message_id.clone(),
                    order,
                    content.text.clone(),
                    content.attachments.clone(),
                    content.timestamp,
                ),
            );
            order
        }
    };

    state.queued_messages.insert(
        message_id.clone(),
        QueuedMessage {
            id: message_id.clone(),
            text: content.text,
            attachments: content.attachments,
            order: Some(order),
            queued_at: content.timestamp,
        },
    );
    state.pending_messages.shift_remove(&message_id);

    if !state.message_uuids.contains_key(&message_id) {
        let uuid = state.pending_uuids.pop_front().or(content.uuid);
        if let Some(uuid) = uuid {
            state.message_uuids.insert(message_id, uuid);
        }
    }
}

fn on_rejected(
    state: &mut SessionState,
    message_id: MessageId,
    error_message: Option<String>,
) -> Vec<Effect> {
    let queued = state.queued_messages.shift_remove(&message_id);
    let pending = state.pending_messages.shift_remove(&message_id);
    let visible = ordering::remove(&mut state.messages, &message_id);
    state.message_uuids.remove(&message_id);

    let draft = queued
        .map(|queued| (queued.text, queued.attachments))
        .or_else(|| pending.map(|pending| (pending.text, pending.attachments)))
        .or_else(|| match visible.map(|message| message.payload) {
            Some(MessagePayload::User { text, attachments }) => Some((text, attachments)),
            _ => None,
        });

    let Some((text, attachments)) = draft else {
        tracing::warn!(
            target: "parley.lifecycle",
            "Rejected message {} had no recoverable content",
            message_id
        );
        return vec![];
    };

    tracing::warn!(
        target: "parley.lifecycle",
        "Message {} rejected: {}",
        message_id,
        error_message.as_deref().unwrap_or("no reason given")
    );
    state.last_rejected_message = Some(RejectedMessageInfo {
        message_id: message_id.clone(),
        text,
        attachments,
        error: error_message,
    });
    vec![Effect::DraftRejected { message_id }]
}

/// Bind a server uuid to a message, or park it until one is accepted.
pub fn bind_uuid(state: &mut SessionState, uuid: MessageUuid, message_id: Option<MessageId>) {
    if let Some(message_id) = message_id {
        state.message_uuids.insert(message_id, uuid);
        return;
    }

    let unbound = state
        .queued_messages
        .keys()
        .find(|id| !state.message_uuids.contains_key(*id))
        .cloned();

    match unbound {
        Some(message_id) => {
            state.message_uuids.insert(message_id, uuid);
        }
        None => state.pending_uuids.push_back(uuid),
    }
}
