//! Ordered message sequence keyed by the server-assigned `order`.
//!
//! The sequence is always sorted ascending by `order`. Within one `order`
//! there is at most one entry per [`MessageSource`]; a second delivery for the
//! same slot replaces the first in place. Message ids are unique.

use parley_protocol::{MessageId, Order};

use crate::domain::message::{ChatMessage, MessageSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(usize),
    Replaced(usize),
}

impl InsertOutcome {
    pub fn position(self) -> usize {
        match self {
            InsertOutcome::Inserted(pos) | InsertOutcome::Replaced(pos) => pos,
        }
    }
}

/// Insert or upsert `message`, keeping `messages` sorted.
///
/// Debug builds assert that the sequence is still sorted afterwards.
pub fn insert(messages: &mut Vec<ChatMessage>, message: ChatMessage) -> InsertOutcome {
    // A copy of this id somewhere else (e.g. a locally synthesized entry now
    // confirmed at the server's order) is superseded by this delivery.
    if let Some(existing) = position_of(messages, &message.id) {
        let current = &messages[existing];
        if current.order != message.order || current.source != message.source {
            tracing::debug!(
                target: "parley.ordering",
                "Moving message {} from order {} to {}",
                message.id,
                current.order,
                message.order
            );
            messages.remove(existing);
        }
    }

    let idx = messages.partition_point(|m| m.order <= message.order);

    let outcome = match find_in_run(messages, idx, message.order, message.source) {
        Some(slot) => {
            messages[slot] = message;
            InsertOutcome::Replaced(slot)
        }
        None => {
            messages.insert(idx, message);
            InsertOutcome::Inserted(idx)
        }
    };

    debug_assert!(is_sorted(messages), "message order invariant violated");
    outcome
}

/// Entries sharing `order` sit immediately left of `end`; walk that run.
fn find_in_run(
    messages: &[ChatMessage],
    end: usize,
    order: Order,
    source: MessageSource,
) -> Option<usize> {
    let mut cursor = end;
    while cursor > 0 {
        let candidate = &messages[cursor - 1];
        if candidate.order != order {
            return None;
        }
        if candidate.source == source {
            return Some(cursor - 1);
        }
        cursor -= 1;
    }
    None
}

/// Position of the entry occupying `(order, source)`, found by binary search.
pub fn find_slot(messages: &[ChatMessage], order: Order, source: MessageSource) -> Option<usize> {
    let end = messages.partition_point(|m| m.order <= order);
    find_in_run(messages, end, order, source)
}

pub fn position_of(messages: &[ChatMessage], id: &MessageId) -> Option<usize> {
    messages.iter().position(|m| &m.id == id)
}

pub fn contains(messages: &[ChatMessage], id: &MessageId) -> bool {
    position_of(messages, id).is_some()
}

pub fn remove(messages: &mut Vec<ChatMessage>, id: &MessageId) -> Option<ChatMessage> {
    let pos = position_of(messages, id)?;
    Some(messages.remove(pos))
}

/// The order one past the current tail, used for locally appended entries.
pub fn next_order(messages: &[ChatMessage]) -> Order {
    messages.last().map_or(Order(1), |m| m.order.next())
}

pub fn is_sorted(messages: &[ChatMessage]) -> bool {
    messages.windows(2).all(|pair| pair[0].order <= pair[1].order)
}

/// Build a sorted sequence from an arbitrary batch, applying the same upsert
/// rules as live insertion.
pub fn from_unsorted(batch: impl IntoIterator<Item = ChatMessage>) -> Vec<ChatMessage> {
    let mut messages = Vec::new();
    for message in batch {
        insert(&mut messages, message);
    }
    messages
}
