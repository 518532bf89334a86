//! Streamed tool-use input, tool progress and thinking deltas.

use std::collections::HashMap;

use parley_protocol::{MessageId, Order, ToolLocation, ToolUseId};

use crate::domain::message::{
    ChatMessage, ContentBlock, MessageSource, ToolUseBlock, derived_message_id,
};
use crate::domain::ordering;

#[derive(Debug, Clone, PartialEq, Eq)]
struct ToolUseSlot {
    position: usize,
    message_id: MessageId,
}

/// Cache from tool-use id to the position of the message holding it.
///
/// Positions go stale whenever an earlier insertion shifts the sequence, so
/// every read is validated against the message found there and repaired by a
/// scan when it no longer matches.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolUseIndex {
    slots: HashMap<ToolUseId, ToolUseSlot>,
}

impl ToolUseIndex {
    pub fn record(&mut self, tool_use_id: ToolUseId, position: usize, message_id: MessageId) {
        self.slots.insert(
            tool_use_id,
            ToolUseSlot {
                position,
                message_id,
            },
        );
    }

    /// Current position of the message carrying `tool_use_id`, or `None` if
    /// no message has it.
    pub fn resolve(&mut self, messages: &[ChatMessage], tool_use_id: &ToolUseId) -> Option<usize> {
        if let Some(slot) = self.slots.get(tool_use_id)
            && let Some(message) = messages.get(slot.position)
            && message.id == slot.message_id
            && message.tool_use(tool_use_id).is_some()
        {
            return Some(slot.position);
        }

        let found = messages
            .iter()
            .rposition(|message| message.tool_use(tool_use_id).is_some());

        match found {
            Some(position) => {
                tracing::debug!(
                    target: "parley.tool_calls",
                    "Repaired index for {} at position {}",
                    tool_use_id,
                    position
                );
                self.record(tool_use_id.clone(), position, messages[position].id.clone());
            }
            None => {
                self.slots.remove(tool_use_id);
            }
        }
        found
    }

    pub fn rebuild(&mut self, messages: &[ChatMessage]) {
        self.slots.clear();
        for (position, message) in messages.iter().enumerate() {
            for block in message.blocks() {
                if let ContentBlock::ToolUse(tool_use) = block {
                    self.record(tool_use.tool_use_id.clone(), position, message.id.clone());
                }
            }
        }
    }

    pub fn contains(&self, tool_use_id: &ToolUseId) -> bool {
        self.slots.contains_key(tool_use_id)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToolProgressInfo {
    pub elapsed_seconds: f64,
    pub locations: Vec<ToolLocation>,
    pub kind: Option<String>,
}

pub type ToolProgressMap = HashMap<ToolUseId, ToolProgressInfo>;

/// Open a streaming tool-use block in the agent message at `order`.
pub fn on_tool_use_started(
    messages: &mut Vec<ChatMessage>,
    index: &mut ToolUseIndex,
    order: Order,
    message_id: Option<MessageId>,
    tool_use_id: ToolUseId,
    name: String,
    timestamp: u64,
) {
    if let Some(position) = ordering::find_slot(messages, order, MessageSource::Agent)
        && let Some(blocks) = messages[position].blocks_mut()
    {
        let already_open = blocks.iter().any(|block| {
            matches!(
                block,
                ContentBlock::ToolUse(tool_use) if tool_use.tool_use_id == tool_use_id
            )
        });
        if !already_open {
            blocks.push(ContentBlock::ToolUse(ToolUseBlock::streaming(
                tool_use_id.clone(),
                name,
            )));
        }
        let id = messages[position].id.clone();
        index.record(tool_use_id, position, id);
        return;
    }

    let id = message_id.unwrap_or_else(|| derived_message_id(MessageSource::Agent, order));
    let message = ChatMessage::assistant(
        id.clone(),
        order,
        vec![ContentBlock::ToolUse(ToolUseBlock::streaming(
            tool_use_id.clone(),
            name,
        ))],
        timestamp,
    );
    let outcome = ordering::insert(messages, message);
    index.record(tool_use_id, outcome.position(), id);
}

/// Append a streamed input fragment. Returns false when no message carries
/// the tool use.
pub fn on_partial_input(
    messages: &mut [ChatMessage],
    index: &mut ToolUseIndex,
    tool_use_id: &ToolUseId,
    fragment: &str,
) -> bool {
    let Some(position) = index.resolve(messages, tool_use_id) else {
        tracing::warn!(
            target: "parley.tool_calls",
            "Input fragment for unknown tool use {}",
            tool_use_id
        );
        return false;
    };
    let Some(tool_use) = messages[position].tool_use_mut(tool_use_id) else {
        return false;
    };

    tool_use.partial_input.push_str(fragment);
    if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&tool_use.partial_input) {
        tool_use.input = parsed;
    }
    true
}

pub fn on_progress(
    progress: &mut ToolProgressMap,
    tool_use_id: ToolUseId,
    elapsed_seconds: f64,
    locations: Option<Vec<ToolLocation>>,
    kind: Option<String>,
) {
    let entry = progress.entry(tool_use_id).or_default();
    entry.elapsed_seconds = elapsed_seconds;
    if let Some(locations) = locations {
        entry.locations = locations;
    }
    if kind.is_some() {
        entry.kind = kind;
    }
}

/// Drop progress for calls that have concluded.
pub fn on_summary(progress: &mut ToolProgressMap, preceding_tool_use_ids: &[ToolUseId]) {
    for tool_use_id in preceding_tool_use_ids {
        progress.remove(tool_use_id);
    }
}

/// Append a thinking delta to the latest open block with `block_index`, or
/// open one in the agent message at `order`.
pub fn on_thinking_delta(
    messages: &mut Vec<ChatMessage>,
    order: Order,
    message_id: Option<MessageId>,
    block_index: u32,
    text: &str,
    timestamp: u64,
) {
    let open = messages
        .iter()
        .rposition(|message| message.has_open_thinking(block_index));

    if let Some(position) = open
        && let Some(blocks) = messages[position].blocks_mut()
        && let Some(ContentBlock::Thinking { text: existing, .. }) =
            blocks.iter_mut().rev().find(|block| {
                matches!(
                    block,
                    ContentBlock::Thinking { index, open: true, .. } if *index == block_index
                )
            })
    {
        existing.push_str(text);
        return;
    }

    let block = ContentBlock::Thinking {
        index: block_index,
        text: text.to_string(),
        open: true,
    };

    if let Some(position) = ordering::find_slot(messages, order, MessageSource::Agent)
        && let Some(blocks) = messages[position].blocks_mut()
    {
        blocks.push(block);
        return;
    }

    let id = message_id.unwrap_or_else(|| derived_message_id(MessageSource::Agent, order));
    ordering::insert(
        messages,
        ChatMessage::assistant(id, order, vec![block], timestamp),
    );
}

pub fn close_all_streaming(messages: &mut [ChatMessage]) {
    for message in messages {
        message.close_streaming_blocks();
    }
}
