//! Conversation entries as the UI sees them.

use parley_protocol::{
    AgentPayload, Attachment, MessageId, Order, ToolUseId, WireChatMessage, WireContentBlock,
};
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum MessageSource {
    User,
    Agent,
    /// Synthesized by this client; never replaced by a server delivery.
    Local,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub order: Order,
    pub source: MessageSource,
    pub payload: MessagePayload,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessagePayload {
    User {
        text: String,
        attachments: Vec<Attachment>,
    },
    Assistant {
        blocks: Vec<ContentBlock>,
    },
    ToolResult {
        tool_use_id: ToolUseId,
        content: String,
        is_error: bool,
    },
    System {
        subtype: Option<String>,
        text: String,
    },
    Error {
        message: String,
    },
    CompactBoundary {
        trigger: Option<String>,
        pre_tokens: Option<u64>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Thinking {
        /// Content-block index assigned by the model stream.
        index: u32,
        text: String,
        /// Still receiving deltas.
        open: bool,
    },
    ToolUse(ToolUseBlock),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolUseBlock {
    pub tool_use_id: ToolUseId,
    pub name: String,
    pub input: serde_json::Value,
    /// Raw JSON text accumulated from streamed fragments.
    pub partial_input: String,
    pub streaming: bool,
}

impl ToolUseBlock {
    pub fn streaming(tool_use_id: ToolUseId, name: String) -> Self {
        Self {
            tool_use_id,
            name,
            input: serde_json::Value::Null,
            partial_input: String::new(),
            streaming: true,
        }
    }
}

impl ContentBlock {
    /// `None` for block types this client does not render.
    pub fn from_wire(block: WireContentBlock) -> Option<Self> {
        let block = match block {
            WireContentBlock::Text { text } => ContentBlock::Text { text },
            WireContentBlock::Thinking { index, thinking } => ContentBlock::Thinking {
                index,
                text: thinking,
                open: false,
            },
            WireContentBlock::ToolUse { id, name, input } => ContentBlock::ToolUse(ToolUseBlock {
                tool_use_id: id,
                name,
                input,
                partial_input: String::new(),
                streaming: false,
            }),
            WireContentBlock::Unsupported => return None,
        };
        Some(block)
    }
}

impl MessagePayload {
    /// Convert a complete agent payload. Streamed fragments and turn markers
    /// have no standalone entry and yield `None`.
    pub fn from_agent_payload(payload: AgentPayload) -> Option<(MessageSource, MessagePayload)> {
        match payload {
            AgentPayload::Assistant { content } => Some((
                MessageSource::Agent,
                MessagePayload::Assistant {
                    blocks: content.into_iter().filter_map(ContentBlock::from_wire).collect(),
                },
            )),
            AgentPayload::User {
                text, attachments, ..
            } => Some((MessageSource::User, MessagePayload::User { text, attachments })),
            AgentPayload::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => Some((
                MessageSource::Agent,
                MessagePayload::ToolResult {
                    tool_use_id,
                    content,
                    is_error,
                },
            )),
            AgentPayload::System { subtype, text } => {
                Some((MessageSource::Agent, MessagePayload::System { subtype, text }))
            }
            AgentPayload::ToolUseStart { .. }
            | AgentPayload::InputJsonDelta { .. }
            | AgentPayload::ThinkingDelta { .. }
            | AgentPayload::Result { .. } => None,
        }
    }
}

/// Id used when the server omits one: unique per `(source, order)`.
pub fn derived_message_id(source: MessageSource, order: Order) -> MessageId {
    MessageId(format!("{source}-{order}"))
}

impl ChatMessage {
    pub fn user(
        id: MessageId,
        order: Order,
        text: String,
        attachments: Vec<Attachment>,
        timestamp: u64,
    ) -> Self {
        Self {
            id,
            order,
            source: MessageSource::User,
            payload: MessagePayload::User { text, attachments },
            timestamp,
        }
    }

    pub fn assistant(
        id: MessageId,
        order: Order,
        blocks: Vec<ContentBlock>,
        timestamp: u64,
    ) -> Self {
        Self {
            id,
            order,
            source: MessageSource::Agent,
            payload: MessagePayload::Assistant { blocks },
            timestamp,
        }
    }

    pub fn error_entry(order: Order, message: String, timestamp: u64) -> Self {
        Self {
            id: MessageId(format!("error-{order}")),
            order,
            source: MessageSource::Local,
            payload: MessagePayload::Error { message },
            timestamp,
        }
    }

    pub fn from_wire(wire: WireChatMessage) -> Option<Self> {
        let (source, payload) = MessagePayload::from_agent_payload(wire.message)?;
        Some(Self {
            id: wire.id,
            order: wire.order,
            source,
            payload,
            timestamp: wire.timestamp,
        })
    }

    pub fn blocks(&self) -> &[ContentBlock] {
        match &self.payload {
            MessagePayload::Assistant { blocks } => blocks,
            _ => &[],
        }
    }

    pub fn blocks_mut(&mut self) -> Option<&mut Vec<ContentBlock>> {
        match &mut self.payload {
            MessagePayload::Assistant { blocks } => Some(blocks),
            _ => None,
        }
    }

    pub fn tool_use(&self, tool_use_id: &ToolUseId) -> Option<&ToolUseBlock> {
        self.blocks().iter().find_map(|block| match block {
            ContentBlock::ToolUse(tool_use) if &tool_use.tool_use_id == tool_use_id => {
                Some(tool_use)
            }
            _ => None,
        })
    }

    pub fn tool_use_mut(&mut self, tool_use_id: &ToolUseId) -> Option<&mut ToolUseBlock> {
        self.blocks_mut()?.iter_mut().find_map(|block| match block {
            ContentBlock::ToolUse(tool_use) if &tool_use.tool_use_id == tool_use_id => {
                Some(tool_use)
            }
            _ => None,
        })
    }

    pub fn has_open_thinking(&self, index: u32) -> bool {
        self.blocks().iter().any(|block| {
            matches!(block, ContentBlock::Thinking { index: i, open: true, .. } if *i == index)
        })
    }

    /// Mark every streamed block of this message as finished.
    pub fn close_streaming_blocks(&mut self) {
        if let Some(blocks) = self.blocks_mut() {
            for block in blocks {
                match block {
                    ContentBlock::Thinking { open, .. } => *open = false,
                    ContentBlock::ToolUse(tool_use) => tool_use.streaming = false,
                    ContentBlock::Text { .. } => {}
                }
            }
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            MessagePayload::User { text, .. } | MessagePayload::System { text, .. } => {
                Some(text.as_str())
            }
            MessagePayload::Error { message } => Some(message.as_str()),
            _ => None,
        }
    }
}
