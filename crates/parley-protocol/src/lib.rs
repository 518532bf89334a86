//! Wire types for the Parley session protocol.
//!
//! Inbound events arrive as JSON objects discriminated by a `type` field and
//! are turned into a closed [`ProtocolEvent`] enum by an explicit parse step.
//! Outbound messages are what the transport sends on behalf of UI commands.

pub mod error;
pub mod ids;
pub mod inbound;
pub mod outbound;
pub mod types;

pub use error::{ProtocolError, Result};
pub use ids::{
    HookId, LoadRequestId, MessageId, MessageUuid, OptionId, Order, RequestId, RequestNonce,
    TaskId, ToolUseId,
};
pub use inbound::{EventTag, ProtocolEvent};
pub use outbound::{OutboundMessage, QuestionAnswer};
pub use types::{
    AgentPayload, Attachment, ConfigOptions, MessageState, PermissionMode, PermissionOption,
    PermissionRequest, Question, QuestionOption, QuestionRequest, RuntimeInfo, SessionPhase,
    SlashCommand, ToolLocation, WireChatMessage, WireContentBlock, WirePendingRequest,
    WireQueuedMessage, WireUserMessage,
};
