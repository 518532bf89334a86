use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::ids::{MessageId, MessageUuid, OptionId, Order, RequestId, ToolUseId};

/// Runtime phase reported by the server for the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    Loading,
    Starting,
    Ready,
    Running,
    Stopping,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeInfo {
    pub phase: SessionPhase,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    #[serde(default)]
    pub media_type: Option<String>,
    /// Opaque payload, usually base64.
    #[serde(default)]
    pub data: String,
}

/// Content block of a complete assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireContentBlock {
    Text {
        text: String,
    },
    Thinking {
        #[serde(default)]
        index: u32,
        thinking: String,
    },
    ToolUse {
        id: ToolUseId,
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    /// A block type this client does not render.
    #[serde(other)]
    Unsupported,
}

/// Body of an `agent_message` event. Complete messages and streamed
/// fragments share the envelope and are told apart by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum AgentPayload {
    Assistant {
        content: Vec<WireContentBlock>,
    },
    User {
        text: String,
        #[serde(default)]
        attachments: Vec<Attachment>,
        #[serde(default)]
        uuid: Option<MessageUuid>,
    },
    ToolResult {
        tool_use_id: ToolUseId,
        #[serde(default)]
        content: String,
        #[serde(default)]
        is_error: bool,
    },
    System {
        #[serde(default)]
        subtype: Option<String>,
        text: String,
    },
    ToolUseStart {
        tool_use_id: ToolUseId,
        name: String,
    },
    InputJsonDelta {
        tool_use_id: ToolUseId,
        partial_json: String,
    },
    ThinkingDelta {
        index: u32,
        thinking: String,
    },
    Result {
        #[serde(default)]
        subtype: Option<String>,
        #[serde(default)]
        is_error: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireChatMessage {
    pub id: MessageId,
    pub order: Order,
    #[serde(default)]
    pub timestamp: u64,
    pub message: AgentPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireQueuedMessage {
    pub id: MessageId,
    pub text: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub order: Option<Order>,
    #[serde(default)]
    pub queued_at: u64,
}

/// User message content carried by a `message_state_changed` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireUserMessage {
    pub text: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub order: Option<Order>,
    #[serde(default)]
    pub uuid: Option<MessageUuid>,
    #[serde(default)]
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionOption {
    pub option_id: OptionId,
    pub name: String,
    #[serde(default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRequest {
    pub request_id: RequestId,
    pub tool_name: String,
    #[serde(default)]
    pub tool_use_id: Option<ToolUseId>,
    #[serde(default)]
    pub input: serde_json::Value,
    /// Present for multi-option ACP-style permissions.
    #[serde(default)]
    pub options: Vec<PermissionOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOption {
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question: String,
    #[serde(default)]
    pub header: Option<String>,
    #[serde(default)]
    pub options: Vec<QuestionOption>,
    #[serde(default)]
    pub multi_select: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRequest {
    pub request_id: RequestId,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WirePendingRequest {
    Permission(PermissionRequest),
    Question(QuestionRequest),
}

/// Server-side lifecycle state of a sent user message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum MessageState {
    Accepted,
    Dispatched,
    Committed,
    Complete,
    Cancelled,
    Rejected,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolLocation {
    pub path: String,
    #[serde(default)]
    pub line: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlashCommand {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub argument_hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PermissionMode {
    #[default]
    Default,
    AcceptEdits,
    Plan,
    BypassPermissions,
}

/// Partial settings update. Absent fields are left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_mode: Option<PermissionMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<bool>,
}

impl ConfigOptions {
    pub fn is_empty(&self) -> bool {
        self.model.is_none()
            && self.permission_mode.is_none()
            && self.plan_mode.is_none()
            && self.thinking.is_none()
    }
}
