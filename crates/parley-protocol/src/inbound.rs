//! Inbound protocol events and the explicit parse step that produces them.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::str::FromStr;
use strum::{Display, EnumString};

use crate::error::{ProtocolError, Result};
use crate::ids::{
    HookId, LoadRequestId, MessageId, MessageUuid, Order, RequestId, RequestNonce, TaskId,
    ToolUseId,
};
use crate::types::{
    AgentPayload, ConfigOptions, PermissionRequest, QuestionRequest, RuntimeInfo, SlashCommand,
    ToolLocation, WireChatMessage, WirePendingRequest, WireQueuedMessage, WireUserMessage,
};

/// The closed set of `type` tags the core understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum EventTag {
    SessionRuntimeSnapshot,
    SessionRuntimeUpdated,
    AgentMessage,
    Error,
    PermissionRequest,
    PermissionCancelled,
    UserQuestion,
    SessionSnapshot,
    SessionReplayBatch,
    MessageStateChanged,
    ToolProgress,
    ToolUseSummary,
    CompactBoundary,
    HookStarted,
    HookResponse,
    TaskNotification,
    SlashCommands,
    UserMessageUuid,
    ConfigOptionsUpdate,
    RewindPreview,
    RewindResult,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolEvent {
    SessionRuntimeSnapshot(RuntimeEvent),
    SessionRuntimeUpdated(RuntimeEvent),
    AgentMessage(AgentMessageEvent),
    Error(ErrorEvent),
    PermissionRequest(PermissionRequestEvent),
    PermissionCancelled(PermissionCancelledEvent),
    UserQuestion(UserQuestionEvent),
    SessionSnapshot(SessionSnapshotEvent),
    SessionReplayBatch(ReplayBatchEvent),
    MessageStateChanged(MessageStateChangedEvent),
    ToolProgress(ToolProgressEvent),
    ToolUseSummary(ToolUseSummaryEvent),
    CompactBoundary(CompactBoundaryEvent),
    HookStarted(HookStartedEvent),
    HookResponse(HookResponseEvent),
    TaskNotification(TaskNotificationEvent),
    SlashCommands(SlashCommandsEvent),
    UserMessageUuid(UserMessageUuidEvent),
    ConfigOptionsUpdate(ConfigOptionsUpdateEvent),
    RewindPreview(RewindPreviewEvent),
    RewindResult(RewindResultEvent),

    /// Well-formed event whose tag this client does not know.
    Unrecognized { tag: String },
    /// Missing tag, or a known tag whose payload failed to parse.
    Invalid { tag: Option<String>, reason: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeEvent {
    pub runtime: RuntimeInfo,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMessageEvent {
    pub order: Order,
    #[serde(default)]
    pub id: Option<MessageId>,
    #[serde(default)]
    pub timestamp: u64,
    pub message: AgentPayload,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEvent {
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRequestEvent {
    pub request: PermissionRequest,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionCancelledEvent {
    pub request_id: RequestId,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuestionEvent {
    pub request: QuestionRequest,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshotEvent {
    #[serde(default)]
    pub load_request_id: Option<LoadRequestId>,
    /// Entries that fail to parse are dropped individually.
    #[serde(default, deserialize_with = "lenient_items")]
    pub messages: Vec<WireChatMessage>,
    #[serde(default, deserialize_with = "lenient_items")]
    pub queue: Vec<WireQueuedMessage>,
    #[serde(default, deserialize_with = "lenient_item")]
    pub pending_request: Option<WirePendingRequest>,
    #[serde(default)]
    pub runtime: Option<RuntimeInfo>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplayBatchEvent {
    pub load_request_id: Option<LoadRequestId>,
    pub events: Vec<ProtocolEvent>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReplayBatch {
    #[serde(default)]
    load_request_id: Option<LoadRequestId>,
    events: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageStateChangedEvent {
    pub message_id: MessageId,
    /// Raw state name; unknown names survive parsing so the reducer can log them.
    pub state: String,
    #[serde(default)]
    pub user_message: Option<WireUserMessage>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolProgressEvent {
    pub tool_use_id: ToolUseId,
    pub elapsed_seconds: f64,
    #[serde(default)]
    pub locations: Option<Vec<ToolLocation>>,
    #[serde(default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUseSummaryEvent {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub preceding_tool_use_ids: Vec<ToolUseId>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompactBoundaryEvent {
    pub order: Order,
    #[serde(default)]
    pub trigger: Option<String>,
    #[serde(default)]
    pub pre_tokens: Option<u64>,
    #[serde(default)]
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookStartedEvent {
    pub hook_id: HookId,
    pub hook_name: String,
    #[serde(default)]
    pub hook_event: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookResponseEvent {
    pub hook_id: HookId,
    #[serde(default)]
    pub hook_name: String,
    #[serde(default)]
    pub hook_event: String,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub outcome: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskNotificationEvent {
    pub task_id: TaskId,
    pub status: String,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlashCommandsEvent {
    pub commands: Vec<SlashCommand>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMessageUuidEvent {
    pub uuid: MessageUuid,
    #[serde(default)]
    pub message_id: Option<MessageId>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigOptionsUpdateEvent {
    pub options: ConfigOptions,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewindPreviewEvent {
    pub target_message_id: MessageId,
    pub request_nonce: RequestNonce,
    #[serde(default)]
    pub affected_files: Option<Vec<String>>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewindResultEvent {
    pub target_message_id: MessageId,
    pub request_nonce: RequestNonce,
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

fn parse_item<T: DeserializeOwned>(item: Value) -> Option<T> {
    match serde_json::from_value(item) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!(target: "parley.protocol", "Dropping unparseable snapshot entry: {}", e);
            None
        }
    }
}

fn lenient_items<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(items.into_iter().filter_map(parse_item).collect())
}

fn lenient_item<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .filter(|item| !item.is_null())
        .and_then(parse_item))
}

fn payload<T: DeserializeOwned>(tag: EventTag, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| ProtocolError::InvalidPayload {
        tag: tag.to_string(),
        reason: e.to_string(),
    })
}

impl ProtocolEvent {
    /// Strict parse: every failure is reported as an error.
    pub fn try_from_value(value: Value) -> Result<Self> {
        let raw_tag = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingTag)?
            .to_string();
        let tag = EventTag::from_str(&raw_tag)
            .map_err(|_| ProtocolError::Unrecognized { tag: raw_tag })?;

        let event = match tag {
            EventTag::SessionRuntimeSnapshot => {
                ProtocolEvent::SessionRuntimeSnapshot(payload(tag, value)?)
            }
            EventTag::SessionRuntimeUpdated => {
                ProtocolEvent::SessionRuntimeUpdated(payload(tag, value)?)
            }
            EventTag::AgentMessage => ProtocolEvent::AgentMessage(payload(tag, value)?),
            EventTag::Error => ProtocolEvent::Error(payload(tag, value)?),
            EventTag::PermissionRequest => ProtocolEvent::PermissionRequest(payload(tag, value)?),
            EventTag::PermissionCancelled => {
                ProtocolEvent::PermissionCancelled(payload(tag, value)?)
            }
            EventTag::UserQuestion => ProtocolEvent::UserQuestion(payload(tag, value)?),
            EventTag::SessionSnapshot => ProtocolEvent::SessionSnapshot(payload(tag, value)?),
            EventTag::SessionReplayBatch => {
                let raw: RawReplayBatch = payload(tag, value)?;
                ProtocolEvent::SessionReplayBatch(ReplayBatchEvent {
                    load_request_id: raw.load_request_id,
                    events: raw.events.into_iter().map(Self::from_value).collect(),
                })
            }
            EventTag::MessageStateChanged => {
                ProtocolEvent::MessageStateChanged(payload(tag, value)?)
            }
            EventTag::ToolProgress => ProtocolEvent::ToolProgress(payload(tag, value)?),
            EventTag::ToolUseSummary => ProtocolEvent::ToolUseSummary(payload(tag, value)?),
            EventTag::CompactBoundary => ProtocolEvent::CompactBoundary(payload(tag, value)?),
            EventTag::HookStarted => ProtocolEvent::HookStarted(payload(tag, value)?),
            EventTag::HookResponse => ProtocolEvent::HookResponse(payload(tag, value)?),
            EventTag::TaskNotification => ProtocolEvent::TaskNotification(payload(tag, value)?),
            EventTag::SlashCommands => ProtocolEvent::SlashCommands(payload(tag, value)?),
            EventTag::UserMessageUuid => ProtocolEvent::UserMessageUuid(payload(tag, value)?),
            EventTag::ConfigOptionsUpdate => {
                ProtocolEvent::ConfigOptionsUpdate(payload(tag, value)?)
            }
            EventTag::RewindPreview => ProtocolEvent::RewindPreview(payload(tag, value)?),
            EventTag::RewindResult => ProtocolEvent::RewindResult(payload(tag, value)?),
        };
        Ok(event)
    }

    pub fn try_from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::try_from_value(value)
    }

    /// Total parse: failures become [`ProtocolEvent::Unrecognized`] or
    /// [`ProtocolEvent::Invalid`] so a single bad event never stops the stream.
    pub fn from_value(value: Value) -> Self {
        match Self::try_from_value(value) {
            Ok(event) => event,
            Err(err) => Self::from_error(err),
        }
    }

    pub fn from_json(text: &str) -> Self {
        match Self::try_from_json(text) {
            Ok(event) => event,
            Err(err) => Self::from_error(err),
        }
    }

    fn from_error(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Unrecognized { tag } => {
                tracing::debug!(target: "parley.protocol", "Unrecognized event type: {}", tag);
                ProtocolEvent::Unrecognized { tag }
            }
            ProtocolError::InvalidPayload { tag, reason } => {
                tracing::warn!(target: "parley.protocol", "Invalid {} payload: {}", tag, reason);
                ProtocolEvent::Invalid {
                    tag: Some(tag),
                    reason,
                }
            }
            other @ (ProtocolError::MissingTag | ProtocolError::Json(_)) => {
                tracing::warn!(target: "parley.protocol", "Dropping malformed event: {}", other);
                ProtocolEvent::Invalid {
                    tag: None,
                    reason: other.to_string(),
                }
            }
        }
    }

    pub fn tag(&self) -> Option<EventTag> {
        let tag = match self {
            ProtocolEvent::SessionRuntimeSnapshot(_) => EventTag::SessionRuntimeSnapshot,
            ProtocolEvent::SessionRuntimeUpdated(_) => EventTag::SessionRuntimeUpdated,
            ProtocolEvent::AgentMessage(_) => EventTag::AgentMessage,
            ProtocolEvent::Error(_) => EventTag::Error,
            ProtocolEvent::PermissionRequest(_) => EventTag::PermissionRequest,
            ProtocolEvent::PermissionCancelled(_) => EventTag::PermissionCancelled,
            ProtocolEvent::UserQuestion(_) => EventTag::UserQuestion,
            ProtocolEvent::SessionSnapshot(_) => EventTag::SessionSnapshot,
            ProtocolEvent::SessionReplayBatch(_) => EventTag::SessionReplayBatch,
            ProtocolEvent::MessageStateChanged(_) => EventTag::MessageStateChanged,
            ProtocolEvent::ToolProgress(_) => EventTag::ToolProgress,
            ProtocolEvent::ToolUseSummary(_) => EventTag::ToolUseSummary,
            ProtocolEvent::CompactBoundary(_) => EventTag::CompactBoundary,
            ProtocolEvent::HookStarted(_) => EventTag::HookStarted,
            ProtocolEvent::HookResponse(_) => EventTag::HookResponse,
            ProtocolEvent::TaskNotification(_) => EventTag::TaskNotification,
            ProtocolEvent::SlashCommands(_) => EventTag::SlashCommands,
            ProtocolEvent::UserMessageUuid(_) => EventTag::UserMessageUuid,
            ProtocolEvent::ConfigOptionsUpdate(_) => EventTag::ConfigOptionsUpdate,
            ProtocolEvent::RewindPreview(_) => EventTag::RewindPreview,
            ProtocolEvent::RewindResult(_) => EventTag::RewindResult,
            ProtocolEvent::Unrecognized { .. } | ProtocolEvent::Invalid { .. } => return None,
        };
        Some(tag)
    }

    pub fn is_replay_batch(&self) -> bool {
        matches!(self, ProtocolEvent::SessionReplayBatch(_))
    }
}
