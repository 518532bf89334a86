use parley_protocol::{
    Attachment, ConfigOptions, HookId, LoadRequestId, MessageId, MessageUuid, OptionId, Order,
    PermissionRequest, ProtocolEvent, QuestionAnswer, QuestionRequest, RequestId, RequestNonce,
    RuntimeInfo, SlashCommand, ToolLocation, ToolUseId, WireUserMessage,
};

use crate::domain::lifecycle::{QueuedMessage, Transition};
use crate::domain::message::ChatMessage;
use crate::domain::pending_request::PendingRequest;
use crate::domain::state::TaskNotification;

/// Full session view carried by a `session_snapshot` event.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub messages: Vec<ChatMessage>,
    pub queue: Vec<QueuedMessage>,
    pub pending_request: PendingRequest,
    pub runtime: Option<RuntimeInfo>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    RuntimeSnapshot {
        runtime: RuntimeInfo,
    },
    RuntimeUpdated {
        runtime: RuntimeInfo,
    },

    AgentMessageReceived {
        message: ChatMessage,
        /// Server uuid carried by user payloads.
        uuid: Option<MessageUuid>,
    },
    ToolUseStarted {
        order: Order,
        message_id: Option<MessageId>,
        tool_use_id: ToolUseId,
        name: String,
        timestamp: u64,
    },
    ToolInputDelta {
        tool_use_id: ToolUseId,
        fragment: String,
    },
    ThinkingDelta {
        order: Order,
        message_id: Option<MessageId>,
        index: u32,
        text: String,
        timestamp: u64,
    },
    TurnFinished {
        is_error: bool,
    },
    SessionError {
        message: String,
        timestamp: u64,
    },

    PermissionRequested {
        request: PermissionRequest,
    },
    PermissionCancelled {
        request_id: RequestId,
    },
    QuestionAsked {
        request: QuestionRequest,
    },

    SnapshotReceived {
        load_request_id: Option<LoadRequestId>,
        snapshot: SessionSnapshot,
    },
    ReplayBatchReceived {
        load_request_id: Option<LoadRequestId>,
        events: Vec<ProtocolEvent>,
    },

    MessageStateChanged {
        message_id: MessageId,
        transition: Transition,
        user_message: Option<WireUserMessage>,
        error_message: Option<String>,
    },

    ToolProgress {
        tool_use_id: ToolUseId,
        elapsed_seconds: f64,
        locations: Option<Vec<ToolLocation>>,
        kind: Option<String>,
    },
    ToolUseSummary {
        summary: String,
        preceding_tool_use_ids: Vec<ToolUseId>,
    },
    CompactBoundary {
        message: ChatMessage,
    },

    HookStarted {
        hook_id: HookId,
        name: String,
        event: String,
    },
    HookFinished {
        hook_id: HookId,
        name: String,
        event: String,
        exit_code: Option<i32>,
        output: Option<String>,
        outcome: Option<String>,
    },
    TaskNotification(TaskNotification),
    SlashCommandsUpdated {
        commands: Vec<SlashCommand>,
    },
    UserMessageUuid {
        uuid: MessageUuid,
        message_id: Option<MessageId>,
    },
    ConfigOptionsUpdated {
        options: ConfigOptions,
    },
    RewindPreviewReceived {
        target_message_id: MessageId,
        request_nonce: RequestNonce,
        affected_files: Option<Vec<String>>,
        error: Option<String>,
    },
    RewindResultReceived {
        target_message_id: MessageId,
        request_nonce: RequestNonce,
        success: bool,
        error: Option<String>,
    },

    // Commands issued by the UI. Ids, nonces and timestamps are generated
    // before the action is built.
    SendMessage {
        message_id: MessageId,
        text: String,
        attachments: Vec<Attachment>,
        timestamp: u64,
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
    LoadSession {
        load_request_id: LoadRequestId,
    },
    RequestRewindPreview {
        target_message_id: MessageId,
        request_nonce: RequestNonce,
    },
    ExecuteRewind {
        target_message_id: MessageId,
        request_nonce: RequestNonce,
    },
    DismissRewind,
    UpdateSettings {
        options: ConfigOptions,
    },
    ClearRejectedMessage,
}

impl Action {
    pub fn is_command(&self) -> bool {
        matches!(
            self,
            Action::SendMessage { .. }
                | Action::RespondPermission { .. }
                | Action::RespondQuestion { .. }
                | Action::Stop
                | Action::LoadSession { .. }
                | Action::RequestRewindPreview { .. }
                | Action::ExecuteRewind { .. }
                | Action::DismissRewind
                | Action::UpdateSettings { .. }
                | Action::ClearRejectedMessage
        )
    }
}
