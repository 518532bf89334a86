use std::collections::{HashMap, VecDeque};

use indexmap::IndexMap;
use parley_protocol::{
    HookId, MessageId, MessageUuid, RuntimeInfo, SessionPhase, SlashCommand, TaskId,
};

use crate::domain::hydration::HydrationGuard;
use crate::domain::lifecycle::{PendingMessageContent, QueuedMessage, RejectedMessageInfo};
use crate::domain::message::ChatMessage;
use crate::domain::pending_request::PendingRequest;
use crate::domain::rewind::RewindPreviewState;
use crate::domain::settings::{Capabilities, ChatSettings};
use crate::domain::tool_calls::{ToolProgressMap, ToolUseIndex};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionStatus {
    pub phase: SessionPhase,
    pub model: Option<String>,
    pub cwd: Option<String>,
}

impl SessionStatus {
    pub fn is_loading(&self) -> bool {
        self.phase == SessionPhase::Loading
    }

    pub fn finish_loading(&mut self) {
        if self.is_loading() {
            tracing::debug!(target: "parley.hydration", "Loading finished");
            self.phase = SessionPhase::Ready;
        }
    }
}

impl From<RuntimeInfo> for SessionStatus {
    fn from(runtime: RuntimeInfo) -> Self {
        Self {
            phase: runtime.phase,
            model: runtime.model,
            cwd: runtime.cwd,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookRun {
    pub hook_id: HookId,
    pub name: String,
    pub event: String,
    pub status: HookStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookStatus {
    Running,
    Finished {
        exit_code: Option<i32>,
        output: Option<String>,
        outcome: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskNotification {
    pub task_id: TaskId,
    pub status: String,
    pub summary: Option<String>,
}

/// Everything the UI reads about one session.
///
/// Owned by the reducer. Contains no clocks or random sources, so the same
/// actions always produce the same state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionState {
    pub status: SessionStatus,
    /// Sorted ascending by `order`.
    pub messages: Vec<ChatMessage>,
    pub tool_use_index: ToolUseIndex,
    pub tool_progress: ToolProgressMap,
    pub last_tool_summary: Option<String>,
    pub pending_request: PendingRequest,
    pub hydration: HydrationGuard,

    pub queued_messages: IndexMap<MessageId, QueuedMessage>,
    pub pending_messages: IndexMap<MessageId, PendingMessageContent>,
    pub last_rejected_message: Option<RejectedMessageInfo>,
    pub message_uuids: HashMap<MessageId, MessageUuid>,
    /// Uuids reported before the message they belong to was accepted.
    pub pending_uuids: VecDeque<MessageUuid>,
    pub rewind: Option<RewindPreviewState>,

    pub hooks: IndexMap<HookId, HookRun>,
    pub task_notifications: IndexMap<TaskId, TaskNotification>,
    pub slash_commands: Vec<SlashCommand>,

    pub settings: ChatSettings,
    pub capabilities: Capabilities,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(settings: ChatSettings, capabilities: Capabilities) -> Self {
        let mut settings = settings;
        settings.clamp(&capabilities);
        Self {
            settings,
            capabilities,
            ..Self::default()
        }
    }

    pub fn message(&self, id: &MessageId) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| &m.id == id)
    }

    pub fn uuid_for(&self, id: &MessageId) -> Option<&MessageUuid> {
        self.message_uuids.get(id)
    }
}
