pub mod action;
pub mod classify;
pub mod effect;
pub mod hydration;
pub mod lifecycle;
pub mod message;
pub mod ordering;
pub mod pending_request;
pub mod reduce;
pub mod replay;
pub mod rewind;
pub mod settings;
pub mod state;
pub mod tool_calls;

#[cfg(test)]
mod tests;

pub use action::{Action, SessionSnapshot};
pub use classify::classify;
pub use effect::Effect;
pub use hydration::{Admission, DropReason, HydrationGuard};
pub use lifecycle::{PendingMessageContent, QueuedMessage, RejectedMessageInfo, Transition};
pub use message::{ChatMessage, ContentBlock, MessagePayload, MessageSource, ToolUseBlock};
pub use pending_request::PendingRequest;
pub use reduce::{apply, apply_event_to_state, reduce};
pub use replay::replay;
pub use rewind::RewindPreviewState;
pub use settings::{Capabilities, ChatSettings};
pub use state::{HookRun, HookStatus, SessionState, SessionStatus, TaskNotification};
pub use tool_calls::{ToolProgressInfo, ToolUseIndex};
