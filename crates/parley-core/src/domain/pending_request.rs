use parley_protocol::{PermissionRequest, QuestionRequest, RequestId, WirePendingRequest};

/// Tool whose approval ends plan mode.
pub const EXIT_PLAN_MODE_TOOL: &str = "ExitPlanMode";

/// The one interactive prompt the user currently owes an answer to.
///
/// The latest request from the server always wins; there is no queue.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PendingRequest {
    #[default]
    None,
    Permission(PermissionRequest),
    Question(QuestionRequest),
}

impl PendingRequest {
    pub fn request_id(&self) -> Option<&RequestId> {
        match self {
            PendingRequest::None => None,
            PendingRequest::Permission(request) => Some(&request.request_id),
            PendingRequest::Question(request) => Some(&request.request_id),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, PendingRequest::None)
    }

    pub fn set_permission(&mut self, request: PermissionRequest) {
        self.log_replacement(&request.request_id);
        *self = PendingRequest::Permission(request);
    }

    pub fn set_question(&mut self, request: QuestionRequest) {
        self.log_replacement(&request.request_id);
        *self = PendingRequest::Question(request);
    }

    /// Clear whatever is pending and hand it back to the caller.
    pub fn respond(&mut self) -> PendingRequest {
        std::mem::take(self)
    }

    /// Returns true when the pending request had `request_id` and was cleared.
    pub fn cancel_if_matches(&mut self, request_id: &RequestId) -> bool {
        if self.request_id() == Some(request_id) {
            *self = PendingRequest::None;
            true
        } else {
            tracing::debug!(
                target: "parley.pending_request",
                "Ignoring cancellation for {} (pending: {:?})",
                request_id,
                self.request_id().map(RequestId::as_str)
            );
            false
        }
    }

    pub fn is_exit_plan_mode(&self) -> bool {
        matches!(
            self,
            PendingRequest::Permission(request) if request.tool_name == EXIT_PLAN_MODE_TOOL
        )
    }

    fn log_replacement(&self, incoming: &RequestId) {
        if let Some(previous) = self.request_id() {
            tracing::debug!(
                target: "parley.pending_request",
                "Request {} replaces pending {}",
                incoming,
                previous
            );
        }
    }
}

impl From<WirePendingRequest> for PendingRequest {
    fn from(wire: WirePendingRequest) -> Self {
        match wire {
            WirePendingRequest::Permission(request) => PendingRequest::Permission(request),
            WirePendingRequest::Question(request) => PendingRequest::Question(request),
        }
    }
}

impl From<Option<WirePendingRequest>> for PendingRequest {
    fn from(wire: Option<WirePendingRequest>) -> Self {
        wire.map_or(PendingRequest::None, PendingRequest::from)
    }
}
