use parley_protocol::{MessageId, OutboundMessage, RequestId};

/// Side effects the reducer asks its owner to carry out.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Hand a message to the transport.
    Send(OutboundMessage),
    /// The server refused a send; its draft is in `last_rejected_message`.
    DraftRejected { message_id: MessageId },
    /// A permission or question prompt now awaits the user.
    InteractiveRequest { request_id: RequestId },
}
