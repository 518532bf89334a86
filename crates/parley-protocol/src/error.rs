use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProtocolError>;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Event is missing a string `type` field")]
    MissingTag,

    #[error("Unrecognized event type: {tag}")]
    Unrecognized { tag: String },

    #[error("Invalid `{tag}` payload: {reason}")]
    InvalidPayload { tag: String, reason: String },
}
