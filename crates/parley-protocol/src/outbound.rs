use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ids::{LoadRequestId, MessageId, MessageUuid, OptionId, RequestId, RequestNonce};
use crate::types::{Attachment, ConfigOptions};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAnswer {
    pub question: String,
    #[serde(default)]
    pub selected: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other: Option<String>,
}

/// Messages the transport sends to the server on behalf of the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum OutboundMessage {
    UserMessage {
        message_id: MessageId,
        text: String,
        attachments: Vec<Attachment>,
    },
    PermissionResponse {
        request_id: RequestId,
        approved: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        option_id: Option<OptionId>,
    },
    QuestionResponse {
        request_id: RequestId,
        answers: Vec<QuestionAnswer>,
    },
    Stop,
    LoadSession {
        load_request_id: LoadRequestId,
    },
    RewindPreview {
        target_message_id: MessageId,
        target_uuid: MessageUuid,
        request_nonce: RequestNonce,
    },
    RewindExecute {
        target_message_id: MessageId,
        target_uuid: MessageUuid,
        request_nonce: RequestNonce,
    },
    SetConfigOptions {
        options: ConfigOptions,
    },
}

impl OutboundMessage {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}
