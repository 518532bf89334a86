use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn from_string(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Stable application identifier of a chat message.
    MessageId
);
string_id!(
    /// Identifier of a single tool-use call within an agent turn.
    ToolUseId
);
string_id!(
    /// Identifier of an interactive permission or question prompt.
    RequestId
);
string_id!(
    /// Token matching a snapshot or replay response to the load that asked for it.
    LoadRequestId
);
string_id!(
    /// Token matching a rewind response to the preview/execute request that asked for it.
    RequestNonce
);
string_id!(HookId);
string_id!(TaskId);
string_id!(
    /// Server-side uuid of a committed user message, used as a rewind target.
    MessageUuid
);
string_id!(OptionId);

/// Server-assigned position of a message in the conversation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Order(pub u64);

impl Order {
    pub fn next(self) -> Order {
        Order(self.0 + 1)
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Order {
    fn from(value: u64) -> Self {
        Order(value)
    }
}
