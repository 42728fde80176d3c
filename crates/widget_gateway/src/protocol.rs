//! Transport shape of an outbound chat request.

use serde::{Deserialize, Serialize};
use widget_core::{Message, Role};

/// Role names understood by the backend.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportRole {
    User,
    Assistant,
}

impl From<Role> for TransportRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => Self::User,
            // Any non-user speaker is sent as the assistant.
            _ => Self::Assistant,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TransportMessage {
    pub role: TransportRole,
    pub content: String,
}

impl From<&Message> for TransportMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role().into(),
            content: message.text().to_string(),
        }
    }
}

/// Body of `POST {endpoint}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatPayload {
    pub chat_history: Vec<TransportMessage>,
    pub language: String,
}

impl ChatPayload {
    pub fn from_history(history: &[Message], language: &str) -> Self {
        Self {
            chat_history: history.iter().map(TransportMessage::from).collect(),
            language: language.to_string(),
        }
    }
}
