//! Message module - Conversation entries
//!
//! A message is created by the store (which assigns its sequence) and is
//! afterwards only mutable while it is a streaming assistant reply.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Position of a message in the conversation history.
pub type Sequence = u64;

/// Who authored a message.
///
/// Within the widget the assistant is labelled `bot`; the gateway maps it
/// to the transport role `assistant`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    #[serde(rename = "bot")]
    Assistant,
}

impl Role {
    pub fn is_assistant(&self) -> bool {
        matches!(self, Self::Assistant)
    }
}

/// Lifecycle of a message's text.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Text is final.
    #[default]
    Complete,
    /// Text is being revealed and may still grow.
    Streaming,
}

/// A single entry of the conversation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Message {
    role: Role,
    text: String,
    sequence: Sequence,
    status: MessageStatus,
    created_at: DateTime<Utc>,
}

impl Message {
    pub(crate) fn from_draft(draft: MessageDraft, sequence: Sequence) -> Self {
        Self {
            role: draft.role,
            text: draft.text,
            sequence,
            status: draft.status,
            created_at: Utc::now(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn sequence(&self) -> Sequence {
        self.sequence
    }

    pub fn status(&self) -> MessageStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// True for an assistant reply that is still being revealed.
    pub fn is_streaming(&self) -> bool {
        self.role.is_assistant() && self.status == MessageStatus::Streaming
    }

    /// Append revealed text. Returns `false` (and leaves the text alone) when
    /// the message is not streaming.
    pub fn append_text(&mut self, chunk: &str) -> bool {
        if !self.is_streaming() {
            return false;
        }
        self.text.push_str(chunk);
        true
    }

    /// Freeze the text. Idempotent.
    pub fn finish_streaming(&mut self) {
        self.status = MessageStatus::Complete;
    }
}

/// A message that has not been assigned a sequence yet.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageDraft {
    pub role: Role,
    pub text: String,
    pub status: MessageStatus,
}

impl MessageDraft {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            status: MessageStatus::Complete,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            status: MessageStatus::Complete,
        }
    }

    /// Empty assistant message that a reveal grows one character at a time.
    pub fn streaming_placeholder() -> Self {
        Self {
            role: Role::Assistant,
            text: String::new(),
            status: MessageStatus::Streaming,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assistant_serializes_with_widget_label() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"bot\"");
        let json = serde_json::to_string(&Role::User).unwrap();
        assert_eq!(json, "\"user\"");
    }

    #[test]
    fn test_append_only_while_streaming() {
        let mut placeholder = Message::from_draft(MessageDraft::streaming_placeholder(), 3);
        assert!(placeholder.append_text("Hi"));
        placeholder.finish_streaming();
        assert!(!placeholder.append_text("!"));
        assert_eq!(placeholder.text(), "Hi");
        assert_eq!(placeholder.sequence(), 3);
    }

    #[test]
    fn test_user_message_is_never_streaming() {
        let mut draft = MessageDraft::user("hello");
        draft.status = MessageStatus::Streaming;
        let mut message = Message::from_draft(draft, 0);
        assert!(!message.is_streaming());
        assert!(!message.append_text(" world"));
    }
}
