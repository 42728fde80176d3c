use serde::Serialize;

use crate::message::Message;

/// Read-only snapshot of a widget instance handed to renderers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationState {
    pub messages: Vec<Message>,
    /// True from submission until the reply has been fully revealed or failed.
    pub pending_send: bool,
    pub panel_open: bool,
}

impl ConversationState {
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}
