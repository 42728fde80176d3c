//! ConversationStore - ordered, append-only message history
//!
//! The store is the single mutable resource of a widget instance. It does no
//! I/O; every mutation is announced on a broadcast channel so a renderer can
//! re-read the snapshot.

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::message::{Message, MessageDraft, MessageStatus, Sequence};

const CHANGE_CHANNEL_CAPACITY: usize = 1024;

/// Errors reported by store mutations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Conversation is empty")]
    Empty,

    #[error("Predicate rejected last message {sequence}")]
    PredicateFailed { sequence: Sequence },
}

/// Notification emitted after every mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    /// A message was added at the tail.
    Appended { sequence: Sequence },
    /// The last message's text grew or its status changed.
    Updated { sequence: Sequence, text_len: usize },
    /// The last message was replaced wholesale.
    Replaced { sequence: Sequence },
}

pub struct ConversationStore {
    messages: Mutex<Vec<Message>>,
    changes: broadcast::Sender<StoreChange>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            messages: Mutex::new(Vec::new()),
            changes,
        }
    }

    /// Create a store seeded with an assistant greeting.
    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        let store = Self::new();
        store.append(MessageDraft::assistant(greeting));
        store
    }

    /// Subscribe to mutation notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    /// Add a message at the tail and return its sequence.
    pub fn append(&self, draft: MessageDraft) -> Sequence {
        let sequence = {
            let mut messages = self.messages.lock();
            let sequence = messages.len() as Sequence;
            if draft.status == MessageStatus::Streaming
                && messages.iter().any(Message::is_streaming)
            {
                log::error!(
                    "Appending streaming message {} while another reply is still streaming",
                    sequence
                );
            }
            messages.push(Message::from_draft(draft, sequence));
            sequence
        };
        self.notify(StoreChange::Appended { sequence });
        sequence
    }

    /// Apply `updater` to the last message if `predicate` accepts it.
    ///
    /// A rejected predicate means two writers interleaved; it is logged as a
    /// logic error and the store is left untouched.
    pub fn mutate_last<P, U>(&self, predicate: P, updater: U) -> Result<Sequence, StoreError>
    where
        P: FnOnce(&Message) -> bool,
        U: FnOnce(&mut Message),
    {
        let (sequence, text_len) = {
            let mut messages = self.messages.lock();
            let last = messages.last_mut().ok_or(StoreError::Empty)?;
            let sequence = last.sequence();
            if !predicate(last) {
                log::error!(
                    "mutate_last predicate rejected message {}: concurrent writers on one conversation",
                    sequence
                );
                return Err(StoreError::PredicateFailed { sequence });
            }
            updater(last);
            (sequence, last.text().chars().count())
        };
        self.notify(StoreChange::Updated { sequence, text_len });
        Ok(sequence)
    }

    /// Replace the last message, keeping its sequence.
    pub fn replace_last(&self, draft: MessageDraft) -> Result<Sequence, StoreError> {
        let sequence = {
            let mut messages = self.messages.lock();
            let last = messages.last_mut().ok_or(StoreError::Empty)?;
            let sequence = last.sequence();
            *last = Message::from_draft(draft, sequence);
            sequence
        };
        self.notify(StoreChange::Replaced { sequence });
        Ok(sequence)
    }

    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.lock().clone()
    }

    pub fn last(&self) -> Option<Message> {
        self.messages.lock().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    /// True while some assistant reply is still being revealed.
    pub fn has_streaming(&self) -> bool {
        self.messages.lock().iter().any(Message::is_streaming)
    }

    fn notify(&self, change: StoreChange) {
        // No subscribers is fine; nobody is rendering.
        let _ = self.changes.send(change);
    }
}
