//! widget_core - Core types for the embeddable chat widget
//!
//! This crate provides the foundational types shared by every widget crate:
//! - `message` - Message, Role and the draft used to append new entries
//! - `store` - ConversationStore, the single mutable conversation resource
//! - `config` - WidgetConfig and the host page's global configuration object
//! - `view` - ConversationState, the read-only snapshot handed to renderers

pub mod config;
pub mod message;
pub mod store;
pub mod view;

// Re-export commonly used types
pub use config::{
    GlobalWidgetConfig, WidgetConfig, DEFAULT_LANGUAGE_TAG,
    GLOBAL_CONFIG_NAME, SCRIPT_ENDPOINT_ATTRIBUTE,
};
pub use message::{Message, MessageDraft, MessageStatus, Role, Sequence};
pub use store::{ConversationStore, StoreChange, StoreError};
pub use view::ConversationState;
