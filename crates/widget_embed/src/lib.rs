//! widget_embed - Mounting the chat widget into a host page
//!
//! - `host` - the HostPage seam between the widget and the embedding document
//! - `memory` - an in-memory HostPage used headlessly and in tests
//! - `styles` - the widget stylesheet and selector scoping
//! - `bootstrap` - EmbedBootstrap, the idempotent single-instance mount

pub mod bootstrap;
pub mod error;
pub mod host;
pub mod memory;
pub mod styles;

pub use bootstrap::{
    EmbedBootstrap, EmbedOptions, InitOutcome, MOUNT_MARKER_ATTRIBUTE, REINIT_FUNCTION_NAME,
    ROOT_ELEMENT_ID,
};
pub use error::EmbedError;
pub use host::{DomEvent, DomListener, GlobalFunction, HostPage, ReadyCallback, RootClaim, StyleTarget};
pub use memory::MemoryPage;
pub use styles::{scope_css, WIDGET_STYLES};
