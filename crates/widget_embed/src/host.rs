//! HostPage - what the widget needs from the embedding document
//!
//! A browser binding implements this over the DOM (shadow root for the
//! isolation boundary, `window` globals, the loading script tag). The
//! bootstrap only talks to the page through this trait.

use std::sync::Arc;

use serde_json::Value;

use crate::error::EmbedError;

/// User interaction forwarded from the widget's subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomEvent {
    LauncherClicked,
    CloseClicked,
    InputChanged(String),
    FormSubmitted,
}

pub type DomListener = Arc<dyn Fn(DomEvent) + Send + Sync>;
pub type GlobalFunction = Arc<dyn Fn() + Send + Sync>;
pub type ReadyCallback = Box<dyn FnOnce() + Send>;

/// Result of claiming the widget root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootClaim {
    /// The root now carries the mount marker and belongs to the caller.
    Claimed,
    /// A marked root already exists; someone else mounted.
    AlreadyMounted,
}

/// Where widget styles end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleTarget {
    /// Inside the isolation boundary; host CSS cannot reach in, widget CSS cannot leak out.
    Boundary,
    /// The page has no boundary support; styles go to the document and must be scoped.
    Document,
}

pub trait HostPage: Send + Sync {
    /// Atomically find or create the element `id` and set `marker` on it,
    /// unless it already carries the marker.
    fn claim_root(&self, id: &str, marker: &str) -> Result<RootClaim, EmbedError>;

    /// Remove `marker` and everything the widget attached under `id`.
    fn release_root(&self, id: &str, marker: &str);

    /// Attach the isolation boundary to the root (once).
    fn attach_boundary(&self, root_id: &str) -> Result<StyleTarget, EmbedError>;

    fn inject_style(&self, root_id: &str, target: StyleTarget, css: &str)
        -> Result<(), EmbedError>;

    fn bind_listener(&self, root_id: &str, listener: DomListener) -> Result<(), EmbedError>;

    /// The page's global configuration object, if set.
    fn global_config(&self) -> Option<Value>;

    /// Value of `name` on the script tag that loaded the widget.
    fn script_attribute(&self, name: &str) -> Option<String>;

    /// Publish a callable under a global name, replacing any previous one.
    fn expose_function(&self, name: &str, function: GlobalFunction);

    /// Run `callback` once the document is ready (immediately if it already is).
    fn on_ready(&self, callback: ReadyCallback);
}
