use std::time::Duration;

use crate::reveal::RevealPacing;

pub const DEFAULT_GREETING: &str = "Hello 👋 I'm the store assistant. I can help with product information, \
troubleshooting, or store setup. Tell me briefly what you need and I'll give you a clear, actionable answer.";

/// How long the panel shows its loading placeholder after opening.
pub const DEFAULT_LOADING_DELAY: Duration = Duration::from_millis(400);

/// Delay between the panel becoming ready and the input being focused.
pub const DEFAULT_FOCUS_DELAY: Duration = Duration::from_millis(180);

/// Configuration for a widget controller.
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Assistant message seeded into every new conversation.
    pub greeting: String,
    pub loading_delay: Duration,
    pub focus_delay: Duration,
    pub pacing: RevealPacing,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            greeting: DEFAULT_GREETING.to_string(),
            loading_delay: DEFAULT_LOADING_DELAY,
            focus_delay: DEFAULT_FOCUS_DELAY,
            pacing: RevealPacing::default(),
        }
    }
}
