//! Widget states - Panel visibility and exchange phase
//!
//! The two are independent: closing the panel does not interrupt an
//! exchange, which completes invisibly.

use serde::{Deserialize, Serialize};

/// Visibility of the chat surface.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PanelState {
    /// Only the launcher is shown.
    #[default]
    Closed,

    /// The panel is showing its loading placeholder.
    Opening,

    /// The panel is interactive.
    Ready,
}

/// Progress of the single outbound exchange.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExchangePhase {
    /// No exchange in flight; a submit may be accepted.
    #[default]
    Idle,

    /// Waiting for the gateway.
    Sending,

    /// Revealing the reply into the placeholder.
    Streaming,
}

/// Combined state of one widget instance.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct WidgetState {
    pub panel: PanelState,
    pub exchange: ExchangePhase,
}

impl WidgetState {
    pub fn new(panel: PanelState, exchange: ExchangePhase) -> Self {
        Self { panel, exchange }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.panel, PanelState::Closed)
    }

    /// True between submission and the end of the reveal (or a failure).
    pub fn is_pending(&self) -> bool {
        !matches!(self.exchange, ExchangePhase::Idle)
    }

    /// Check if this state allows a new submission.
    pub fn accepts_user_input(&self) -> bool {
        self.panel == PanelState::Ready && self.exchange == ExchangePhase::Idle
    }

    /// Get a human-readable description of the current state.
    pub fn description(&self) -> &str {
        match (self.panel, self.exchange) {
            (PanelState::Closed, ExchangePhase::Idle) => "Closed",
            (PanelState::Opening, _) => "Loading",
            (_, ExchangePhase::Sending) => "Assistant is typing",
            (_, ExchangePhase::Streaming) => "Receiving reply",
            (PanelState::Ready, ExchangePhase::Idle) => "Ready for input",
        }
    }
}
