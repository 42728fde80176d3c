//! Widget events - Defines events that trigger state transitions

use serde::{Deserialize, Serialize};

/// Defines the events that can trigger state transitions in the FSM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetEvent {
    // ========== Panel Events ==========
    /// The launcher was activated while the panel was closed.
    Open,

    /// The cosmetic loading placeholder finished.
    LoadingElapsed,

    /// The panel was closed (close button, launcher toggle, or host).
    Close,

    /// The widget is being torn down.
    Unmount,

    // ========== Exchange Events ==========
    /// The user submitted non-empty input.
    Submit,

    /// The gateway returned a reply.
    GatewaySucceeded,

    /// The gateway failed; the apology has been appended.
    GatewayFailed,

    /// The reveal finished or was cancelled.
    RevealFinished,
}

impl WidgetEvent {
    /// Check if this event is user-initiated.
    pub fn is_user_event(&self) -> bool {
        matches!(self, Self::Open | Self::Close | Self::Submit)
    }

    /// Check if this event concerns the outbound exchange.
    pub fn is_exchange_event(&self) -> bool {
        matches!(
            self,
            Self::Submit | Self::GatewaySucceeded | Self::GatewayFailed | Self::RevealFinished
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::LoadingElapsed => "loading_elapsed",
            Self::Close => "close",
            Self::Unmount => "unmount",
            Self::Submit => "submit",
            Self::GatewaySucceeded => "gateway_succeeded",
            Self::GatewayFailed => "gateway_failed",
            Self::RevealFinished => "reveal_finished",
        }
    }
}
