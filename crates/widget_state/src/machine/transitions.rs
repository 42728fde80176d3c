//! State transitions - FSM transition logic
//!
//! Implements the state machine that handles event-driven state transitions.

use thiserror::Error;

use super::events::WidgetEvent;
use super::states::{ExchangePhase, PanelState, WidgetState};

/// Error type for invalid state transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Invalid transition from {from:?} with event {event}")]
    InvalidTransition { from: WidgetState, event: String },
}

/// Represents a state transition result.
#[derive(Debug, Clone)]
pub struct StateTransition {
    /// The state before the transition.
    pub from: WidgetState,
    /// The state after the transition.
    pub to: WidgetState,
    /// The event that triggered the transition.
    pub event: WidgetEvent,
    /// Whether the state actually changed.
    pub changed: bool,
}

/// State machine for managing widget state transitions.
#[derive(Debug, Clone)]
pub struct StateMachine {
    /// Current state.
    current_state: WidgetState,
    /// Transition history (limited).
    history: Vec<StateTransition>,
    /// Max history entries to keep.
    max_history: usize,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    /// Create a new state machine with the panel closed and no exchange.
    pub fn new() -> Self {
        Self::with_state(WidgetState::default())
    }

    /// Create a state machine with a specific initial state.
    pub fn with_state(state: WidgetState) -> Self {
        Self {
            current_state: state,
            history: Vec::new(),
            max_history: 50,
        }
    }

    /// Get the current state.
    pub fn state(&self) -> &WidgetState {
        &self.current_state
    }

    /// Get the transition history.
    pub fn history(&self) -> &[StateTransition] {
        &self.history
    }

    /// Handle an event and transition to a new state.
    ///
    /// Events that do not apply to the current state leave it unchanged.
    pub fn handle_event(&mut self, event: WidgetEvent) -> StateTransition {
        let old_state = self.current_state;
        let new_state = Self::compute_next_state(&old_state, &event);
        let changed = old_state != new_state;

        self.current_state = new_state;

        if changed {
            tracing::debug!(
                event = event.name(),
                from = ?old_state,
                to = ?new_state,
                "widget state transition"
            );
        }

        let transition = StateTransition {
            from: old_state,
            to: new_state,
            event,
            changed,
        };

        // Add to history
        self.history.push(transition.clone());
        if self.history.len() > self.max_history {
            self.history.remove(0);
        }

        transition
    }

    /// Handle an event that must change the state, rejecting it otherwise.
    ///
    /// A rejected event is not recorded in the history.
    pub fn try_handle_event(
        &mut self,
        event: WidgetEvent,
    ) -> Result<StateTransition, TransitionError> {
        if !self.can_transition(&event) {
            return Err(TransitionError::InvalidTransition {
                from: self.current_state,
                event: event.name().to_string(),
            });
        }
        Ok(self.handle_event(event))
    }

    /// Compute the next state given current state and event.
    fn compute_next_state(state: &WidgetState, event: &WidgetEvent) -> WidgetState {
        use ExchangePhase::*;
        use PanelState::*;
        use WidgetEvent::*;

        let WidgetState { panel, exchange } = *state;

        match (panel, exchange, event) {
            // ========== Panel ==========
            (Closed, _, Open) => WidgetState::new(Opening, exchange),
            (Opening, _, LoadingElapsed) => WidgetState::new(Ready, exchange),
            (_, _, Close) | (_, _, Unmount) => WidgetState::new(Closed, exchange),

            // ========== Exchange (single-flight) ==========
            (Ready, Idle, Submit) => WidgetState::new(panel, Sending),
            (_, Sending, GatewaySucceeded) => WidgetState::new(panel, Streaming),
            (_, Sending, GatewayFailed) => WidgetState::new(panel, Idle),
            (_, Streaming, RevealFinished) => WidgetState::new(panel, Idle),

            // ========== Default: No transition ==========
            _ => *state,
        }
    }

    /// Check if a transition is valid without executing it.
    pub fn can_transition(&self, event: &WidgetEvent) -> bool {
        let next = Self::compute_next_state(&self.current_state, event);
        next != self.current_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_machine() -> StateMachine {
        StateMachine::with_state(WidgetState::new(PanelState::Ready, ExchangePhase::Idle))
    }

    #[test]
    fn test_open_flow() {
        let mut sm = StateMachine::new();
        assert_eq!(sm.state().panel, PanelState::Closed);

        let t1 = sm.handle_event(WidgetEvent::Open);
        assert!(t1.changed);
        assert_eq!(sm.state().panel, PanelState::Opening);

        let t2 = sm.handle_event(WidgetEvent::LoadingElapsed);
        assert!(t2.changed);
        assert_eq!(sm.state().panel, PanelState::Ready);
    }

    #[test]
    fn test_exchange_success_flow() {
        let mut sm = ready_machine();

        sm.try_handle_event(WidgetEvent::Submit).unwrap();
        assert_eq!(sm.state().exchange, ExchangePhase::Sending);

        sm.try_handle_event(WidgetEvent::GatewaySucceeded).unwrap();
        assert_eq!(sm.state().exchange, ExchangePhase::Streaming);

        sm.try_handle_event(WidgetEvent::RevealFinished).unwrap();
        assert_eq!(sm.state().exchange, ExchangePhase::Idle);
    }

    #[test]
    fn test_gateway_failure_returns_to_idle() {
        let mut sm = ready_machine();
        sm.handle_event(WidgetEvent::Submit);
        sm.handle_event(WidgetEvent::GatewayFailed);
        assert_eq!(*sm.state(), WidgetState::new(PanelState::Ready, ExchangePhase::Idle));
    }

    #[test]
    fn test_second_submit_is_rejected() {
        let mut sm = ready_machine();
        sm.try_handle_event(WidgetEvent::Submit).unwrap();

        let err = sm.try_handle_event(WidgetEvent::Submit).unwrap_err();
        assert_eq!(
            err,
            TransitionError::InvalidTransition {
                from: WidgetState::new(PanelState::Ready, ExchangePhase::Sending),
                event: "submit".to_string(),
            }
        );
        assert_eq!(sm.history().len(), 1);
    }

    #[test]
    fn test_submit_rejected_while_opening() {
        let mut sm = StateMachine::new();
        sm.handle_event(WidgetEvent::Open);
        assert!(!sm.can_transition(&WidgetEvent::Submit));
    }

    #[test]
    fn test_close_keeps_exchange_running() {
        let mut sm = ready_machine();
        sm.handle_event(WidgetEvent::Submit);
        sm.handle_event(WidgetEvent::Close);
        assert_eq!(
            *sm.state(),
            WidgetState::new(PanelState::Closed, ExchangePhase::Sending)
        );

        sm.handle_event(WidgetEvent::GatewaySucceeded);
        sm.handle_event(WidgetEvent::RevealFinished);
        assert_eq!(*sm.state(), WidgetState::default());
    }

    #[test]
    fn test_reopen_during_exchange_still_blocks_submit() {
        let mut sm = ready_machine();
        sm.handle_event(WidgetEvent::Submit);
        sm.handle_event(WidgetEvent::Close);
        sm.handle_event(WidgetEvent::Open);
        sm.handle_event(WidgetEvent::LoadingElapsed);
        assert_eq!(sm.state().panel, PanelState::Ready);
        assert!(!sm.can_transition(&WidgetEvent::Submit));
    }

    #[test]
    fn test_history_is_bounded() {
        let mut sm = StateMachine::new();
        for _ in 0..40 {
            sm.handle_event(WidgetEvent::Open);
            sm.handle_event(WidgetEvent::Close);
        }
        assert_eq!(sm.history().len(), 50);
    }
}
