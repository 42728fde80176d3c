//! widget_state - State machine for the chat widget
//!
//! This crate provides the FSM that tracks panel visibility
//! (Closed -> Opening -> Ready) and the single-flight exchange phase
//! (Idle -> Sending -> Streaming -> Idle) of one widget instance.

pub mod machine;

// Re-export commonly used types
pub use machine::{
    ExchangePhase, PanelState, StateMachine, StateTransition, TransitionError, WidgetEvent,
    WidgetState,
};
