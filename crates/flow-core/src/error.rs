use protocol::AgentMessage;
use thiserror::Error;

use crate::event::FlowEvent;
use crate::state::FlowState;

/// Expected, recoverable outcome of bad user input. Never commits a state
/// transition; the caller re-prompts in the same state.
#[derive(Debug, Clone, Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    /// Name of the offending field.
    pub field: &'static str,
    /// The rejected value.
    pub value: String,
    /// Human-readable rule that was violated.
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Anything else that prevents a transition from completing: missing
/// transition, failed guard, handler failure, unexpected result shape.
#[derive(Debug, Clone, Error)]
#[error("flow error in state {state}: {reason}")]
pub struct FlowError {
    /// State before the attempted transition.
    pub state: FlowState,
    pub reason: String,
    /// Events that would have been accepted; populated for unknown
    /// transitions so callers can build a useful re-prompt.
    pub valid_events: Vec<FlowEvent>,
    /// Pre-built fallback messages a handler managed to produce before
    /// failing. Callers show these instead of a generic apology.
    pub fallback_messages: Vec<AgentMessage>,
}

impl FlowError {
    pub fn new(state: FlowState, reason: impl Into<String>) -> Self {
        Self {
            state,
            reason: reason.into(),
            valid_events: Vec::new(),
            fallback_messages: Vec::new(),
        }
    }

    pub fn unknown_transition(state: FlowState, event: FlowEvent, valid_events: Vec<FlowEvent>) -> Self {
        let listed: Vec<&str> = valid_events.iter().map(FlowEvent::as_str).collect();
        Self {
            state,
            reason: format!(
                "invalid transition: {state} + {event}, valid events: [{}]",
                listed.join(", ")
            ),
            valid_events,
            fallback_messages: Vec::new(),
        }
    }

    pub fn with_fallback(mut self, messages: Vec<AgentMessage>) -> Self {
        self.fallback_messages = messages;
        self
    }
}

/// Error surface of `FlowEngine::process_event`. Both variants leave the
/// session state untouched.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Flow(#[from] FlowError),
}

/// What a transition handler may fail with. `Validation` and `Flow` pass
/// through the engine unchanged; anything opaque is wrapped into a
/// `FlowError` carrying the pre-transition state.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Flow(#[from] FlowError),
    #[error("handler failed: {0}")]
    Other(#[from] anyhow::Error),
}
