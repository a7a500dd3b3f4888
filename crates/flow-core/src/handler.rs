use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use protocol::AgentMessage;
use serde_json::Value;

use crate::error::HandlerError;
use crate::session::SessionState;
use crate::state::FlowState;

/// Legacy side-channel signal a handler may leave in the turn context.
/// The engine reads it after the handler returns; the "not found" and
/// "stay" values force a stay outcome over whatever the handler returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextEvent {
    SymptomFound,
    SymptomNotFound,
    StayInState,
}

/// Per-turn scratch state shared between the engine and the handler.
#[derive(Debug, Default)]
pub struct TurnContext {
    pub next_event: Option<NextEvent>,
    pub values: HashMap<String, Value>,
}

impl TurnContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal(&mut self, event: NextEvent) {
        self.next_event = Some(event);
    }

    /// True when the sentinel demands staying in the current state.
    pub fn wants_stay(&self) -> bool {
        matches!(
            self.next_event,
            Some(NextEvent::SymptomNotFound) | Some(NextEvent::StayInState)
        )
    }
}

/// How a handler's return value steers the machine.
#[derive(Debug, Clone)]
pub enum HandlerOutcome {
    /// Proceed to the transition's statically declared target state.
    Continue(Vec<AgentMessage>),
    /// Remain in the current state, ignoring the declared target.
    Stay(Vec<AgentMessage>),
    /// Move to a state the handler chose at runtime.
    Override(FlowState, Vec<AgentMessage>),
}

impl HandlerOutcome {
    pub fn messages(&self) -> &[AgentMessage] {
        match self {
            HandlerOutcome::Continue(msgs)
            | HandlerOutcome::Stay(msgs)
            | HandlerOutcome::Override(_, msgs) => msgs,
        }
    }
}

pub type HandlerResult = Result<HandlerOutcome, HandlerError>;

/// Business logic bound to one transition. The engine knows nothing about
/// what a handler does, only how to interpret its outcome.
#[async_trait]
pub trait TransitionHandler: Send + Sync {
    async fn handle(
        &self,
        session: &mut SessionState,
        user_input: &str,
        context: &mut TurnContext,
    ) -> HandlerResult;
}

pub type SharedHandler = Arc<dyn TransitionHandler>;

/// The full set of handlers the standard transition table needs, supplied
/// at engine construction so the core stays free of agent/service types.
#[derive(Clone)]
pub struct HandlerSet {
    pub greeting: SharedHandler,
    pub symptom: SharedHandler,
    pub confirmation: SharedHandler,
    pub context_input: SharedHandler,
    pub exercise_request: SharedHandler,
    pub exercise_declined: SharedHandler,
    pub restart_yes: SharedHandler,
    pub restart_no: SharedHandler,
    /// One handler per feedback hand-off Q1→Q2 … Q4→Q5, in order.
    pub feedback_steps: [SharedHandler; 4],
    pub feedback_completion: SharedHandler,
    pub restart_command: SharedHandler,
}
