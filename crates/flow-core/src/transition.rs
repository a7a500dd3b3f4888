use std::fmt;
use std::sync::Arc;

use crate::event::FlowEvent;
use crate::handler::{SharedHandler, TurnContext};
use crate::session::SessionState;
use crate::state::FlowState;

/// Predicate that must hold for a transition to be taken.
pub type TransitionGuard = Arc<dyn Fn(&SessionState, &str, &TurnContext) -> bool + Send + Sync>;

/// One entry of the transition table, immutable once registered.
#[derive(Clone)]
pub struct Transition {
    pub from_state: FlowState,
    pub event: FlowEvent,
    pub to_state: FlowState,
    pub guard: Option<TransitionGuard>,
    pub handler: Option<SharedHandler>,
    /// Diagnostic string only, never interpreted.
    pub description: String,
}

impl Transition {
    pub fn new(
        from_state: FlowState,
        event: FlowEvent,
        to_state: FlowState,
        handler: Option<SharedHandler>,
        guard: Option<TransitionGuard>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            from_state,
            event,
            to_state,
            guard,
            handler,
            description: description.into(),
        }
    }

    /// True when no guard is present or the guard accepts.
    pub fn guard_allows(&self, session: &SessionState, input: &str, context: &TurnContext) -> bool {
        match &self.guard {
            Some(guard) => guard(session, input, context),
            None => true,
        }
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("from_state", &self.from_state)
            .field("event", &self.event)
            .field("to_state", &self.to_state)
            .field("guard", &self.guard.is_some())
            .field("handler", &self.handler.is_some())
            .field("description", &self.description)
            .finish()
    }
}
