use std::collections::HashMap;

use serde::Serialize;

use crate::error::{EngineError, FlowError, HandlerError};
use crate::event::{classify_user_input, FlowEvent};
use crate::handler::{HandlerOutcome, HandlerSet, SharedHandler, TurnContext};
use crate::session::SessionState;
use crate::state::FlowState;
use crate::transition::{Transition, TransitionGuard};

/// Diagnostic dump of the machine's shape, read-only.
#[derive(Debug, Clone, Serialize)]
pub struct FlowSummary {
    pub total_states: usize,
    pub total_events: usize,
    pub total_transitions: usize,
    pub states: Vec<String>,
    pub events: Vec<String>,
    pub transitions: Vec<TransitionSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransitionSummary {
    pub from: String,
    pub event: String,
    pub to: String,
    pub description: String,
    pub has_handler: bool,
}

/// The conversation state machine. Stateless after construction: concurrent
/// `process_event` calls on *different* sessions need no coordination, and
/// the `&mut SessionState` parameter makes the one-writer-per-session
/// assumption a compile-time property rather than a convention.
pub struct FlowEngine {
    transitions: Vec<Transition>,
    transition_map: HashMap<(FlowState, FlowEvent), usize>,
}

impl FlowEngine {
    /// An engine with no transitions. Use `add_transition` +
    /// `build_transition_map`, or start from `with_handlers`.
    pub fn new() -> Self {
        Self {
            transitions: Vec::new(),
            transition_map: HashMap::new(),
        }
    }

    /// Build the standard conversation table with the supplied handlers.
    pub fn with_handlers(handlers: HandlerSet) -> Self {
        let mut engine = Self::new();
        engine.setup_transitions(handlers);
        engine.build_transition_map();
        engine
    }

    fn setup_transitions(&mut self, handlers: HandlerSet) {
        self.add_transition(
            FlowState::Greeting,
            FlowEvent::SessionStart,
            FlowState::WaitForSymptom,
            Some(handlers.greeting),
            None,
            "initial greeting, then wait for a symptom description",
        );

        self.add_transition(
            FlowState::WaitForSymptom,
            FlowEvent::UserInput,
            FlowState::WaitForConfirmation,
            Some(handlers.symptom),
            None,
            "search the described symptom and report whether a match was found",
        );

        self.add_transition(
            FlowState::WaitForConfirmation,
            FlowEvent::UserInput,
            FlowState::WaitForContext,
            Some(handlers.confirmation),
            None,
            "interpret the yes/no confirmation answer",
        );

        self.add_transition(
            FlowState::WaitForContext,
            FlowEvent::UserInput,
            FlowState::AskForExercise,
            Some(handlers.context_input),
            None,
            "analyze context, deliver the diagnosis, offer an exercise",
        );

        self.add_transition(
            FlowState::AskForExercise,
            FlowEvent::Affirmative,
            FlowState::EndOrRestart,
            Some(handlers.exercise_request),
            None,
            "user wants the exercise, then offer a restart",
        );
        self.add_transition(
            FlowState::AskForExercise,
            FlowEvent::Negative,
            FlowState::FeedbackQ1,
            Some(handlers.exercise_declined),
            None,
            "user declines the exercise, start feedback",
        );

        self.add_transition(
            FlowState::EndOrRestart,
            FlowEvent::Affirmative,
            FlowState::WaitForSymptom,
            Some(handlers.restart_yes),
            None,
            "user wants another behavior, restart the conversation",
        );
        self.add_transition(
            FlowState::EndOrRestart,
            FlowEvent::Negative,
            FlowState::FeedbackQ1,
            Some(handlers.restart_no),
            None,
            "user wants to end, start feedback collection",
        );

        let feedback_chain = [
            (FlowState::FeedbackQ1, FlowState::FeedbackQ2),
            (FlowState::FeedbackQ2, FlowState::FeedbackQ3),
            (FlowState::FeedbackQ3, FlowState::FeedbackQ4),
            (FlowState::FeedbackQ4, FlowState::FeedbackQ5),
        ];
        for (i, (from, to)) in feedback_chain.into_iter().enumerate() {
            self.add_transition(
                from,
                FlowEvent::FeedbackAnswer,
                to,
                Some(handlers.feedback_steps[i].clone()),
                None,
                format!("store the answer for {from}, ask the next question"),
            );
        }

        self.add_transition(
            FlowState::FeedbackQ5,
            FlowEvent::FeedbackComplete,
            FlowState::Greeting,
            Some(handlers.feedback_completion),
            None,
            "store all feedback, thank the user, close the loop",
        );

        // Generated for every state so a restart can never be silently
        // missing from one of them.
        for state in FlowState::ALL {
            self.add_transition(
                state,
                FlowEvent::RestartCommand,
                FlowState::WaitForSymptom,
                Some(handlers.restart_command.clone()),
                None,
                format!("restart command from {state}, new conversation"),
            );
        }
    }

    /// Register one transition. A later registration for the same
    /// `(from_state, event)` pair wins once the map is rebuilt; that is how
    /// setup-time overrides are expressed, not an error.
    pub fn add_transition(
        &mut self,
        from_state: FlowState,
        event: FlowEvent,
        to_state: FlowState,
        handler: Option<SharedHandler>,
        guard: Option<TransitionGuard>,
        description: impl Into<String>,
    ) {
        self.transitions.push(Transition::new(
            from_state,
            event,
            to_state,
            handler,
            guard,
            description,
        ));
    }

    /// Materialize the `(state, event)` lookup. Must be called again after
    /// any `add_transition` past construction.
    pub fn build_transition_map(&mut self) {
        self.transition_map.clear();
        for (index, transition) in self.transitions.iter().enumerate() {
            let key = (transition.from_state, transition.event);
            if self.transition_map.insert(key, index).is_some() {
                tracing::warn!(
                    from = %transition.from_state,
                    event = %transition.event,
                    "duplicate transition registration, later one wins"
                );
            }
        }
    }

    fn lookup(&self, state: FlowState, event: FlowEvent) -> Option<&Transition> {
        self.transition_map
            .get(&(state, event))
            .map(|&index| &self.transitions[index])
    }

    /// All transitions leaving `state`, in registration order.
    pub fn get_valid_transitions(&self, state: FlowState) -> Vec<&Transition> {
        self.transitions
            .iter()
            .filter(|t| t.from_state == state)
            .collect()
    }

    fn valid_events(&self, state: FlowState) -> Vec<FlowEvent> {
        self.get_valid_transitions(state)
            .iter()
            .map(|t| t.event)
            .collect()
    }

    /// True iff the pair is registered and its guard (if any) accepts.
    pub fn can_transition(
        &self,
        state: FlowState,
        event: FlowEvent,
        session: &SessionState,
        input: &str,
        context: &TurnContext,
    ) -> bool {
        match self.lookup(state, event) {
            Some(transition) => transition.guard_allows(session, input, context),
            None => false,
        }
    }

    /// Classify raw user input for the given state. Total, never errors.
    pub fn classify_user_input(&self, text: &str, current_state: FlowState) -> FlowEvent {
        classify_user_input(text, current_state)
    }

    /// Process one event against a session: look up the transition, check
    /// its guard, run the handler, reconcile the outcome, commit the state.
    ///
    /// The context stay sentinel is read *after* the handler's returned
    /// variant is interpreted and overrides it: a handler that returns
    /// `Continue` but signals "not found" stays put. Neither error variant
    /// commits a state change.
    pub async fn process_event(
        &self,
        session: &mut SessionState,
        event: FlowEvent,
        user_input: &str,
        context: &mut TurnContext,
    ) -> Result<(FlowState, Vec<protocol::AgentMessage>), EngineError> {
        let current_state = session.current_state;
        tracing::info!(session_id = %session.session_id, state = %current_state, %event, "processing event");

        let transition = match self.lookup(current_state, event) {
            Some(t) if t.guard_allows(session, user_input, context) => t,
            _ => {
                let valid = self.valid_events(current_state);
                tracing::warn!(
                    state = %current_state,
                    %event,
                    ?valid,
                    "no usable transition"
                );
                return Err(FlowError::unknown_transition(current_state, event, valid).into());
            }
        };

        let outcome = match &transition.handler {
            Some(handler) => {
                handler
                    .handle(session, user_input, context)
                    .await
                    .map_err(|err| match err {
                        HandlerError::Validation(e) => EngineError::Validation(e),
                        HandlerError::Flow(e) => EngineError::Flow(e),
                        HandlerError::Other(e) => {
                            tracing::error!(state = %current_state, error = %e, "transition handler failed");
                            EngineError::Flow(FlowError::new(
                                current_state,
                                format!("transition execution failed: {e}"),
                            ))
                        }
                    })?
            }
            None => HandlerOutcome::Continue(Vec::new()),
        };

        let (resolved, messages) = match outcome {
            HandlerOutcome::Continue(messages) => (transition.to_state, messages),
            HandlerOutcome::Stay(messages) => (current_state, messages),
            HandlerOutcome::Override(state, messages) => {
                tracing::info!(state = %current_state, target = %state, "handler overrode transition target");
                (state, messages)
            }
        };

        // Sentinel check runs after variant dispatch and wins over it.
        let resolved = if context.wants_stay() {
            tracing::info!(state = %current_state, "stay sentinel set, staying in current state");
            current_state
        } else {
            resolved
        };

        session.current_state = resolved;
        tracing::info!(from = %current_state, to = %resolved, "transition committed");
        Ok((resolved, messages))
    }

    /// Structural self-check: flood-fill reachability from the initial
    /// state over unguarded transitions, and flag handler-less entries.
    /// Startup/test tool, not a request-path concern.
    pub fn validate_fsm(&self) -> Vec<String> {
        let mut issues = Vec::new();

        let mut reachable = std::collections::HashSet::from([FlowState::initial()]);
        loop {
            let before = reachable.len();
            for transition in &self.transitions {
                if transition.guard.is_none() && reachable.contains(&transition.from_state) {
                    reachable.insert(transition.to_state);
                }
            }
            if reachable.len() == before {
                break;
            }
        }

        let mut unreachable: Vec<&str> = self
            .transitions
            .iter()
            .flat_map(|t| [t.from_state, t.to_state])
            .filter(|s| !reachable.contains(s))
            .map(|s| s.as_str())
            .collect();
        unreachable.sort_unstable();
        unreachable.dedup();
        if !unreachable.is_empty() {
            issues.push(format!("unreachable states: [{}]", unreachable.join(", ")));
        }

        let missing_handlers = self.transitions.iter().filter(|t| t.handler.is_none()).count();
        if missing_handlers > 0 {
            issues.push(format!("transitions without handlers: {missing_handlers}"));
        }

        issues
    }

    pub fn flow_summary(&self) -> FlowSummary {
        let mut states: Vec<String> = self
            .transitions
            .iter()
            .flat_map(|t| [t.from_state, t.to_state])
            .map(|s| s.as_str().to_string())
            .collect();
        states.sort_unstable();
        states.dedup();

        let mut events: Vec<String> = self
            .transitions
            .iter()
            .map(|t| t.event.as_str().to_string())
            .collect();
        events.sort_unstable();
        events.dedup();

        FlowSummary {
            total_states: states.len(),
            total_events: events.len(),
            total_transitions: self.transitions.len(),
            states,
            events,
            transitions: self
                .transitions
                .iter()
                .map(|t| TransitionSummary {
                    from: t.from_state.as_str().to_string(),
                    event: t.event.as_str().to_string(),
                    to: t.to_state.as_str().to_string(),
                    description: t.description.clone(),
                    has_handler: t.handler.is_some(),
                })
                .collect(),
        }
    }
}

impl Default for FlowEngine {
    fn default() -> Self {
        Self::new()
    }
}
