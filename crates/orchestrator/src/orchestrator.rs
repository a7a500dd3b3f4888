use std::sync::Arc;

use agents::prompts::dog;
use agents::{Agent, AgentContext, MessageIntent};
use flow_core::{EngineError, FlowEngine, FlowEvent, SessionStore};
use protocol::{AgentMessage, MessageKind, SENDER_DOG};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::handlers::{handler_set, FlowHandlers};
use crate::validation;

/// Read-only snapshot of one session for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub current_state: String,
    pub active_symptom: String,
    pub message_count: usize,
    pub feedback_collected: usize,
    pub valid_events: Vec<String>,
}

/// Drives conversations end to end: classify input, process the event,
/// keep the transcript, recover from turn-scoped errors.
///
/// The session store sits behind one async mutex, so turns are serialized
/// and at most one `process_event` call is in flight per session, the
/// single-writer assumption the engine documents.
pub struct Orchestrator {
    engine: FlowEngine,
    dog: Arc<dyn Agent>,
    sessions: Mutex<SessionStore>,
}

impl Orchestrator {
    pub fn new(handlers: Arc<FlowHandlers>) -> Self {
        let dog = handlers.dog();
        let engine = FlowEngine::with_handlers(handler_set(handlers));
        Self {
            engine,
            dog,
            sessions: Mutex::new(SessionStore::new()),
        }
    }

    pub fn engine(&self) -> &FlowEngine {
        &self.engine
    }

    /// Start (or restart) a conversation: fire the session-start event and
    /// return the greeting messages.
    pub async fn start_conversation(&self, session_id: &str) -> Vec<AgentMessage> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_or_create(session_id);
        session.current_state = flow_core::FlowState::initial();

        let mut context = flow_core::TurnContext::new();
        match self
            .engine
            .process_event(session, FlowEvent::SessionStart, "", &mut context)
            .await
        {
            Ok((_, messages)) => {
                for message in &messages {
                    session.record_message(message.clone());
                }
                messages
            }
            Err(err) => {
                tracing::error!(error = %err, "starting conversation failed");
                vec![AgentMessage::new(SENDER_DOG, dog::TECHNICAL_ERROR, MessageKind::Error)]
            }
        }
    }

    /// One user turn. Never fails: both error kinds resolve to re-prompt
    /// messages and leave the session state where it was.
    pub async fn handle_message(&self, session_id: &str, user_input: &str) -> Vec<AgentMessage> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_or_create(session_id);

        let trimmed = user_input.trim();
        if !trimmed.is_empty() {
            session.record_message(AgentMessage::user(trimmed));
        }

        let current_state = session.current_state;
        let event = self.engine.classify_user_input(trimmed, current_state);
        tracing::info!(session_id, state = %current_state, %event, "classified input");

        let mut context = flow_core::TurnContext::new();
        let result = self
            .engine
            .process_event(session, event, trimmed, &mut context)
            .await;

        let messages = match result {
            Ok((new_state, messages)) => {
                tracing::info!(from = %current_state, to = %new_state, "turn complete");
                messages
            }
            Err(EngineError::Validation(err)) => {
                tracing::info!(field = err.field, reason = %err.reason, "validation failed, re-prompting");
                let kind = validation::error_kind(&err);
                self.error_messages(session_id, MessageIntent::Error(kind)).await
            }
            Err(EngineError::Flow(err)) => {
                tracing::warn!(state = %err.state, reason = %err.reason, "flow error");
                if err.fallback_messages.is_empty() {
                    vec![AgentMessage::new(SENDER_DOG, dog::NOT_UNDERSTOOD, MessageKind::Error)]
                } else {
                    err.fallback_messages
                }
            }
        };

        for message in &messages {
            session.record_message(message.clone());
        }
        messages
    }

    pub async fn session_info(&self, session_id: &str) -> Option<SessionInfo> {
        let sessions = self.sessions.lock().await;
        sessions.get(session_id).map(|session| SessionInfo {
            session_id: session.session_id.clone(),
            current_state: session.current_state.to_string(),
            active_symptom: session.active_symptom.clone(),
            message_count: session.message_history.len(),
            feedback_collected: session.feedback_answers.len(),
            valid_events: self
                .engine
                .get_valid_transitions(session.current_state)
                .iter()
                .map(|t| t.event.to_string())
                .collect(),
        })
    }

    pub async fn remove_session(&self, session_id: &str) -> bool {
        self.sessions.lock().await.remove(session_id).is_some()
    }

    async fn error_messages(&self, session_id: &str, intent: MessageIntent) -> Vec<AgentMessage> {
        let context = AgentContext::new(session_id, intent);
        match self.dog.respond(&context).await {
            Ok(messages) => messages,
            Err(err) => {
                tracing::error!(error = %err, "error formatting failed");
                vec![AgentMessage::new(SENDER_DOG, dog::GENERAL_ERROR, MessageKind::Error)]
            }
        }
    }
}
