use std::collections::HashMap;

use protocol::AgentMessage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::FlowState;

/// Feedback answers are capped at one per feedback question.
pub const MAX_FEEDBACK_ANSWERS: usize = 5;

/// Mutable record of one conversation's progress.
///
/// Owned by the caller that holds its id; the engine mutates it in place and
/// never replaces it. `current_state` is written only by the engine;
/// handlers influence it exclusively through their returned outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    /// Stable identifier, immutable after creation.
    pub session_id: String,
    pub current_state: FlowState,
    /// Behavior under discussion; cleared on restart.
    pub active_symptom: String,
    /// One entry per answered feedback question, in order.
    pub feedback_answers: Vec<String>,
    /// Similarity score of the last symptom match, diagnostics only.
    pub match_distance: Option<f64>,
    /// Append-only transcript. Never read by the engine.
    pub message_history: Vec<AgentMessage>,
}

impl SessionState {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            current_state: FlowState::initial(),
            active_symptom: String::new(),
            feedback_answers: Vec::new(),
            match_distance: None,
            message_history: Vec::new(),
        }
    }

    pub fn generate() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    pub fn record_message(&mut self, message: AgentMessage) {
        self.message_history.push(message);
    }

    /// Append a feedback answer, holding the at-most-5 invariant.
    pub fn push_feedback(&mut self, answer: impl Into<String>) {
        if self.feedback_answers.len() >= MAX_FEEDBACK_ANSWERS {
            tracing::warn!(
                session_id = %self.session_id,
                "dropping feedback answer beyond question {MAX_FEEDBACK_ANSWERS}"
            );
            return;
        }
        self.feedback_answers.push(answer.into().trim().to_string());
    }

    /// Clear the per-conversation content fields. The restart handler calls
    /// this; the state field itself stays under engine control.
    pub fn reset_conversation(&mut self) {
        self.active_symptom.clear();
        self.feedback_answers.clear();
        self.match_distance = None;
    }
}

/// Explicit in-memory session table, injected where needed instead of
/// ambient global state. Expiry is owned by the embedding store.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<String, SessionState>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self) -> &mut SessionState {
        let session = SessionState::generate();
        let id = session.session_id.clone();
        self.sessions.entry(id).or_insert(session)
    }

    pub fn get_or_create(&mut self, session_id: &str) -> &mut SessionState {
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionState::new(session_id))
    }

    pub fn get(&self, session_id: &str) -> Option<&SessionState> {
        self.sessions.get(session_id)
    }

    pub fn get_mut(&mut self, session_id: &str) -> Option<&mut SessionState> {
        self.sessions.get_mut(session_id)
    }

    pub fn remove(&mut self, session_id: &str) -> Option<SessionState> {
        self.sessions.remove(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
