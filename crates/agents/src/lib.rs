//! Persona agents: pure message formatting over the generation port.
//! Business logic (search, validation, bookkeeping) lives with the flow
//! handlers; agents only turn intents into messages.

pub mod companion;
pub mod dog;
pub mod prompts;

use std::collections::HashMap;

use async_trait::async_trait;
use protocol::AgentMessage;
use thiserror::Error;

pub use companion::CompanionAgent;
pub use dog::DogAgent;

/// Which instinct drives a behavior, per the analysis step.
#[derive(Debug, Clone, Default)]
pub struct InstinctAnalysis {
    pub primary_instinct: String,
    pub primary_description: String,
    /// Description per instinct name (jagd, rudel, territorial, sexual).
    pub instincts: HashMap<String, String>,
    pub confidence: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    Confirmation,
    Context,
    Exercise,
    Restart,
    AskForMore,
    /// Feedback question number, 1-based.
    Feedback(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NoBehaviorMatch,
    NotDogRelated,
    InputTooShort,
    ContextTooShort,
    InvalidYesNo,
    Technical,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionKind {
    DescribeMore,
    AnotherBehavior,
    RestartConfirmed,
}

/// What the caller wants said, as one typed value instead of a message
/// type plus a metadata map.
#[derive(Debug, Clone)]
pub enum MessageIntent {
    Greeting,
    Question(QuestionKind),
    /// Dog-perspective rendering of matched symptom knowledge.
    Perspective { symptom: String, match_data: String },
    /// Instinct diagnosis from symptom + context + analysis.
    Diagnosis {
        symptom: String,
        context: String,
        analysis: InstinctAnalysis,
    },
    /// Exercise instructions; `None` uses the canned fallback.
    Exercise { instructions: Option<String> },
    Acknowledgment,
    Completion { saved: bool },
    Error(ErrorKind),
    Instruction(InstructionKind),
}

/// Context passed to an agent for one response.
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub session_id: String,
    pub user_input: String,
    pub intent: MessageIntent,
}

impl AgentContext {
    pub fn new(session_id: impl Into<String>, intent: MessageIntent) -> Self {
        Self {
            session_id: session_id.into(),
            user_input: String::new(),
            intent,
        }
    }

    pub fn with_input(mut self, user_input: impl Into<String>) -> Self {
        self.user_input = user_input.into();
        self
    }
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("{agent} does not handle this intent: {detail}")]
    Unsupported { agent: &'static str, detail: String },
}

/// A persona agent: formats messages for intents, never drives control
/// flow. Generation failures degrade to canned texts instead of erroring.
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &'static str;
    /// Sender tag stamped onto produced messages.
    fn sender(&self) -> &'static str;
    async fn respond(&self, context: &AgentContext) -> Result<Vec<AgentMessage>, AgentError>;
}
