use async_trait::async_trait;
use protocol::{AgentMessage, MessageKind, SENDER_COMPANION};

use crate::prompts::companion;
use crate::{Agent, AgentContext, AgentError, MessageIntent, QuestionKind};

/// The companion persona. Collects end-of-conversation feedback; entirely
/// canned texts, no generation calls.
#[derive(Debug, Default)]
pub struct CompanionAgent;

impl CompanionAgent {
    pub fn new() -> Self {
        Self
    }

    fn message(&self, text: impl Into<String>, kind: MessageKind) -> AgentMessage {
        AgentMessage::new(SENDER_COMPANION, text, kind)
    }

    fn feedback_question(&self, number: u8) -> Result<Vec<AgentMessage>, AgentError> {
        if !(1..=companion::QUESTIONS.len() as u8).contains(&number) {
            return Err(AgentError::Unsupported {
                agent: "CompanionAgent",
                detail: format!("feedback question {number} out of range"),
            });
        }
        let question = companion::QUESTIONS[(number - 1) as usize];
        let mut messages = Vec::new();
        if number == 1 {
            messages.push(self.message(companion::FEEDBACK_INTRO, MessageKind::Greeting));
        }
        messages.push(self.message(question, MessageKind::Question));
        Ok(messages)
    }
}

#[async_trait]
impl Agent for CompanionAgent {
    fn name(&self) -> &'static str {
        "Companion"
    }

    fn sender(&self) -> &'static str {
        SENDER_COMPANION
    }

    async fn respond(&self, context: &AgentContext) -> Result<Vec<AgentMessage>, AgentError> {
        match &context.intent {
            MessageIntent::Question(QuestionKind::Feedback(number)) => {
                self.feedback_question(*number)
            }
            MessageIntent::Acknowledgment => {
                Ok(vec![self.message(companion::FEEDBACK_ACK, MessageKind::Response)])
            }
            MessageIntent::Completion { saved } => {
                let text = if *saved {
                    companion::FEEDBACK_COMPLETE
                } else {
                    companion::FEEDBACK_COMPLETE_NOSAVE
                };
                Ok(vec![self.message(text, MessageKind::Response)])
            }
            MessageIntent::Error(_) => {
                Ok(vec![self.message(companion::GENERAL_ERROR, MessageKind::Error)])
            }
            other => Err(AgentError::Unsupported {
                agent: "CompanionAgent",
                detail: format!("{other:?}"),
            }),
        }
    }
}
