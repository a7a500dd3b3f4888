use std::sync::Arc;

use async_trait::async_trait;
use backends::{CompletionRequest, TextGeneration};
use protocol::{AgentMessage, MessageKind, SENDER_DOG};

use crate::prompts::{self, dog, templates};
use crate::{Agent, AgentContext, AgentError, ErrorKind, InstructionKind, MessageIntent, QuestionKind};

/// Temperature for dog-voice generation; a little personality.
const DOG_TEMPERATURE: f32 = 0.8;

/// The dog persona. Explains behavior from the dog's point of view;
/// generated responses stay on the retrieved content via the system prompt.
pub struct DogAgent {
    generation: Arc<dyn TextGeneration>,
}

impl DogAgent {
    pub fn new(generation: Arc<dyn TextGeneration>) -> Self {
        Self { generation }
    }

    fn message(&self, text: impl Into<String>, kind: MessageKind) -> AgentMessage {
        AgentMessage::new(SENDER_DOG, text, kind)
    }

    async fn generate(&self, prompt: String) -> anyhow::Result<String> {
        self.generation
            .complete(
                CompletionRequest::new(prompt)
                    .with_system(templates::DOG_AGENT_SYSTEM)
                    .with_temperature(DOG_TEMPERATURE),
            )
            .await
    }

    async fn perspective(&self, symptom: &str, match_data: &str) -> Vec<AgentMessage> {
        let prompt = prompts::render(
            templates::DOG_PERSPECTIVE,
            &[("symptom", symptom), ("match", match_data)],
        );
        match self.generate(prompt).await {
            Ok(text) => vec![self.message(text, MessageKind::Response)],
            Err(err) => {
                tracing::error!(error = %err, "perspective generation failed");
                vec![self.message(dog::TECHNICAL_ERROR, MessageKind::Error)]
            }
        }
    }

    async fn diagnosis(
        &self,
        symptom: &str,
        context: &str,
        analysis: &crate::InstinctAnalysis,
    ) -> Vec<AgentMessage> {
        let lookup = |name: &str| {
            analysis
                .instincts
                .get(name)
                .map(String::as_str)
                .unwrap_or("keine Information gefunden")
                .to_string()
        };
        let prompt = prompts::render(
            templates::INSTINCT_DIAGNOSIS,
            &[
                ("symptom", symptom),
                ("context", context),
                ("jagd", &lookup("jagd")),
                ("rudel", &lookup("rudel")),
                ("territorial", &lookup("territorial")),
                ("sexual", &lookup("sexual")),
            ],
        );
        match self.generate(prompt).await {
            Ok(text) => vec![
                self.message(dog::DIAGNOSIS_INTRO, MessageKind::Response),
                self.message(text, MessageKind::Response),
            ],
            Err(err) => {
                tracing::error!(error = %err, "diagnosis generation failed");
                vec![self.message(dog::TECHNICAL_ERROR, MessageKind::Error)]
            }
        }
    }

    fn question_text(kind: QuestionKind) -> &'static str {
        match kind {
            QuestionKind::Confirmation => dog::REQUEST_YES_NO,
            QuestionKind::Context => dog::CONTEXT_QUESTION,
            QuestionKind::Exercise => dog::EXERCISE_QUESTION,
            QuestionKind::Restart => dog::CONTINUE_OR_RESTART,
            QuestionKind::AskForMore => dog::ASK_FOR_MORE,
            // Feedback questions belong to the companion persona.
            QuestionKind::Feedback(_) => dog::REQUEST_YES_NO,
        }
    }

    fn error_text(kind: ErrorKind) -> &'static str {
        match kind {
            ErrorKind::NoBehaviorMatch => dog::NO_MATCH_FOUND,
            ErrorKind::NotDogRelated => dog::NOT_DOG_RELATED,
            ErrorKind::InputTooShort => dog::INVALID_INPUT_ERROR,
            ErrorKind::ContextTooShort => dog::NEED_MORE_CONTEXT,
            ErrorKind::InvalidYesNo => dog::REQUEST_YES_NO,
            ErrorKind::Technical => dog::TECHNICAL_ERROR,
            ErrorKind::General => dog::GENERAL_ERROR,
        }
    }

    fn instruction_text(kind: InstructionKind) -> &'static str {
        match kind {
            InstructionKind::DescribeMore => dog::NEED_MORE_DETAIL,
            InstructionKind::AnotherBehavior => dog::ANOTHER_BEHAVIOR,
            InstructionKind::RestartConfirmed => dog::RESTART_CONFIRMED,
        }
    }
}

#[async_trait]
impl Agent for DogAgent {
    fn name(&self) -> &'static str {
        "Hund"
    }

    fn sender(&self) -> &'static str {
        SENDER_DOG
    }

    async fn respond(&self, context: &AgentContext) -> Result<Vec<AgentMessage>, AgentError> {
        match &context.intent {
            MessageIntent::Greeting => Ok(vec![
                self.message(dog::GREETING, MessageKind::Greeting),
                self.message(dog::GREETING_FOLLOWUP, MessageKind::Question),
            ]),
            MessageIntent::Question(kind) => {
                Ok(vec![self.message(Self::question_text(*kind), MessageKind::Question)])
            }
            MessageIntent::Perspective { symptom, match_data } => {
                Ok(self.perspective(symptom, match_data).await)
            }
            MessageIntent::Diagnosis {
                symptom,
                context: situation,
                analysis,
            } => Ok(self.diagnosis(symptom, situation, analysis).await),
            MessageIntent::Exercise { instructions } => {
                let text = instructions
                    .as_deref()
                    .unwrap_or(dog::FALLBACK_EXERCISE);
                Ok(vec![self.message(text, MessageKind::Response)])
            }
            MessageIntent::Error(kind) => {
                Ok(vec![self.message(Self::error_text(*kind), MessageKind::Error)])
            }
            MessageIntent::Instruction(kind) => Ok(vec![
                self.message(Self::instruction_text(*kind), MessageKind::Instruction)
            ]),
            other @ (MessageIntent::Acknowledgment | MessageIntent::Completion { .. }) => {
                Err(AgentError::Unsupported {
                    agent: "DogAgent",
                    detail: format!("{other:?}"),
                })
            }
        }
    }
}
