use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use agents::{
    Agent, AgentContext, ErrorKind, InstinctAnalysis, InstructionKind, MessageIntent, QuestionKind,
};
use agents::prompts::{self, templates};
use async_trait::async_trait;
use backends::{CompletionRequest, KeyValueStore, TextGeneration, VectorSearch};
use chrono::Utc;
use flow_core::{
    FlowState, HandlerError, HandlerOutcome, HandlerResult, HandlerSet, NextEvent, SessionState,
    TransitionHandler, TurnContext,
};
use protocol::AgentMessage;
use serde_json::json;

use crate::validation::{ValidationService, YesNo};

/// A hit counts as a symptom match below this distance (lower = closer).
pub const MATCH_DISTANCE_THRESHOLD: f64 = 0.6;

pub const SYMPTOM_COLLECTION: &str = "Symptome";
pub const INSTINCT_COLLECTION: &str = "Instinkte";
pub const EXERCISE_COLLECTION: &str = "Erziehung";

/// Stored feedback expires after 90 days.
pub const FEEDBACK_TTL: Duration = Duration::from_secs(90 * 24 * 60 * 60);

const INSTINCT_NAMES: [&str; 4] = ["jagd", "rudel", "territorial", "sexual"];

/// Business logic behind every transition. Coordinates the persona agents
/// and the three backend ports; the engine only ever sees the outcomes.
pub struct FlowHandlers {
    dog: Arc<dyn Agent>,
    companion: Arc<dyn Agent>,
    generation: Arc<dyn TextGeneration>,
    vector: Arc<dyn VectorSearch>,
    store: Arc<dyn KeyValueStore>,
    validation: ValidationService,
}

impl FlowHandlers {
    pub fn new(
        dog: Arc<dyn Agent>,
        companion: Arc<dyn Agent>,
        generation: Arc<dyn TextGeneration>,
        vector: Arc<dyn VectorSearch>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let validation = ValidationService::new(Some(generation.clone()));
        Self {
            dog,
            companion,
            generation,
            vector,
            store,
            validation,
        }
    }

    pub fn dog(&self) -> Arc<dyn Agent> {
        self.dog.clone()
    }

    async fn say(
        &self,
        agent: &Arc<dyn Agent>,
        session: &SessionState,
        input: &str,
        intent: MessageIntent,
    ) -> Result<Vec<AgentMessage>, HandlerError> {
        let context = AgentContext::new(session.session_id.clone(), intent).with_input(input);
        agent
            .respond(&context)
            .await
            .map_err(|e| HandlerError::Other(anyhow::Error::new(e)))
    }

    // ===== transition handlers =====

    async fn handle_greeting(
        &self,
        session: &mut SessionState,
        input: &str,
        _context: &mut TurnContext,
    ) -> HandlerResult {
        let messages = self.say(&self.dog, session, input, MessageIntent::Greeting).await?;
        Ok(HandlerOutcome::Continue(messages))
    }

    /// Symptom intake: validate, search, and either present the match or
    /// signal "not found" so the machine stays put.
    async fn handle_symptom_input(
        &self,
        session: &mut SessionState,
        input: &str,
        context: &mut TurnContext,
    ) -> HandlerResult {
        self.validation.validate_symptom(input).await?;

        let hits = match self
            .vector
            .search(
                SYMPTOM_COLLECTION,
                input,
                3,
                &["symptom_name", "schnelldiagnose"],
                true,
            )
            .await
        {
            Ok(hits) => hits,
            Err(err) => {
                tracing::error!(error = %err, "symptom search failed");
                let messages = self
                    .say(&self.dog, session, input, MessageIntent::Error(ErrorKind::Technical))
                    .await?;
                context.signal(NextEvent::SymptomNotFound);
                return Ok(HandlerOutcome::Continue(messages));
            }
        };

        let best_distance = hits.first().and_then(|hit| hit.metadata.distance);
        tracing::info!(
            query = %input,
            results = hits.len(),
            best_distance = ?best_distance,
            "symptom search"
        );

        session.active_symptom = input.to_string();

        let matched = hits
            .first()
            .filter(|hit| hit.metadata.distance.unwrap_or(1.0) < MATCH_DISTANCE_THRESHOLD)
            .and_then(|hit| hit.property_str("schnelldiagnose").map(str::to_string));

        match matched {
            Some(match_data) => {
                session.match_distance = best_distance;
                let mut messages = self
                    .say(
                        &self.dog,
                        session,
                        input,
                        MessageIntent::Perspective {
                            symptom: input.to_string(),
                            match_data,
                        },
                    )
                    .await?;
                messages.extend(
                    self.say(
                        &self.dog,
                        session,
                        "",
                        MessageIntent::Question(QuestionKind::AskForMore),
                    )
                    .await?,
                );
                context.signal(NextEvent::SymptomFound);
                Ok(HandlerOutcome::Continue(messages))
            }
            None => {
                tracing::info!("no symptom match below threshold, staying");
                let messages = self
                    .say(
                        &self.dog,
                        session,
                        input,
                        MessageIntent::Error(ErrorKind::NoBehaviorMatch),
                    )
                    .await?;
                context.signal(NextEvent::SymptomNotFound);
                Ok(HandlerOutcome::Continue(messages))
            }
        }
    }

    /// Confirmation: yes moves on to context gathering, no wipes the
    /// session and jumps straight back to symptom intake.
    async fn handle_confirmation(
        &self,
        session: &mut SessionState,
        input: &str,
        _context: &mut TurnContext,
    ) -> HandlerResult {
        let answer = self.validation.validate_yes_no(input)?;
        let distance = session.match_distance;

        match answer {
            YesNo::Yes => {
                tracing::info!(symptom = %session.active_symptom, ?distance, "match confirmed");
                let messages = self
                    .say(&self.dog, session, "", MessageIntent::Question(QuestionKind::Context))
                    .await?;
                Ok(HandlerOutcome::Override(FlowState::WaitForContext, messages))
            }
            YesNo::No => {
                tracing::info!(symptom = %session.active_symptom, ?distance, "match rejected, fresh start");
                session.reset_conversation();
                session.message_history.clear();
                let messages = self.say(&self.dog, session, "", MessageIntent::Greeting).await?;
                Ok(HandlerOutcome::Override(FlowState::WaitForSymptom, messages))
            }
        }
    }

    /// Context intake: validate, analyze instincts, deliver the diagnosis
    /// and offer an exercise.
    async fn handle_context_input(
        &self,
        session: &mut SessionState,
        input: &str,
        _context: &mut TurnContext,
    ) -> HandlerResult {
        self.validation.validate_context(input)?;

        let symptom = session.active_symptom.clone();
        let analysis = self.analyze_instincts(&symptom, input).await;

        let mut messages = self
            .say(
                &self.dog,
                session,
                input,
                MessageIntent::Diagnosis {
                    symptom,
                    context: input.to_string(),
                    analysis,
                },
            )
            .await?;
        messages.extend(
            self.say(
                &self.dog,
                session,
                "",
                MessageIntent::Question(QuestionKind::Exercise),
            )
            .await?,
        );
        Ok(HandlerOutcome::Continue(messages))
    }

    async fn handle_exercise_request(
        &self,
        session: &mut SessionState,
        _input: &str,
        _context: &mut TurnContext,
    ) -> HandlerResult {
        let instructions = self.find_exercise(&session.active_symptom).await;
        let mut messages = self
            .say(&self.dog, session, "", MessageIntent::Exercise { instructions })
            .await?;
        messages.extend(
            self.say(
                &self.dog,
                session,
                "",
                MessageIntent::Question(QuestionKind::Restart),
            )
            .await?,
        );
        Ok(HandlerOutcome::Continue(messages))
    }

    async fn handle_exercise_declined(
        &self,
        session: &mut SessionState,
        _input: &str,
        _context: &mut TurnContext,
    ) -> HandlerResult {
        let messages = self
            .say(
                &self.companion,
                session,
                "",
                MessageIntent::Question(QuestionKind::Feedback(1)),
            )
            .await?;
        Ok(HandlerOutcome::Continue(messages))
    }

    async fn handle_restart_yes(
        &self,
        session: &mut SessionState,
        _input: &str,
        _context: &mut TurnContext,
    ) -> HandlerResult {
        session.active_symptom.clear();
        let messages = self
            .say(
                &self.dog,
                session,
                "",
                MessageIntent::Instruction(InstructionKind::AnotherBehavior),
            )
            .await?;
        Ok(HandlerOutcome::Continue(messages))
    }

    async fn handle_restart_no(
        &self,
        session: &mut SessionState,
        _input: &str,
        _context: &mut TurnContext,
    ) -> HandlerResult {
        let messages = self
            .say(
                &self.companion,
                session,
                "",
                MessageIntent::Question(QuestionKind::Feedback(1)),
            )
            .await?;
        Ok(HandlerOutcome::Continue(messages))
    }

    /// Store the answer to the current feedback question and ask the next.
    async fn handle_feedback_step(
        &self,
        next_question: u8,
        session: &mut SessionState,
        input: &str,
        _context: &mut TurnContext,
    ) -> HandlerResult {
        self.validation.validate_feedback(input)?;
        session.push_feedback(input);
        let messages = self
            .say(
                &self.companion,
                session,
                "",
                MessageIntent::Question(QuestionKind::Feedback(next_question)),
            )
            .await?;
        Ok(HandlerOutcome::Continue(messages))
    }

    async fn handle_feedback_completion(
        &self,
        session: &mut SessionState,
        input: &str,
        _context: &mut TurnContext,
    ) -> HandlerResult {
        self.validation.validate_feedback(input)?;
        session.push_feedback(input);
        let saved = self.save_feedback(session).await;
        let messages = self
            .say(&self.companion, session, input, MessageIntent::Completion { saved })
            .await?;
        Ok(HandlerOutcome::Continue(messages))
    }

    async fn handle_restart_command(
        &self,
        session: &mut SessionState,
        _input: &str,
        _context: &mut TurnContext,
    ) -> HandlerResult {
        session.reset_conversation();
        let messages = self
            .say(
                &self.dog,
                session,
                "",
                MessageIntent::Instruction(InstructionKind::RestartConfirmed),
            )
            .await?;
        Ok(HandlerOutcome::Continue(messages))
    }

    // ===== domain helpers =====

    /// Bucket instinct knowledge from the vector store, then let the
    /// generator pick the primary instinct. Degrades to an "unbekannt"
    /// analysis instead of failing the turn.
    async fn analyze_instincts(&self, symptom: &str, context: &str) -> InstinctAnalysis {
        let query = format!("{symptom} {context}");
        let hits = match self
            .vector
            .search(
                INSTINCT_COLLECTION,
                &query,
                5,
                &["instinkt", "hundesperspektive"],
                false,
            )
            .await
        {
            Ok(hits) if !hits.is_empty() => hits,
            Ok(_) => {
                return InstinctAnalysis {
                    primary_instinct: "unbekannt".to_string(),
                    primary_description: "Konnte nicht eindeutig bestimmt werden".to_string(),
                    instincts: HashMap::new(),
                    confidence: 0.3,
                }
            }
            Err(err) => {
                tracing::error!(error = %err, "instinct search failed");
                return InstinctAnalysis {
                    primary_instinct: "unbekannt".to_string(),
                    primary_description: "Fehler bei der Analyse".to_string(),
                    instincts: HashMap::new(),
                    confidence: 0.1,
                };
            }
        };

        let mut instincts = HashMap::new();
        for hit in &hits {
            let name = hit.property_str("instinkt").unwrap_or_default().to_lowercase();
            let perspective = hit.property_str("hundesperspektive").unwrap_or_default();
            for known in INSTINCT_NAMES {
                if name.contains(known) {
                    instincts.insert(known.to_string(), perspective.to_string());
                }
            }
        }

        let prompt = prompts::render(
            templates::INSTINCT_ANALYSIS,
            &[("symptom", symptom), ("context", context)],
        );
        match self.generation.complete(CompletionRequest::new(prompt)).await {
            Ok(response) => InstinctAnalysis {
                primary_instinct: extract_primary_instinct(&response),
                primary_description: extract_description(&response),
                instincts,
                confidence: 0.8,
            },
            Err(err) => {
                tracing::error!(error = %err, "instinct analysis generation failed");
                InstinctAnalysis {
                    primary_instinct: "unbekannt".to_string(),
                    primary_description: "Fehler bei der Analyse".to_string(),
                    instincts,
                    confidence: 0.1,
                }
            }
        }
    }

    /// Best matching exercise text, or `None` to use the canned fallback.
    async fn find_exercise(&self, symptom: &str) -> Option<String> {
        match self
            .vector
            .search(EXERCISE_COLLECTION, symptom, 3, &["anleitung"], false)
            .await
        {
            Ok(hits) => hits
                .first()
                .and_then(|hit| hit.property_str("anleitung"))
                .map(str::to_string),
            Err(err) => {
                tracing::error!(error = %err, "exercise search failed");
                None
            }
        }
    }

    /// Persist the collected answers. Returns whether the write succeeded;
    /// the completion message reports it either way.
    async fn save_feedback(&self, session: &SessionState) -> bool {
        if session.feedback_answers.is_empty() {
            return false;
        }
        let record = json!({
            "session_id": session.session_id,
            "symptom": session.active_symptom,
            "responses": session.feedback_answers,
            "timestamp": Utc::now().to_rfc3339(),
        });
        let key = format!("feedback:{}", session.session_id);
        match self.store.set(&key, record, Some(FEEDBACK_TTL)).await {
            Ok(()) => {
                tracing::info!(session_id = %session.session_id, "feedback saved");
                true
            }
            Err(err) => {
                tracing::error!(error = %err, "saving feedback failed");
                false
            }
        }
    }
}

fn extract_primary_instinct(response: &str) -> String {
    let lower = response.to_lowercase();
    INSTINCT_NAMES
        .iter()
        .find(|name| lower.contains(*name))
        .map(|name| name.to_string())
        .unwrap_or_else(|| "unbekannt".to_string())
}

fn extract_description(response: &str) -> String {
    if let Some(first) = response.split('.').next() {
        if first.chars().count() > 20 {
            return first.trim().to_string();
        }
    }
    response.chars().take(100).collect::<String>().trim().to_string()
}

// ===== engine wiring =====

macro_rules! bind_handler {
    ($name:ident, $method:ident) => {
        struct $name(Arc<FlowHandlers>);

        #[async_trait]
        impl TransitionHandler for $name {
            async fn handle(
                &self,
                session: &mut SessionState,
                user_input: &str,
                context: &mut TurnContext,
            ) -> HandlerResult {
                self.0.$method(session, user_input, context).await
            }
        }
    };
}

bind_handler!(Greeting, handle_greeting);
bind_handler!(SymptomInput, handle_symptom_input);
bind_handler!(Confirmation, handle_confirmation);
bind_handler!(ContextInput, handle_context_input);
bind_handler!(ExerciseRequest, handle_exercise_request);
bind_handler!(ExerciseDeclined, handle_exercise_declined);
bind_handler!(RestartYes, handle_restart_yes);
bind_handler!(RestartNo, handle_restart_no);
bind_handler!(FeedbackCompletion, handle_feedback_completion);
bind_handler!(RestartCommand, handle_restart_command);

struct FeedbackStep {
    handlers: Arc<FlowHandlers>,
    next_question: u8,
}

#[async_trait]
impl TransitionHandler for FeedbackStep {
    async fn handle(
        &self,
        session: &mut SessionState,
        user_input: &str,
        context: &mut TurnContext,
    ) -> HandlerResult {
        self.handlers
            .handle_feedback_step(self.next_question, session, user_input, context)
            .await
    }
}

/// Bind the business handlers to the slots of the standard table.
pub fn handler_set(handlers: Arc<FlowHandlers>) -> HandlerSet {
    let step = |next_question| {
        Arc::new(FeedbackStep {
            handlers: handlers.clone(),
            next_question,
        }) as flow_core::SharedHandler
    };
    HandlerSet {
        greeting: Arc::new(Greeting(handlers.clone())),
        symptom: Arc::new(SymptomInput(handlers.clone())),
        confirmation: Arc::new(Confirmation(handlers.clone())),
        context_input: Arc::new(ContextInput(handlers.clone())),
        exercise_request: Arc::new(ExerciseRequest(handlers.clone())),
        exercise_declined: Arc::new(ExerciseDeclined(handlers.clone())),
        restart_yes: Arc::new(RestartYes(handlers.clone())),
        restart_no: Arc::new(RestartNo(handlers.clone())),
        feedback_steps: [step(2), step(3), step(4), step(5)],
        feedback_completion: Arc::new(FeedbackCompletion(handlers.clone())),
        restart_command: Arc::new(RestartCommand(handlers)),
    }
}
