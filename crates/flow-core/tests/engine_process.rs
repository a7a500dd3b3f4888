use std::sync::Arc;

use async_trait::async_trait;
use flow_core::{
    EngineError, FlowEngine, FlowEvent, FlowState, HandlerOutcome, HandlerResult, HandlerSet,
    NextEvent, SessionState, TransitionHandler, TurnContext, ValidationError,
};
use protocol::{AgentMessage, MessageKind, SENDER_COMPANION, SENDER_DOG};

fn dog_says(text: &str) -> Vec<AgentMessage> {
    vec![AgentMessage::new(SENDER_DOG, text, MessageKind::Response)]
}

/// Handler that always resolves to a fixed outcome.
struct Scripted(HandlerOutcome);

#[async_trait]
impl TransitionHandler for Scripted {
    async fn handle(&self, _: &mut SessionState, _: &str, _: &mut TurnContext) -> HandlerResult {
        Ok(self.0.clone())
    }
}

/// Symptom intake: rejects short input, matches anything mentioning
/// "bellt", signals not-found otherwise.
struct SymptomIntake;

#[async_trait]
impl TransitionHandler for SymptomIntake {
    async fn handle(
        &self,
        session: &mut SessionState,
        input: &str,
        context: &mut TurnContext,
    ) -> HandlerResult {
        if input.trim().len() < 25 {
            return Err(ValidationError::new("user_input", input, "too short").into());
        }
        if input.contains("bellt") {
            session.active_symptom = input.to_string();
            session.match_distance = Some(0.31);
            context.signal(NextEvent::SymptomFound);
            Ok(HandlerOutcome::Continue(dog_says("kenne ich")))
        } else {
            context.signal(NextEvent::SymptomNotFound);
            Ok(HandlerOutcome::Continue(dog_says("kenne ich nicht")))
        }
    }
}

/// Confirmation: "ja" jumps to context gathering, "nein" restarts.
struct Confirmation;

#[async_trait]
impl TransitionHandler for Confirmation {
    async fn handle(
        &self,
        session: &mut SessionState,
        input: &str,
        _: &mut TurnContext,
    ) -> HandlerResult {
        let normalized = input.trim().to_lowercase();
        if normalized.contains("ja") {
            Ok(HandlerOutcome::Override(
                FlowState::WaitForContext,
                dog_says("erzähl mehr"),
            ))
        } else if normalized.contains("nein") {
            session.reset_conversation();
            Ok(HandlerOutcome::Override(
                FlowState::WaitForSymptom,
                dog_says("dann von vorne"),
            ))
        } else {
            Err(ValidationError::new("user_input", input, "expected ja or nein").into())
        }
    }
}

/// Feedback step: stores the answer, asks the next question.
struct FeedbackStep(usize);

#[async_trait]
impl TransitionHandler for FeedbackStep {
    async fn handle(
        &self,
        session: &mut SessionState,
        input: &str,
        _: &mut TurnContext,
    ) -> HandlerResult {
        session.push_feedback(input);
        Ok(HandlerOutcome::Continue(vec![AgentMessage::new(
            SENDER_COMPANION,
            format!("frage {}", self.0 + 1),
            MessageKind::Question,
        )]))
    }
}

struct FeedbackCompletion;

#[async_trait]
impl TransitionHandler for FeedbackCompletion {
    async fn handle(
        &self,
        session: &mut SessionState,
        input: &str,
        _: &mut TurnContext,
    ) -> HandlerResult {
        session.push_feedback(input);
        Ok(HandlerOutcome::Continue(vec![AgentMessage::new(
            SENDER_COMPANION,
            "danke",
            MessageKind::Response,
        )]))
    }
}

struct RestartCommand;

#[async_trait]
impl TransitionHandler for RestartCommand {
    async fn handle(
        &self,
        session: &mut SessionState,
        _: &str,
        _: &mut TurnContext,
    ) -> HandlerResult {
        session.reset_conversation();
        Ok(HandlerOutcome::Continue(dog_says("okay, von vorne")))
    }
}

fn test_handler_set() -> HandlerSet {
    HandlerSet {
        greeting: Arc::new(Scripted(HandlerOutcome::Continue(dog_says("wuff")))),
        symptom: Arc::new(SymptomIntake),
        confirmation: Arc::new(Confirmation),
        context_input: Arc::new(Scripted(HandlerOutcome::Continue(dog_says("diagnose")))),
        exercise_request: Arc::new(Scripted(HandlerOutcome::Continue(dog_says("übung")))),
        exercise_declined: Arc::new(Scripted(HandlerOutcome::Continue(dog_says("frage 1")))),
        restart_yes: Arc::new(RestartCommand),
        restart_no: Arc::new(Scripted(HandlerOutcome::Continue(dog_says("frage 1")))),
        feedback_steps: [
            Arc::new(FeedbackStep(1)),
            Arc::new(FeedbackStep(2)),
            Arc::new(FeedbackStep(3)),
            Arc::new(FeedbackStep(4)),
        ],
        feedback_completion: Arc::new(FeedbackCompletion),
        restart_command: Arc::new(RestartCommand),
    }
}

#[tokio::test]
async fn literal_scenario_walkthrough() {
    let engine = FlowEngine::with_handlers(test_handler_set());
    let mut session = SessionState::new("scenario");

    // greeting + session_start -> wait_for_symptom
    let (state, messages) = engine
        .process_event(&mut session, FlowEvent::SessionStart, "", &mut TurnContext::new())
        .await
        .unwrap();
    assert_eq!(state, FlowState::WaitForSymptom);
    assert_eq!(messages.len(), 1);

    // "hi" is too short: validation error, state unchanged
    let err = engine
        .process_event(&mut session, FlowEvent::UserInput, "hi", &mut TurnContext::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert_eq!(session.current_state, FlowState::WaitForSymptom);

    // a real symptom matches and advances to confirmation
    let symptom = "Mein Hund bellt ständig wenn Besucher kommen";
    let (state, _) = engine
        .process_event(&mut session, FlowEvent::UserInput, symptom, &mut TurnContext::new())
        .await
        .unwrap();
    assert_eq!(state, FlowState::WaitForConfirmation);
    assert_eq!(session.active_symptom, symptom);

    // "nein" overrides straight back to wait_for_symptom
    let (state, _) = engine
        .process_event(&mut session, FlowEvent::UserInput, "nein", &mut TurnContext::new())
        .await
        .unwrap();
    assert_eq!(state, FlowState::WaitForSymptom);
    assert!(session.active_symptom.is_empty());
}

#[tokio::test]
async fn unknown_transition_reports_exact_valid_events() {
    let engine = FlowEngine::with_handlers(test_handler_set());
    let mut session = SessionState::new("s");

    let err = engine
        .process_event(&mut session, FlowEvent::FeedbackAnswer, "x", &mut TurnContext::new())
        .await
        .unwrap_err();

    let expected: Vec<FlowEvent> = engine
        .get_valid_transitions(FlowState::Greeting)
        .iter()
        .map(|t| t.event)
        .collect();

    match err {
        EngineError::Flow(flow) => {
            assert_eq!(flow.state, FlowState::Greeting);
            assert_eq!(flow.valid_events, expected);
        }
        other => panic!("expected flow error, got {other:?}"),
    }
    assert_eq!(session.current_state, FlowState::Greeting);
}

#[tokio::test]
async fn stay_variant_and_sentinel_are_equivalent() {
    // Variant A: handler returns Stay.
    let mut set_a = test_handler_set();
    set_a.symptom = Arc::new(Scripted(HandlerOutcome::Stay(dog_says("nochmal bitte"))));
    let engine_a = FlowEngine::with_handlers(set_a);

    // Variant B: handler returns Continue but sets the not-found sentinel.
    struct ContinueWithSentinel;
    #[async_trait]
    impl TransitionHandler for ContinueWithSentinel {
        async fn handle(
            &self,
            _: &mut SessionState,
            _: &str,
            context: &mut TurnContext,
        ) -> HandlerResult {
            context.signal(NextEvent::SymptomNotFound);
            Ok(HandlerOutcome::Continue(dog_says("nochmal bitte")))
        }
    }
    let mut set_b = test_handler_set();
    set_b.symptom = Arc::new(ContinueWithSentinel);
    let engine_b = FlowEngine::with_handlers(set_b);

    for engine in [engine_a, engine_b] {
        let mut session = SessionState::new("s");
        session.current_state = FlowState::WaitForSymptom;
        let (state, messages) = engine
            .process_event(
                &mut session,
                FlowEvent::UserInput,
                "Mein Hund knurrt Fremde an und zieht stark",
                &mut TurnContext::new(),
            )
            .await
            .unwrap();
        assert_eq!(state, FlowState::WaitForSymptom);
        assert_eq!(session.current_state, FlowState::WaitForSymptom);
        assert_eq!(messages[0].text, "nochmal bitte");
    }
}

#[tokio::test]
async fn sentinel_overrides_even_an_override_outcome() {
    struct OverrideButNotFound;
    #[async_trait]
    impl TransitionHandler for OverrideButNotFound {
        async fn handle(
            &self,
            _: &mut SessionState,
            _: &str,
            context: &mut TurnContext,
        ) -> HandlerResult {
            context.signal(NextEvent::StayInState);
            Ok(HandlerOutcome::Override(FlowState::EndOrRestart, Vec::new()))
        }
    }
    let mut set = test_handler_set();
    set.symptom = Arc::new(OverrideButNotFound);
    let engine = FlowEngine::with_handlers(set);

    let mut session = SessionState::new("s");
    session.current_state = FlowState::WaitForSymptom;
    let (state, _) = engine
        .process_event(
            &mut session,
            FlowEvent::UserInput,
            "Mein Hund bellt ständig wenn Besucher kommen",
            &mut TurnContext::new(),
        )
        .await
        .unwrap();
    assert_eq!(state, FlowState::WaitForSymptom);
}

#[tokio::test]
async fn restart_command_works_from_every_state() {
    let engine = FlowEngine::with_handlers(test_handler_set());

    for state in FlowState::ALL {
        let mut session = SessionState::new("s");
        session.current_state = state;
        session.active_symptom = "bellt".to_string();
        session.push_feedback("irgendwas");

        let (new_state, _) = engine
            .process_event(&mut session, FlowEvent::RestartCommand, "neu", &mut TurnContext::new())
            .await
            .unwrap();

        assert_eq!(new_state, FlowState::WaitForSymptom, "restart from {state}");
        assert!(session.active_symptom.is_empty());
        assert!(session.feedback_answers.is_empty());
    }
}

#[tokio::test]
async fn feedback_cycle_appends_one_answer_per_question() {
    let engine = FlowEngine::with_handlers(test_handler_set());
    let mut session = SessionState::new("s");
    session.current_state = FlowState::FeedbackQ1;

    for (i, expected) in [
        FlowState::FeedbackQ2,
        FlowState::FeedbackQ3,
        FlowState::FeedbackQ4,
        FlowState::FeedbackQ5,
    ]
    .into_iter()
    .enumerate()
    {
        let (state, _) = engine
            .process_event(
                &mut session,
                FlowEvent::FeedbackAnswer,
                &format!("antwort {}", i + 1),
                &mut TurnContext::new(),
            )
            .await
            .unwrap();
        assert_eq!(state, expected);
        assert_eq!(session.feedback_answers.len(), i + 1);
    }

    let (state, _) = engine
        .process_event(
            &mut session,
            FlowEvent::FeedbackComplete,
            "antwort 5",
            &mut TurnContext::new(),
        )
        .await
        .unwrap();
    assert_eq!(state, FlowState::Greeting);
    assert_eq!(session.feedback_answers.len(), 5);
    assert_eq!(session.feedback_answers[0], "antwort 1");
    assert_eq!(session.feedback_answers[4], "antwort 5");
}

#[tokio::test]
async fn standard_table_has_no_structural_issues() {
    let engine = FlowEngine::with_handlers(test_handler_set());
    let issues = engine.validate_fsm();
    assert!(issues.is_empty(), "unexpected issues: {issues:?}");

    let summary = engine.flow_summary();
    assert_eq!(summary.total_states, 11);
    // 13 flow transitions plus one generated restart per state
    assert_eq!(summary.total_transitions, 13 + 11);
}

#[tokio::test]
async fn later_registration_wins_after_rebuild() {
    let mut engine = FlowEngine::with_handlers(test_handler_set());
    engine.add_transition(
        FlowState::Greeting,
        FlowEvent::SessionStart,
        FlowState::EndOrRestart,
        Some(Arc::new(Scripted(HandlerOutcome::Continue(Vec::new())))),
        None,
        "override for testing",
    );
    engine.build_transition_map();

    let mut session = SessionState::new("s");
    let (state, _) = engine
        .process_event(&mut session, FlowEvent::SessionStart, "", &mut TurnContext::new())
        .await
        .unwrap();
    assert_eq!(state, FlowState::EndOrRestart);
}

#[tokio::test]
async fn failed_guard_is_reported_like_a_missing_transition() {
    let mut engine = FlowEngine::new();
    let guard: flow_core::TransitionGuard =
        Arc::new(|session: &SessionState, _: &str, _: &TurnContext| {
            !session.active_symptom.is_empty()
        });
    engine.add_transition(
        FlowState::Greeting,
        FlowEvent::SessionStart,
        FlowState::WaitForSymptom,
        Some(Arc::new(Scripted(HandlerOutcome::Continue(Vec::new())))),
        Some(guard),
        "guarded start",
    );
    engine.build_transition_map();

    let mut session = SessionState::new("s");
    let err = engine
        .process_event(&mut session, FlowEvent::SessionStart, "", &mut TurnContext::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Flow(_)));
    assert_eq!(session.current_state, FlowState::Greeting);

    assert!(!engine.can_transition(
        FlowState::Greeting,
        FlowEvent::SessionStart,
        &session,
        "",
        &TurnContext::new()
    ));
    session.active_symptom = "bellt".to_string();
    assert!(engine.can_transition(
        FlowState::Greeting,
        FlowEvent::SessionStart,
        &session,
        "",
        &TurnContext::new()
    ));
}

#[tokio::test]
async fn handler_flow_errors_keep_their_fallback_messages() {
    struct FailsWithFallback;
    #[async_trait]
    impl TransitionHandler for FailsWithFallback {
        async fn handle(&self, session: &mut SessionState, _: &str, _: &mut TurnContext) -> HandlerResult {
            Err(flow_core::FlowError::new(session.current_state, "agent pipeline broke")
                .with_fallback(dog_says("versuch es gleich nochmal"))
                .into())
        }
    }
    let mut set = test_handler_set();
    set.greeting = Arc::new(FailsWithFallback);
    let engine = FlowEngine::with_handlers(set);

    let mut session = SessionState::new("s");
    let err = engine
        .process_event(&mut session, FlowEvent::SessionStart, "", &mut TurnContext::new())
        .await
        .unwrap_err();
    match err {
        EngineError::Flow(flow) => {
            assert_eq!(flow.fallback_messages.len(), 1);
            assert_eq!(flow.fallback_messages[0].text, "versuch es gleich nochmal");
        }
        other => panic!("expected flow error, got {other:?}"),
    }
    assert_eq!(session.current_state, FlowState::Greeting);
}

#[tokio::test]
async fn opaque_handler_errors_are_wrapped_with_prior_state() {
    struct Exploding;
    #[async_trait]
    impl TransitionHandler for Exploding {
        async fn handle(&self, _: &mut SessionState, _: &str, _: &mut TurnContext) -> HandlerResult {
            Err(anyhow::anyhow!("backend unreachable").into())
        }
    }
    let mut set = test_handler_set();
    set.greeting = Arc::new(Exploding);
    let engine = FlowEngine::with_handlers(set);

    let mut session = SessionState::new("s");
    let err = engine
        .process_event(&mut session, FlowEvent::SessionStart, "", &mut TurnContext::new())
        .await
        .unwrap_err();
    match err {
        EngineError::Flow(flow) => {
            assert_eq!(flow.state, FlowState::Greeting);
            assert!(flow.reason.contains("backend unreachable"));
        }
        other => panic!("expected flow error, got {other:?}"),
    }
    assert_eq!(session.current_state, FlowState::Greeting);
}
