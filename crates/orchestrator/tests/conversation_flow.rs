use std::sync::Arc;

use agents::{Agent, CompanionAgent, DogAgent};
use backends::mocks::{FailingVectorSearch, MockGeneration, MockVectorSearch};
use backends::{KeyValueStore, MemoryStore, TextGeneration, VectorSearch};
use orchestrator::{FlowHandlers, Orchestrator};
use protocol::MessageKind;

const SYMPTOM: &str = "Mein Hund bellt ständig wenn Besucher kommen";
const CONTEXT: &str = "Es passiert an der Haustür, wenn es klingelt und Gäste eintreten";

struct TestStack {
    orchestrator: Orchestrator,
    store: Arc<MemoryStore>,
}

fn stack_with_vector(vector: Arc<dyn VectorSearch>) -> TestStack {
    let generation: Arc<dyn TextGeneration> = Arc::new(MockGeneration::replying(
        "Ich erlebe Besucher als Aufregung in meinem Revier, das ist mein Territorialinstinkt.",
    ));
    let store = Arc::new(MemoryStore::new());
    let dog: Arc<dyn Agent> = Arc::new(DogAgent::new(generation.clone()));
    let companion: Arc<dyn Agent> = Arc::new(CompanionAgent::new());
    let handlers = Arc::new(FlowHandlers::new(
        dog,
        companion,
        generation,
        vector,
        store.clone() as Arc<dyn KeyValueStore>,
    ));
    TestStack {
        orchestrator: Orchestrator::new(handlers),
        store,
    }
}

fn matching_stack() -> TestStack {
    let vector = MockVectorSearch::new()
        .with_hits(
            "Symptome",
            vec![MockVectorSearch::hit(
                &[
                    ("symptom_name", "Bellen bei Besuch"),
                    ("schnelldiagnose", "Besucher machen mich nervös, ich melde sie."),
                ],
                0.31,
            )],
        )
        .with_hits(
            "Instinkte",
            vec![
                MockVectorSearch::hit(
                    &[
                        ("instinkt", "Territorialinstinkt"),
                        ("hundesperspektive", "Ich bewache mein Revier."),
                    ],
                    0.2,
                ),
                MockVectorSearch::hit(
                    &[
                        ("instinkt", "Rudelinstinkt"),
                        ("hundesperspektive", "Ich halte mein Rudel zusammen."),
                    ],
                    0.4,
                ),
            ],
        )
        .with_hits(
            "Erziehung",
            vec![MockVectorSearch::hit(
                &[("anleitung", "Übe ruhiges Begrüßen an der Tür.")],
                0.3,
            )],
        );
    stack_with_vector(Arc::new(vector))
}

async fn state_of(stack: &TestStack, session: &str) -> String {
    stack
        .orchestrator
        .session_info(session)
        .await
        .expect("session exists")
        .current_state
}

#[tokio::test]
async fn full_conversation_happy_path() {
    let stack = matching_stack();
    let sid = "happy";

    // greeting pair
    let greeting = stack.orchestrator.start_conversation(sid).await;
    assert_eq!(greeting.len(), 2);
    assert_eq!(greeting[0].kind, MessageKind::Greeting);
    assert_eq!(state_of(&stack, sid).await, "wait_for_symptom");

    // too-short input re-prompts without advancing
    let reply = stack.orchestrator.handle_message(sid, "hi").await;
    assert_eq!(reply[0].kind, MessageKind::Error);
    assert!(reply[0].text.contains("kurz"));
    assert_eq!(state_of(&stack, sid).await, "wait_for_symptom");

    // matched symptom: perspective + ask-for-more, on to confirmation
    let reply = stack.orchestrator.handle_message(sid, SYMPTOM).await;
    assert_eq!(reply.len(), 2);
    assert_eq!(reply[1].kind, MessageKind::Question);
    assert_eq!(state_of(&stack, sid).await, "wait_for_confirmation");

    // yes: context question
    let reply = stack.orchestrator.handle_message(sid, "ja").await;
    assert!(reply[0].text.contains("Informationen"));
    assert_eq!(state_of(&stack, sid).await, "wait_for_context");

    // context: diagnosis intro + generated text + exercise question
    let reply = stack.orchestrator.handle_message(sid, CONTEXT).await;
    assert!(reply.len() >= 2);
    assert!(reply.iter().any(|m| m.text.contains("Hundeperspektive")));
    assert_eq!(state_of(&stack, sid).await, "ask_for_exercise");

    // yes: exercise + restart question
    let reply = stack.orchestrator.handle_message(sid, "ja bitte").await;
    assert!(reply.iter().any(|m| m.text.contains("Begrüßen")));
    assert_eq!(state_of(&stack, sid).await, "end_or_restart");

    // no: feedback intro + question 1
    let reply = stack.orchestrator.handle_message(sid, "nein").await;
    assert_eq!(reply.len(), 2);
    assert!(reply[0].text.contains("Feedback"));
    assert_eq!(state_of(&stack, sid).await, "feedback_q1");

    // five answers close the loop back to greeting
    for (answer, expected_state) in [
        ("Ja, sehr geholfen", "feedback_q2"),
        ("Die Perspektive war spannend", "feedback_q3"),
        ("Die Übung passt gut", "feedback_q4"),
        ("9", "feedback_q5"),
        ("keine", "greeting"),
    ] {
        stack.orchestrator.handle_message(sid, answer).await;
        assert_eq!(state_of(&stack, sid).await, expected_state);
    }

    let info = stack.orchestrator.session_info(sid).await.unwrap();
    assert_eq!(info.feedback_collected, 5);

    // feedback persisted under the session key with the record shape
    let record = stack
        .store
        .get(&format!("feedback:{sid}"))
        .await
        .unwrap()
        .expect("feedback stored");
    assert_eq!(record["responses"].as_array().unwrap().len(), 5);
    assert_eq!(record["symptom"], SYMPTOM);
    assert!(record["timestamp"].as_str().is_some());
}

#[tokio::test]
async fn unmatched_symptom_stays_and_reprompts() {
    let vector = MockVectorSearch::new().with_hits(
        "Symptome",
        vec![MockVectorSearch::hit(
            &[("symptom_name", "irgendwas"), ("schnelldiagnose", "egal")],
            0.92,
        )],
    );
    let stack = stack_with_vector(Arc::new(vector));
    let sid = "nomatch";

    stack.orchestrator.start_conversation(sid).await;
    let reply = stack.orchestrator.handle_message(sid, SYMPTOM).await;
    assert!(reply[0].text.contains("keine Antwort"));
    assert_eq!(state_of(&stack, sid).await, "wait_for_symptom");

    // the failed attempt still records what was asked about
    let info = stack.orchestrator.session_info(sid).await.unwrap();
    assert_eq!(info.active_symptom, SYMPTOM);
}

#[tokio::test]
async fn search_outage_degrades_to_technical_error_and_stays() {
    let stack = stack_with_vector(Arc::new(FailingVectorSearch));
    let sid = "outage";

    stack.orchestrator.start_conversation(sid).await;
    let reply = stack.orchestrator.handle_message(sid, SYMPTOM).await;
    assert_eq!(reply[0].kind, MessageKind::Error);
    assert_eq!(state_of(&stack, sid).await, "wait_for_symptom");
}

#[tokio::test]
async fn rejecting_the_match_restarts_fresh() {
    let stack = matching_stack();
    let sid = "reject";

    stack.orchestrator.start_conversation(sid).await;
    stack.orchestrator.handle_message(sid, SYMPTOM).await;
    assert_eq!(state_of(&stack, sid).await, "wait_for_confirmation");

    let reply = stack.orchestrator.handle_message(sid, "nein").await;
    // fresh greeting, straight back to symptom intake (not end_or_restart)
    assert_eq!(reply[0].kind, MessageKind::Greeting);
    let info = stack.orchestrator.session_info(sid).await.unwrap();
    assert_eq!(info.current_state, "wait_for_symptom");
    assert_eq!(info.active_symptom, "");
}

#[tokio::test]
async fn unclear_confirmation_answer_reprompts_in_place() {
    let stack = matching_stack();
    let sid = "unclear";

    stack.orchestrator.start_conversation(sid).await;
    stack.orchestrator.handle_message(sid, SYMPTOM).await;

    let reply = stack.orchestrator.handle_message(sid, "vielleicht").await;
    assert!(reply[0].text.contains("'Ja' oder 'Nein'"));
    assert_eq!(state_of(&stack, sid).await, "wait_for_confirmation");
}

#[tokio::test]
async fn restart_phrase_resets_from_the_middle_of_a_conversation() {
    let stack = matching_stack();
    let sid = "restart";

    stack.orchestrator.start_conversation(sid).await;
    stack.orchestrator.handle_message(sid, SYMPTOM).await;
    stack.orchestrator.handle_message(sid, "ja").await;
    assert_eq!(state_of(&stack, sid).await, "wait_for_context");

    let reply = stack.orchestrator.handle_message(sid, "von vorne").await;
    assert!(reply[0].text.contains("neu"));
    let info = stack.orchestrator.session_info(sid).await.unwrap();
    assert_eq!(info.current_state, "wait_for_symptom");
    assert_eq!(info.active_symptom, "");
}

#[tokio::test]
async fn unexpected_event_yields_generic_reprompt() {
    let stack = matching_stack();
    let sid = "generic";

    // no start_conversation: session sits in greeting, plain text input
    // has no transition there
    let reply = stack.orchestrator.handle_message(sid, "hallo du").await;
    assert_eq!(reply.len(), 1);
    assert!(reply[0].text.contains("nicht verstanden"));
    assert_eq!(state_of(&stack, sid).await, "greeting");
}

#[tokio::test]
async fn declining_exercise_goes_straight_to_feedback() {
    let stack = matching_stack();
    let sid = "decline";

    stack.orchestrator.start_conversation(sid).await;
    stack.orchestrator.handle_message(sid, SYMPTOM).await;
    stack.orchestrator.handle_message(sid, "ja").await;
    stack.orchestrator.handle_message(sid, CONTEXT).await;
    assert_eq!(state_of(&stack, sid).await, "ask_for_exercise");

    let reply = stack.orchestrator.handle_message(sid, "nein").await;
    assert!(reply[0].text.contains("Feedback"));
    assert_eq!(state_of(&stack, sid).await, "feedback_q1");
}

#[tokio::test]
async fn wanting_another_behavior_loops_back() {
    let stack = matching_stack();
    let sid = "again";

    stack.orchestrator.start_conversation(sid).await;
    stack.orchestrator.handle_message(sid, SYMPTOM).await;
    stack.orchestrator.handle_message(sid, "ja").await;
    stack.orchestrator.handle_message(sid, CONTEXT).await;
    stack.orchestrator.handle_message(sid, "ja").await;
    assert_eq!(state_of(&stack, sid).await, "end_or_restart");

    let reply = stack.orchestrator.handle_message(sid, "ja").await;
    assert!(reply[0].text.contains("anderes Verhalten"));
    let info = stack.orchestrator.session_info(sid).await.unwrap();
    assert_eq!(info.current_state, "wait_for_symptom");
    assert_eq!(info.active_symptom, "");
}

#[tokio::test]
async fn engine_structure_is_valid() {
    let stack = matching_stack();
    let issues = stack.orchestrator.engine().validate_fsm();
    assert!(issues.is_empty(), "unexpected issues: {issues:?}");
}
