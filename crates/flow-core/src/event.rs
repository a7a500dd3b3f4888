use std::fmt;

use serde::{Deserialize, Serialize};

use crate::state::FlowState;

/// Commands that restart the conversation from any state. Matched exactly
/// against the normalized input; a substring check would hijack symptom
/// descriptions that merely contain "neu".
pub const RESTART_PHRASES: [&str; 3] = ["neu", "restart", "von vorne"];

/// Symbolic events derived from user input. Closed set; the transition
/// table is keyed on `(FlowState, FlowEvent)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowEvent {
    SessionStart,
    UserInput,
    Affirmative,
    Negative,
    FeedbackAnswer,
    FeedbackComplete,
    RestartCommand,
}

impl FlowEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowEvent::SessionStart => "session_start",
            FlowEvent::UserInput => "user_input",
            FlowEvent::Affirmative => "affirmative",
            FlowEvent::Negative => "negative",
            FlowEvent::FeedbackAnswer => "feedback_answer",
            FlowEvent::FeedbackComplete => "feedback_complete",
            FlowEvent::RestartCommand => "restart_command",
        }
    }
}

impl fmt::Display for FlowEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify raw user input into an event for the current state.
///
/// Total by construction: every `(text, state)` pair maps to an event,
/// never an error. Restart detection runs first and wins in every state.
///
/// `WaitForConfirmation` deliberately classifies to `UserInput` even for
/// "ja"/"nein": the confirmation handler decides yes/no there, unlike
/// `AskForExercise`/`EndOrRestart` where the classifier does.
pub fn classify_user_input(text: &str, current_state: FlowState) -> FlowEvent {
    let normalized = text.trim().to_lowercase();

    if RESTART_PHRASES.contains(&normalized.as_str()) {
        return FlowEvent::RestartCommand;
    }

    match current_state {
        FlowState::WaitForSymptom | FlowState::WaitForContext | FlowState::WaitForConfirmation => {
            FlowEvent::UserInput
        }
        FlowState::AskForExercise | FlowState::EndOrRestart => {
            if normalized.contains("ja") {
                FlowEvent::Affirmative
            } else if normalized.contains("nein") {
                FlowEvent::Negative
            } else {
                FlowEvent::UserInput
            }
        }
        FlowState::FeedbackQ1 | FlowState::FeedbackQ2 | FlowState::FeedbackQ3 | FlowState::FeedbackQ4 => {
            FlowEvent::FeedbackAnswer
        }
        FlowState::FeedbackQ5 => FlowEvent::FeedbackComplete,
        _ => FlowEvent::UserInput,
    }
}
