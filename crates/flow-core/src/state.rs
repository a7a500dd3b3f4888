use std::fmt;

use serde::{Deserialize, Serialize};

/// Conversation states. The machine is cyclic: completing the feedback
/// sequence leads back to `Greeting`, one conversation per loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    Greeting,
    WaitForSymptom,
    WaitForConfirmation,
    WaitForContext,
    AskForExercise,
    EndOrRestart,
    FeedbackQ1,
    FeedbackQ2,
    FeedbackQ3,
    FeedbackQ4,
    FeedbackQ5,
}

impl FlowState {
    /// Every state, in flow order. The universal restart transition is
    /// generated over this list so no state can be silently left out.
    pub const ALL: [FlowState; 11] = [
        FlowState::Greeting,
        FlowState::WaitForSymptom,
        FlowState::WaitForConfirmation,
        FlowState::WaitForContext,
        FlowState::AskForExercise,
        FlowState::EndOrRestart,
        FlowState::FeedbackQ1,
        FlowState::FeedbackQ2,
        FlowState::FeedbackQ3,
        FlowState::FeedbackQ4,
        FlowState::FeedbackQ5,
    ];

    pub fn initial() -> Self {
        FlowState::Greeting
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FlowState::Greeting => "greeting",
            FlowState::WaitForSymptom => "wait_for_symptom",
            FlowState::WaitForConfirmation => "wait_for_confirmation",
            FlowState::WaitForContext => "wait_for_context",
            FlowState::AskForExercise => "ask_for_exercise",
            FlowState::EndOrRestart => "end_or_restart",
            FlowState::FeedbackQ1 => "feedback_q1",
            FlowState::FeedbackQ2 => "feedback_q2",
            FlowState::FeedbackQ3 => "feedback_q3",
            FlowState::FeedbackQ4 => "feedback_q4",
            FlowState::FeedbackQ5 => "feedback_q5",
        }
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
