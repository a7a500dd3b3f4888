use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sender tag for messages spoken by the dog persona.
pub const SENDER_DOG: &str = "dog";
/// Sender tag for messages spoken by the feedback companion persona.
pub const SENDER_COMPANION: &str = "companion";
/// Sender tag for messages typed by the human.
pub const SENDER_USER: &str = "user";

/// What kind of utterance a message is. Carried for transcripts and UIs;
/// the flow engine never branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Greeting,
    Question,
    Response,
    Error,
    Confirmation,
    Instruction,
}

/// One message in a conversation, from either a persona agent or the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessage {
    pub sender: String,
    pub text: String,
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

impl AgentMessage {
    pub fn new<S: Into<String>, T: Into<String>>(sender: S, text: T, kind: MessageKind) -> Self {
        Self {
            sender: sender.into(),
            text: text.into().trim().to_string(),
            kind,
            metadata: HashMap::new(),
        }
    }

    /// Message as typed by the human, recorded into the transcript.
    pub fn user<T: Into<String>>(text: T) -> Self {
        Self::new(SENDER_USER, text, MessageKind::Response)
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}
