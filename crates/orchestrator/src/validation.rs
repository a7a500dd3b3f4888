use std::collections::HashSet;
use std::sync::Arc;

use agents::ErrorKind;
use backends::{CompletionRequest, TextGeneration};
use flow_core::ValidationError;
use once_cell::sync::Lazy;

/// Substantial input required for a useful symptom search.
pub const MIN_SYMPTOM_LENGTH: usize = 25;
pub const MIN_CONTEXT_LENGTH: usize = 25;
/// Feedback can be brief, but not empty.
pub const MIN_FEEDBACK_LENGTH: usize = 1;

const CODE_INPUT_TOO_SHORT: &str = "input_too_short";
const CODE_CONTEXT_TOO_SHORT: &str = "context_too_short";
const CODE_NOT_DOG_RELATED: &str = "not_dog_related";
const CODE_INVALID_YES_NO: &str = "invalid_yes_no";
const CODE_FEEDBACK_EMPTY: &str = "feedback_empty";

/// Dog-related vocabulary for the fast keyword screen, German and English.
static DOG_KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // German
        "hund", "hunde", "welpe", "welpen", "rüde", "hündin", "vierbeiner",
        "bellen", "bellt", "gebell", "beißen", "beißt", "knurren", "knurrt",
        "winseln", "winselt", "jaulen", "jault", "heulen", "heult",
        "schwanz", "rute", "pfote", "pfoten", "schnauze", "nase",
        "schnüffeln", "schnüffelt", "lecken", "leckt", "sabbern", "sabbert",
        "springen", "springt", "rennen", "rennt", "laufen", "läuft",
        "ziehen", "zieht", "zerren", "zerrt",
        "gehorchen", "gehorcht", "folgen", "folgt", "hören", "hört",
        "sitz", "platz", "bleib", "fuß", "komm", "aus",
        "apportieren", "apportiert", "bringen", "bringt", "holen", "holt",
        "jagen", "jagt", "hetzen", "hetzt", "verfolgen", "verfolgt",
        "fressen", "frisst", "futter", "leckerli", "leckerchen",
        "gassi", "spaziergang", "spazieren", "leine", "halsband", "geschirr",
        "spielen", "spielt", "toben", "tobt", "ball", "spielzeug", "stock",
        "hundeschule", "training", "erziehung", "kommando", "tricks",
        // English
        "dog", "dogs", "puppy", "puppies", "canine", "pup", "pooch",
        "bark", "barking", "barks", "bite", "biting", "bites", "growl", "growling",
        "whine", "whining", "howl", "howling", "yelp", "yelping",
        "tail", "paw", "paws", "snout", "muzzle",
        "sniff", "sniffing", "lick", "licking", "drool", "drooling",
        "chase", "chasing", "hunt", "hunting", "track", "tracking",
        "treat", "treats", "kibble", "leash", "collar", "harness",
        "fetch", "heel", "obey", "obeys",
    ]
    .into_iter()
    .collect()
});

/// A classified yes/no answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YesNo {
    Yes,
    No,
}

/// Centralized input validation: length rules first (cheap), content rules
/// second, graceful degradation when the generation fallback is down.
pub struct ValidationService {
    generation: Option<Arc<dyn TextGeneration>>,
}

impl ValidationService {
    pub fn new(generation: Option<Arc<dyn TextGeneration>>) -> Self {
        Self { generation }
    }

    pub async fn validate_symptom(&self, input: &str) -> Result<(), ValidationError> {
        let input = input.trim();
        if input.chars().count() < MIN_SYMPTOM_LENGTH {
            return Err(reject(
                input,
                CODE_INPUT_TOO_SHORT,
                format!("describe the behavior in at least {MIN_SYMPTOM_LENGTH} characters"),
            ));
        }
        if !self.is_dog_related(input).await {
            return Err(reject(
                input,
                CODE_NOT_DOG_RELATED,
                "input does not describe a dog behavior",
            ));
        }
        Ok(())
    }

    pub fn validate_context(&self, input: &str) -> Result<(), ValidationError> {
        let input = input.trim();
        if input.chars().count() < MIN_CONTEXT_LENGTH {
            return Err(reject(
                input,
                CODE_CONTEXT_TOO_SHORT,
                format!("provide at least {MIN_CONTEXT_LENGTH} characters of context"),
            ));
        }
        Ok(())
    }

    pub fn validate_yes_no(&self, input: &str) -> Result<YesNo, ValidationError> {
        let normalized = input.trim().to_lowercase();
        if normalized.contains("ja") || normalized.contains("yes") {
            return Ok(YesNo::Yes);
        }
        if normalized.contains("nein") || normalized.contains("no") {
            return Ok(YesNo::No);
        }
        Err(reject(input, CODE_INVALID_YES_NO, "expected ja or nein"))
    }

    pub fn validate_feedback(&self, input: &str) -> Result<(), ValidationError> {
        if input.trim().chars().count() < MIN_FEEDBACK_LENGTH {
            return Err(reject(
                input,
                CODE_FEEDBACK_EMPTY,
                "feedback answer cannot be empty",
            ));
        }
        Ok(())
    }

    /// Keyword screen first; generation fallback for edge cases. Permissive
    /// when neither can decide.
    async fn is_dog_related(&self, input: &str) -> bool {
        if contains_dog_keyword(input) {
            return true;
        }
        match &self.generation {
            Some(generation) => {
                let prompt = format!("Ist das Hundeverhalten? Antworte nur 'ja' oder 'nein':\n{input}");
                let request = CompletionRequest::new(prompt)
                    .with_temperature(0.3)
                    .with_max_tokens(3);
                match generation.complete(request).await {
                    Ok(answer) => answer.to_lowercase().contains("ja"),
                    Err(err) => {
                        tracing::warn!(error = %err, "dog-content check failed, allowing input");
                        true
                    }
                }
            }
            None => true,
        }
    }
}

fn contains_dog_keyword(input: &str) -> bool {
    input
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .any(|token| DOG_KEYWORDS.contains(token))
}

fn reject(value: &str, code: &'static str, detail: impl Into<String>) -> ValidationError {
    ValidationError::new("user_input", value, format!("{code}: {}", detail.into()))
}

/// Map a validation failure back to the persona error message to re-prompt
/// with. The code prefix is the stable part of the reason.
pub fn error_kind(err: &ValidationError) -> ErrorKind {
    let code = err.reason.split(':').next().unwrap_or_default();
    match code {
        CODE_INPUT_TOO_SHORT => ErrorKind::InputTooShort,
        CODE_CONTEXT_TOO_SHORT => ErrorKind::ContextTooShort,
        CODE_NOT_DOG_RELATED => ErrorKind::NotDogRelated,
        CODE_INVALID_YES_NO => ErrorKind::InvalidYesNo,
        _ => ErrorKind::General,
    }
}
