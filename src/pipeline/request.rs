//! Generation requests: bounded source text, card count and difficulty.

use crate::config::{Difficulty, MAX_CARD_COUNT, MAX_SOURCE_CHARS};
use crate::error::GenerateError;
use crate::prompts::flashcard_prompt;
use serde::Serialize;
use tracing::debug;

/// One immutable request to the completion model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    source_text: String,
    count: usize,
    difficulty: Difficulty,
}

impl GenerationRequest {
    /// Build a request, truncating `source_text` to [`MAX_SOURCE_CHARS`].
    ///
    /// Fails when the text is blank or `count` is outside `1..=MAX_CARD_COUNT`.
    /// Which counts a UI offers is the caller's policy.
    pub fn new(
        source_text: &str,
        count: usize,
        difficulty: Difficulty,
    ) -> Result<Self, GenerateError> {
        if source_text.trim().is_empty() {
            return Err(GenerateError::EmptySource);
        }
        if count == 0 || count > MAX_CARD_COUNT {
            return Err(GenerateError::InvalidRequest(format!(
                "card count must be 1–{MAX_CARD_COUNT}, got {count}"
            )));
        }

        let source_text = truncate_chars(source_text, MAX_SOURCE_CHARS);
        debug!(
            "Generation request: {} chars, {} cards, {}",
            source_text.chars().count(),
            count,
            difficulty
        );

        Ok(Self {
            source_text: source_text.to_string(),
            count,
            difficulty,
        })
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// The user message sent to the model.
    pub fn prompt(&self) -> String {
        flashcard_prompt(self.count, self.difficulty, &self.source_text)
    }
}

/// Prefix of `text` holding at most `max` characters.
///
/// Counts Unicode scalar values, so the cut never splits a character.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
