//! Card types produced by the pipeline and the drafts handed to the store.
//!
//! [`GeneratedCard`] is what the parser emits. [`FlashcardSetDraft`] and
//! [`FlashcardDraft`] are what a caller inserts into the sets/cards tables;
//! their `validate` methods apply the same field limits the study app's
//! forms enforce, so a caller can check a whole generated set before writing
//! any row.

use crate::error::DraftError;
use serde::{Deserialize, Serialize};

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_DESCRIPTION_CHARS: usize = 500;
pub const MAX_CARD_FIELD_CHARS: usize = 1000;

/// One question/answer pair returned by the model.
///
/// Both fields are non-empty after trimming; the text itself is kept exactly
/// as the model wrote it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedCard {
    pub question: String,
    pub answer: String,
}

impl GeneratedCard {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Text pulled out of a document, page by page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedText {
    /// Page texts joined by a blank line.
    pub text: String,
    /// Number of pages actually read (at most the page cap).
    pub pages_read: usize,
    /// Page count reported by the document.
    pub total_pages: usize,
}

impl ExtractedText {
    /// `true` when pages past the cap were skipped.
    pub fn was_truncated(&self) -> bool {
        self.total_pages > self.pages_read
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// A card about to be inserted into a set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardDraft {
    pub question: String,
    pub answer: String,
}

impl FlashcardDraft {
    pub fn validate(&self) -> Result<(), DraftError> {
        check_required("question", &self.question, MAX_CARD_FIELD_CHARS)?;
        check_required("answer", &self.answer, MAX_CARD_FIELD_CHARS)
    }

    /// Copy with surrounding whitespace removed from both fields.
    pub fn trimmed(&self) -> Self {
        Self {
            question: self.question.trim().to_string(),
            answer: self.answer.trim().to_string(),
        }
    }
}

impl From<GeneratedCard> for FlashcardDraft {
    fn from(card: GeneratedCard) -> Self {
        Self {
            question: card.question,
            answer: card.answer,
        }
    }
}

/// A set plus its cards, ready for the external store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardSetDraft {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub cards: Vec<FlashcardDraft>,
}

impl FlashcardSetDraft {
    /// Wrap generated cards in a set draft, trimming every card.
    pub fn from_generated(title: impl Into<String>, cards: Vec<GeneratedCard>) -> Self {
        Self {
            title: title.into(),
            description: None,
            cards: cards
                .into_iter()
                .map(|c| FlashcardDraft::from(c).trimmed())
                .collect(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check title, description and every card; report the first violation.
    ///
    /// Card indices in errors are 1-based.
    pub fn validate(&self) -> Result<(), DraftError> {
        check_required("title", &self.title, MAX_TITLE_CHARS)?;
        if let Some(ref d) = self.description {
            let len = d.trim().chars().count();
            if len > MAX_DESCRIPTION_CHARS {
                return Err(DraftError::TooLong {
                    field: "description",
                    max: MAX_DESCRIPTION_CHARS,
                    len,
                });
            }
        }
        for (i, card) in self.cards.iter().enumerate() {
            card.validate().map_err(|e| DraftError::Card {
                index: i + 1,
                source: Box::new(e),
            })?;
        }
        Ok(())
    }
}

fn check_required(field: &'static str, value: &str, max: usize) -> Result<(), DraftError> {
    let len = value.trim().chars().count();
    if len == 0 {
        return Err(DraftError::Required { field });
    }
    if len > max {
        return Err(DraftError::TooLong { field, max, len });
    }
    Ok(())
}
