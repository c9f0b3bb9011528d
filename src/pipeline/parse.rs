//! Response parsing: pull flashcards out of free-form model output.
//!
//! Models are told to answer with a bare JSON array but often wrap it in
//! prose ("Here are your cards: [...] Enjoy!") or a code fence. Parsing is
//! two-phase:
//!
//! 1. **Scan**: take the span from the first `[` to the last `]`.
//! 2. **Decode**: strict `serde_json` on that span, or on the whole text
//!    when no span was found.
//!
//! Elements that are not `{question: string, answer: string}` with non-blank
//! values are dropped without failing the whole reply.

use crate::cards::GeneratedCard;
use crate::error::GenerateError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

static RE_JSON_ARRAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\[.*\]").unwrap());

/// Why a reply yielded no cards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    /// Neither the scanned span nor the whole text decoded as a JSON array.
    Unparseable(String),
    /// Valid JSON array, but no element survived filtering.
    Empty,
}

impl From<ParseFailure> for GenerateError {
    fn from(f: ParseFailure) -> Self {
        match f {
            ParseFailure::Unparseable(detail) => GenerateError::Unparseable { detail },
            ParseFailure::Empty => GenerateError::EmptyResult,
        }
    }
}

/// Cards that survived filtering, plus how many elements were discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCards {
    pub cards: Vec<GeneratedCard>,
    pub dropped: usize,
}

/// Parse raw completion text into cards.
pub fn parse_cards(raw: &str) -> Result<ParsedCards, ParseFailure> {
    let candidate = RE_JSON_ARRAY
        .find(raw)
        .map(|m| m.as_str())
        .unwrap_or(raw);

    let value: Value = serde_json::from_str(candidate)
        .map_err(|e| ParseFailure::Unparseable(e.to_string()))?;

    let elements = match value {
        Value::Array(items) => items,
        other => {
            return Err(ParseFailure::Unparseable(format!(
                "expected a JSON array, got {}",
                json_kind(&other)
            )))
        }
    };

    let total = elements.len();
    let cards: Vec<GeneratedCard> = elements.iter().filter_map(card_from_value).collect();
    let dropped = total - cards.len();
    if dropped > 0 {
        debug!("Dropped {} of {} generated cards as invalid", dropped, total);
    }

    if cards.is_empty() {
        return Err(ParseFailure::Empty);
    }

    Ok(ParsedCards { cards, dropped })
}

fn card_from_value(value: &Value) -> Option<GeneratedCard> {
    let question = value.get("question")?.as_str()?;
    let answer = value.get("answer")?.as_str()?;
    if question.trim().is_empty() || answer.trim().is_empty() {
        return None;
    }
    Some(GeneratedCard::new(question, answer))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
