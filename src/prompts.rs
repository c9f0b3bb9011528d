//! Prompt text for flashcard generation.
//!
//! Every word the model sees lives here so prompt changes touch one file and
//! can be checked by unit tests without a network.

use crate::config::Difficulty;

/// Instruction block sent ahead of the source text.
///
/// `{count}` and `{difficulty}` are substituted by [`flashcard_prompt`].
pub const FLASHCARD_INSTRUCTIONS: &str = r#"You are an expert educator creating study flashcards. Generate exactly {count} high-quality flashcard question-answer pairs from the provided content.

Requirements:
- Create {count} flashcards at {difficulty} difficulty level
- Questions should be clear, specific, and test understanding
- Answers should be concise but complete
- Cover different aspects of the material
- Return ONLY a valid JSON array, no other text

Format your response as a JSON array:
[
  {"question": "question text here", "answer": "answer text here"},
  {"question": "question text here", "answer": "answer text here"}
]"#;

/// Build the complete user message for one generation request.
///
/// `source_text` must already be truncated; this function embeds it verbatim.
pub fn flashcard_prompt(count: usize, difficulty: Difficulty, source_text: &str) -> String {
    let instructions = FLASHCARD_INSTRUCTIONS
        .replace("{count}", &count.to_string())
        .replace("{difficulty}", difficulty.as_str());

    format!("{instructions}\n\nContent to generate flashcards from:\n\n{source_text}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_count_and_tier() {
        let p = flashcard_prompt(15, Difficulty::Advanced, "Mitochondria make ATP.");
        assert!(p.contains("Generate exactly 15 high-quality"));
        assert!(p.contains("Create 15 flashcards at advanced difficulty level"));
        assert!(!p.contains("{count}"));
        assert!(!p.contains("{difficulty}"));
    }

    #[test]
    fn prompt_ends_with_source_text() {
        let p = flashcard_prompt(5, Difficulty::Basic, "The cell is the unit of life.");
        assert!(p.ends_with("Content to generate flashcards from:\n\nThe cell is the unit of life."));
    }

    #[test]
    fn prompt_asks_for_bare_json_array() {
        let p = flashcard_prompt(10, Difficulty::Intermediate, "x");
        assert!(p.contains("Return ONLY a valid JSON array"));
    }
}
