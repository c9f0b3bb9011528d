//! # pdf2cards
//!
//! Generate study flashcards from PDF documents with a chat-completion LLM.
//!
//! A study app lets users upload lecture notes or a textbook chapter and get
//! back a set of question/answer cards. This crate is the part of that app
//! that does real work: pull the text out of the PDF, ask a language model
//! for cards, and make sense of whatever the model sends back.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF upload
//!  │
//!  ├─ 1. Validate  media type, 10 MiB ceiling, %PDF magic
//!  ├─ 2. Extract   first 50 pages via pdfium (spawn_blocking, cancellable)
//!  ├─ 3. Request   first 8000 chars + count + difficulty → prompt
//!  ├─ 4. Complete  one POST to /chat/completions (no retry)
//!  └─ 5. Parse     JSON array scan, drop malformed cards
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2cards::{extract_file, generate, ChatCompletionsClient, Difficulty};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Fails right here when PERPLEXITY_API_KEY is unset.
//!     let client = ChatCompletionsClient::from_env()?;
//!     let text = extract_file("lecture.pdf").await?;
//!     let cards = generate(&client, &text.text, 10, Difficulty::Intermediate).await?;
//!     for card in cards {
//!         println!("Q: {}\nA: {}\n", card.question, card.answer);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature   | Default | Description |
//! |-----------|---------|-------------|
//! | `cli`     | on      | Enables the `pdf2cards` binary (clap + anyhow + tracing-subscriber) |
//! | `bundled` | off     | Embed the pdfium shared library at compile time |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod cards;
pub mod config;
pub mod error;
pub mod generate;
pub mod pipeline;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use cards::{ExtractedText, FlashcardDraft, FlashcardSetDraft, GeneratedCard};
pub use config::{ClientConfig, ClientConfigBuilder, Difficulty, ExtractOptions};
pub use error::{ConfigError, DraftError, ExtractError, GenerateError, Pdf2CardsError};
pub use generate::{
    extract, extract_file, extract_with, generate, generate_from_pdf, generate_request,
};
pub use pipeline::completion::{ChatCompletionsClient, CompletionClient, ProviderClient};
pub use pipeline::document::SourceDocument;
pub use pipeline::extract::{PageSource, PdfEngine, PdfiumEngine};
pub use pipeline::parse::{parse_cards, ParseFailure, ParsedCards};
pub use pipeline::request::GenerationRequest;
pub use tokio_util::sync::CancellationToken;
