//! Pipeline stages for PDF-to-flashcard generation.
//!
//! Each submodule implements exactly one transformation step and can be
//! tested on its own; only [`completion`] touches the network and only
//! [`extract`] touches the PDF engine.
//!
//! ## Data Flow
//!
//! ```text
//! document ──▶ extract ──▶ request ──▶ completion ──▶ parse
//! (validate)   (pdfium)    (prompt)    (HTTP/LLM)     (cards)
//! ```
//!
//! 1. [`document`]  : media type, size ceiling and `%PDF` magic checks
//! 2. [`extract`]   : page-capped text extraction on the blocking pool
//! 3. [`request`]   : truncate source text and build the prompt
//! 4. [`completion`]: one remote call, no retry
//! 5. [`parse`]     : tolerant JSON scan plus per-card filtering

pub mod completion;
pub mod document;
pub mod extract;
pub mod parse;
pub mod request;
