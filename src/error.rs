//! Error types for the pdf2cards library.
//!
//! Each pipeline operation has its own error type so callers can match on
//! exactly the failures that operation can produce:
//!
//! * [`ExtractError`]: the upload could not be turned into text (wrong type,
//!   too large, image-only scan, corrupt file).
//! * [`GenerateError`]: the remote model could not produce usable cards
//!   (not configured, rate limited, unparseable or empty output).
//! * [`DraftError`]: a set or card draft fails the field-length rules
//!   applied before rows are written to the flashcard store.
//! * [`ConfigError`]: a client configuration failed validation.
//!
//! [`Pdf2CardsError`] wraps the extraction and generation errors for the
//! combined [`crate::generate::generate_from_pdf`] entry point.
//!
//! None of these are fatal to the host process. Every failure is surfaced to
//! the caller; the library never retries on its own.

use std::path::PathBuf;
use thiserror::Error;

/// Failures of [`crate::generate::extract`] and friends.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Validation (no extraction work performed) ─────────────────────────
    /// The declared media type is not `application/pdf`.
    #[error("Unsupported file type '{media_type}'\nPlease upload a PDF file.")]
    InvalidType { media_type: String },

    /// The document is larger than the configured ceiling.
    #[error("File is {size} bytes, the limit is {limit} bytes\nFile size must be less than 10MB.")]
    TooLarge { size: u64, limit: u64 },

    // ── File errors ───────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    // ── Extraction ────────────────────────────────────────────────────────
    /// The document was read but no page carried any text.
    #[error("No text found in PDF\nThe file might be image-based; try an OCR'd copy.")]
    NoText,

    /// The PDF engine could not read the document.
    #[error("Failed to extract text from PDF: {detail}\nTry a different file.")]
    ExtractionFailed { detail: String },

    /// The pdfium library could not be located or loaded.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
PDFium is normally downloaded automatically on first run.\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy."
    )]
    PdfiumUnavailable(String),

    /// The caller cancelled the extraction.
    #[error("Text extraction was cancelled")]
    Cancelled,
}

/// Failures of [`crate::generate::generate`] and the completion clients.
#[derive(Debug, Error)]
pub enum GenerateError {
    // ── Request errors ────────────────────────────────────────────────────
    /// Source text is empty after trimming.
    #[error("No text provided")]
    EmptySource,

    /// Card count outside the accepted range.
    #[error("Invalid generation request: {0}")]
    InvalidRequest(String),

    // ── Service errors ────────────────────────────────────────────────────
    /// No credential (or no usable provider) is configured.
    #[error("Generation service '{service}' is not configured.\n{hint}")]
    ServiceNotConfigured { service: String, hint: String },

    /// The remote API answered HTTP 429.
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited { retry_after_secs: Option<u64> },

    /// The remote API rejected the credential (401/403).
    #[error("Authentication error from generation service: {detail}")]
    AuthError { detail: String },

    /// The remote call did not finish in time.
    #[error("Generation request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Network failure, non-2xx status, or a reply without a completion.
    #[error("Failed to generate flashcards: {detail}")]
    ServiceUnavailable { detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The reply did not contain decodable JSON.
    #[error("Failed to parse generated flashcards: {detail}")]
    Unparseable { detail: String },

    /// The reply decoded but no element was a usable card.
    #[error("No valid flashcards generated\nTry again with different content.")]
    EmptyResult,

    /// The caller cancelled the generation.
    #[error("Flashcard generation was cancelled")]
    Cancelled,
}

impl GenerateError {
    /// Whether an immediate user-initiated retry is reasonable.
    ///
    /// Rate limiting asks the user to wait; configuration and request errors
    /// will fail again unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerateError::ServiceUnavailable { .. }
                | GenerateError::Timeout { .. }
                | GenerateError::Unparseable { .. }
                | GenerateError::EmptyResult
        )
    }

    /// Short message suitable for a toast or status line.
    pub fn user_message(&self) -> &'static str {
        match self {
            GenerateError::RateLimited { .. } => "Rate limit exceeded. Please try again later.",
            GenerateError::EmptyResult => {
                "No flashcards generated. Please try with different content."
            }
            GenerateError::EmptySource => "No text provided.",
            GenerateError::Cancelled => "Generation cancelled.",
            _ => "Failed to generate flashcards. Please try again.",
        }
    }
}

/// A field of a set or card draft violates its length rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field} must be at most {max} characters (got {len})")]
    TooLong {
        field: &'static str,
        max: usize,
        len: usize,
    },

    #[error("Card {index}: {source}")]
    Card {
        index: usize,
        #[source]
        source: Box<DraftError>,
    },
}

/// Client configuration failed validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),

    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Umbrella error for the combined extract-then-generate entry point.
#[derive(Debug, Error)]
pub enum Pdf2CardsError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Generate(#[from] GenerateError),
}
