//! Top-level entry points: extract text, generate cards, or both.
//!
//! Every function runs its stages strictly in sequence and performs at most
//! one remote call. Nothing is retried and nothing is written anywhere; the
//! caller persists the returned cards (or leaves its state untouched on
//! error).

use crate::cards::{ExtractedText, GeneratedCard};
use crate::config::{Difficulty, ExtractOptions};
use crate::error::{ExtractError, GenerateError, Pdf2CardsError};
use crate::pipeline::completion::CompletionClient;
use crate::pipeline::document::SourceDocument;
use crate::pipeline::extract::{extract_document, PdfEngine, PdfiumEngine};
use crate::pipeline::parse::parse_cards;
use crate::pipeline::request::GenerationRequest;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Extract text from an uploaded PDF with the default limits and pdfium.
///
/// # Errors
/// - [`ExtractError::InvalidType`] / [`ExtractError::TooLarge`] before any
///   page is read
/// - [`ExtractError::NoText`] for image-only documents
/// - [`ExtractError::ExtractionFailed`] for corrupt files or engine errors
pub async fn extract(document: SourceDocument) -> Result<ExtractedText, ExtractError> {
    extract_with(
        Arc::new(PdfiumEngine),
        document,
        &ExtractOptions::default(),
        CancellationToken::new(),
    )
    .await
}

/// [`extract`] with an explicit engine, limits and cancellation token.
pub async fn extract_with(
    engine: Arc<dyn PdfEngine>,
    document: SourceDocument,
    options: &ExtractOptions,
    cancel: CancellationToken,
) -> Result<ExtractedText, ExtractError> {
    extract_document(engine, document, options, cancel).await
}

/// Read a file from disk and extract its text.
///
/// The media type comes from the extension, so anything but `.pdf` fails
/// with [`ExtractError::InvalidType`].
pub async fn extract_file(path: impl AsRef<Path>) -> Result<ExtractedText, ExtractError> {
    let document = SourceDocument::from_path(path).await?;
    extract(document).await
}

/// Ask `client` for `count` cards about `source_text`.
///
/// `source_text` is cut to its first 8000 characters before it is sent.
/// The result holds every valid card in the reply, which may be fewer (or
/// more) than `count`.
///
/// # Errors
/// - [`GenerateError::RateLimited`] on HTTP 429
/// - [`GenerateError::ServiceUnavailable`] on other remote failures
/// - [`GenerateError::Unparseable`] when the reply holds no JSON array
/// - [`GenerateError::EmptyResult`] when the array holds no valid card
pub async fn generate(
    client: &dyn CompletionClient,
    source_text: &str,
    count: usize,
    difficulty: Difficulty,
) -> Result<Vec<GeneratedCard>, GenerateError> {
    let request = GenerationRequest::new(source_text, count, difficulty)?;
    generate_request(client, &request, &CancellationToken::new()).await
}

/// Run one prebuilt request, abandoning the remote call if `cancel` fires.
pub async fn generate_request(
    client: &dyn CompletionClient,
    request: &GenerationRequest,
    cancel: &CancellationToken,
) -> Result<Vec<GeneratedCard>, GenerateError> {
    if cancel.is_cancelled() {
        return Err(GenerateError::Cancelled);
    }

    let start = Instant::now();
    let prompt = request.prompt();

    let raw = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(GenerateError::Cancelled),
        result = client.complete(&prompt) => result?,
    };

    let parsed = parse_cards(&raw)?;
    info!(
        "Generated {} flashcards ({} requested, {} dropped) via {} in {:?}",
        parsed.cards.len(),
        request.count(),
        parsed.dropped,
        client.name(),
        start.elapsed()
    );
    Ok(parsed.cards)
}

/// Extract a PDF and generate cards from its text in one call.
pub async fn generate_from_pdf(
    engine: Arc<dyn PdfEngine>,
    client: &dyn CompletionClient,
    document: SourceDocument,
    count: usize,
    difficulty: Difficulty,
    cancel: CancellationToken,
) -> Result<Vec<GeneratedCard>, Pdf2CardsError> {
    let extracted =
        extract_with(engine, document, &ExtractOptions::default(), cancel.clone()).await?;
    let request = GenerationRequest::new(&extracted.text, count, difficulty)?;
    Ok(generate_request(client, &request, &cancel).await?)
}
