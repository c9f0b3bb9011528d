//! Text extraction: turn a validated PDF into page-ordered plain text.
//!
//! ## Engine seam
//!
//! The page loop ([`extract_pages`]) only needs two things from a PDF
//! library: how many pages there are, and the text items on page *n*. Those
//! are the [`PageSource`] trait. [`PdfEngine`] opens raw bytes and drives the
//! loop; [`PdfiumEngine`] is the production engine, tests plug in fakes.
//!
//! ## Why spawn_blocking?
//!
//! pdfium keeps thread-local state and blocks while parsing, so the engine
//! runs on tokio's blocking pool. Cancellation is checked before each page,
//! which bounds the wasted work after a cancel to a single page.

use crate::cards::ExtractedText;
use crate::config::ExtractOptions;
use crate::error::ExtractError;
use crate::pipeline::document::SourceDocument;
use pdfium_render::prelude::*;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Separator between text items on one page.
pub const ITEM_SEPARATOR: &str = " ";

/// Separator between pages: one blank line.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Random access to the text of an opened document.
pub trait PageSource {
    /// Total pages in the document.
    fn page_count(&self) -> usize;

    /// Text items of the page at 0-based `index`, in extraction order.
    fn page_items(&mut self, index: usize) -> Result<Vec<String>, ExtractError>;
}

/// Something that can open PDF bytes and extract their text.
pub trait PdfEngine: Send + Sync {
    fn extract(
        &self,
        bytes: &[u8],
        max_pages: usize,
        cancel: &CancellationToken,
    ) -> Result<ExtractedText, ExtractError>;
}

/// Read pages `0..min(total, max_pages)` and join their text.
///
/// Pages past the cap are never requested from `source`.
pub fn extract_pages(
    source: &mut dyn PageSource,
    max_pages: usize,
    cancel: &CancellationToken,
) -> Result<ExtractedText, ExtractError> {
    let total_pages = source.page_count();
    let pages_to_read = total_pages.min(max_pages);
    if total_pages > max_pages {
        debug!(
            "Document has {} pages; reading the first {}",
            total_pages, max_pages
        );
    }

    let mut pages = Vec::with_capacity(pages_to_read);
    for idx in 0..pages_to_read {
        if cancel.is_cancelled() {
            return Err(ExtractError::Cancelled);
        }
        let items = source.page_items(idx)?;
        pages.push(items.join(ITEM_SEPARATOR));
    }

    let text = pages.join(PAGE_SEPARATOR);
    if text.trim().is_empty() {
        return Err(ExtractError::NoText);
    }

    Ok(ExtractedText {
        text,
        pages_read: pages_to_read,
        total_pages,
    })
}

/// Validate `document`, then extract its text on the blocking pool.
///
/// Type and size violations return before `engine` is called.
pub async fn extract_document(
    engine: Arc<dyn PdfEngine>,
    document: SourceDocument,
    options: &ExtractOptions,
    cancel: CancellationToken,
) -> Result<ExtractedText, ExtractError> {
    document.validate(options)?;
    if cancel.is_cancelled() {
        return Err(ExtractError::Cancelled);
    }

    let max_pages = options.max_pages;
    let name = document.file_name().unwrap_or("<upload>").to_string();
    let bytes = document.into_bytes();

    let extracted = tokio::task::spawn_blocking(move || engine.extract(&bytes, max_pages, &cancel))
        .await
        .map_err(|e| ExtractError::ExtractionFailed {
            detail: format!("extraction task panicked: {e}"),
        })??;

    info!(
        "Extracted {} chars from {}/{} pages of {}",
        extracted.char_count(),
        extracted.pages_read,
        extracted.total_pages,
        name
    );
    Ok(extracted)
}

// ── pdfium ───────────────────────────────────────────────────────────────

/// Production engine backed by pdfium.
///
/// The library is bound per call through `pdfium-auto`, which downloads and
/// caches it on first use (or honours `PDFIUM_LIB_PATH`).
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfiumEngine;

impl PdfEngine for PdfiumEngine {
    fn extract(
        &self,
        bytes: &[u8],
        max_pages: usize,
        cancel: &CancellationToken,
    ) -> Result<ExtractedText, ExtractError> {
        let pdfium = pdfium_auto::bind_pdfium_silent()
            .map_err(|e| ExtractError::PdfiumUnavailable(e.to_string()))?;

        let document = pdfium.load_pdf_from_byte_slice(bytes, None).map_err(|e| {
            ExtractError::ExtractionFailed {
                detail: format!("{:?}", e),
            }
        })?;

        let mut source = PdfiumPages {
            document: &document,
        };
        extract_pages(&mut source, max_pages, cancel)
    }
}

struct PdfiumPages<'a, 'b> {
    document: &'b PdfDocument<'a>,
}

impl PageSource for PdfiumPages<'_, '_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    /// Each pdfium text segment (a run of characters sharing a baseline and
    /// font) is one item, in page order.
    fn page_items(&mut self, index: usize) -> Result<Vec<String>, ExtractError> {
        let page = self
            .document
            .pages()
            .get(index as u16)
            .map_err(|e| ExtractError::ExtractionFailed {
                detail: format!("page {}: {:?}", index + 1, e),
            })?;

        let text = page.text().map_err(|e| ExtractError::ExtractionFailed {
            detail: format!("page {} text: {:?}", index + 1, e),
        })?;

        let items = text.segments().iter().map(|segment| segment.text()).collect();
        Ok(items)
    }
}
