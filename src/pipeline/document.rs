//! Source documents: an uploaded blob plus the checks run before extraction.
//!
//! Validation runs before the PDF engine is touched: media type, declared
//! size, then the `%PDF` magic bytes. A blob
//! that fails any of these never reaches [`super::extract`].

use crate::config::ExtractOptions;
use crate::error::ExtractError;
use std::path::Path;
use tracing::debug;

/// The only media type the extractor accepts.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// An uploaded file held in memory until its text has been extracted.
#[derive(Clone)]
pub struct SourceDocument {
    bytes: Vec<u8>,
    media_type: String,
    declared_size: u64,
    file_name: Option<String>,
}

impl std::fmt::Debug for SourceDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceDocument")
            .field("media_type", &self.media_type)
            .field("declared_size", &self.declared_size)
            .field("file_name", &self.file_name)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl SourceDocument {
    /// Wrap `bytes` with the media type the uploader declared.
    ///
    /// The declared size is the byte length.
    pub fn new(bytes: Vec<u8>, media_type: impl Into<String>) -> Self {
        let declared_size = bytes.len() as u64;
        Self {
            bytes,
            media_type: media_type.into(),
            declared_size,
            file_name: None,
        }
    }

    /// Shorthand for a PDF upload.
    pub fn pdf(bytes: Vec<u8>) -> Self {
        Self::new(bytes, PDF_MEDIA_TYPE)
    }

    /// Override the declared size, e.g. with the `Content-Length` of an upload.
    pub fn with_declared_size(mut self, size: u64) -> Self {
        self.declared_size = size;
        self
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// The larger of the declared size and the actual byte count.
    pub fn size(&self) -> u64 {
        self.declared_size.max(self.bytes.len() as u64)
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Check type, size and magic bytes. Performs no extraction work.
    pub fn validate(&self, options: &ExtractOptions) -> Result<(), ExtractError> {
        if !is_pdf_media_type(&self.media_type) {
            return Err(ExtractError::InvalidType {
                media_type: self.media_type.clone(),
            });
        }

        let size = self.size();
        if size > options.max_bytes {
            return Err(ExtractError::TooLarge {
                size,
                limit: options.max_bytes,
            });
        }

        match self.bytes.get(..4) {
            Some(magic) if magic == b"%PDF" => {}
            Some(magic) => {
                return Err(ExtractError::ExtractionFailed {
                    detail: format!("not a PDF (first bytes: {magic:?})"),
                })
            }
            None => {
                return Err(ExtractError::ExtractionFailed {
                    detail: format!("file is only {} bytes", self.bytes.len()),
                })
            }
        }

        debug!(
            "Validated document {:?}: {} bytes",
            self.file_name.as_deref().unwrap_or("<upload>"),
            size
        );
        Ok(())
    }

    /// Read a document from disk, inferring the media type from the extension.
    ///
    /// Applies the default size ceiling; see [`Self::from_path_with`].
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ExtractError> {
        Self::from_path_with(path, &ExtractOptions::default()).await
    }

    /// [`Self::from_path`] with an explicit size ceiling.
    ///
    /// The size comes from file metadata, so an oversized file fails before
    /// any of it is read. As in [`Self::validate`], a wrong type is reported
    /// ahead of the size.
    pub async fn from_path_with(
        path: impl AsRef<Path>,
        options: &ExtractOptions,
    ) -> Result<Self, ExtractError> {
        let path = path.as_ref();
        let media_type = media_type_for_path(path);

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| read_error(path, e))?;
        if metadata.is_dir() {
            return Err(ExtractError::ExtractionFailed {
                detail: format!("{} is a directory", path.display()),
            });
        }
        if metadata.len() > options.max_bytes {
            if !is_pdf_media_type(media_type) {
                return Err(ExtractError::InvalidType {
                    media_type: media_type.to_string(),
                });
            }
            return Err(ExtractError::TooLarge {
                size: metadata.len(),
                limit: options.max_bytes,
            });
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| read_error(path, e))?;

        let mut doc = Self::new(bytes, media_type);
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            doc = doc.with_file_name(name);
        }
        Ok(doc)
    }
}

fn read_error(path: &Path, e: std::io::Error) -> ExtractError {
    match e.kind() {
        std::io::ErrorKind::NotFound => ExtractError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => ExtractError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => ExtractError::ExtractionFailed {
            detail: format!("reading {}: {e}", path.display()),
        },
    }
}

/// Case-insensitive media type check that ignores parameters (`; charset=...`).
pub fn is_pdf_media_type(media_type: &str) -> bool {
    media_type
        .split(';')
        .next()
        .map(|t| t.trim().eq_ignore_ascii_case(PDF_MEDIA_TYPE))
        .unwrap_or(false)
}

/// Guess a media type from a file extension.
pub fn media_type_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => PDF_MEDIA_TYPE,
        Some("txt") | Some("md") => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Whether a path looks like plain text the generator can take directly.
pub fn is_plain_text_path(path: &Path) -> bool {
    media_type_for_path(path) == "text/plain"
}
