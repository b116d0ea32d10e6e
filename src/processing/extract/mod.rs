//! Format-specific text extraction producing ordered pages.

mod image;
mod pdf;
mod text;

pub use image::{OcrEngine, OcrError, TesseractCli};

use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use super::types::{Page, PipelineError};

/// Errors raised while turning a file into pages.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Input could not be read.
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
    /// Plain-text input was not valid UTF-8.
    #[error("text input is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    /// PDF parsing or page text extraction failed.
    #[error("PDF extraction failed: {0}")]
    Pdf(#[from] lopdf::Error),
    /// OCR engine could not process the image.
    #[error("OCR failed: {0}")]
    Ocr(#[from] OcrError),
    /// Image formats are processed from disk, not from memory.
    #[error("{0:?} input must be extracted from a file path")]
    RequiresPath(DocumentFormat),
}

/// Supported input formats, derived from the declared file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// Portable Document Format.
    Pdf,
    /// UTF-8 plain text.
    Text,
    /// Raster image processed with OCR.
    Image,
}

impl DocumentFormat {
    /// Map an extension (`.pdf`, `txt`, `.JPG`, ...) to a format.
    pub fn from_extension(extension: &str) -> Result<Self, PipelineError> {
        let normalized = extension.trim().trim_start_matches('.').to_lowercase();
        match normalized.as_str() {
            "pdf" => Ok(Self::Pdf),
            "txt" => Ok(Self::Text),
            "png" | "jpg" | "jpeg" => Ok(Self::Image),
            _ => Err(PipelineError::UnsupportedFormat {
                extension: extension.to_string(),
            }),
        }
    }

    /// Derive the format from a path's extension.
    pub fn from_path(path: &Path) -> Result<Self, PipelineError> {
        let extension = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        Self::from_extension(&extension)
    }

    /// Canonical suffix used when staging files of this format.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Pdf => ".pdf",
            Self::Text => ".txt",
            Self::Image => ".png",
        }
    }
}

/// Dispatches extraction by format; holds the OCR engine used for images.
#[derive(Clone)]
pub struct TextExtractor {
    ocr: Arc<dyn OcrEngine>,
}

impl TextExtractor {
    /// Build an extractor around the given OCR engine.
    pub fn new(ocr: Arc<dyn OcrEngine>) -> Self {
        Self { ocr }
    }

    /// Extract pages from a file on disk. The file is only read.
    pub fn extract_file(
        &self,
        path: &Path,
        format: DocumentFormat,
    ) -> Result<Vec<Page>, ExtractionError> {
        tracing::debug!(path = %path.display(), ?format, "Extracting document");
        let pages = match format {
            DocumentFormat::Image => image::extract_image(self.ocr.as_ref(), path)?,
            DocumentFormat::Pdf | DocumentFormat::Text => {
                let bytes = std::fs::read(path)?;
                self.extract_bytes(&bytes, format)?
            }
        };
        tracing::debug!(path = %path.display(), pages = pages.len(), "Extraction finished");
        Ok(pages)
    }

    /// Extract pages from in-memory PDF or text bytes.
    pub fn extract_bytes(
        &self,
        bytes: &[u8],
        format: DocumentFormat,
    ) -> Result<Vec<Page>, ExtractionError> {
        match format {
            DocumentFormat::Pdf => pdf::extract_pdf(bytes),
            DocumentFormat::Text => text::extract_text(bytes),
            DocumentFormat::Image => Err(ExtractionError::RequiresPath(format)),
        }
    }
}

impl std::fmt::Debug for TextExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextExtractor").finish_non_exhaustive()
    }
}
