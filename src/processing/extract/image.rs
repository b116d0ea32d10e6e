//! OCR for raster images.
//!
//! The default engine shells out to the `tesseract` binary and reads the recognized text from
//! stdout. OCR output is passed through unchanged.

use std::path::Path;
use std::process::{Command, ExitStatus};
use thiserror::Error;

use super::ExtractionError;
use crate::processing::types::Page;

/// Errors raised by OCR engines.
#[derive(Debug, Error)]
pub enum OcrError {
    /// OCR process could not be started.
    #[error("failed to launch '{binary}': {source}")]
    Spawn {
        /// Binary that was invoked.
        binary: String,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },
    /// OCR process ran but reported failure.
    #[error("'{binary}' exited with {status}: {stderr}")]
    Failed {
        /// Binary that was invoked.
        binary: String,
        /// Exit status of the process.
        status: ExitStatus,
        /// Captured standard error.
        stderr: String,
    },
}

/// Recognizes text in an image file.
pub trait OcrEngine: Send + Sync {
    /// Return the text recognized in the image at `image`.
    fn recognize(&self, image: &Path) -> Result<String, OcrError>;
}

/// OCR engine invoking the Tesseract command-line tool.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    binary: String,
    language: String,
}

impl TesseractCli {
    /// Create an engine running `binary` with the given language pack.
    pub fn new(binary: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
        }
    }
}

impl OcrEngine for TesseractCli {
    fn recognize(&self, image: &Path) -> Result<String, OcrError> {
        let output = Command::new(&self.binary)
            .arg(image)
            .arg("stdout")
            .args(["-l", &self.language])
            .output()
            .map_err(|source| OcrError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(OcrError::Failed {
                binary: self.binary.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        tracing::debug!(chars = text.len(), "Tesseract OCR finished");
        Ok(text)
    }
}

pub(super) fn extract_image(
    engine: &dyn OcrEngine,
    path: &Path,
) -> Result<Vec<Page>, ExtractionError> {
    let text = engine.recognize(path)?;
    if text.trim().is_empty() {
        tracing::warn!(path = %path.display(), "OCR recognized no text");
    }
    Ok(vec![Page::new(1, text)])
}
