//! Core data types and error definitions for the ingestion pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::extract::ExtractionError;
use super::fetch::FetchError;

/// One logical page of extracted text.
///
/// Formats without pagination (plain text, single images) produce a single page numbered `1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number, strictly increasing within a document.
    pub page_number: u32,
    /// Extracted page text; text blocks are separated by blank lines.
    pub text: String,
}

impl Page {
    /// Build a page from its number and text.
    pub fn new(page_number: u32, text: impl Into<String>) -> Self {
        Self {
            page_number,
            text: text.into(),
        }
    }
}

/// Provenance attached to every chunk for citation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Identifier of the owning document.
    pub doc_id: String,
    /// Page number the chunk was taken from.
    pub page: u32,
    /// 0-based paragraph index within the page.
    pub paragraph: usize,
    /// 0-based position within the paragraph's chunk sequence.
    pub chunk_index: usize,
    /// Human-readable citation string (`{doc_id}_page_{page}`).
    pub source: String,
}

impl ChunkMetadata {
    /// Build metadata for a chunk, deriving the citation string.
    pub fn new(doc_id: &str, page: u32, paragraph: usize, chunk_index: usize) -> Self {
        Self {
            doc_id: doc_id.to_string(),
            page,
            paragraph,
            chunk_index,
            source: format!("{doc_id}_page_{page}"),
        }
    }

    /// Ordering key shared by every chunk of the same position, independent of the random id.
    pub fn position(&self) -> (&str, u32, usize, usize) {
        (&self.doc_id, self.page, self.paragraph, self.chunk_index)
    }
}

/// The unit handed to the embedding/indexing sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Random UUID v4, never reused.
    pub id: String,
    /// Trimmed substring of a paragraph.
    pub text: String,
    /// Provenance metadata.
    pub metadata: ChunkMetadata,
}

/// Paragraph that contributed no chunks because the splitter rejected it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedParagraph {
    /// Page of the skipped paragraph.
    pub page: u32,
    /// Paragraph index within the page.
    pub paragraph: usize,
    /// Splitter error rendered as text.
    pub reason: String,
}

/// Non-fatal conditions raised while processing a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineWarning {
    /// Output was capped by `max_chunks`; the tail was dropped.
    Trimmed {
        /// Chunks produced before trimming.
        produced: usize,
        /// Chunks returned to the caller.
        kept: usize,
    },
    /// A paragraph was dropped because the splitter failed on it.
    ParagraphSkipped(SkippedParagraph),
}

impl std::fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trimmed { produced, kept } => {
                write!(f, "trimmed output from {produced} to {kept} chunks")
            }
            Self::ParagraphSkipped(skipped) => write!(
                f,
                "skipped page {} paragraph {}: {}",
                skipped.page, skipped.paragraph, skipped.reason
            ),
        }
    }
}

/// Result of one successful pipeline invocation.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Document the chunks belong to.
    pub doc_id: String,
    /// Chunks in `(page, paragraph, chunk_index)` order.
    pub chunks: Vec<Chunk>,
    /// Conditions the caller should surface (trimming, skipped paragraphs).
    pub warnings: Vec<PipelineWarning>,
}

impl PipelineOutput {
    /// Whether `max_chunks` truncated this output.
    pub fn was_trimmed(&self) -> bool {
        self.warnings
            .iter()
            .any(|warning| matches!(warning, PipelineWarning::Trimmed { .. }))
    }
}

/// Errors produced while configuring or running the recursive chunker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkingError {
    /// Overlap must be strictly smaller than the chunk size.
    #[error("invalid chunk config: overlap {chunk_overlap} must be smaller than chunk size {chunk_size}")]
    InvalidChunkConfig {
        /// Configured chunk size.
        chunk_size: usize,
        /// Configured overlap.
        chunk_overlap: usize,
    },
    /// At least one separator is required.
    #[error("invalid chunk config: separator list is empty")]
    NoSeparators,
}

/// Errors surfaced by the pipeline driver.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Declared extension is not one of the supported formats.
    #[error("unsupported file format: '{extension}'")]
    UnsupportedFormat {
        /// Rejected extension as supplied by the caller.
        extension: String,
    },
    /// Chunk size/overlap combination is unusable.
    #[error(transparent)]
    InvalidChunkConfig(#[from] ChunkingError),
    /// Remote document could not be fetched or staged.
    #[error("failed to fetch {url}: {source}")]
    FetchFailed {
        /// URL that was requested.
        url: String,
        /// Underlying fetch error.
        #[source]
        source: FetchError,
    },
    /// Format-specific extraction failed.
    #[error("extraction failed for document '{doc_id}': {source}")]
    ExtractionFailed {
        /// Document whose extraction failed.
        doc_id: String,
        /// Underlying extraction error.
        #[source]
        source: ExtractionError,
    },
    /// Blocking extraction task panicked or was cancelled.
    #[error("processing task for document '{doc_id}' did not complete: {source}")]
    TaskFailed {
        /// Document whose task failed.
        doc_id: String,
        /// Join error reported by the runtime.
        #[source]
        source: tokio::task::JoinError,
    },
}

impl PipelineError {
    /// Whether the caller may reasonably retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::FetchFailed { .. })
    }
}
