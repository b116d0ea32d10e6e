//! Turns extracted pages into chunk records with provenance metadata.

use uuid::Uuid;

use super::chunking::TextSplitter;
use super::types::{Chunk, ChunkMetadata, Page, SkippedParagraph};

const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Chunks for one document plus the paragraphs that could not be chunked.
#[derive(Debug, Clone, Default)]
pub struct AssembledDocument {
    /// Chunks in `(page, paragraph, chunk_index)` order.
    pub chunks: Vec<Chunk>,
    /// Paragraphs dropped because the splitter failed on them.
    pub skipped: Vec<SkippedParagraph>,
}

/// Split page text into trimmed, non-empty paragraphs.
pub fn paragraphs(text: &str) -> impl Iterator<Item = &str> {
    text.split(PARAGRAPH_SEPARATOR)
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
}

/// Walks pages and paragraphs, delegating each paragraph to a [`TextSplitter`].
pub struct ChunkAssembler<'s> {
    splitter: &'s dyn TextSplitter,
}

impl<'s> ChunkAssembler<'s> {
    /// Create an assembler over the given splitter.
    pub fn new(splitter: &'s dyn TextSplitter) -> Self {
        Self { splitter }
    }

    /// Produce chunk records for every page of `doc_id`, in document order.
    pub fn assemble(&self, doc_id: &str, pages: &[Page]) -> AssembledDocument {
        let mut assembled = AssembledDocument::default();

        for page in pages {
            for (paragraph_index, paragraph) in paragraphs(&page.text).enumerate() {
                let pieces = match self.splitter.split(paragraph) {
                    Ok(pieces) => pieces,
                    Err(error) => {
                        tracing::warn!(
                            doc_id,
                            page = page.page_number,
                            paragraph = paragraph_index,
                            error = %error,
                            "Skipping paragraph the splitter rejected"
                        );
                        assembled.skipped.push(SkippedParagraph {
                            page: page.page_number,
                            paragraph: paragraph_index,
                            reason: error.to_string(),
                        });
                        continue;
                    }
                };

                assembled
                    .chunks
                    .extend(pieces.into_iter().enumerate().map(|(chunk_index, piece)| {
                        Chunk {
                            id: Uuid::new_v4().to_string(),
                            text: piece.to_string(),
                            metadata: ChunkMetadata::new(
                                doc_id,
                                page.page_number,
                                paragraph_index,
                                chunk_index,
                            ),
                        }
                    }));
            }
        }

        tracing::debug!(
            doc_id,
            pages = pages.len(),
            chunks = assembled.chunks.len(),
            skipped = assembled.skipped.len(),
            "Assembled document chunks"
        );
        assembled
    }
}
