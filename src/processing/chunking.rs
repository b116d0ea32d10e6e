//! Recursive, separator-aware character chunking.
//!
//! This module decides where Rusty Docs cuts paragraph text. Highlights:
//!
//! - Priority separators: paragraph break, line break, sentence period, space. The first
//!   separator present in a piece of text is used; oversized pieces recurse with the remaining
//!   separators.
//! - Budget: chunk lengths are counted in characters and never exceed `chunk_size`, except for
//!   a single token that no remaining separator can split. Such a token is emitted whole.
//! - Overlap: after a chunk is emitted, trailing pieces totalling at most `chunk_overlap`
//!   characters are carried into the next chunk.
//! - Spans: all work is done on byte ranges of the input, so chunks borrow from the input
//!   text.

use std::collections::VecDeque;
use std::ops::Range;

use super::types::ChunkingError;

/// Default maximum chunk length in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 500;
/// Default overlap between consecutive chunks in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;
/// Separators tried in priority order.
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", ".", " "];

/// Validated chunking parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkConfig {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl ChunkConfig {
    /// Build a config with the default separators.
    ///
    /// Fails with [`ChunkingError::InvalidChunkConfig`] when `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ChunkingError> {
        Self::with_separators(
            chunk_size,
            chunk_overlap,
            DEFAULT_SEPARATORS.iter().map(|sep| sep.to_string()).collect(),
        )
    }

    /// Build a config with a custom separator priority list.
    ///
    /// An empty string separator splits between every character.
    pub fn with_separators(
        chunk_size: usize,
        chunk_overlap: usize,
        separators: Vec<String>,
    ) -> Result<Self, ChunkingError> {
        if chunk_overlap >= chunk_size {
            return Err(ChunkingError::InvalidChunkConfig {
                chunk_size,
                chunk_overlap,
            });
        }
        if separators.is_empty() {
            return Err(ChunkingError::NoSeparators);
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators,
        })
    }

    /// Maximum chunk length in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap carried between consecutive chunks.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Separator priority list.
    pub fn separators(&self) -> &[String] {
        &self.separators
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            separators: DEFAULT_SEPARATORS.iter().map(|sep| sep.to_string()).collect(),
        }
    }
}

/// Splits a single text into ordered pieces.
///
/// The assembler depends on this trait rather than on [`RecursiveChunker`] directly.
pub trait TextSplitter: Send + Sync {
    /// Split `text` into ordered, non-empty pieces.
    fn split<'a>(&self, text: &'a str) -> Result<Vec<&'a str>, ChunkingError>;
}

/// Character-budgeted recursive splitter.
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    config: ChunkConfig,
}

impl RecursiveChunker {
    /// Create a chunker from a validated config.
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    /// Split `text` into trimmed chunks borrowed from the input.
    pub fn chunks<'a>(&self, text: &'a str) -> Vec<&'a str> {
        self.split_spans(text)
            .into_iter()
            .map(|span| &text[span])
            .collect()
    }

    /// Split `text` into trimmed, non-empty byte ranges in document order.
    pub fn split_spans(&self, text: &str) -> Vec<Range<usize>> {
        let mut spans = Vec::new();
        if text.trim().is_empty() {
            return spans;
        }
        self.split_range(text, 0..text.len(), &self.config.separators, &mut spans);
        spans
    }

    fn split_range(
        &self,
        text: &str,
        range: Range<usize>,
        separators: &[String],
        out: &mut Vec<Range<usize>>,
    ) {
        let segment = &text[range.clone()];
        let (separator, fallback) = pick_separator(segment, separators);
        let pieces = cut_after_separator(segment, separator, range.start);

        let mut pending: Vec<Range<usize>> = Vec::new();
        for piece in pieces {
            if trimmed_len(text, &piece) <= self.config.chunk_size {
                pending.push(piece);
                continue;
            }

            if !pending.is_empty() {
                self.merge(text, &pending, out);
                pending.clear();
            }

            if fallback.is_empty() {
                tracing::warn!(
                    length = trimmed_len(text, &piece),
                    chunk_size = self.config.chunk_size,
                    "No separator left to split oversized piece; emitting it whole"
                );
                push_trimmed(text, piece, out);
            } else {
                self.split_range(text, piece, fallback, out);
            }
        }

        if !pending.is_empty() {
            self.merge(text, &pending, out);
        }
    }

    /// Greedily pack adjacent pieces into chunks, carrying an overlap tail between them.
    ///
    /// A window fits when its trimmed text is within `chunk_size`; the overlap tail counts
    /// the raw characters carried over.
    fn merge(&self, text: &str, pieces: &[Range<usize>], out: &mut Vec<Range<usize>>) {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;
        let mut window: VecDeque<(Range<usize>, usize)> = VecDeque::new();
        let mut total = 0usize;

        let fits = |window: &VecDeque<(Range<usize>, usize)>, piece: &Range<usize>| {
            window
                .front()
                .is_none_or(|(first, _)| trimmed_len(text, &(first.start..piece.end)) <= size)
        };

        for piece in pieces {
            let len = char_len(text, piece);
            if !fits(&window, piece) {
                push_trimmed(text, window_span(&window), out);
                while total > overlap || !fits(&window, piece) {
                    let Some((_, dropped)) = window.pop_front() else {
                        break;
                    };
                    total -= dropped;
                }
            }
            window.push_back((piece.clone(), len));
            total += len;
        }

        if !window.is_empty() {
            push_trimmed(text, window_span(&window), out);
        }
    }
}

impl TextSplitter for RecursiveChunker {
    fn split<'a>(&self, text: &'a str) -> Result<Vec<&'a str>, ChunkingError> {
        Ok(self.chunks(text))
    }
}

/// Choose the first separator found in `segment`; the rest become the fallback list.
///
/// When nothing matches, the last separator is used with no fallback so the segment stays whole.
fn pick_separator<'s>(segment: &str, separators: &'s [String]) -> (&'s str, &'s [String]) {
    for (idx, separator) in separators.iter().enumerate() {
        if separator.is_empty() || segment.contains(separator.as_str()) {
            return (separator.as_str(), &separators[idx + 1..]);
        }
    }
    let last = separators.last().map(String::as_str).unwrap_or("");
    (last, &[])
}

/// Cut `segment` after every occurrence of `separator`, returning absolute, non-empty ranges.
fn cut_after_separator(segment: &str, separator: &str, offset: usize) -> Vec<Range<usize>> {
    let mut pieces = Vec::new();
    let mut start = 0;

    if separator.is_empty() {
        for (idx, ch) in segment.char_indices() {
            pieces.push(offset + idx..offset + idx + ch.len_utf8());
        }
        return pieces;
    }

    for (idx, matched) in segment.match_indices(separator) {
        let end = idx + matched.len();
        if end > start {
            pieces.push(offset + start..offset + end);
        }
        start = end;
    }
    if start < segment.len() {
        pieces.push(offset + start..offset + segment.len());
    }
    pieces
}

fn window_span(window: &VecDeque<(Range<usize>, usize)>) -> Range<usize> {
    match (window.front(), window.back()) {
        (Some((first, _)), Some((last, _))) => first.start..last.end,
        _ => 0..0,
    }
}

fn push_trimmed(text: &str, span: Range<usize>, out: &mut Vec<Range<usize>>) {
    let slice = &text[span.clone()];
    let leading = slice.len() - slice.trim_start().len();
    let trailing = slice.len() - slice.trim_end().len();
    if leading + trailing >= slice.len() {
        return;
    }
    out.push(span.start + leading..span.end - trailing);
}

fn char_len(text: &str, span: &Range<usize>) -> usize {
    text[span.clone()].chars().count()
}

fn trimmed_len(text: &str, span: &Range<usize>) -> usize {
    text[span.clone()].trim().chars().count()
}
