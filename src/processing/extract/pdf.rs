//! PDF page extraction backed by `lopdf`.
//!
//! Each page's text objects (BT/ET blocks) become text blocks; lopdf terminates every block
//! with a newline. Image and path operators carry no text and are never emitted. Retained
//! blocks are joined with a blank line so the assembler sees one paragraph per block.

use lopdf::Document;

use super::ExtractionError;
use crate::processing::types::Page;

const BLOCK_SEPARATOR: &str = "\n\n";

pub(super) fn extract_pdf(bytes: &[u8]) -> Result<Vec<Page>, ExtractionError> {
    let document = Document::load_mem(bytes)?;
    let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();

    let mut pages = Vec::with_capacity(page_numbers.len());
    for (index, page_number) in page_numbers.into_iter().enumerate() {
        let raw = document.extract_text(&[page_number])?;
        let text = join_text_blocks(&raw);
        tracing::trace!(page = page_number, chars = text.len(), "Extracted PDF page");
        pages.push(Page::new(index as u32 + 1, text));
    }

    Ok(pages)
}

fn join_text_blocks(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}
