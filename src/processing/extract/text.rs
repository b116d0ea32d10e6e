use super::ExtractionError;
use crate::processing::types::Page;

pub(super) fn extract_text(bytes: &[u8]) -> Result<Vec<Page>, ExtractionError> {
    let text = String::from_utf8(bytes.to_vec())?;
    Ok(vec![Page::new(1, text)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_text_verbatim() {
        let pages = extract_text("Ünïcödé\n\nsecond".as_bytes()).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].page_number, 1);
        assert_eq!(pages[0].text, "Ünïcödé\n\nsecond");
    }

    #[test]
    fn empty_file_is_one_empty_page() {
        let pages = extract_text(b"").unwrap();
        assert_eq!(pages, vec![Page::new(1, "")]);
    }

    #[test]
    fn rejects_invalid_utf8() {
        let error = extract_text(&[0x66, 0xff, 0x6f]).unwrap_err();
        assert!(matches!(error, ExtractionError::InvalidUtf8(_)));
    }
}
