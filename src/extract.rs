//! Document bytes to page texts.

use crate::error::{Error, Result};

const FORM_FEED: char = '\u{000C}';

/// Raw text of a document, one entry per page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedText {
    pub pages: Vec<String>,
}

pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedText>;
}

/// UTF-8 text files. Form feeds separate pages, which is what `pdftotext`
/// and similar converters emit.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedText> {
        if bytes.starts_with(b"%PDF-") {
            return Err(Error::Extraction(
                "PDF input needs converting to text first (e.g. `pdftotext file.pdf`)".into(),
            ));
        }

        let text = std::str::from_utf8(bytes)
            .map_err(|e| Error::Extraction(format!("input is not valid UTF-8: {e}")))?;
        let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);

        Ok(ExtractedText {
            pages: text.split(FORM_FEED).map(str::to_string).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_form_feed_splits_pages() {
        let extracted = PlainTextExtractor
            .extract("page one\n\u{000C}page two\u{000C}".as_bytes())
            .unwrap();
        assert_eq!(extracted.pages, vec!["page one\n", "page two", ""]);
    }

    #[test]
    fn test_single_page_without_form_feed() {
        let extracted = PlainTextExtractor.extract(b"just text").unwrap();
        assert_eq!(extracted.pages, vec!["just text"]);
    }

    #[test]
    fn test_byte_order_mark_stripped() {
        let extracted = PlainTextExtractor.extract("\u{FEFF}hello".as_bytes()).unwrap();
        assert_eq!(extracted.pages, vec!["hello"]);
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let err = PlainTextExtractor.extract(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Extraction);
    }

    #[test]
    fn test_pdf_rejected_with_hint() {
        let err = PlainTextExtractor.extract(b"%PDF-1.7 ...").unwrap_err();
        assert!(err.to_string().contains("pdftotext"));
    }
}
