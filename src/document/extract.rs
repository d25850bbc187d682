//! PDF text extraction.
//!
//! Epistemic foundation:
//! - K_i: Pages are visited in document order
//! - B_i: The upload is a parseable PDF (might fail → Extraction error)
//! - B_i: Some page carries a text layer (scanned PDFs have none)

use crate::models::{QuizError, Result};
use lopdf::Document;
use tracing::debug;

/// Text pulled out of a PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfText {
    /// Non-empty pages joined with `\n`
    pub text: String,
    /// Pages in the document
    pub page_count: usize,
    /// Pages that yielded text
    pub pages_with_text: usize,
}

impl PdfText {
    /// Whether no page yielded any text.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Unwrap the text, turning "no text at all" into a user-facing error.
    pub fn require_text(self) -> Result<String> {
        if self.is_empty() {
            return Err(QuizError::Extraction(
                "No extractable text found in the uploaded PDF.".to_string(),
            ));
        }
        Ok(self.text)
    }
}

/// Extract text from in-memory PDF bytes.
///
/// Pages yielding no text are skipped. A document where no page yields
/// text produces an empty [`PdfText`], not an error.
pub fn extract_text(bytes: &[u8]) -> Result<PdfText> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| QuizError::Extraction(format!("Failed to load PDF: {e}")))?;

    let pages = doc.get_pages();
    let page_count = pages.len();
    let mut texts = Vec::with_capacity(page_count);

    for page_num in pages.keys() {
        let content = doc.extract_text(&[*page_num]).map_err(|e| {
            QuizError::Extraction(format!("Failed to read page {page_num}: {e}"))
        })?;
        if !content.trim().is_empty() {
            texts.push(content);
        }
    }

    debug!(
        pages = page_count,
        pages_with_text = texts.len(),
        "Extracted PDF text"
    );

    Ok(PdfText {
        pages_with_text: texts.len(),
        text: texts.join("\n"),
        page_count,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    /// Build a PDF with one page per entry; `None` pages carry no text.
    pub(crate) fn build_pdf(pages: &[Option<&str>]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut kids: Vec<Object> = Vec::new();
        for page in pages {
            let operations = match page {
                Some(text) => vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
                None => vec![],
            };
            let content = Content { operations };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        let pages_dict = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages_dict));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_extract_pages_in_order() {
        let pdf = build_pdf(&[Some("Photosynthesis basics"), Some("Light reactions")]);
        let extracted = extract_text(&pdf).unwrap();

        assert_eq!(extracted.page_count, 2);
        assert_eq!(extracted.pages_with_text, 2);
        let first = extracted.text.find("Photosynthesis basics").unwrap();
        let second = extracted.text.find("Light reactions").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_extract_skips_empty_pages() {
        let pdf = build_pdf(&[Some("Alpha"), None, Some("Gamma")]);
        let extracted = extract_text(&pdf).unwrap();

        assert_eq!(extracted.page_count, 3);
        assert_eq!(extracted.pages_with_text, 2);
        assert!(extracted.text.contains("Alpha"));
        assert!(extracted.text.contains("Gamma"));
    }

    #[test]
    fn test_extract_no_text_is_empty_not_error() {
        let pdf = build_pdf(&[None, None]);
        let extracted = extract_text(&pdf).unwrap();

        assert!(extracted.is_empty());
        assert_eq!(extracted.pages_with_text, 0);
        let err = extracted.require_text().unwrap_err();
        assert!(matches!(err, QuizError::Extraction(_)));
    }

    #[test]
    fn test_extract_rejects_garbage() {
        let err = extract_text(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, QuizError::Extraction(_)));
    }
}
