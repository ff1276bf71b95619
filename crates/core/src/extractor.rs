use crate::error::IngestError;
use crate::models::Document;
use lopdf::Document as PdfDocument;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

/// Page texts of one PDF plus the pages whose text could not be decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdfText {
    pub pages: Vec<PageText>,
    pub unreadable_pages: Vec<u32>,
}

pub trait PdfExtractor {
    /// Extracts the readable text of each page.
    ///
    /// Pages without text (scanned images, blank pages) are left out and
    /// pages that fail to decode are listed in `unreadable_pages`; a valid
    /// PDF without any text yields no pages rather than an error.
    fn extract_pages(&self, path: &Path) -> Result<PdfText, IngestError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<PdfText, IngestError> {
        let document =
            PdfDocument::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;

        Ok(collect_pages(document.get_pages().into_keys(), |page_no| {
            document.extract_text(&[page_no])
        }))
    }
}

fn collect_pages<I, F, E>(page_numbers: I, mut extract: F) -> PdfText
where
    I: IntoIterator<Item = u32>,
    F: FnMut(u32) -> Result<String, E>,
{
    let mut extracted = PdfText::default();
    for number in page_numbers {
        match extract(number) {
            Ok(text) if !text.trim().is_empty() => extracted.pages.push(PageText { number, text }),
            Ok(_) => {}
            Err(_) => extracted.unreadable_pages.push(number),
        }
    }
    extracted
}

pub fn extract_page_texts(path: &Path) -> Result<PdfText, IngestError> {
    LopdfExtractor.extract_pages(path)
}

/// Joins page texts into one document, separating pages with a blank line.
pub fn document_from_pages(source_id: impl Into<String>, pages: &[PageText]) -> Document {
    let text = pages
        .iter()
        .map(|page| page.text.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    Document::new(source_id, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_are_joined_with_blank_lines() {
        let pages = vec![
            PageText {
                number: 1,
                text: "  First page\n".to_string(),
            },
            PageText {
                number: 2,
                text: "   ".to_string(),
            },
            PageText {
                number: 3,
                text: "Third page".to_string(),
            },
        ];

        let document = document_from_pages("manual.pdf", &pages);

        assert_eq!(document.source_id, "manual.pdf");
        assert_eq!(document.text, "First page\n\nThird page");
    }

    #[test]
    fn failing_pages_are_skipped_not_fatal() {
        let extracted = collect_pages([1, 2, 3, 4], |number| match number {
            2 => Err("bad content stream"),
            3 => Ok("   ".to_string()),
            _ => Ok(format!("page {number}")),
        });

        assert_eq!(
            extracted.pages,
            vec![
                PageText {
                    number: 1,
                    text: "page 1".to_string(),
                },
                PageText {
                    number: 4,
                    text: "page 4".to_string(),
                },
            ]
        );
        assert_eq!(extracted.unreadable_pages, vec![2]);
    }

    #[test]
    fn no_pages_make_an_empty_document() {
        assert!(document_from_pages("scan.pdf", &[]).text.is_empty());
    }

    #[test]
    fn unreadable_file_is_a_parse_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.4\n%broken")?;

        assert!(matches!(
            extract_page_texts(&path),
            Err(IngestError::PdfParse(_))
        ));
        Ok(())
    }
}
