//! PDF text extraction, one section per page.
//!
//! Only the text layer is read. Scanned pages come out as a short note
//! instead of text.

use async_trait::async_trait;
use lopdf::Document;
use std::path::Path;
use tracing::warn;

use crate::converter::{display_name, display_stem, file_extension, ConversionOutcome, Converter};
use crate::error::{ConvertError, Result};

/// Text of the extracted pages of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfText {
    /// `(page number, text)` in page order; `None` if the page failed
    pub pages: Vec<(u32, Option<String>)>,
    pub page_count: u32,
}

impl PdfText {
    pub fn is_truncated(&self) -> bool {
        (self.pages.len() as u32) < self.page_count
    }
}

/// Extract the text of at most `max_pages` pages.
pub fn extract_pdf_text(bytes: &[u8], max_pages: u32) -> Result<PdfText> {
    if bytes.is_empty() {
        return Err(ConvertError::Parse("PDF: empty file".to_string()));
    }

    let doc = Document::load_mem(bytes)
        .map_err(|e| ConvertError::Parse(format!("PDF: invalid document: {}", e)))?;
    let mut page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    page_numbers.sort_unstable();
    let page_count = u32::try_from(page_numbers.len()).unwrap_or(u32::MAX);

    let pages = page_numbers
        .into_iter()
        .take(max_pages as usize)
        .map(|number| match doc.extract_text(&[number]) {
            Ok(text) => (number, Some(text)),
            Err(e) => {
                warn!(page = number, error = %e, "PDF page text extraction failed");
                (number, None)
            }
        })
        .collect();

    Ok(PdfText { pages, page_count })
}

fn render(source: &Path, pdf: &PdfText) -> String {
    let mut out = String::new();
    out.push_str("---\n");
    out.push_str(&format!("source_file: {}\n", display_name(source)));
    out.push_str(&format!(
        "original_format: {}\n",
        file_extension(source).unwrap_or_default()
    ));
    out.push_str(&format!("total_pages: {}\n", pdf.page_count));
    out.push_str(&format!("pages_converted: {}\n", pdf.pages.len()));
    out.push_str(&format!("truncated: {}\n", pdf.is_truncated()));
    out.push_str("converted_by: PdfConverter\n");
    out.push_str("---\n\n");
    out.push_str(&format!("# {}\n", display_stem(source)));

    for (number, text) in &pdf.pages {
        out.push_str(&format!("\n## Page {}\n\n", number));
        match text.as_deref().map(str::trim) {
            Some("") => out.push_str("_No text on this page (image-only or scanned)_\n"),
            Some(text) => {
                out.push_str(text);
                out.push('\n');
            }
            None => out.push_str("_Text extraction failed for this page_\n"),
        }
    }

    if pdf.is_truncated() {
        out.push_str(&format!(
            "\n---\n\nOnly the first {} of {} pages were converted.\n",
            pdf.pages.len(),
            pdf.page_count
        ));
    }
    out
}

pub struct PdfConverter {
    max_pages: u32,
}

impl PdfConverter {
    pub fn new(max_pages: u32) -> Self {
        Self {
            max_pages: max_pages.max(1),
        }
    }
}

#[async_trait]
impl Converter for PdfConverter {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn can_handle(&self, path: &Path) -> bool {
        file_extension(path).as_deref() == Some(".pdf")
    }

    async fn convert(&self, input: &Path, output: &Path) -> Result<ConversionOutcome> {
        let bytes = tokio::fs::read(input).await?;
        let max_pages = self.max_pages;
        let pdf = tokio::task::spawn_blocking(move || extract_pdf_text(&bytes, max_pages)).await??;
        tokio::fs::write(output, render(input, &pdf)).await?;
        Ok(ConversionOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    /// Document with one text line per page.
    fn pdf_bytes(lines: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for line in lines {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![100.into(), 600.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*line)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
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
    fn test_extracts_each_page() {
        let pdf = extract_pdf_text(&pdf_bytes(&["First page", "Second page"]), 100).unwrap();

        assert_eq!(pdf.page_count, 2);
        assert!(!pdf.is_truncated());
        assert_eq!(pdf.pages[0].0, 1);
        assert!(pdf.pages[0].1.as_deref().unwrap().contains("First page"));
        assert!(pdf.pages[1].1.as_deref().unwrap().contains("Second page"));
    }

    #[test]
    fn test_page_limit_truncates() {
        let pdf = extract_pdf_text(&pdf_bytes(&["a", "b", "c"]), 2).unwrap();
        assert_eq!(pdf.page_count, 3);
        assert_eq!(pdf.pages.len(), 2);
        assert!(pdf.is_truncated());

        let rendered = render(Path::new("/x/scan.pdf"), &pdf);
        assert!(rendered.contains("truncated: true\n"));
        assert!(rendered.contains("Only the first 2 of 3 pages were converted."));
        assert!(!rendered.contains("## Page 3"));
    }

    #[test]
    fn test_rejects_non_pdf() {
        assert!(matches!(
            extract_pdf_text(b"not a pdf", 10),
            Err(ConvertError::Parse(_))
        ));
        assert!(extract_pdf_text(&[], 10).is_err());
    }

    #[test]
    fn test_blank_and_failed_pages_are_noted() {
        let pdf = PdfText {
            pages: vec![(1, Some("  \n".to_string())), (2, None)],
            page_count: 2,
        };
        let rendered = render(Path::new("report.pdf"), &pdf);
        assert!(rendered.contains("## Page 1\n\n_No text on this page"));
        assert!(rendered.contains("## Page 2\n\n_Text extraction failed"));
        assert!(rendered.contains("# report\n"));
    }

    #[tokio::test]
    async fn test_convert_writes_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("report.pdf");
        let output = dir.path().join("report.pdf.md");
        tokio::fs::write(&input, pdf_bytes(&["Quarterly report"])).await.unwrap();

        let converter = PdfConverter::new(100);
        assert!(converter.can_handle(&input));
        converter.convert(&input, &output).await.unwrap();

        let written = tokio::fs::read_to_string(&output).await.unwrap();
        assert!(written.contains("source_file: report.pdf\n"));
        assert!(written.contains("total_pages: 1\n"));
        assert!(written.contains("## Page 1\n\n"));
        assert!(written.contains("Quarterly report"));
    }
}
