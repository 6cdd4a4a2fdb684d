//! Paragraph text of `word/document.xml` inside a DOCX container.

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::Read as _;
use std::path::Path;

use crate::converter::{display_name, display_stem, file_extension, ConversionOutcome, Converter};
use crate::error::{ConvertError, Result};

pub struct DocxConverter;

impl DocxConverter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DocxConverter {
    fn default() -> Self {
        Self::new()
    }
}

fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().rposition(|b| *b == b':') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

fn ensure_newline(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

/// Extract paragraph text, one paragraph per line.
pub fn extract_docx_text(bytes: &[u8]) -> Result<String> {
    if bytes.is_empty() {
        return Err(ConvertError::Parse("DOCX: empty file".to_string()));
    }

    let mut zip = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ConvertError::Parse(format!("DOCX: invalid zip container: {}", e)))?;
    let mut file = zip
        .by_name("word/document.xml")
        .map_err(|_| ConvertError::Parse("DOCX: missing word/document.xml".to_string()))?;

    let mut xml = String::new();
    file.read_to_string(&mut xml)?;

    let mut reader = Reader::from_str(&xml);
    reader.trim_text(false);

    let mut buf = Vec::<u8>::new();
    let mut out = String::new();
    let mut at_paragraph_start = true;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match local_name(e.name().as_ref()) {
                b"p" => {
                    ensure_newline(&mut out);
                    at_paragraph_start = true;
                }
                b"tab" if !out.ends_with(' ') && !out.ends_with('\n') => out.push(' '),
                _ => {}
            },
            Ok(Event::Empty(e)) => match local_name(e.name().as_ref()) {
                b"br" | b"cr" => {
                    if !out.ends_with('\n') {
                        out.push('\n');
                    }
                    at_paragraph_start = true;
                }
                b"tab" if !out.ends_with(' ') && !out.ends_with('\n') => out.push(' '),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| ConvertError::Parse(format!("DOCX: bad XML text: {}", e)))?;
                if !text.is_empty() {
                    if at_paragraph_start {
                        out.push_str(text.trim_start());
                    } else {
                        out.push_str(&text);
                    }
                    at_paragraph_start = false;
                }
            }
            Ok(Event::End(e)) => {
                if local_name(e.name().as_ref()) == b"p" {
                    ensure_newline(&mut out);
                    at_paragraph_start = true;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ConvertError::Parse(format!("DOCX: XML error: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

fn render(source: &Path, text: &str) -> String {
    let paragraphs: Vec<&str> = text
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect();

    let mut out = String::new();
    out.push_str("---\n");
    out.push_str(&format!("source_file: {}\n", display_name(source)));
    out.push_str(&format!(
        "original_format: {}\n",
        file_extension(source).unwrap_or_default()
    ));
    out.push_str(&format!("paragraphs: {}\n", paragraphs.len()));
    out.push_str("converted_by: DocxConverter\n");
    out.push_str("---\n\n");
    out.push_str(&format!("# {}\n\n", display_stem(source)));
    out.push_str(&paragraphs.join("\n\n"));
    out.push('\n');
    out
}

#[async_trait]
impl Converter for DocxConverter {
    fn name(&self) -> &'static str {
        "docx"
    }

    fn can_handle(&self, path: &Path) -> bool {
        file_extension(path).as_deref() == Some(".docx")
    }

    async fn convert(&self, input: &Path, output: &Path) -> Result<ConversionOutcome> {
        let bytes = tokio::fs::read(input).await?;
        let text = tokio::task::spawn_blocking(move || extract_docx_text(&bytes)).await??;
        tokio::fs::write(output, render(input, &text)).await?;
        Ok(ConversionOutcome::Completed)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write as _;

    /// Minimal DOCX container with the given `word/document.xml` body.
    pub(crate) fn docx_bytes(body: &str) -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut cursor);
            zip.start_file("word/document.xml", zip::write::FileOptions::default())
                .unwrap();
            write!(
                zip,
                r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
                body
            )
            .unwrap();
            zip.finish().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_extract_paragraphs_and_breaks() {
        let bytes = docx_bytes(
            "<w:p><w:r><w:t>Hello</w:t></w:r><w:r><w:tab/><w:t>world</w:t></w:r></w:p>\
             <w:p><w:r><w:t>Line one</w:t><w:br/><w:t>Line two</w:t></w:r></w:p>\
             <w:p><w:r><w:t>Fish &amp; chips</w:t></w:r></w:p>",
        );

        let text = extract_docx_text(&bytes).unwrap();
        assert_eq!(text, "Hello world\nLine one\nLine two\nFish & chips\n");
    }

    #[test]
    fn test_rejects_non_docx() {
        assert!(matches!(
            extract_docx_text(b"plain text"),
            Err(ConvertError::Parse(_))
        ));
        assert!(extract_docx_text(&[]).is_err());
    }

    #[tokio::test]
    async fn test_convert_writes_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("doc.docx");
        let output = dir.path().join("doc.docx.md");
        tokio::fs::write(&input, docx_bytes("<w:p><w:r><w:t>Quarterly report</w:t></w:r></w:p>"))
            .await
            .unwrap();

        DocxConverter::new().convert(&input, &output).await.unwrap();

        let written = tokio::fs::read_to_string(&output).await.unwrap();
        assert!(written.contains("source_file: doc.docx\n"));
        assert!(written.contains("# doc\n\nQuarterly report\n"));
    }
}
