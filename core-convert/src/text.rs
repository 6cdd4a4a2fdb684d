//! Plain text and source files rendered into a fenced code block.

use async_trait::async_trait;
use std::path::Path;

use crate::converter::{display_name, display_stem, file_extension, ConversionOutcome, Converter};
use crate::error::Result;

/// Extension to code-fence language
const LANGUAGES: &[(&str, &str)] = &[
    (".txt", "text"),
    (".log", "text"),
    (".md", "markdown"),
    (".py", "python"),
    (".rs", "rust"),
    (".js", "javascript"),
    (".ts", "typescript"),
    (".go", "go"),
    (".java", "java"),
    (".c", "c"),
    (".h", "c"),
    (".cpp", "cpp"),
    (".sh", "bash"),
    (".sql", "sql"),
    (".json", "json"),
    (".avsc", "json"),
    (".xml", "xml"),
    (".yaml", "yaml"),
    (".yml", "yaml"),
    (".toml", "toml"),
    (".ini", "ini"),
    (".j2", "jinja2"),
];

pub struct TextConverter;

impl TextConverter {
    pub fn new() -> Self {
        Self
    }

    fn language_for(extension: &str) -> Option<&'static str> {
        LANGUAGES
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, lang)| *lang)
    }

    /// Backtick fence one longer than the longest run inside `content`.
    fn fence_for(content: &str) -> String {
        let mut longest = 0;
        let mut run = 0;
        for c in content.chars() {
            if c == '`' {
                run += 1;
                longest = longest.max(run);
            } else {
                run = 0;
            }
        }
        "`".repeat((longest + 1).max(3))
    }

    pub(crate) fn render(source: &Path, size: u64, bytes: &[u8]) -> String {
        let extension = file_extension(source).unwrap_or_default();
        let language = Self::language_for(&extension).unwrap_or("text");
        let text = String::from_utf8_lossy(bytes);
        let content = text.strip_prefix('\u{feff}').unwrap_or(&text);

        let mut out = String::new();
        out.push_str("---\n");
        out.push_str(&format!("source_file: {}\n", display_name(source)));
        out.push_str(&format!("original_format: {}\n", extension));
        out.push_str(&format!("language: {}\n", language));
        out.push_str(&format!("size_bytes: {}\n", size));
        out.push_str("converted_by: TextConverter\n");
        out.push_str("---\n\n");
        out.push_str(&format!("# {}\n\n", display_stem(source)));
        out.push_str("## Content\n\n");

        if extension == ".md" {
            out.push_str(content);
            if !content.ends_with('\n') {
                out.push('\n');
            }
        } else {
            let fence = Self::fence_for(content);
            out.push_str(&format!("{}{}\n", fence, language));
            out.push_str(content);
            if !content.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&fence);
            out.push('\n');
        }
        out
    }
}

impl Default for TextConverter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Converter for TextConverter {
    fn name(&self) -> &'static str {
        "text"
    }

    fn can_handle(&self, path: &Path) -> bool {
        file_extension(path).is_some_and(|ext| Self::language_for(&ext).is_some())
    }

    async fn convert(&self, input: &Path, output: &Path) -> Result<ConversionOutcome> {
        let bytes = tokio::fs::read(input).await?;
        let rendered = Self::render(input, bytes.len() as u64, &bytes);
        tokio::fs::write(output, rendered).await?;
        Ok(ConversionOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_handle() {
        let converter = TextConverter::new();
        assert!(converter.can_handle(Path::new("notes.TXT")));
        assert!(converter.can_handle(Path::new("schema.avsc")));
        assert!(!converter.can_handle(Path::new("photo.jpg")));
        assert!(!converter.can_handle(Path::new("README")));
    }

    #[test]
    fn test_render_wraps_code() {
        let out = TextConverter::render(Path::new("main.py"), 12, b"print('hi')");
        assert!(out.contains("language: python\n"));
        assert!(out.contains("# main\n"));
        assert!(out.contains("```python\nprint('hi')\n```\n"));
    }

    #[test]
    fn test_fence_outgrows_embedded_backticks() {
        let out = TextConverter::render(Path::new("a.txt"), 0, b"before\n````\nafter");
        assert!(out.contains("`````text\n"));
    }

    #[test]
    fn test_markdown_is_inlined() {
        let out = TextConverter::render(Path::new("README.md"), 7, "\u{feff}# Title".as_bytes());
        assert!(out.ends_with("## Content\n\n# Title\n"));
    }

    #[tokio::test]
    async fn test_convert_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("config.toml");
        let output = dir.path().join("config.toml.md");
        tokio::fs::write(&input, "key = 1\n").await.unwrap();

        let outcome = TextConverter::new().convert(&input, &output).await.unwrap();

        assert_eq!(outcome, ConversionOutcome::Completed);
        let written = tokio::fs::read_to_string(&output).await.unwrap();
        assert!(written.contains("```toml\nkey = 1\n```"));
    }
}
