//! Converter capability shared by every format handler.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// Handle of a job that keeps running after `convert` returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOperation {
    pub operation_id: String,
    /// Opaque data the completion step needs (source name, size, ...)
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConversionOutcome {
    /// The artifact has been written to the requested output path.
    Completed,
    /// An external job was started; nothing has been written yet.
    Submitted(PendingOperation),
}

/// A format handler turning one local file into a textual artifact.
///
/// # Example
///
/// ```ignore
/// if converter.can_handle(&input) {
///     match converter.convert(&input, &output).await? {
///         ConversionOutcome::Completed => println!("wrote {}", output.display()),
///         ConversionOutcome::Submitted(op) => println!("job {}", op.operation_id),
///     }
/// }
/// ```
#[async_trait]
pub trait Converter: Send + Sync {
    /// Short name used in logs and archive indexes
    fn name(&self) -> &'static str;

    /// Decide from the path (and possibly file metadata) whether to accept it.
    fn can_handle(&self, path: &Path) -> bool;

    /// Extension appended to the source file name to form the artifact name.
    fn target_extension(&self) -> &'static str {
        "md"
    }

    /// Whether `convert` may return [`ConversionOutcome::Submitted`].
    fn is_async(&self) -> bool {
        false
    }

    /// Convert `input`, writing the artifact to `output`.
    ///
    /// The parent directory of `output` exists when this is called.
    async fn convert(&self, input: &Path, output: &Path) -> Result<ConversionOutcome>;
}

/// Lower-cased extension with its leading dot; `.tar.gz` is kept whole.
pub fn file_extension(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?.to_lowercase();
    if name.ends_with(".tar.gz") && name.len() > ".tar.gz".len() {
        return Some(".tar.gz".to_string());
    }
    let dot = name.rfind('.')?;
    if dot == 0 {
        return None;
    }
    Some(name[dot..].to_string())
}

/// `true` when the file's extension is in `extensions` (entries carry the dot).
pub fn has_extension<S: AsRef<str>>(path: &Path, extensions: &[S]) -> bool {
    let Some(ext) = file_extension(path) else {
        return false;
    };
    extensions.iter().any(|candidate| {
        let candidate = candidate.as_ref();
        candidate.eq_ignore_ascii_case(&ext)
            || (ext == ".tar.gz" && candidate.eq_ignore_ascii_case(".gz"))
    })
}

/// File stem used for artifact headings (`report.xlsx` -> `report`).
pub(crate) fn display_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension(Path::new("a/Report.XLSX")).as_deref(), Some(".xlsx"));
        assert_eq!(file_extension(Path::new("backup.tar.gz")).as_deref(), Some(".tar.gz"));
        assert_eq!(file_extension(Path::new("notes")), None);
        assert_eq!(file_extension(Path::new(".bashrc")), None);
    }

    #[test]
    fn test_has_extension_is_case_insensitive() {
        assert!(has_extension(Path::new("clip.MP4"), &[".mp4", ".mov"]));
        assert!(!has_extension(Path::new("clip.mp3"), &[".mp4"]));
        assert!(has_extension(Path::new("dump.tar.gz"), &[".gz"]));
        assert!(has_extension(Path::new("dump.tar.gz"), &[".tar.gz"]));
    }
}
