//! Markdown index written for every processed archive.

use std::path::{Path, PathBuf};

use super::extract::ArchiveKind;

const MAX_CONVERTED_LISTED: usize = 50;
const MAX_SKIPPED_LISTED: usize = 20;
const MAX_ERRORS_LISTED: usize = 20;
const TREE_MAX_DEPTH: usize = 3;
const TREE_MAX_ENTRIES: usize = 20;

/// What happened to a nested archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NestedOutcome {
    Expanded,
    CycleDetected,
    DepthExceeded,
    Failed(String),
}

impl NestedOutcome {
    fn label(&self) -> String {
        match self {
            NestedOutcome::Expanded => "expanded".to_string(),
            NestedOutcome::CycleDetected => "skipped: cycle detected".to_string(),
            NestedOutcome::DepthExceeded => "skipped: depth limit reached".to_string(),
            NestedOutcome::Failed(reason) => format!("failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedEntry {
    pub file: PathBuf,
    /// Artifact path relative to the index file
    pub link: String,
    pub converter: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedEntry {
    pub file: PathBuf,
    pub link: String,
    pub outcome: NestedOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryError {
    pub file: String,
    pub error: String,
}

/// Everything the index of one archive reports.
#[derive(Debug, Clone, Default)]
pub struct IndexReport {
    pub total_files: usize,
    pub total_size: u64,
    pub files: Vec<PathBuf>,
    pub converted: Vec<ConvertedEntry>,
    pub nested: Vec<NestedEntry>,
    pub no_converter: Vec<PathBuf>,
    pub errors: Vec<EntryError>,
}

pub fn format_size(size: u64) -> String {
    let mut value = size as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if value < 1024.0 {
            return format!("{:.1} {}", value, unit);
        }
        value /= 1024.0;
    }
    format!("{:.1} TB", value)
}

fn front_matter(archive: &Path, kind: Option<ArchiveKind>, extra: &[(&str, String)]) -> String {
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let format = crate::converter::file_extension(archive).unwrap_or_default();

    let mut out = String::from("---\n");
    out.push_str(&format!("source_file: {}\n", name));
    out.push_str(&format!("original_format: {}\n", format));
    out.push_str(&format!(
        "archive_type: {}\n",
        kind.map(|k| k.as_str()).unwrap_or("unknown")
    ));
    for (key, value) in extra {
        out.push_str(&format!("{}: {}\n", key, value));
    }
    out.push_str("converted_by: ArchiveExpander\n");
    out.push_str("---\n\n");
    out
}

fn tree(archive_name: &str, files: &[PathBuf]) -> String {
    let mut out = format!("```\n{}/\n", archive_name);
    let mut shown = 0;
    for file in files {
        if shown >= TREE_MAX_ENTRIES {
            out.push_str(&format!("... and {} more files\n", files.len() - shown));
            break;
        }
        let depth = file.components().count().saturating_sub(1);
        if depth > TREE_MAX_DEPTH {
            continue;
        }
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        out.push_str(&format!("{}├── {}\n", "  ".repeat(depth), name));
        shown += 1;
    }
    out.push_str("```\n");
    out
}

fn more(out: &mut String, total: usize, listed: usize, noun: &str) {
    if total > listed {
        out.push_str(&format!("\n_... and {} more {}_\n", total - listed, noun));
    }
}

pub fn render_index(archive: &Path, kind: ArchiveKind, depth: u32, report: &IndexReport) -> String {
    let stem = crate::converter::display_stem(archive);
    let name = crate::converter::display_name(archive);
    let size = format_size(report.total_size);

    let mut out = front_matter(
        archive,
        Some(kind),
        &[
            ("total_files", report.total_files.to_string()),
            ("total_size", size.clone()),
            ("extraction_depth", depth.to_string()),
        ],
    );
    out.push_str(&format!("# {}\n\n", stem));
    out.push_str(&format!("**Type:** {} archive\n", kind.as_str().to_uppercase()));
    out.push_str(&format!("**Files:** {}\n", report.total_files));
    out.push_str(&format!("**Size:** {}\n", size));
    out.push_str(&format!("**Depth:** {}\n\n", depth));

    out.push_str("## Contents\n\n");

    if !report.converted.is_empty() {
        out.push_str(&format!("### Converted files ({})\n\n", report.converted.len()));
        for entry in report.converted.iter().take(MAX_CONVERTED_LISTED) {
            out.push_str(&format!(
                "- `{}` -> [{}]({}) ({})\n",
                entry.file.display(),
                entry.link.rsplit('/').next().unwrap_or(&entry.link),
                entry.link,
                entry.converter
            ));
        }
        more(&mut out, report.converted.len(), MAX_CONVERTED_LISTED, "files");
        out.push('\n');
    }

    if !report.nested.is_empty() {
        out.push_str(&format!("### Nested archives ({})\n\n", report.nested.len()));
        for entry in &report.nested {
            if entry.outcome == NestedOutcome::Expanded {
                out.push_str(&format!(
                    "- `{}` ({}) -> [index]({})\n",
                    entry.file.display(),
                    entry.outcome.label(),
                    entry.link
                ));
            } else {
                out.push_str(&format!(
                    "- `{}` ({})\n",
                    entry.file.display(),
                    entry.outcome.label()
                ));
            }
        }
        out.push('\n');
    }

    if !report.no_converter.is_empty() {
        out.push_str(&format!("### Without converter ({})\n\n", report.no_converter.len()));
        for file in report.no_converter.iter().take(MAX_SKIPPED_LISTED) {
            out.push_str(&format!("- `{}`\n", file.display()));
        }
        more(&mut out, report.no_converter.len(), MAX_SKIPPED_LISTED, "files");
        out.push('\n');
    }

    if !report.errors.is_empty() {
        out.push_str(&format!("### Errors ({})\n\n", report.errors.len()));
        for entry in report.errors.iter().take(MAX_ERRORS_LISTED) {
            out.push_str(&format!("- `{}`: {}\n", entry.file, entry.error));
        }
        more(&mut out, report.errors.len(), MAX_ERRORS_LISTED, "errors");
        out.push('\n');
    }

    out.push_str("## Structure\n\n");
    out.push_str(&tree(&name, &report.files));
    out.push('\n');

    out.push_str("## Statistics\n\n");
    out.push_str(&format!("- Total files: {}\n", report.total_files));
    out.push_str(&format!("- Converted: {}\n", report.converted.len()));
    out.push_str(&format!("- Nested archives: {}\n", report.nested.len()));
    out.push_str(&format!("- Without converter: {}\n", report.no_converter.len()));
    out.push_str(&format!("- Errors: {}\n", report.errors.len()));
    out
}

pub fn render_error_index(archive: &Path, kind: Option<ArchiveKind>, error: &str) -> String {
    let mut out = front_matter(archive, kind, &[("error", "true".to_string())]);
    out.push_str(&format!("# {}\n\n", crate::converter::display_stem(archive)));
    out.push_str("## Extraction failed\n\n");
    out.push_str(&format!("**Error:** {}\n", error));
    out
}
