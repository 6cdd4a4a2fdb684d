//! # Archive Expander
//!
//! Recursive, cycle-safe expansion of archives into per-entry artifacts and
//! an index document.
//!
//! ## Overview
//!
//! For `bundle.zip` converted to `bundle.zip.md`, every extracted entry is
//! dispatched to the sibling converters and written below
//! `bundle.zip_extracted/`. Nested archives recurse with `depth + 1`.
//!
//! Two guards keep recursion finite:
//! - the SHA-256 of every archive entered on the current branch is kept in
//!   a [`VisitedSet`]; meeting one again stops with
//!   [`NestedOutcome::CycleDetected`]
//! - a branch deeper than `max_depth` stops with
//!   [`NestedOutcome::DepthExceeded`]
//!
//! Extraction happens in a fresh temporary directory that is removed when
//! the expansion returns, whatever the outcome.

mod extract;
mod index;
mod visited;

pub use extract::{ArchiveKind, Extracted};
pub use index::{format_size, ConvertedEntry, EntryError, IndexReport, NestedEntry, NestedOutcome};
pub use visited::{hash_file, VisitedSet};

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::converter::{ConversionOutcome, Converter};
use crate::error::{ConvertError, Result};

pub struct ArchiveExpander {
    siblings: Vec<Arc<dyn Converter>>,
    max_depth: u32,
}

impl ArchiveExpander {
    pub fn new(siblings: Vec<Arc<dyn Converter>>, max_depth: u32) -> Self {
        Self {
            siblings,
            max_depth,
        }
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Directory holding the expanded entries of the archive indexed at `output`.
    pub fn extracted_dir(output: &Path) -> PathBuf {
        let stem = output
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        output.with_file_name(format!("{}_extracted", stem))
    }

    async fn write_error_index(archive: &Path, output: &Path, error: &str) {
        let content = index::render_error_index(archive, ArchiveKind::detect(archive), error);
        if let Some(parent) = output.parent() {
            let _ = tokio::fs::create_dir_all(parent).await;
        }
        if let Err(e) = tokio::fs::write(output, content).await {
            warn!(output = %output.display(), error = %e, "Failed to write archive error index");
        }
    }

    async fn fail(archive: &Path, output: &Path, reason: String) -> NestedOutcome {
        warn!(archive = %archive.display(), error = %reason, "Archive expansion failed");
        Self::write_error_index(archive, output, &reason).await;
        NestedOutcome::Failed(reason)
    }

    /// Expand `archive`, writing its index to `output`.
    ///
    /// `visited` holds the hashes of the archives enclosing this one.
    pub fn expand<'a>(
        &'a self,
        archive: &'a Path,
        output: &'a Path,
        depth: u32,
        visited: VisitedSet,
    ) -> BoxFuture<'a, NestedOutcome> {
        async move {
            let source = archive.to_path_buf();
            let hash = match tokio::task::spawn_blocking(move || hash_file(&source)).await {
                Ok(Ok(hash)) => hash,
                Ok(Err(e)) => return Self::fail(archive, output, e.to_string()).await,
                Err(e) => return Self::fail(archive, output, e.to_string()).await,
            };

            if visited.contains(&hash) {
                warn!(archive = %archive.display(), "Archive cycle detected, not expanding again");
                return NestedOutcome::CycleDetected;
            }
            if depth > self.max_depth {
                warn!(
                    archive = %archive.display(),
                    max_depth = self.max_depth,
                    "Archive nesting too deep, not expanding"
                );
                return NestedOutcome::DepthExceeded;
            }

            let Some(kind) = ArchiveKind::detect(archive) else {
                return Self::fail(archive, output, "not a recognized archive".to_string()).await;
            };

            let workspace = match tempfile::Builder::new().prefix("archive_extract_").tempdir() {
                Ok(dir) => dir,
                Err(e) => return Self::fail(archive, output, e.to_string()).await,
            };

            info!(archive = %archive.display(), depth, kind = kind.as_str(), "Expanding archive");

            // Entries dropped from a changed archive must not survive a re-expansion.
            let extracted_dir = Self::extracted_dir(output);
            match tokio::fs::remove_dir_all(&extracted_dir).await {
                Ok(()) => debug!(path = %extracted_dir.display(), "Cleared previous expansion"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Self::fail(archive, output, e.to_string()).await,
            }

            let src = archive.to_path_buf();
            let dest = workspace.path().to_path_buf();
            let extracted = match tokio::task::spawn_blocking(move || extract::extract(kind, &src, &dest))
                .await
                .map_err(ConvertError::from)
                .and_then(|r| r)
            {
                Ok(extracted) => extracted,
                Err(e) => return Self::fail(archive, output, e.to_string()).await,
            };

            let extracted_name = extracted_dir
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let branch = visited.with(hash);

            let mut report = IndexReport {
                total_files: extracted.files.len(),
                files: extracted.files.clone(),
                ..Default::default()
            };
            for name in extracted.rejected {
                report.errors.push(EntryError {
                    file: name,
                    error: "entry path escapes the archive".to_string(),
                });
            }

            for relative in &extracted.files {
                let entry_path = workspace.path().join(relative);
                report.total_size += tokio::fs::metadata(&entry_path)
                    .await
                    .map(|m| m.len())
                    .unwrap_or(0);
                let relative_str = relative.to_string_lossy().replace('\\', "/");

                if ArchiveKind::detect(&entry_path).is_some() {
                    let artifact = format!("{}.md", relative_str);
                    let nested_output = extracted_dir.join(&artifact);
                    if let Some(parent) = nested_output.parent() {
                        if let Err(e) = tokio::fs::create_dir_all(parent).await {
                            report.errors.push(EntryError {
                                file: relative_str,
                                error: e.to_string(),
                            });
                            continue;
                        }
                    }
                    let outcome = self
                        .expand(&entry_path, &nested_output, depth + 1, branch.clone())
                        .await;
                    report.nested.push(NestedEntry {
                        file: relative.clone(),
                        link: format!("{}/{}", extracted_name, artifact),
                        outcome,
                    });
                    continue;
                }

                let Some(converter) = self.siblings.iter().find(|c| c.can_handle(&entry_path))
                else {
                    report.no_converter.push(relative.clone());
                    continue;
                };
                if converter.is_async() {
                    report.errors.push(EntryError {
                        file: relative_str,
                        error: format!("{} runs asynchronously; not available inside archives", converter.name()),
                    });
                    continue;
                }

                let artifact = format!("{}.{}", relative_str, converter.target_extension());
                let target = extracted_dir.join(&artifact);
                if let Some(parent) = target.parent() {
                    if let Err(e) = tokio::fs::create_dir_all(parent).await {
                        report.errors.push(EntryError {
                            file: relative_str,
                            error: e.to_string(),
                        });
                        continue;
                    }
                }

                match converter.convert(&entry_path, &target).await {
                    Ok(ConversionOutcome::Completed) => report.converted.push(ConvertedEntry {
                        file: relative.clone(),
                        link: format!("{}/{}", extracted_name, artifact),
                        converter: converter.name(),
                    }),
                    Ok(ConversionOutcome::Submitted(_)) => report.errors.push(EntryError {
                        file: relative_str,
                        error: "asynchronous outcome inside archive".to_string(),
                    }),
                    Err(e) => {
                        debug!(entry = %relative_str, error = %e, "Archive entry conversion failed");
                        report.errors.push(EntryError {
                            file: relative_str,
                            error: e.to_string(),
                        });
                    }
                }
            }

            let content = index::render_index(archive, kind, depth, &report);
            if let Some(parent) = output.parent() {
                if let Err(e) = tokio::fs::create_dir_all(parent).await {
                    return NestedOutcome::Failed(e.to_string());
                }
            }
            if let Err(e) = tokio::fs::write(output, content).await {
                return NestedOutcome::Failed(e.to_string());
            }

            info!(
                archive = %archive.display(),
                files = report.total_files,
                converted = report.converted.len(),
                nested = report.nested.len(),
                errors = report.errors.len(),
                "Archive expanded"
            );
            NestedOutcome::Expanded
        }
        .boxed()
    }
}

#[async_trait]
impl Converter for ArchiveExpander {
    fn name(&self) -> &'static str {
        "archive"
    }

    fn can_handle(&self, path: &Path) -> bool {
        ArchiveKind::detect(path).is_some()
    }

    async fn convert(&self, input: &Path, output: &Path) -> Result<ConversionOutcome> {
        match self.expand(input, output, 0, VisitedSet::new()).await {
            NestedOutcome::Expanded => Ok(ConversionOutcome::Completed),
            NestedOutcome::Failed(reason) => Err(ConvertError::Extraction(reason)),
            NestedOutcome::CycleDetected => Err(ConvertError::Extraction(
                "archive cycle detected".to_string(),
            )),
            NestedOutcome::DepthExceeded => Err(ConvertError::Extraction(
                "archive nesting too deep".to_string(),
            )),
        }
    }
}
