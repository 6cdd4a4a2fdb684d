//! # Conversion Dispatcher
//!
//! First-match dispatch of a downloaded file to one registered [`Converter`].
//!
//! Artifact names append the converter's target extension to the full
//! source name (`report.xlsx` becomes `report.xlsx.md`) and mirror the
//! source's relative location under the artifact root.

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use core_runtime::config::ConversionConfig;

use crate::archive::ArchiveExpander;
use crate::converter::{ConversionOutcome, Converter, PendingOperation};
use crate::csv::CsvConverter;
use crate::docx::DocxConverter;
use crate::error::{ConvertError, Result};
use crate::pdf::PdfConverter;
use crate::text::TextConverter;

/// Result of dispatching one file
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// No registered converter accepts the file.
    NoConverter,
    /// The artifact exists at `artifact` (relative to the artifact root).
    Converted {
        artifact: String,
        converter: &'static str,
    },
    /// An async job owns the file; `artifact` is where its result will go.
    Submitted {
        operation: PendingOperation,
        artifact: String,
        converter: &'static str,
    },
}

/// Ordered list of converters
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    converters: Vec<Arc<dyn Converter>>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stock converters in registration order: text, CSV, DOCX, PDF, the
    /// optional transcription capability and finally the archive expander.
    pub fn standard(config: &ConversionConfig, transcription: Option<Arc<dyn Converter>>) -> Self {
        let mut registry = Self::new()
            .register(Arc::new(TextConverter::new()))
            .register(Arc::new(CsvConverter::new(config.table_output)))
            .register(Arc::new(DocxConverter::new()))
            .register(Arc::new(PdfConverter::new(config.pdf_max_pages)));

        if let Some(converter) = transcription {
            registry = registry.register(converter);
        }
        if config.archives_enabled {
            registry = registry.with_archive_expander(config.archive_max_depth);
        }
        registry
    }

    pub fn register(mut self, converter: Arc<dyn Converter>) -> Self {
        self.converters.push(converter);
        self
    }

    /// Append an [`ArchiveExpander`] that can use every converter registered so far.
    pub fn with_archive_expander(self, max_depth: u32) -> Self {
        let siblings = self.converters.clone();
        self.register(Arc::new(ArchiveExpander::new(siblings, max_depth)))
    }

    pub fn converters(&self) -> &[Arc<dyn Converter>] {
        &self.converters
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    /// First converter, in registration order, that accepts the path.
    pub fn find(&self, path: &Path) -> Option<&Arc<dyn Converter>> {
        self.converters.iter().find(|c| c.can_handle(path))
    }

    /// Artifact path relative to the artifact root.
    pub fn artifact_relative_path(relative: &str, target_extension: &str) -> String {
        format!("{}.{}", relative, target_extension)
    }

    /// Convert `input` (whose root-relative path is `relative`) into an
    /// artifact under `artifact_root`.
    ///
    /// # Errors
    ///
    /// Any converter failure, or a `Completed` outcome without an artifact
    /// on disk.
    pub async fn dispatch(
        &self,
        input: &Path,
        relative: &str,
        artifact_root: &Path,
    ) -> Result<Dispatch> {
        let Some(converter) = self.find(input) else {
            debug!(path = %relative, "No converter accepts file");
            return Ok(Dispatch::NoConverter);
        };

        let artifact = Self::artifact_relative_path(relative, converter.target_extension());
        let output = artifact_root.join(&artifact);
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        debug!(path = %relative, converter = converter.name(), "Converting");
        match converter.convert(input, &output).await {
            Ok(ConversionOutcome::Completed) => {
                if !tokio::fs::try_exists(&output).await.unwrap_or(false) {
                    return Err(ConvertError::MissingOutput(output));
                }
                Ok(Dispatch::Converted {
                    artifact,
                    converter: converter.name(),
                })
            }
            Ok(ConversionOutcome::Submitted(operation)) => Ok(Dispatch::Submitted {
                operation,
                artifact,
                converter: converter.name(),
            }),
            Err(e) => {
                warn!(path = %relative, converter = converter.name(), error = %e, "Conversion failed");
                Err(e)
            }
        }
    }
}
