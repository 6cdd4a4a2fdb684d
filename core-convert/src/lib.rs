//! # Content Conversion
//!
//! Turns downloaded files into textual artifacts.
//!
//! ## Overview
//!
//! A [`ConverterRegistry`] holds an ordered list of [`Converter`]s and hands
//! each file to the first one that accepts it. The stock set covers plain
//! text and source code, CSV/TSV tables, DOCX and PDF documents, video
//! transcription and, last, archives, which the [`ArchiveExpander`] unpacks
//! and feeds back through the other converters.
//!
//! ## Usage
//!
//! ```ignore
//! use core_convert::{ConverterRegistry, Dispatch};
//!
//! let registry = ConverterRegistry::standard(&config.conversion, None);
//! match registry.dispatch(&local, "A/doc.docx", &artifact_root).await? {
//!     Dispatch::Converted { artifact, .. } => println!("wrote {}", artifact),
//!     Dispatch::Submitted { operation, .. } => println!("job {}", operation.operation_id),
//!     Dispatch::NoConverter => {}
//! }
//! ```

pub mod archive;
pub mod converter;
pub mod csv;
pub mod docx;
pub mod error;
pub mod pdf;
pub mod registry;
pub mod text;
pub mod transcription;

pub use archive::{ArchiveExpander, ArchiveKind, NestedOutcome, VisitedSet};
pub use converter::{file_extension, has_extension, ConversionOutcome, Converter, PendingOperation};
pub use csv::CsvConverter;
pub use docx::DocxConverter;
pub use error::{ConvertError, Result};
pub use pdf::PdfConverter;
pub use registry::{ConverterRegistry, Dispatch};
pub use text::TextConverter;
pub use transcription::{
    render_transcript, AsyncJobBackend, AudioExtractor, HttpTranscriptionBackend, OperationHandle,
    OperationStatus, TranscriptionConverter, VideoMetadata,
};
