//! # Video Transcription
//!
//! Converts video files into transcript artifacts through an external
//! speech recognition job service.
//!
//! The audio track is extracted with ffmpeg and submitted to an
//! [`AsyncJobBackend`]. In async mode the converter returns
//! [`ConversionOutcome::Submitted`] right after submission and the sync
//! engine owns the job from there on; otherwise it polls inline and writes
//! the artifact itself.

mod audio;
mod backend;

pub use audio::AudioExtractor;
pub use backend::{AsyncJobBackend, HttpTranscriptionBackend, OperationHandle, OperationStatus};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use core_runtime::config::TranscriptionConfig;

use crate::archive::format_size;
use crate::converter::{file_extension, has_extension, ConversionOutcome, Converter, PendingOperation};
use crate::error::{ConvertError, Result};

/// Facts about the source video carried from submission to completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub source_file: String,
    pub size_bytes: u64,
    pub language: String,
    pub submitted_at: DateTime<Utc>,
}

impl VideoMetadata {
    pub fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| ConvertError::Parse(format!("video metadata: {}", e)))
    }

    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| ConvertError::Parse(format!("video metadata: {}", e)))
    }
}

/// Markdown transcript artifact.
pub fn render_transcript(metadata: &VideoMetadata, text: &str, completed_at: DateTime<Utc>) -> String {
    let source = Path::new(&metadata.source_file);
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| metadata.source_file.clone());
    let size = format_size(metadata.size_bytes);
    let completed = completed_at.format("%Y-%m-%d %H:%M:%S UTC");

    let mut out = String::from("---\n");
    out.push_str(&format!("source_file: {}\n", metadata.source_file));
    out.push_str(&format!(
        "original_format: {}\n",
        file_extension(source).unwrap_or_default()
    ));
    out.push_str(&format!("size: {}\n", size));
    out.push_str(&format!("language: {}\n", metadata.language));
    out.push_str(&format!("transcribed_at: {}\n", completed_at.to_rfc3339()));
    out.push_str("converted_by: TranscriptionConverter\n");
    out.push_str("---\n\n");
    out.push_str(&format!("# {}\n\n", stem));
    out.push_str(&format!("**Source file:** {}\n", metadata.source_file));
    out.push_str(&format!("**Size:** {}\n", size));
    out.push_str(&format!("**Transcribed:** {}\n\n", completed));
    out.push_str("## Transcript\n\n");
    if text.trim().is_empty() {
        out.push_str("_No speech recognized._\n");
    } else {
        out.push_str(text.trim());
        out.push('\n');
    }
    out
}

/// Video to transcript converter.
pub struct TranscriptionConverter {
    backend: Arc<dyn AsyncJobBackend>,
    audio: AudioExtractor,
    video_extensions: Vec<String>,
    max_size: u64,
    language: String,
    async_mode: bool,
    poll_interval: Duration,
    timeout: Duration,
}

impl TranscriptionConverter {
    pub fn new(
        backend: Arc<dyn AsyncJobBackend>,
        config: &TranscriptionConfig,
        video_extensions: Vec<String>,
    ) -> Self {
        Self {
            backend,
            audio: AudioExtractor::new(config.ffmpeg_path.clone()),
            video_extensions,
            max_size: config.video_max_size,
            language: config.language.clone(),
            async_mode: config.async_mode,
            poll_interval: config.poll_interval,
            timeout: config.timeout,
        }
    }

    pub fn audio_extractor(&self) -> &AudioExtractor {
        &self.audio
    }

    async fn wait_inline(&self, handle: &OperationHandle) -> Result<String> {
        let started = tokio::time::Instant::now();
        loop {
            match self.backend.poll_status(handle).await {
                Ok(status) if status.done => {
                    if let Some(error) = status.error {
                        return Err(ConvertError::Backend(error));
                    }
                    return Ok(status.result.unwrap_or_default());
                }
                Ok(_) => debug!(operation_id = %handle.id, "Transcription still running"),
                Err(e) if e.is_transient() => {
                    warn!(operation_id = %handle.id, error = %e, "Transcription poll failed, will retry")
                }
                Err(e) => return Err(e),
            }
            if started.elapsed() >= self.timeout {
                return Err(ConvertError::Timeout(format!(
                    "transcription {} not done after {:?}",
                    handle.id, self.timeout
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl Converter for TranscriptionConverter {
    fn name(&self) -> &'static str {
        "transcription"
    }

    fn can_handle(&self, path: &Path) -> bool {
        if !has_extension(path, &self.video_extensions) {
            return false;
        }
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() <= self.max_size => true,
            Ok(meta) => {
                warn!(
                    path = %path.display(),
                    size = meta.len(),
                    limit = self.max_size,
                    "Video too large to transcribe"
                );
                false
            }
            Err(_) => false,
        }
    }

    fn is_async(&self) -> bool {
        self.async_mode
    }

    async fn convert(&self, input: &Path, output: &Path) -> Result<ConversionOutcome> {
        let size_bytes = tokio::fs::metadata(input).await?.len();
        let workspace = tempfile::Builder::new().prefix("transcription_").tempdir()?;

        let audio = self.audio.extract(input, workspace.path()).await?;
        let handle = self.backend.submit(&audio).await?;

        let metadata = VideoMetadata {
            source_file: input
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            size_bytes,
            language: self.language.clone(),
            submitted_at: Utc::now(),
        };
        info!(
            video = %metadata.source_file,
            operation_id = %handle.id,
            "Transcription submitted"
        );

        if self.async_mode {
            return Ok(ConversionOutcome::Submitted(PendingOperation {
                operation_id: handle.id,
                metadata: metadata.to_json()?,
            }));
        }

        let text = self.wait_inline(&handle).await?;
        tokio::fs::write(output, render_transcript(&metadata, &text, Utc::now())).await?;
        Ok(ConversionOutcome::Completed)
    }
}
