//! Audio track extraction through an external `ffmpeg` binary.

use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

use crate::error::{ConvertError, Result};

/// Runs ffmpeg to produce a mono 16 kHz Opus track.
#[derive(Debug, Clone)]
pub struct AudioExtractor {
    ffmpeg: PathBuf,
}

impl AudioExtractor {
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }

    /// Whether the configured binary can be started at all.
    pub async fn is_available(&self) -> bool {
        Command::new(&self.ffmpeg)
            .arg("-version")
            .kill_on_drop(true)
            .output()
            .await
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    /// Write the audio of `video` into `dest_dir` and return its path.
    pub async fn extract(&self, video: &Path, dest_dir: &Path) -> Result<PathBuf> {
        let stem = video
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio".to_string());
        let audio = dest_dir.join(format!("{}.ogg", stem));

        debug!(video = %video.display(), "Extracting audio track");
        let output = Command::new(&self.ffmpeg)
            .arg("-i")
            .arg(video)
            .args(["-vn", "-ac", "1", "-ar", "16000", "-c:a", "libopus", "-y"])
            .arg(&audio)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ConvertError::Tool(format!("cannot run {}: {}", self.ffmpeg.display(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: String = stderr.lines().rev().take(3).collect::<Vec<_>>().join(" | ");
            return Err(ConvertError::Tool(format!(
                "ffmpeg exited with {}: {}",
                output.status, tail
            )));
        }
        if !tokio::fs::try_exists(&audio).await.unwrap_or(false) {
            return Err(ConvertError::MissingOutput(audio));
        }
        Ok(audio)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Stand-in for ffmpeg that writes a few bytes to its last argument.
    #[cfg(unix)]
    pub(crate) fn fake_ffmpeg(dir: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("fake-ffmpeg");
        std::fs::write(
            &script,
            "#!/bin/sh\nfor last; do :; done\nprintf 'OggS' > \"$last\"\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_extract_with_fake_binary() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("talk.mp4");
        std::fs::write(&video, b"video").unwrap();

        let extractor = AudioExtractor::new(fake_ffmpeg(dir.path()));
        let audio = extractor.extract(&video, dir.path()).await.unwrap();

        assert_eq!(audio, dir.path().join("talk.ogg"));
        assert_eq!(std::fs::read(&audio).unwrap(), b"OggS");
    }

    #[tokio::test]
    async fn test_missing_binary_is_tool_error() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = AudioExtractor::new(dir.path().join("no-such-ffmpeg"));

        assert!(!extractor.is_available().await);
        let result = extractor
            .extract(&dir.path().join("talk.mp4"), dir.path())
            .await;
        assert!(matches!(result, Err(ConvertError::Tool(_))));
    }
}
