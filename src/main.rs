//! `disk-mirror`: mirror a Yandex Disk folder into local storage.
//!
//! Configured entirely from `DISK_MIRROR_*` environment variables; the OAuth
//! token is read from `DISK_MIRROR_TOKEN`. Ctrl-C stops scheduling new
//! files and abandons in-flight downloads.

use anyhow::Context;
use bridge_desktop::{ReqwestHttpClient, StaticTokenProvider};
use bridge_traits::http::{HttpClient, RetryPolicy};
use core_convert::{AsyncJobBackend, Converter, ConverterRegistry, HttpTranscriptionBackend, TranscriptionConverter};
use core_runtime::logging::{init_logging, LoggingConfig};
use core_runtime::SyncConfig;
use core_store::{create_pool, DatabaseConfig, SqliteFileRecordRepository};
use core_sync::{SyncCoordinator, SyncError};
use provider_yandex_disk::YandexDiskConnector;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const TOKEN_VAR: &str = "DISK_MIRROR_TOKEN";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::from_env()?)?;
    let config = SyncConfig::from_env().context("invalid configuration")?;
    info!(root = %config.remote_root, data = %config.paths.download_dir.display(), "disk-mirror starting");

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after in-flight work");
            on_signal.cancel();
        }
    });

    let retry = RetryPolicy::linear(config.retry.max_retries, config.retry.retry_delay);
    let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::with_timeout(config.retry.request_timeout)?);
    let tokens = Arc::new(StaticTokenProvider::from_env(TOKEN_VAR).with_context(|| format!("{} is required", TOKEN_VAR))?);
    let store = Arc::new(
        YandexDiskConnector::new(Arc::clone(&http), tokens, retry.clone())
            .with_request_timeout(config.retry.request_timeout),
    );

    let pool = create_pool(DatabaseConfig::new(config.paths.database_path.clone()))
        .await
        .context("failed to open metadata store")?;
    let repo = Arc::new(SqliteFileRecordRepository::new(pool));

    let backend: Option<Arc<dyn AsyncJobBackend>> = if config.transcription.enabled {
        let backend = HttpTranscriptionBackend::from_config(Arc::clone(&http), &config.transcription)?
            .with_retry(retry)
            .with_request_timeout(config.retry.request_timeout);
        Some(Arc::new(backend))
    } else {
        None
    };

    let mut transcription: Option<Arc<dyn Converter>> = None;
    if let Some(backend) = &backend {
        let converter = TranscriptionConverter::new(
            Arc::clone(backend),
            &config.transcription,
            config.skip.video_extensions.clone(),
        );
        if !converter.audio_extractor().is_available().await {
            warn!(ffmpeg = %config.transcription.ffmpeg_path.display(), "ffmpeg not found, video transcription will fail");
        }
        transcription = Some(Arc::new(converter));
    }
    let registry = ConverterRegistry::standard(&config.conversion, transcription);

    let mut coordinator = SyncCoordinator::new(config, store, repo, registry);
    if let Some(backend) = backend {
        coordinator = coordinator.with_transcription(backend);
    }

    match coordinator.run(&cancel).await {
        Ok(report) => {
            info!(
                downloaded = report.downloaded(),
                converted = report.converted,
                failures = report.download_failures,
                "disk-mirror finished"
            );
            Ok(())
        }
        Err(SyncError::Cancelled) => {
            warn!("Sync interrupted; completed files are recorded");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Sync failed");
            Err(e.into())
        }
    }
}
