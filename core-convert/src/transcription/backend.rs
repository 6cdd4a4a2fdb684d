//! Speech recognition job service boundary and its HTTP implementation.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, RetryPolicy};
use bytes::Bytes;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use core_runtime::config::TranscriptionConfig;

use crate::error::{ConvertError, Result};

/// Opaque identifier of a job running in the external service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationHandle {
    pub id: String,
}

impl OperationHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Snapshot of a job as reported by one poll
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OperationStatus {
    pub done: bool,
    pub error: Option<String>,
    /// Recognized text, present once the job is done without error
    pub result: Option<String>,
}

/// Long-running job service.
///
/// Transport failures surface as [`ConvertError::Bridge`] so callers can
/// tell them apart from a job the service itself reports as failed.
#[async_trait]
pub trait AsyncJobBackend: Send + Sync {
    /// Start a job for the audio file at `input`.
    async fn submit(&self, input: &Path) -> Result<OperationHandle>;

    /// Ask the service for the current state of a job.
    async fn poll_status(&self, handle: &OperationHandle) -> Result<OperationStatus>;
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct OperationBody {
    #[serde(default)]
    done: bool,
    error: Option<OperationError>,
    response: Option<RecognitionResponse>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
struct RecognitionResponse {
    #[serde(default)]
    chunks: Vec<Chunk>,
}

#[derive(Debug, Deserialize)]
struct Chunk {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    #[serde(default)]
    text: String,
}

impl RecognitionResponse {
    /// First alternative of every chunk, joined with spaces.
    fn text(&self) -> String {
        self.chunks
            .iter()
            .filter_map(|chunk| chunk.alternatives.first())
            .map(|alt| alt.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Recognition service reached over HTTP with an `Api-Key` credential.
pub struct HttpTranscriptionBackend {
    http: Arc<dyn HttpClient>,
    submit_url: String,
    operations_url: String,
    api_key: String,
    language: String,
    retry: RetryPolicy,
    request_timeout: Duration,
}

impl HttpTranscriptionBackend {
    pub fn new(
        http: Arc<dyn HttpClient>,
        submit_url: impl Into<String>,
        operations_url: impl Into<String>,
        api_key: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            http,
            submit_url: submit_url.into(),
            operations_url: operations_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            language: language.into(),
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(60),
        }
    }

    /// Build from configuration; both endpoints and the key are required.
    pub fn from_config(http: Arc<dyn HttpClient>, config: &TranscriptionConfig) -> Result<Self> {
        let (Some(submit), Some(operations), Some(key)) = (
            config.submit_url.as_ref(),
            config.operations_url.as_ref(),
            config.api_key.as_ref(),
        ) else {
            return Err(ConvertError::Backend(
                "transcription endpoints or API key not configured".to_string(),
            ));
        };
        Ok(Self::new(http, submit, operations, key, &config.language))
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn authorize(&self, request: HttpRequest) -> HttpRequest {
        request
            .header("Authorization", format!("Api-Key {}", self.api_key))
            .timeout(self.request_timeout)
    }
}

#[async_trait]
impl AsyncJobBackend for HttpTranscriptionBackend {
    #[instrument(skip(self), fields(input = %input.display()))]
    async fn submit(&self, input: &Path) -> Result<OperationHandle> {
        let audio = tokio::fs::read(input).await?;
        let url = format!(
            "{}?lang={}",
            self.submit_url,
            urlencoding::encode(&self.language)
        );

        let request = self
            .authorize(HttpRequest::new(HttpMethod::Post, url))
            .header("Content-Type", "audio/ogg")
            .body(Bytes::from(audio));

        let response = self
            .http
            .execute_with_retry(request, self.retry.clone())
            .await?
            .error_for_status()?;
        let body: SubmitResponse = response.json()?;

        debug!(operation_id = %body.id, "Transcription job submitted");
        Ok(OperationHandle::new(body.id))
    }

    #[instrument(skip(self), fields(operation_id = %handle.id))]
    async fn poll_status(&self, handle: &OperationHandle) -> Result<OperationStatus> {
        let url = format!(
            "{}/{}",
            self.operations_url,
            urlencoding::encode(&handle.id)
        );
        let request = self.authorize(HttpRequest::new(HttpMethod::Get, url));

        let response = self
            .http
            .execute_with_retry(request, self.retry.clone())
            .await?
            .error_for_status()?;
        let body: OperationBody = response.json()?;

        if !body.done {
            return Ok(OperationStatus::default());
        }
        if let Some(error) = body.error {
            let message = if error.message.is_empty() {
                "recognition failed".to_string()
            } else {
                error.message
            };
            return Ok(OperationStatus {
                done: true,
                error: Some(message),
                result: None,
            });
        }
        Ok(OperationStatus {
            done: true,
            error: None,
            result: Some(body.response.unwrap_or_default().text()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::HttpResponse;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
            async fn download_stream(&self, url: String) -> BridgeResult<Box<dyn tokio::io::AsyncRead + Send + Unpin>>;
        }
    }

    fn json_response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn backend(mock: MockHttpClient) -> HttpTranscriptionBackend {
        HttpTranscriptionBackend::new(
            Arc::new(mock),
            "https://stt.example/recognize",
            "https://ops.example/operations/",
            "secret",
            "ru-RU",
        )
        .with_retry(RetryPolicy::linear(2, Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn test_submit_posts_audio() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("a.ogg");
        std::fs::write(&audio, b"OggS").unwrap();

        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|req| {
            assert_eq!(req.method, HttpMethod::Post);
            assert_eq!(req.url, "https://stt.example/recognize?lang=ru-RU");
            assert_eq!(
                req.headers.get("Authorization"),
                Some(&"Api-Key secret".to_string())
            );
            assert_eq!(req.body.as_deref(), Some(&b"OggS"[..]));
            Ok(json_response(200, r#"{"id": "op-1", "done": false}"#))
        });

        let handle = backend(mock_http).submit(&audio).await.unwrap();
        assert_eq!(handle, OperationHandle::new("op-1"));
    }

    #[tokio::test]
    async fn test_poll_joins_first_alternatives() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|req| {
            assert_eq!(req.url, "https://ops.example/operations/op-1");
            Ok(json_response(
                200,
                r#"{"done": true, "response": {"chunks": [
                    {"alternatives": [{"text": "hello"}, {"text": "hallo"}]},
                    {"alternatives": []},
                    {"alternatives": [{"text": "world"}]}
                ]}}"#,
            ))
        });

        let status = backend(mock_http)
            .poll_status(&OperationHandle::new("op-1"))
            .await
            .unwrap();
        assert!(status.done);
        assert_eq!(status.result.as_deref(), Some("hello world"));
    }

    #[tokio::test]
    async fn test_poll_reports_job_error() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|_| {
            Ok(json_response(
                200,
                r#"{"done": true, "error": {"code": 3, "message": "bad audio"}}"#,
            ))
        });

        let status = backend(mock_http)
            .poll_status(&OperationHandle::new("op-2"))
            .await
            .unwrap();
        assert_eq!(status.error.as_deref(), Some("bad audio"));
        assert!(status.result.is_none());
    }

    #[tokio::test]
    async fn test_poll_running_job() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(json_response(200, r#"{"id": "op-3", "done": false}"#)));

        let status = backend(mock_http)
            .poll_status(&OperationHandle::new("op-3"))
            .await
            .unwrap();
        assert!(!status.done);
    }

    #[tokio::test]
    async fn test_transport_failure_is_transient() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(2)
            .returning(|_| Err(BridgeError::Transient("connection reset".into())));

        let err = backend(mock_http)
            .poll_status(&OperationHandle::new("op-4"))
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn test_from_config_requires_endpoints() {
        let http: Arc<dyn HttpClient> = Arc::new(MockHttpClient::new());
        let config = TranscriptionConfig::default();
        assert!(matches!(
            HttpTranscriptionBackend::from_config(http, &config),
            Err(ConvertError::Backend(_))
        ));
    }
}
