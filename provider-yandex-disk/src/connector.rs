//! Yandex Disk API connector implementation
//!
//! Implements the `RemoteStore` trait for the Yandex Disk REST API v1.

use async_trait::async_trait;
use bridge_traits::auth::TokenProvider;
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
use bridge_traits::storage::{DownloadLink, RemoteEntry, RemoteEntryKind, RemoteStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::YandexDiskError;
use crate::types::{ApiErrorBody, Link, Resource};

/// Yandex Disk API base URL
pub const DISK_API_BASE: &str = "https://cloud-api.yandex.net/v1/disk";

/// Largest page the listing endpoint accepts
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Fields requested for folder listings
const LISTING_FIELDS: &str = "name,path,type,_embedded.items.name,_embedded.items.path,\
_embedded.items.type,_embedded.items.size,_embedded.items.modified,_embedded.items.md5,\
_embedded.limit,_embedded.offset,_embedded.total";

/// Yandex Disk API connector
///
/// Implements `RemoteStore` for Yandex Disk.
///
/// # Features
///
/// - Paginated folder listing (`limit` / `offset`)
/// - Download link resolution followed by a streamed GET
/// - `Authorization: OAuth <token>`, token fetched per request
/// - Transport failures retried per [`RetryPolicy`]; HTTP errors are not
///
/// # Example
///
/// ```ignore
/// use provider_yandex_disk::YandexDiskConnector;
/// use bridge_traits::storage::RemoteStore;
///
/// let connector = YandexDiskConnector::new(http_client, token_provider, RetryPolicy::default());
/// let entries = connector.list_folder("/Docs", 1000, 0).await?;
/// ```
pub struct YandexDiskConnector {
    /// HTTP client for API requests
    http_client: Arc<dyn HttpClient>,

    /// Source of the OAuth token
    tokens: Arc<dyn TokenProvider>,

    retry: RetryPolicy,
    request_timeout: Duration,
    api_base: String,
}

impl YandexDiskConnector {
    /// Create a new Yandex Disk connector
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client implementation
    /// * `tokens` - Token provider, asked before every call
    /// * `retry` - Retry policy for transport failures
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        tokens: Arc<dyn TokenProvider>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            http_client,
            tokens,
            retry,
            request_timeout: Duration::from_secs(30),
            api_base: DISK_API_BASE.to_string(),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Point the connector at another API root (proxies, tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Strip the `disk:` scheme the API prefixes paths with.
    fn normalize_path(path: &str) -> String {
        let stripped = path.strip_prefix("disk:").unwrap_or(path);
        if stripped.starts_with('/') {
            stripped.to_string()
        } else {
            format!("/{}", stripped)
        }
    }

    /// Convert a Yandex resource to a RemoteEntry
    fn convert_resource(resource: Resource) -> RemoteEntry {
        let kind = if resource.is_dir() {
            RemoteEntryKind::Folder
        } else {
            RemoteEntryKind::File
        };

        RemoteEntry {
            path: Self::normalize_path(&resource.path),
            name: resource.name,
            kind,
            size: resource.size.unwrap_or(0),
            modified: resource.modified,
            content_hash: resource.md5.filter(|h| !h.is_empty()),
        }
    }

    /// Execute an authorized GET and turn non-2xx answers into errors
    async fn get(&self, url: String, path: &str) -> Result<HttpResponse> {
        let token = self.tokens.current_token().await?;

        let request = HttpRequest::new(HttpMethod::Get, url)
            .oauth_token(token)
            .header("Accept", "application/json")
            .timeout(self.request_timeout);

        let response = self
            .http_client
            .execute_with_retry(request, self.retry.clone())
            .await?;

        if response.is_success() {
            debug!(status = response.status, "API request succeeded");
            return Ok(response);
        }

        let message = match serde_json::from_slice::<ApiErrorBody>(&response.body) {
            Ok(body) => body.summary(),
            Err(_) => String::from_utf8_lossy(&response.body).to_string(),
        };
        warn!(status = response.status, path = %path, message = %message, "API request failed");
        Err(YandexDiskError::from_status(path, response.status, message).into())
    }
}

#[async_trait]
impl RemoteStore for YandexDiskConnector {
    #[instrument(skip(self))]
    async fn list_folder(&self, path: &str, limit: u32, offset: u32) -> Result<Vec<RemoteEntry>> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let url = format!(
            "{}/resources?path={}&limit={}&offset={}&fields={}",
            self.api_base,
            urlencoding::encode(path),
            limit,
            offset,
            LISTING_FIELDS
        );

        let response = self.get(url, path).await?;
        let resource: Resource = serde_json::from_slice(&response.body).map_err(|e| {
            YandexDiskError::ParseError(format!("Failed to parse folder listing: {}", e))
        })?;

        let entries: Vec<RemoteEntry> = resource
            .embedded
            .map(|list| list.items)
            .unwrap_or_default()
            .into_iter()
            .map(Self::convert_resource)
            .collect();

        debug!(count = entries.len(), "Listed folder page");
        Ok(entries)
    }

    #[instrument(skip(self))]
    async fn resolve_download(&self, path: &str) -> Result<DownloadLink> {
        let url = format!(
            "{}/resources/download?path={}",
            self.api_base,
            urlencoding::encode(path)
        );

        let response = self.get(url, path).await?;
        let link: Link = serde_json::from_slice(&response.body).map_err(|e| {
            YandexDiskError::ParseError(format!("Failed to parse download link: {}", e))
        })?;

        if link.href.is_empty() {
            return Err(YandexDiskError::MissingDownloadLink {
                path: path.to_string(),
            }
            .into());
        }
        Ok(DownloadLink { href: link.href })
    }

    async fn open_download(
        &self,
        link: &DownloadLink,
    ) -> Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>> {
        // Download hrefs are pre-signed; no Authorization header.
        self.http_client.download_stream(link.href.clone()).await
    }
}
