use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::types::{
    ClusterItemsResponse, ClustersResponse, FeedResponse, FeedsPage, HeaderColorRequest,
    TimelinePage,
};
use crate::color::extract::MAX_FAVICON_SIZE;
use crate::color::{ColorBackend, ExtractionError};
use crate::timeline::TimelineSource;

/// Largest JSON body accepted from the API. A 500-item timeline page is well
/// under 1 MiB.
const MAX_RESPONSE_SIZE: usize = 16 * 1024 * 1024; // 16MB

/// Errors from talking to the headlines server.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Request timed out")]
    Timeout,
    /// Body was not the JSON shape we expected
    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Response too large")]
    ResponseTooLarge,
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
}

impl ApiError {
    /// Short form for the status bar.
    pub fn summary(&self) -> String {
        match self {
            ApiError::Network(_) => "server unreachable".to_string(),
            ApiError::HttpStatus(code) => format!("server returned {}", code),
            ApiError::Timeout => "request timed out".to_string(),
            ApiError::Decode(_) => "unexpected response".to_string(),
            ApiError::ResponseTooLarge => "response too large".to_string(),
            ApiError::InvalidUrl(_) | ApiError::UnsupportedScheme(_) => "bad URL".to_string(),
        }
    }
}

/// Redirect policy: at most 3 hops, no loops.
fn create_redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }

        let url = attempt.url();
        if attempt.previous().iter().any(|prev| prev.as_str() == url.as_str()) {
            return attempt.error("Redirect loop detected");
        }

        tracing::debug!(
            from = %attempt.previous().last().map(|u| u.as_str()).unwrap_or("initial"),
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );

        attempt.follow()
    })
}

// ============================================================================
// ApiClient
// ============================================================================

/// Client for the headlines HTTP API.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base: Url,
    timeout: Duration,
}

impl ApiClient {
    /// Build a client for the server at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .redirect(create_redirect_policy())
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(timeout)
            .user_agent(concat!("headlines/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::with_client(client, base_url, timeout)
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let mut base = Url::parse(base_url)?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ApiError::UnsupportedScheme(base.scheme().to_string()));
        }
        // Relative joins must keep any path prefix on the base.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            client,
            base,
            timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // ========================================================================
    // Endpoints
    // ========================================================================

    /// `GET /api/feeds?tab=<tab>`
    pub async fn fetch_feeds(&self, tab: &str) -> Result<FeedsPage, ApiError> {
        let mut url = self.endpoint(&["api", "feeds"])?;
        url.query_pairs_mut().append_pair("tab", tab);
        self.get_json(url).await
    }

    /// `GET /api/timeline?limit=&offset=&days=`
    pub async fn fetch_timeline(
        &self,
        limit: usize,
        offset: usize,
        days: u32,
    ) -> Result<TimelinePage, ApiError> {
        let mut url = self.endpoint(&["api", "timeline"])?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("offset", &offset.to_string())
            .append_pair("days", &days.to_string());
        self.get_json(url).await
    }

    /// `GET /api/clusters`
    pub async fn fetch_clusters(&self) -> Result<ClustersResponse, ApiError> {
        let url = self.endpoint(&["api", "clusters"])?;
        self.get_json(url).await
    }

    /// `GET /api/clusters/<id>/items`
    pub async fn fetch_cluster_items(
        &self,
        cluster_id: &str,
    ) -> Result<ClusterItemsResponse, ApiError> {
        let url = self.endpoint(&["api", "clusters", cluster_id, "items"])?;
        self.get_json(url).await
    }

    /// `GET /api/feed_more?url=&limit=&offset=`
    pub async fn fetch_more_feed_items(
        &self,
        feed_url: &str,
        limit: usize,
        offset: usize,
    ) -> Result<FeedResponse, ApiError> {
        let mut url = self.endpoint(&["api", "feed_more"])?;
        url.query_pairs_mut()
            .append_pair("url", feed_url)
            .append_pair("limit", &limit.to_string())
            .append_pair("offset", &offset.to_string());
        self.get_json(url).await
    }

    /// `POST /api/header_color`
    pub async fn save_header_color(
        &self,
        feed_url: &str,
        color: &str,
        text_color: &str,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "header_color"])?;
        let body = serde_json::to_vec(&HeaderColorRequest {
            feed_url: feed_url.to_string(),
            color: color.to_string(),
            text_color: text_color.to_string(),
        })?;

        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        let response = self.send(request).await?;
        tracing::debug!(feed = %feed_url, color = %color, text_color = %text_color, status = response.status().as_u16(), "Saved header color");
        Ok(())
    }

    /// Download a favicon. `favicon` may be absolute or relative to the server.
    pub async fn load_favicon(&self, favicon: &str) -> Result<Vec<u8>, ApiError> {
        let url = self.base.join(favicon)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ApiError::UnsupportedScheme(url.scheme().to_string()));
        }
        let response = self.send(self.client.get(url)).await?;
        self.read_body(response, MAX_FAVICON_SIZE).await
    }

    // ========================================================================
    // Plumbing
    // ========================================================================

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        tracing::debug!(url = %url, "GET");
        let response = self.send(self.client.get(url)).await?;
        let bytes = self.read_body(response, MAX_RESPONSE_SIZE).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| ApiError::Timeout)??;

        if !response.status().is_success() {
            return Err(ApiError::HttpStatus(response.status().as_u16()));
        }
        Ok(response)
    }

    async fn read_body(&self, response: reqwest::Response, limit: usize) -> Result<Vec<u8>, ApiError> {
        tokio::time::timeout(self.timeout, read_limited_bytes(response, limit))
            .await
            .map_err(|_| ApiError::Timeout)?
    }
}

/// Read a response body, rejecting anything larger than `limit` bytes.
async fn read_limited_bytes(response: reqwest::Response, limit: usize) -> Result<Vec<u8>, ApiError> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(ApiError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ApiError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

// ============================================================================
// Collaborator impls
// ============================================================================

impl TimelineSource for ApiClient {
    async fn fetch_page(
        &self,
        limit: usize,
        offset: usize,
        days: u32,
    ) -> Result<TimelinePage, ApiError> {
        self.fetch_timeline(limit, offset, days).await
    }
}

impl ColorBackend for ApiClient {
    async fn load_favicon(&self, favicon_url: &str) -> Result<Vec<u8>, ExtractionError> {
        ApiClient::load_favicon(self, favicon_url)
            .await
            .map_err(|e| ExtractionError::Unavailable(e.to_string()))
    }

    async fn save_header_color(
        &self,
        feed_url: &str,
        color: &str,
        text_color: &str,
    ) -> Result<(), ApiError> {
        ApiClient::save_header_color(self, feed_url, color, text_color).await
    }
}
