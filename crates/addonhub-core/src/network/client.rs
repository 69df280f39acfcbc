//! HTTP client with rate limiting awareness.
//!
//! Provides a wrapper around reqwest with:
//! - Rate limit tracking from GitHub response headers
//! - A uniform "status >= 400 is an error" check
//! - User-agent management

use crate::config::AppConfig;
use crate::{AddonHubError, Result};
use reqwest::{header, Client, Response};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Rate limit state extracted from response headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitState {
    /// Remaining requests allowed.
    pub remaining: Option<u64>,
    /// Total request limit.
    pub limit: Option<u64>,
    /// Unix timestamp when the rate limit resets.
    pub reset: Option<u64>,
}

impl RateLimitState {
    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }
}

/// Shared HTTP client. Cheap to share behind an `Arc`; it holds no per-request state.
pub struct HttpClient {
    client: Client,
    rate_limit_remaining: AtomicI64,
    rate_limit_limit: AtomicU64,
    rate_limit_reset: AtomicU64,
}

impl HttpClient {
    /// Create a client without a request timeout.
    pub fn new() -> Result<Self> {
        Self::build(Client::builder())
    }

    /// Create a client whose requests time out after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        Self::build(Client::builder().timeout(timeout))
    }

    fn build(builder: reqwest::ClientBuilder) -> Result<Self> {
        let client = builder
            .user_agent(AppConfig::USER_AGENT)
            .build()
            .map_err(|e| AddonHubError::Network {
                message: format!("Failed to create HTTP client: {}", e),
                source: Some(e),
            })?;

        Ok(Self {
            client,
            rate_limit_remaining: AtomicI64::new(-1),
            rate_limit_limit: AtomicU64::new(0),
            rate_limit_reset: AtomicU64::new(0),
        })
    }

    /// Get the current rate limit state.
    pub fn rate_limit_state(&self) -> RateLimitState {
        let remaining = self.rate_limit_remaining.load(Ordering::SeqCst);
        let limit = self.rate_limit_limit.load(Ordering::SeqCst);
        let reset = self.rate_limit_reset.load(Ordering::SeqCst);
        RateLimitState {
            remaining: u64::try_from(remaining).ok(),
            limit: (limit > 0).then_some(limit),
            reset: (reset > 0).then_some(reset),
        }
    }

    /// GET `url`, failing with `RemoteApi` on any status >= 400.
    pub async fn get(&self, url: &str) -> Result<Response> {
        self.get_with_headers(url, &[], &[]).await
    }

    /// GET `url` with extra headers and query parameters.
    pub async fn get_with_headers(
        &self,
        url: &str,
        headers: &[(&str, String)],
        query: &[(&str, &str)],
    ) -> Result<Response> {
        let mut request = self.client.get(url);
        for (key, value) in headers {
            request = request.header(*key, value.as_str());
        }
        if !query.is_empty() {
            request = request.query(query);
        }

        debug!("Doing a HTTP GET request to {}", url);
        let response = request.send().await.map_err(|e| AddonHubError::Network {
            message: format!("GET {} failed: {}", url, e),
            source: Some(e),
        })?;
        debug!(
            "HTTP GET response from {} received with status {}",
            url,
            response.status()
        );

        self.update_rate_limits(&response);
        check_status(response)
    }

    fn update_rate_limits(&self, response: &Response) {
        let headers = response.headers();
        let read = |name: &str| -> Option<i64> {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<i64>().ok())
        };

        if let Some(remaining) = read("X-RateLimit-Remaining") {
            self.rate_limit_remaining.store(remaining, Ordering::SeqCst);
        }
        if let Some(limit) = read("X-RateLimit-Limit").and_then(|v| u64::try_from(v).ok()) {
            self.rate_limit_limit.store(limit, Ordering::SeqCst);
        }
        if let Some(reset) = read("X-RateLimit-Reset").and_then(|v| u64::try_from(v).ok()) {
            self.rate_limit_reset.store(reset, Ordering::SeqCst);
        }

        let state = self.rate_limit_state();
        if state.is_exhausted() {
            warn!(
                "Rate limit exhausted for {}, resets at {:?}",
                response.url().host_str().unwrap_or("unknown"),
                state.reset
            );
        }
    }
}

/// Turn any status >= 400 into `RemoteApi`.
pub fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        return Err(AddonHubError::RemoteApi {
            url: response.url().to_string(),
            status_code: status.as_u16(),
        });
    }
    Ok(response)
}

/// Whether `value` is an absolute http(s) URL with a host.
pub fn is_http_like(value: &str) -> bool {
    url::Url::parse(value)
        .map(|u| {
            matches!(u.scheme(), "http" | "https") && u.host_str().is_some_and(|h| !h.is_empty())
        })
        .unwrap_or(false)
}

/// A remote response body that hasn't been read yet.
///
/// Asset requests stream these straight through to the client.
pub struct RemoteBody {
    response: Response,
}

impl RemoteBody {
    pub fn new(response: Response) -> Self {
        Self { response }
    }

    /// URL the body was finally served from (after redirects).
    pub fn url(&self) -> &str {
        self.response.url().as_str()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    pub fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }

    /// Read the whole body.
    pub async fn bytes(self) -> Result<Vec<u8>> {
        let bytes = self.response.bytes().await?;
        Ok(bytes.to_vec())
    }

    /// Hand over the underlying response for streaming.
    pub fn into_response(self) -> Response {
        self.response
    }
}

impl std::fmt::Debug for RemoteBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteBody")
            .field("url", &self.url())
            .field("content_type", &self.content_type())
            .finish()
    }
}
