//! `reqwest` transport for the Slack Web API
//!
//! Performs exactly one round trip per call: builds the method URL, attaches
//! the credential as a bearer header, and hands status, `Retry-After` and
//! body back unchanged. Throttling and `ok` handling are the guard's job.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, AUTHORIZATION, RETRY_AFTER};
use reqwest::Client;
use tracing::{debug, warn};

use crate::crawler::config::REQUEST_TIMEOUT;
use crate::fetcher::{ApiRequest, FetcherError, FetcherResult, RawResponse, SlackTransport};
use crate::Credential;

/// HTTP transport bound to one workspace credential
pub struct SlackHttpClient {
    client: Client,
    base_url: String,
    credential: Credential,
}

impl SlackHttpClient {
    /// Create a transport
    ///
    /// # Arguments
    /// * `credential` - Token sent with every request
    /// * `base_url` - API root, e.g. `https://slack.com/api/`
    ///
    /// # Errors
    /// Returns `NetworkError` if the HTTP client cannot be built
    pub fn new(credential: Credential, base_url: impl Into<String>) -> FetcherResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("slack-history-dump/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetcherError::NetworkError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, credential, base_url))
    }

    /// Create a transport over an existing client
    pub fn with_client(client: Client, credential: Credential, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            client,
            base_url,
            credential,
        }
    }

    /// API root every method is appended to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL of the request's method
    pub fn url_for(&self, request: &ApiRequest) -> String {
        format!("{}{}", self.base_url, request.endpoint().method())
    }
}

#[async_trait]
impl SlackTransport for SlackHttpClient {
    async fn send(&self, request: &ApiRequest) -> FetcherResult<RawResponse> {
        let url = self.url_for(request);
        debug!("GET {} with {} params", url, request.params().len());

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.credential.expose()))
            .query(request.params())
            .send()
            .await
            .map_err(|e| {
                let kind = if e.is_timeout() {
                    "timeout"
                } else if e.is_connect() {
                    "connection failed"
                } else {
                    "request failed"
                };
                FetcherError::NetworkError(format!("{url}: {kind}: {e}"))
            })?;

        let status = response.status().as_u16();
        let retry_after = parse_retry_after(response.headers());
        let body = response
            .text()
            .await
            .map_err(|e| FetcherError::NetworkError(format!("{url}: failed to read body: {e}")))?;

        Ok(RawResponse {
            status,
            retry_after,
            body,
        })
    }
}

/// Parse a `Retry-After` header given in whole seconds
pub fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?;
    match raw.trim().parse::<u64>() {
        Ok(seconds) => Some(seconds),
        Err(e) => {
            warn!("Ignoring unparsable Retry-After header '{}': {}", raw, e);
            None
        }
    }
}
