//! Slack Web API access: transport seam, request values, pagination and
//! the four resource bindings the crawl is built from.

use async_trait::async_trait;

pub mod diagnostics;
pub mod pagination;
pub mod request;
pub mod resources;
pub mod slack_http;

pub use pagination::{Continuation, PageSpec, Paginator};
pub use request::{ApiRequest, Endpoint, RawResponse};
pub use resources::{ChannelListOptions, ChannelType, Resource, SlackFetcher};

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// Non-success HTTP status without a throttling directive
    #[error("HTTP error {status}: {body}")]
    HttpError {
        /// HTTP status code
        status: u16,
        /// Response body, as received
        body: String,
    },

    /// The request could not be completed at the transport level
    #[error("network error: {0}")]
    NetworkError(String),

    /// Response carried `"ok": false`
    #[error("API error from {endpoint}: {code}")]
    ApiError {
        /// API method that failed
        endpoint: Endpoint,
        /// Error code reported by the server (e.g. `channel_not_found`)
        code: String,
    },

    /// Response body or list element could not be decoded
    #[error("parse error: {0}")]
    ParseError(String),

    /// Decodable response that breaks the pagination contract
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// Issues a single API request and returns the raw outcome.
///
/// Implementations attach the credential and perform exactly one round trip;
/// throttling and `ok` handling live in
/// [`RateLimitGuard`](crate::crawler::RateLimitGuard).
#[async_trait]
pub trait SlackTransport: Send + Sync {
    /// Send one request
    async fn send(&self, request: &ApiRequest) -> FetcherResult<RawResponse>;
}
