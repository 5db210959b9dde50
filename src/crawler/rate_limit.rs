//! Throttle recovery around single API requests
//!
//! [`RateLimitGuard`] turns a raw transport round trip into either a decoded
//! `ok: true` body or an error. A response carrying `Retry-After` is waited
//! out and the identical request re-issued, with no retry bound; any other
//! failure is returned immediately.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::crawler::config::throttle_delay;
use crate::fetcher::diagnostics::{format_api_failure, format_throttle_wait};
use crate::fetcher::{ApiRequest, Endpoint, FetcherError, FetcherResult, SlackTransport};
use crate::metrics;

/// Suspends the crawl for a given duration
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Wait for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Executes requests, transparently waiting out throttling directives
#[derive(Clone)]
pub struct RateLimitGuard {
    transport: Arc<dyn SlackTransport>,
    sleeper: Arc<dyn Sleeper>,
}

impl RateLimitGuard {
    /// Create a guard over a transport
    ///
    /// # Arguments
    /// * `transport` - Performs the actual round trips
    /// * `sleeper` - Used for throttle waits and pacing delays
    pub fn new(transport: Arc<dyn SlackTransport>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { transport, sleeper }
    }

    /// Execute one request until it is answered without a throttling directive
    ///
    /// # Returns
    /// The decoded body of an `ok: true` response
    ///
    /// # Errors
    /// - `HttpError` for a non-success status without `Retry-After`
    /// - `ApiError` for an `ok: false` body
    /// - `ParseError` / `InvalidResponse` for undecodable bodies
    /// - whatever the transport itself returns
    pub async fn execute(&self, request: &ApiRequest) -> FetcherResult<Value> {
        let endpoint = request.endpoint();
        let mut waits = 0u32;

        loop {
            let response = self.transport.send(request).await?;
            metrics::record_response(endpoint, response.status);

            if response.is_success() {
                if waits > 0 {
                    debug!(%endpoint, waits, "Request succeeded after throttling");
                }
                return decode_body(endpoint, &response.body);
            }

            let Some(retry_after) = response.retry_after else {
                return Err(FetcherError::HttpError {
                    status: response.status,
                    body: response.body,
                });
            };

            waits += 1;
            let delay = throttle_delay(retry_after);
            warn!(
                %endpoint,
                retry_after,
                wait_secs = delay.as_secs(),
                waits,
                "{}",
                format_throttle_wait(endpoint, retry_after, delay)
            );
            metrics::record_throttle_wait(endpoint, delay);
            self.sleeper.sleep(delay).await;
        }
    }

    /// Apply a fixed cooperative delay between page requests
    pub async fn pace(&self, delay: Duration) {
        debug!(delay_ms = delay.as_millis() as u64, "Pacing before next request");
        self.sleeper.sleep(delay).await;
    }
}

/// Decode a 2xx body and enforce the `ok` envelope
fn decode_body(endpoint: Endpoint, body: &str) -> FetcherResult<Value> {
    let value: Value = serde_json::from_str(body).map_err(|e| {
        FetcherError::ParseError(format!("{endpoint} returned a non-JSON body: {e}"))
    })?;

    match value.get("ok").and_then(Value::as_bool) {
        Some(true) => Ok(value),
        Some(false) => {
            let code = value
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error")
                .to_string();
            warn!(%endpoint, code = %code, "{}", format_api_failure(endpoint, &code));
            metrics::record_api_error(endpoint, &code);
            Err(FetcherError::ApiError { endpoint, code })
        }
        None => Err(FetcherError::InvalidResponse(format!(
            "{endpoint} response has no boolean `ok` field"
        ))),
    }
}
