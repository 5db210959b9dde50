//! Crawl observability metrics
//!
//! Counters and histograms for requests, merged pages, throttle waits and
//! API failures, recorded through the `metrics` facade. Without an installed
//! recorder every call is a no-op; [`init_metrics`] installs a Prometheus
//! exporter with a scrape endpoint for long crawls.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{debug, info};

use crate::fetcher::Endpoint;

static METRICS_INITIALIZED: OnceCell<SocketAddr> = OnceCell::new();

/// Metrics setup errors
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Exporter could not be installed
    #[error("failed to install Prometheus exporter on {addr}: {message}")]
    InstallFailed {
        /// Requested listen address
        addr: SocketAddr,
        /// Underlying error
        message: String,
    },
}

/// Install the Prometheus exporter and describe every metric
///
/// Idempotent: later calls return `Ok` without reinstalling. Must be called
/// from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), MetricsError> {
    if let Some(existing) = METRICS_INITIALIZED.get() {
        debug!(%existing, "Metrics already initialized, skipping");
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| MetricsError::InstallFailed {
            addr,
            message: e.to_string(),
        })?;

    describe_counter!(
        "api_requests_total",
        Unit::Count,
        "Slack API round trips, by method and HTTP status"
    );
    describe_counter!(
        "pages_fetched_total",
        Unit::Count,
        "List pages merged, by method"
    );
    describe_counter!(
        "items_fetched_total",
        Unit::Count,
        "List elements merged, by method"
    );
    describe_counter!(
        "api_throttle_waits_total",
        Unit::Count,
        "Retry-After directives waited out, by method"
    );
    describe_histogram!(
        "api_throttle_wait_seconds",
        Unit::Seconds,
        "Time spent waiting out a Retry-After directive"
    );
    describe_counter!(
        "api_errors_total",
        Unit::Count,
        "ok:false responses, by method and error code"
    );
    describe_counter!(
        "archives_completed_total",
        Unit::Count,
        "Crawls that produced a complete archive"
    );
    describe_counter!(
        "archives_failed_total",
        Unit::Count,
        "Crawls aborted by an unrecoverable error"
    );

    let _ = METRICS_INITIALIZED.set(addr);
    info!(%addr, "Metrics exporter listening");
    Ok(())
}

/// Whether [`init_metrics`] has succeeded
pub fn is_initialized() -> bool {
    METRICS_INITIALIZED.get().is_some()
}

/// Record one transport round trip
pub fn record_response(endpoint: Endpoint, status: u16) {
    counter!(
        "api_requests_total",
        "endpoint" => endpoint.method(),
        "status" => status.to_string(),
    )
    .increment(1);
}

/// Record one merged page
pub fn record_page(endpoint: Endpoint, items: usize) {
    counter!("pages_fetched_total", "endpoint" => endpoint.method()).increment(1);
    counter!("items_fetched_total", "endpoint" => endpoint.method()).increment(items as u64);
}

/// Record a throttle wait
pub fn record_throttle_wait(endpoint: Endpoint, wait: Duration) {
    counter!("api_throttle_waits_total", "endpoint" => endpoint.method()).increment(1);
    histogram!("api_throttle_wait_seconds", "endpoint" => endpoint.method())
        .record(wait.as_secs_f64());
}

/// Record an `ok: false` response
pub fn record_api_error(endpoint: Endpoint, code: &str) {
    counter!(
        "api_errors_total",
        "endpoint" => endpoint.method(),
        "code" => code.to_string(),
    )
    .increment(1);
}

/// Record a completed crawl
pub fn record_archive_completed() {
    counter!("archives_completed_total").increment(1);
}

/// Record an aborted crawl
pub fn record_archive_failed() {
    counter!("archives_failed_total").increment(1);
}
