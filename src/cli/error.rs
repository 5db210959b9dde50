//! CLI error types and conversions

use crate::crawler::CrawlError;
use crate::fetcher::FetcherError;
use crate::metrics::MetricsError;
use crate::output::OutputError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Crawl error
    #[error("crawl error: {0}")]
    CrawlError(#[from] CrawlError),

    /// Fetcher error raised while setting up the client
    #[error("fetcher error: {0}")]
    FetcherError(#[from] FetcherError),

    /// Output error
    #[error("output error: {0}")]
    OutputError(#[from] OutputError),

    /// Metrics exporter error
    #[error("metrics error: {0}")]
    MetricsError(#[from] MetricsError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl CliError {
    /// The underlying fetch failure, if this error came from the API
    pub fn fetch_error(&self) -> Option<&FetcherError> {
        match self {
            CliError::CrawlError(CrawlError::Fetch(e)) | CliError::FetcherError(e) => Some(e),
            _ => None,
        }
    }
}
