//! Crawl orchestration
//!
//! The crawl is a single sequential walk:
//!
//! 1. **Directory**: every workspace member
//! 2. **Channels**: every visible conversation, narrowed by [`ChannelSelector`]
//! 3. **History**: every message of each selected channel
//! 4. **Threads**: every reply of each thread root, root excluded
//! 5. **Referenced users**: directory entries of observed authors
//!
//! One request is in flight at a time. Waits happen only inside
//! [`RateLimitGuard`] (throttling directives) and as fixed pacing between
//! pages of low-ceiling methods.
//!
//! # Error Handling
//!
//! Any failure other than throttling aborts the crawl and reaches the caller
//! unchanged; no partial archive is returned.

pub mod assembler;
pub mod config;
pub mod progress;
pub mod rate_limit;
pub mod selector;

pub use assembler::{Archive, CrawlStats, HierarchyAssembler};
pub use progress::{NoopProgress, PageCounter, Phase, ProgressSink};
pub use rate_limit::{RateLimitGuard, Sleeper, TokioSleeper};
pub use selector::ChannelSelector;

use crate::fetcher::FetcherError;

/// Crawl errors
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    /// A fetch failed; carried through unchanged
    #[error(transparent)]
    Fetch(#[from] FetcherError),

    /// The channel selection cannot be satisfied
    #[error("invalid channel selection: {0}")]
    InvalidSelection(String),
}
