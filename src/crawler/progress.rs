//! Progress reporting hooks for a running crawl.
//!
//! Progress is observable but not part of the data contract; the library
//! reports to a [`ProgressSink`] and the CLI decides how to render it.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::fetcher::Endpoint;

/// Stage of the crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Fetching the member directory
    Users,
    /// Fetching the conversation list
    Channels,
    /// Fetching one channel's history
    History {
        /// Channel name
        channel: String,
    },
    /// Fetching the threads of one channel
    Threads {
        /// Channel name
        channel: String,
    },
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Users => write!(f, "retrieving users list"),
            Phase::Channels => write!(f, "retrieving channels list"),
            Phase::History { channel } => write!(f, "retrieving history of #{channel}"),
            Phase::Threads { channel } => write!(f, "retrieving threads of #{channel}"),
        }
    }
}

/// Receives crawl progress events
pub trait ProgressSink: Send + Sync {
    /// A phase begins
    fn phase_started(&self, _phase: &Phase) {}

    /// One page of `endpoint` was merged, carrying `items` elements
    fn page_fetched(&self, _endpoint: Endpoint, _items: usize) {}

    /// A phase ended with `items` elements collected
    fn phase_finished(&self, _phase: &Phase, _items: usize) {}
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {}

/// Counts pages and items, for summaries and tests
#[derive(Debug, Default)]
pub struct PageCounter {
    pages: AtomicUsize,
    items: AtomicUsize,
    phases: AtomicUsize,
}

impl PageCounter {
    /// Pages seen so far
    pub fn pages(&self) -> usize {
        self.pages.load(Ordering::Relaxed)
    }

    /// Elements seen so far, across all pages
    pub fn items(&self) -> usize {
        self.items.load(Ordering::Relaxed)
    }

    /// Phases completed so far
    pub fn phases(&self) -> usize {
        self.phases.load(Ordering::Relaxed)
    }
}

impl ProgressSink for PageCounter {
    fn page_fetched(&self, _endpoint: Endpoint, items: usize) {
        self.pages.fetch_add(1, Ordering::Relaxed);
        self.items.fetch_add(items, Ordering::Relaxed);
    }

    fn phase_finished(&self, _phase: &Phase, _items: usize) {
        self.phases.fetch_add(1, Ordering::Relaxed);
    }
}
