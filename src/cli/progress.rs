//! Terminal spinner for a running crawl

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::crawler::{Phase, ProgressSink};
use crate::fetcher::Endpoint;

const TICK: Duration = Duration::from_millis(120);

/// [`ProgressSink`] rendering an indicatif spinner on stderr
///
/// The spinner shows the current phase and the number of pages merged.
/// indicatif hides it automatically when stderr is not a terminal.
#[derive(Clone)]
pub struct SpinnerProgress {
    bar: ProgressBar,
}

impl SpinnerProgress {
    /// Start a spinner
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg} ({pos} pages)")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        bar.enable_steady_tick(TICK);
        Self { bar }
    }

    /// Spinner with no draw target, for tests and `--quiet`
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Pages merged so far
    pub fn pages(&self) -> u64 {
        self.bar.position()
    }

    /// Current phase message
    pub fn message(&self) -> String {
        self.bar.message()
    }

    /// Stop the spinner and clear its line
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for SpinnerProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for SpinnerProgress {
    fn phase_started(&self, phase: &Phase) {
        self.bar.set_message(phase.to_string());
    }

    fn page_fetched(&self, _endpoint: Endpoint, _items: usize) {
        self.bar.inc(1);
    }
}
