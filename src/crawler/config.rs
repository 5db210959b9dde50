//! Crawl configuration constants

use std::time::Duration;

/// Seconds added on top of every `Retry-After` directive.
/// Slack's directive is the minimum wait; the margin keeps the retried
/// request from landing right on the edge of the next window.
pub const THROTTLE_SAFETY_MARGIN_SECS: u64 = 10;

/// Fixed delay after each `conversations.replies` page.
/// The method is Tier 3 (~50 requests per minute); one request per second
/// stays under the ceiling even for workspaces with thousands of threads.
pub const REPLIES_PAGE_DELAY: Duration = Duration::from_secs(1);

/// `users.list` page size. 0 lets the server pick.
pub const USERS_PAGE_SIZE: u32 = 0;

/// `conversations.list` page size
pub const CHANNELS_PAGE_SIZE: u32 = 100;

/// `conversations.history` page size (server maximum)
pub const HISTORY_PAGE_SIZE: u32 = 1000;

/// `conversations.replies` page size
pub const REPLIES_PAGE_SIZE: u32 = 10;

/// Default Slack Web API base URL
pub const DEFAULT_BASE_URL: &str = "https://slack.com/api/";

/// Transport-level timeout for a single request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Wait applied for a `Retry-After: n` directive
pub fn throttle_delay(retry_after_secs: u64) -> Duration {
    Duration::from_secs(retry_after_secs.saturating_add(THROTTLE_SAFETY_MARGIN_SECS))
}
