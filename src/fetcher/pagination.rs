//! Cursor pagination over Slack list methods
//!
//! One engine serves every list method. Two continuation styles exist in the
//! API and are selected per resource through [`PageSpec`]:
//! - `response_metadata.next_cursor` non-empty means another page
//!   (`users.list`, `conversations.list`)
//! - `has_more: true` means another page, whose token is then read from
//!   `response_metadata.next_cursor` (`conversations.history`,
//!   `conversations.replies`)
//!
//! Every page's list field is appended exactly once. A cursor the server
//! hands out twice within one walk is rejected.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

use crate::crawler::progress::{NoopProgress, ProgressSink};
use crate::crawler::RateLimitGuard;
use crate::fetcher::{ApiRequest, Endpoint, FetcherError, FetcherResult};
use crate::metrics;

/// How a page signals that another page follows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// A non-empty `response_metadata.next_cursor` is the only signal
    NextCursor,
    /// `has_more` decides; the token comes from `response_metadata.next_cursor`
    HasMoreFlag,
}

/// Per-resource pagination shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpec {
    /// Top-level array field merged across pages
    pub list_field: &'static str,
    /// Continuation style of the method
    pub continuation: Continuation,
    /// Fixed delay after every page request, for methods with a low ceiling
    pub pacing: Option<Duration>,
}

/// Walks all pages of a list method and merges them
pub struct Paginator<'a> {
    guard: &'a RateLimitGuard,
    progress: &'a dyn ProgressSink,
}

impl<'a> Paginator<'a> {
    /// Paginator issuing its requests through `guard`
    pub fn new(guard: &'a RateLimitGuard) -> Self {
        Self {
            guard,
            progress: &NoopProgress,
        }
    }

    /// Report every fetched page to `progress`
    pub fn with_progress(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    /// Fetch every page starting at `initial` and concatenate the list field
    ///
    /// # Returns
    /// All elements, in page order then in-page order
    ///
    /// # Errors
    /// The first failure of any page aborts the walk; elements gathered so
    /// far are dropped.
    pub async fn fetch_all<T>(&self, initial: ApiRequest, spec: &PageSpec) -> FetcherResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let endpoint = initial.endpoint();
        let mut items = Vec::new();
        let mut consumed = HashSet::new();
        let mut request = initial;
        let mut page_number = 0usize;

        loop {
            page_number += 1;
            let mut page = self.guard.execute(&request).await?;
            let batch = take_list(&mut page, spec.list_field, endpoint)?;
            let count = batch.len();

            for (position, raw) in batch.into_iter().enumerate() {
                let item = serde_json::from_value(raw).map_err(|e| {
                    FetcherError::ParseError(format!(
                        "{endpoint} page {page_number}, `{}`[{position}]: {e}",
                        spec.list_field
                    ))
                })?;
                items.push(item);
            }

            debug!(
                %endpoint,
                page = page_number,
                received = count,
                total = items.len(),
                "Fetched page"
            );
            metrics::record_page(endpoint, count);
            self.progress.page_fetched(endpoint, count);

            if let Some(delay) = spec.pacing {
                self.guard.pace(delay).await;
            }

            let Some(cursor) = next_cursor(&page, spec.continuation, endpoint)? else {
                break;
            };
            if !consumed.insert(cursor.clone()) {
                return Err(FetcherError::InvalidResponse(format!(
                    "{endpoint} returned cursor `{cursor}` a second time"
                )));
            }
            request = request.with_cursor(&cursor);
        }

        debug!(
            %endpoint,
            pages = page_number,
            total = items.len(),
            "Pagination complete"
        );
        Ok(items)
    }
}

/// Continuation token for the page after `page`, or `None` on the last page
pub fn next_cursor(
    page: &Value,
    continuation: Continuation,
    endpoint: Endpoint,
) -> FetcherResult<Option<String>> {
    let token = page
        .pointer("/response_metadata/next_cursor")
        .and_then(Value::as_str)
        .filter(|c| !c.is_empty());

    match continuation {
        Continuation::NextCursor => Ok(token.map(str::to_owned)),
        Continuation::HasMoreFlag => {
            let has_more = page
                .get("has_more")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if !has_more {
                return Ok(None);
            }
            token.map(|t| Some(t.to_owned())).ok_or_else(|| {
                FetcherError::InvalidResponse(format!(
                    "{endpoint} set has_more without a next_cursor"
                ))
            })
        }
    }
}

fn take_list(page: &mut Value, field: &str, endpoint: Endpoint) -> FetcherResult<Vec<Value>> {
    match page.get_mut(field).map(Value::take) {
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(FetcherError::InvalidResponse(format!(
            "{endpoint} field `{field}` is not an array"
        ))),
        None => Err(FetcherError::InvalidResponse(format!(
            "{endpoint} response has no `{field}` field"
        ))),
    }
}
