//! Hierarchy assembly: channel → message → thread reply, plus the index of
//! referenced users.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

use crate::crawler::progress::{NoopProgress, Phase, ProgressSink};
use crate::crawler::{ChannelSelector, CrawlError, RateLimitGuard};
use crate::fetcher::{ChannelListOptions, FetcherResult, Paginator, SlackFetcher};
use crate::metrics;
use crate::{ChannelRecord, MessageRecord, TimeWindow, UserDirectory, UserIndex, UserRecord};

/// Result of a complete crawl
#[derive(Debug, Clone, PartialEq)]
pub struct Archive {
    /// Full member directory
    pub users: UserDirectory,
    /// Selected channels, each carrying its closed history
    pub channels: Vec<ChannelRecord>,
    /// Directory entries of users that authored a retrieved history message
    pub channel_users: UserIndex,
}

impl Archive {
    /// Totals over the assembled archive
    pub fn stats(&self) -> CrawlStats {
        let mut stats = CrawlStats {
            directory_users: self.users.members.len(),
            referenced_users: self.channel_users.len(),
            channels: self.channels.len(),
            ..CrawlStats::default()
        };
        for history in self.channels.iter().filter_map(|c| c.history.as_ref()) {
            stats.messages += history.messages.len();
            for replies in history.messages.iter().filter_map(|m| m.replies.as_ref()) {
                stats.threads += 1;
                stats.replies += replies.len();
            }
        }
        stats
    }
}

/// Counts describing an archive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Members in the directory
    pub directory_users: usize,
    /// Members referenced by retrieved messages
    pub referenced_users: usize,
    /// Channels archived
    pub channels: usize,
    /// History messages across all channels
    pub messages: usize,
    /// Thread roots with an attached reply set
    pub threads: usize,
    /// Replies across all threads
    pub replies: usize,
}

/// Drives the crawl and stitches the results together
pub struct HierarchyAssembler {
    guard: RateLimitGuard,
    channel_options: ChannelListOptions,
    progress: Arc<dyn ProgressSink>,
}

impl HierarchyAssembler {
    /// Assembler issuing every request through `guard`
    pub fn new(guard: RateLimitGuard) -> Self {
        Self {
            guard,
            channel_options: ChannelListOptions::default(),
            progress: Arc::new(NoopProgress),
        }
    }

    /// Override the `conversations.list` filters
    pub fn with_channel_options(mut self, options: ChannelListOptions) -> Self {
        self.channel_options = options;
        self
    }

    /// Report progress to `progress`
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Crawl the workspace and assemble the archive
    ///
    /// # Arguments
    /// * `selector` - Channels to archive
    /// * `window` - Bounds applied to every history fetch
    ///
    /// # Errors
    /// The first non-throttling failure, unchanged
    pub async fn build_archive(
        &self,
        selector: &ChannelSelector,
        window: &TimeWindow,
    ) -> Result<Archive, CrawlError> {
        match self.crawl(selector, window).await {
            Ok(archive) => {
                let stats = archive.stats();
                info!(
                    channels = stats.channels,
                    messages = stats.messages,
                    threads = stats.threads,
                    replies = stats.replies,
                    referenced_users = stats.referenced_users,
                    "Archive assembled"
                );
                metrics::record_archive_completed();
                Ok(archive)
            }
            Err(e) => {
                metrics::record_archive_failed();
                Err(e)
            }
        }
    }

    async fn crawl(
        &self,
        selector: &ChannelSelector,
        window: &TimeWindow,
    ) -> Result<Archive, CrawlError> {
        let paginator = Paginator::new(&self.guard).with_progress(self.progress.as_ref());
        let fetcher = SlackFetcher::new(paginator);

        self.progress.phase_started(&Phase::Users);
        let users = UserDirectory::new(fetcher.users().await?);
        self.progress.phase_finished(&Phase::Users, users.members.len());
        info!(users = users.members.len(), "Fetched user directory");

        self.progress.phase_started(&Phase::Channels);
        let listed = fetcher.channels(&self.channel_options).await?;
        self.progress.phase_finished(&Phase::Channels, listed.len());
        let listed_count = listed.len();

        let (mut channels, unmatched) = selector.select(listed);
        for name in &unmatched {
            warn!(channel = %name, "Requested channel not found, skipping");
        }
        info!(
            listed = listed_count,
            selected = channels.len(),
            "Selected channels"
        );

        let channel_users = {
            let directory = users.lookup();
            let mut referenced = UserIndex::new();
            for channel in &mut channels {
                let span = info_span!("channel", id = %channel.id, name = %channel.name);
                self.assemble_channel(&fetcher, channel, &directory, &mut referenced, window)
                    .instrument(span)
                    .await?;
            }
            referenced
        };

        Ok(Archive {
            users,
            channels,
            channel_users,
        })
    }

    /// Attach the closed history (with reply sets on thread roots) to one
    /// channel and record the authors it references
    async fn assemble_channel(
        &self,
        fetcher: &SlackFetcher<'_>,
        channel: &mut ChannelRecord,
        directory: &HashMap<&str, &UserRecord>,
        referenced: &mut UserIndex,
        window: &TimeWindow,
    ) -> FetcherResult<()> {
        let history_phase = Phase::History {
            channel: channel.name.clone(),
        };
        self.progress.phase_started(&history_phase);
        let mut history = fetcher.history(&channel.id, window).await?;
        self.progress
            .phase_finished(&history_phase, history.messages.len());

        let roots = thread_roots(&history.messages);
        let threads_phase = Phase::Threads {
            channel: channel.name.clone(),
        };
        self.progress.phase_started(&threads_phase);
        let mut reply_count = 0usize;

        for message in &mut history.messages {
            if let Some(user) = message.user.as_deref().and_then(|id| directory.get(id)) {
                referenced.insert(user);
            }
            if roots.contains(&message.ts) {
                let replies = fetcher.reply_set(&channel.id, message).await?;
                reply_count += replies.len();
                message.replies = Some(replies);
            }
        }

        self.progress.phase_finished(&threads_phase, reply_count);
        info!(
            messages = history.messages.len(),
            threads = roots.len(),
            replies = reply_count,
            "Channel assembled"
        );
        channel.history = Some(history);
        Ok(())
    }
}

/// Timestamps of the messages that anchor a thread.
///
/// A message is a root when it carries `thread_ts`, or when another message
/// of the same history names its `ts` as `thread_ts`.
pub fn thread_roots(messages: &[MessageRecord]) -> HashSet<String> {
    let present: HashSet<&str> = messages.iter().map(|m| m.ts.as_str()).collect();
    let mut roots = HashSet::new();
    for message in messages {
        if let Some(parent) = message.thread_ts.as_deref() {
            roots.insert(message.ts.clone());
            if present.contains(parent) {
                roots.insert(parent.to_string());
            }
        }
    }
    roots
}
