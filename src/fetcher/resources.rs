//! The four list resources the crawl reads, as configuration over
//! [`Paginator`].
//!
//! | Resource | Method | List field | Continuation | Page size | Pacing |
//! |---|---|---|---|---|---|
//! | Users | `users.list` | `members` | next_cursor | server default | - |
//! | Channels | `conversations.list` | `channels` | next_cursor | 100 | - |
//! | History | `conversations.history` | `messages` | has_more | 1000 | - |
//! | Replies | `conversations.replies` | `messages` | has_more | 10 | 1 s |

use crate::crawler::config::{
    CHANNELS_PAGE_SIZE, HISTORY_PAGE_SIZE, REPLIES_PAGE_DELAY, REPLIES_PAGE_SIZE,
    USERS_PAGE_SIZE,
};
use crate::fetcher::{ApiRequest, Continuation, Endpoint, FetcherResult, PageSpec, Paginator};
use crate::{ChannelRecord, HistoryCollection, MessageRecord, ReplySet, TimeWindow, UserRecord};

/// List resources read by the crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    /// Workspace member directory
    Users,
    /// Conversations visible to the token
    Channels,
    /// Messages of one channel
    History,
    /// Messages of one thread
    Replies,
}

impl Resource {
    /// API method backing the resource
    pub fn endpoint(&self) -> Endpoint {
        match self {
            Resource::Users => Endpoint::UsersList,
            Resource::Channels => Endpoint::ConversationsList,
            Resource::History => Endpoint::ConversationsHistory,
            Resource::Replies => Endpoint::ConversationsReplies,
        }
    }

    /// Pagination shape of the resource
    pub fn page_spec(&self) -> PageSpec {
        match self {
            Resource::Users => PageSpec {
                list_field: "members",
                continuation: Continuation::NextCursor,
                pacing: None,
            },
            Resource::Channels => PageSpec {
                list_field: "channels",
                continuation: Continuation::NextCursor,
                pacing: None,
            },
            Resource::History => PageSpec {
                list_field: "messages",
                continuation: Continuation::HasMoreFlag,
                pacing: None,
            },
            Resource::Replies => PageSpec {
                list_field: "messages",
                continuation: Continuation::HasMoreFlag,
                pacing: Some(REPLIES_PAGE_DELAY),
            },
        }
    }

    /// Page size hint sent as `limit`
    pub fn page_size(&self) -> u32 {
        match self {
            Resource::Users => USERS_PAGE_SIZE,
            Resource::Channels => CHANNELS_PAGE_SIZE,
            Resource::History => HISTORY_PAGE_SIZE,
            Resource::Replies => REPLIES_PAGE_SIZE,
        }
    }

    fn request(&self) -> ApiRequest {
        ApiRequest::new(self.endpoint()).param("limit", self.page_size().to_string())
    }
}

/// Conversation type accepted by `conversations.list`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelType {
    /// Public channels
    Public,
    /// Private channels the token's user belongs to
    Private,
}

impl ChannelType {
    /// Wire value for the `types` parameter
    pub fn as_param(&self) -> &'static str {
        match self {
            ChannelType::Public => "public_channel",
            ChannelType::Private => "private_channel",
        }
    }
}

/// Filters applied when listing channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelListOptions {
    /// Leave archived channels out of the list
    pub exclude_archived: bool,
    /// Conversation types to list
    pub types: Vec<ChannelType>,
}

impl Default for ChannelListOptions {
    fn default() -> Self {
        Self {
            exclude_archived: true,
            types: vec![ChannelType::Public, ChannelType::Private],
        }
    }
}

/// First-page request for `users.list`
pub fn users_request() -> ApiRequest {
    Resource::Users.request().param("include_locale", "false")
}

/// First-page request for `conversations.list`
pub fn channels_request(options: &ChannelListOptions) -> ApiRequest {
    let types = options
        .types
        .iter()
        .map(ChannelType::as_param)
        .collect::<Vec<_>>()
        .join(",");
    Resource::Channels
        .request()
        .param("exclude_archived", options.exclude_archived.to_string())
        .param("types", types)
}

/// First-page request for `conversations.history` of one channel
pub fn history_request(channel_id: &str, window: &TimeWindow) -> ApiRequest {
    Resource::History
        .request()
        .param("channel", channel_id)
        .param("inclusive", "false")
        .param_opt("oldest", window.oldest.as_deref())
        .param_opt("latest", window.latest.as_deref())
}

/// First-page request for `conversations.replies` of one thread
pub fn replies_request(channel_id: &str, thread_ts: &str) -> ApiRequest {
    Resource::Replies
        .request()
        .param("channel", channel_id)
        .param("ts", thread_ts)
        .param("inclusive", "false")
}

/// Typed, closed fetches of the four resources
pub struct SlackFetcher<'a> {
    paginator: Paginator<'a>,
}

impl<'a> SlackFetcher<'a> {
    /// Fetcher issuing its pages through `paginator`
    pub fn new(paginator: Paginator<'a>) -> Self {
        Self { paginator }
    }

    /// Every workspace member
    pub async fn users(&self) -> FetcherResult<Vec<UserRecord>> {
        self.paginator
            .fetch_all(users_request(), &Resource::Users.page_spec())
            .await
    }

    /// Every conversation matching `options`
    pub async fn channels(&self, options: &ChannelListOptions) -> FetcherResult<Vec<ChannelRecord>> {
        self.paginator
            .fetch_all(channels_request(options), &Resource::Channels.page_spec())
            .await
    }

    /// Complete history of a channel within `window`
    pub async fn history(
        &self,
        channel_id: &str,
        window: &TimeWindow,
    ) -> FetcherResult<HistoryCollection> {
        let messages = self
            .paginator
            .fetch_all(
                history_request(channel_id, window),
                &Resource::History.page_spec(),
            )
            .await?;
        Ok(HistoryCollection::new(messages, window))
    }

    /// Every message of a thread as delivered, root included
    pub async fn replies(&self, channel_id: &str, thread_ts: &str) -> FetcherResult<Vec<MessageRecord>> {
        self.paginator
            .fetch_all(
                replies_request(channel_id, thread_ts),
                &Resource::Replies.page_spec(),
            )
            .await
    }

    /// Replies of a thread with the root removed
    pub async fn reply_set(&self, channel_id: &str, root: &MessageRecord) -> FetcherResult<ReplySet> {
        let replies = self.replies(channel_id, &root.ts).await?;
        Ok(ReplySet::new(exclude_thread_root(&root.ts, replies)))
    }
}

/// Drop every message that is the thread root itself.
///
/// A message is the root when its `ts` equals its own `thread_ts`, or when
/// its `ts` equals the timestamp the thread was fetched for.
pub fn exclude_thread_root(root_ts: &str, replies: Vec<MessageRecord>) -> Vec<MessageRecord> {
    replies
        .into_iter()
        .filter(|reply| !reply.is_self_rooted() && reply.ts != root_ts)
        .collect()
}
