//! # Slack History Dump Library
//!
//! Crawls the complete visible history of a Slack workspace through the
//! paginated, rate-limited Web API and assembles it into a closed,
//! hierarchical archive: users, channels, messages and thread replies.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use slack_history_dump::crawler::{ChannelSelector, HierarchyAssembler, RateLimitGuard, TokioSleeper};
//! use slack_history_dump::fetcher::slack_http::SlackHttpClient;
//! use slack_history_dump::{Credential, TimeWindow};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = SlackHttpClient::new(Credential::new("xoxp-..."), "https://slack.com/api/")?;
//! let guard = RateLimitGuard::new(Arc::new(client), Arc::new(TokioSleeper));
//! let assembler = HierarchyAssembler::new(guard);
//!
//! let selector = ChannelSelector::from_names(["general"])?;
//! let archive = assembler.build_archive(&selector, &TimeWindow::unbounded()).await?;
//! println!("{} channels archived", archive.channels.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`fetcher`] - Transport seam, request values, pagination and the four resource bindings
//! - [`crawler`] - Throttle recovery, channel selection and hierarchy assembly
//! - [`output`] - Atomic JSON archive writer
//! - [`cli`] - Command line surface
//! - [`metrics`] - Request, page and throttle counters
//!
//! ## Data Types
//!
//! Records keep every attribute the API returns; only the fields the crawl
//! needs are typed. Merged collections ([`HistoryCollection`], [`ReplySet`])
//! are closed: they carry no cursor and serialize `has_more` as `false`.

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// CLI command implementation
pub mod cli;

/// Crawl orchestration, throttle recovery and channel selection
pub mod crawler;

/// API transport, pagination and resource bindings
pub mod fetcher;

/// Request and throttle metrics
pub mod metrics;

/// Archive writers
pub mod output;

/// Opaque attribute map preserved verbatim from API responses
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Opaque bearer credential attached to every request
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a token string
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token value, for building the authorization header
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Optional `[oldest, latest]` bound on a history fetch, as Slack timestamps
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeWindow {
    /// Lower bound (exclusive); `None` means from the beginning
    pub oldest: Option<String>,
    /// Upper bound (exclusive); `None` means up to now
    pub latest: Option<String>,
}

impl TimeWindow {
    /// Window with no bounds
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Window with the given bounds
    pub fn new(oldest: Option<String>, latest: Option<String>) -> Self {
        Self { oldest, latest }
    }
}

/// Workspace member as returned by `users.list`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Unique user id (e.g. `U012AB3CD`)
    pub id: String,
    /// Every other attribute, untouched
    #[serde(flatten)]
    pub attributes: Attributes,
}

impl UserRecord {
    /// Handle of the user, if present
    pub fn name(&self) -> Option<&str> {
        self.attributes.get("name").and_then(|v| v.as_str())
    }
}

/// Conversation as returned by `conversations.list`, plus its assembled history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRecord {
    /// Unique channel id (e.g. `C012AB3CD`)
    pub id: String,
    /// Channel name without the leading `#`
    #[serde(default)]
    pub name: String,
    /// Whether the credential's user is a member
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_member: Option<bool>,
    /// Whether the channel is archived
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_archived: Option<bool>,
    /// Whether the channel is private
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_private: Option<bool>,
    /// Every other attribute, untouched
    #[serde(flatten)]
    pub attributes: Attributes,
    /// Full message history, attached by the assembler
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<HistoryCollection>,
}

/// Message of a channel history or a thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Message timestamp; unique within the channel
    pub ts: String,
    /// Author id; absent for some bot and system messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Timestamp of the thread root this message belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
    /// Every other attribute, untouched
    #[serde(flatten)]
    pub attributes: Attributes,
    /// Replies of the thread rooted at this message, attached by the assembler
    #[serde(
        rename = "replies_body",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub replies: Option<ReplySet>,
}

impl MessageRecord {
    /// Whether this message names itself as its own thread root
    pub fn is_self_rooted(&self) -> bool {
        self.thread_ts.as_deref() == Some(self.ts.as_str())
    }
}

/// Marker for a collection whose pagination is complete.
///
/// Serializes as `false` and refuses to deserialize `true`, so a closed
/// collection can never claim to have more pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Closed;

impl Serialize for Closed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(false)
    }
}

impl<'de> Deserialize<'de> for Closed {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if bool::deserialize(deserializer)? {
            return Err(D::Error::custom(
                "closed collection cannot have has_more = true",
            ));
        }
        Ok(Closed)
    }
}

/// Complete, page-merged history of one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryCollection {
    /// Messages in the order the API delivered them
    pub messages: Vec<MessageRecord>,
    /// Lower bound the history was fetched with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oldest: Option<String>,
    /// Upper bound the history was fetched with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<String>,
    #[serde(default)]
    has_more: Closed,
}

impl HistoryCollection {
    /// Close a merged message list under the window it was fetched with
    pub fn new(messages: Vec<MessageRecord>, window: &TimeWindow) -> Self {
        Self {
            messages,
            oldest: window.oldest.clone(),
            latest: window.latest.clone(),
            has_more: Closed,
        }
    }
}

/// Complete, page-merged replies of one thread, root excluded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplySet {
    /// Replies in thread order
    pub messages: Vec<MessageRecord>,
    #[serde(default)]
    has_more: Closed,
}

impl ReplySet {
    /// Close a merged reply list
    pub fn new(messages: Vec<MessageRecord>) -> Self {
        Self {
            messages,
            has_more: Closed,
        }
    }

    /// Number of replies
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the thread has no replies besides its root
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Full workspace member directory, page-merged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserDirectory {
    /// Every member, in directory order
    pub members: Vec<UserRecord>,
}

impl UserDirectory {
    /// Wrap a merged member list
    pub fn new(members: Vec<UserRecord>) -> Self {
        Self { members }
    }

    /// Id → record lookup over the directory
    pub fn lookup(&self) -> HashMap<&str, &UserRecord> {
        self.members.iter().map(|u| (u.id.as_str(), u)).collect()
    }
}

/// Users that authored at least one retrieved message, keyed by id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserIndex(BTreeMap<String, UserRecord>);

impl UserIndex {
    /// Empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a user; a second insert of the same id is a no-op
    pub fn insert(&mut self, user: &UserRecord) {
        self.0
            .entry(user.id.clone())
            .or_insert_with(|| user.clone());
    }

    /// Look up a user by id
    pub fn get(&self, id: &str) -> Option<&UserRecord> {
        self.0.get(id)
    }

    /// Ids in sorted order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of users
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no user was referenced
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
