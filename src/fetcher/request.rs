//! Immutable request values and raw responses.
//!
//! A page request is never mutated: the request for page N+1 is derived
//! from the one for page N by copying it and overriding the cursor.

use std::fmt;

/// Slack Web API methods used by the crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `users.list`
    UsersList,
    /// `conversations.list`
    ConversationsList,
    /// `conversations.history`
    ConversationsHistory,
    /// `conversations.replies`
    ConversationsReplies,
}

impl Endpoint {
    /// Method name, appended to the API base URL
    pub fn method(&self) -> &'static str {
        match self {
            Endpoint::UsersList => "users.list",
            Endpoint::ConversationsList => "conversations.list",
            Endpoint::ConversationsHistory => "conversations.history",
            Endpoint::ConversationsReplies => "conversations.replies",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method())
    }
}

/// Query parameter name used to carry the continuation token
pub const CURSOR_PARAM: &str = "cursor";

/// One API call: method plus query parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    endpoint: Endpoint,
    params: Vec<(&'static str, String)>,
}

impl ApiRequest {
    /// Request with no parameters
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            params: Vec::new(),
        }
    }

    /// Set a parameter, replacing any earlier value for the same key
    pub fn param(mut self, key: &'static str, value: impl Into<String>) -> Self {
        let value = value.into();
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.params.push((key, value)),
        }
        self
    }

    /// Set a parameter only when a value is given
    pub fn param_opt(self, key: &'static str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.param(key, v),
            None => self,
        }
    }

    /// Copy of this request pointing at the page after `cursor`
    pub fn with_cursor(&self, cursor: &str) -> Self {
        self.clone().param(CURSOR_PARAM, cursor)
    }

    /// Target method
    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    /// Parameters in insertion order
    pub fn params(&self) -> &[(&'static str, String)] {
        &self.params
    }

    /// Value of a parameter
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Continuation token this request resumes from, if any
    pub fn cursor(&self) -> Option<&str> {
        self.get(CURSOR_PARAM)
    }
}

/// Raw transport outcome, before throttle and `ok` handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Parsed `Retry-After` header, in seconds
    pub retry_after: Option<u64>,
    /// Response body
    pub body: String,
}

impl RawResponse {
    /// 200 response with the given body
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            retry_after: None,
            body: body.into(),
        }
    }

    /// 429 response asking the client to wait `seconds`
    pub fn throttled(seconds: u64) -> Self {
        Self {
            status: 429,
            retry_after: Some(seconds),
            body: String::new(),
        }
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
