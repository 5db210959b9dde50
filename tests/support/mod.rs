//! Scripted in-memory Slack workspace shared by the integration tests

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use slack_history_dump::crawler::{HierarchyAssembler, RateLimitGuard, Sleeper};
use slack_history_dump::fetcher::{
    ApiRequest, Endpoint, FetcherResult, RawResponse, SlackTransport,
};

struct Route {
    endpoint: Endpoint,
    matches: Vec<(&'static str, String)>,
    cursor: Option<String>,
    responses: VecDeque<RawResponse>,
}

impl Route {
    fn accepts(&self, request: &ApiRequest) -> bool {
        request.endpoint() == self.endpoint
            && request.cursor() == self.cursor.as_deref()
            && self
                .matches
                .iter()
                .all(|(k, v)| request.get(k) == Some(v.as_str()))
    }
}

/// Transport answering from scripted routes, recording every request
///
/// A route's last response is repeated once its queue is down to one entry.
#[derive(Default)]
pub struct MockSlack {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockSlack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the responses for `endpoint` at `cursor`, filtered by `matches`
    pub fn route(
        &self,
        endpoint: Endpoint,
        matches: &[(&'static str, &str)],
        cursor: Option<&str>,
        responses: Vec<RawResponse>,
    ) {
        self.routes.lock().unwrap().push(Route {
            endpoint,
            matches: matches.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            cursor: cursor.map(str::to_string),
            responses: responses.into(),
        });
    }

    /// Script a single 200 page
    pub fn page(
        &self,
        endpoint: Endpoint,
        matches: &[(&'static str, &str)],
        cursor: Option<&str>,
        body: Value,
    ) {
        self.route(endpoint, matches, cursor, vec![RawResponse::ok(body.to_string())]);
    }

    fn with_route(
        &self,
        endpoint: Endpoint,
        matches: &[(&'static str, &str)],
        cursor: Option<&str>,
        edit: impl FnOnce(&mut VecDeque<RawResponse>),
    ) {
        let mut routes = self.routes.lock().unwrap();
        let route = routes
            .iter_mut()
            .find(|r| {
                r.endpoint == endpoint
                    && r.cursor.as_deref() == cursor
                    && r.matches.len() == matches.len()
                    && matches
                        .iter()
                        .all(|(k, v)| r.matches.iter().any(|(rk, rv)| rk == k && rv == v))
            })
            .expect("route must be scripted first");
        edit(&mut route.responses);
    }

    /// Throttle the next requests to an already scripted route, once per
    /// entry of `retry_after`
    pub fn throttle(
        &self,
        endpoint: Endpoint,
        matches: &[(&'static str, &str)],
        cursor: Option<&str>,
        retry_after: &[u64],
    ) {
        self.with_route(endpoint, matches, cursor, |responses| {
            for seconds in retry_after.iter().rev() {
                responses.push_front(RawResponse::throttled(*seconds));
            }
        });
    }

    /// Answer an already scripted route with `body` instead
    pub fn replace(
        &self,
        endpoint: Endpoint,
        matches: &[(&'static str, &str)],
        cursor: Option<&str>,
        body: Value,
    ) {
        self.with_route(endpoint, matches, cursor, |responses| {
            responses.clear();
            responses.push_back(RawResponse::ok(body.to_string()));
        });
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, endpoint: Endpoint) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.endpoint() == endpoint)
            .collect()
    }
}

#[async_trait]
impl SlackTransport for MockSlack {
    async fn send(&self, request: &ApiRequest) -> FetcherResult<RawResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let mut routes = self.routes.lock().unwrap();
        let route = routes
            .iter_mut()
            .find(|r| r.accepts(request))
            .unwrap_or_else(|| panic!("no scripted response for {request:?}"));
        let response = if route.responses.len() > 1 {
            route.responses.pop_front().unwrap()
        } else {
            route.responses.front().cloned().unwrap()
        };
        Ok(response)
    }
}

/// Sleeper that records instead of waiting
#[derive(Default)]
pub struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }

    pub fn waits_longer_than(&self, threshold: Duration) -> Vec<Duration> {
        self.waits()
            .into_iter()
            .filter(|d| *d > threshold)
            .collect()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

pub fn guard(slack: &Arc<MockSlack>, sleeper: &Arc<RecordingSleeper>) -> RateLimitGuard {
    RateLimitGuard::new(slack.clone(), sleeper.clone())
}

pub fn assembler(slack: &Arc<MockSlack>, sleeper: &Arc<RecordingSleeper>) -> HierarchyAssembler {
    HierarchyAssembler::new(guard(slack, sleeper))
}

/// Three users, three channels over two list pages, a two-page history in
/// `general` with one two-page thread, an empty `random` and a one-message
/// `dev` history.
pub fn workspace() -> MockSlack {
    let slack = MockSlack::new();

    slack.page(
        Endpoint::UsersList,
        &[],
        None,
        json!({
            "ok": true,
            "members": [
                {"id": "U1", "name": "alice", "real_name": "Alice"},
                {"id": "U2", "name": "bob"}
            ],
            "response_metadata": {"next_cursor": "users-2"}
        }),
    );
    slack.page(
        Endpoint::UsersList,
        &[],
        Some("users-2"),
        json!({
            "ok": true,
            "members": [{"id": "U3", "name": "carol"}],
            "response_metadata": {"next_cursor": ""}
        }),
    );

    slack.page(
        Endpoint::ConversationsList,
        &[],
        None,
        json!({
            "ok": true,
            "channels": [
                {"id": "C1", "name": "general", "is_member": true, "topic": {"value": "all hands"}},
                {"id": "C2", "name": "random", "is_member": true}
            ],
            "response_metadata": {"next_cursor": "channels-2"}
        }),
    );
    slack.page(
        Endpoint::ConversationsList,
        &[],
        Some("channels-2"),
        json!({
            "ok": true,
            "channels": [{"id": "C3", "name": "dev", "is_private": true}],
            "response_metadata": {"next_cursor": ""}
        }),
    );

    slack.page(
        Endpoint::ConversationsHistory,
        &[("channel", "C1")],
        None,
        json!({
            "ok": true,
            "messages": [
                {"ts": "1700000003.000000", "user": "U1", "text": "release is out", "thread_ts": "1700000003.000000", "reply_count": 3},
                {"ts": "1700000002.000000", "user": "U9", "text": "from a deleted user"}
            ],
            "has_more": true,
            "pin_count": 0,
            "response_metadata": {"next_cursor": "history-2"}
        }),
    );
    slack.page(
        Endpoint::ConversationsHistory,
        &[("channel", "C1")],
        Some("history-2"),
        json!({
            "ok": true,
            "messages": [
                {"ts": "1700000001.000000", "user": "U1", "text": "hello"},
                {"ts": "1700000000.000000", "subtype": "channel_join", "text": "joined"}
            ],
            "has_more": false
        }),
    );

    slack.page(
        Endpoint::ConversationsReplies,
        &[("channel", "C1"), ("ts", "1700000003.000000")],
        None,
        json!({
            "ok": true,
            "messages": [
                {"ts": "1700000003.000000", "user": "U1", "text": "release is out", "thread_ts": "1700000003.000000"},
                {"ts": "1700000004.000000", "user": "U2", "text": "congrats", "thread_ts": "1700000003.000000"}
            ],
            "has_more": true,
            "response_metadata": {"next_cursor": "replies-2"}
        }),
    );
    slack.page(
        Endpoint::ConversationsReplies,
        &[("channel", "C1"), ("ts", "1700000003.000000")],
        Some("replies-2"),
        json!({
            "ok": true,
            "messages": [
                {"ts": "1700000005.000000", "user": "U3", "text": "🎉", "thread_ts": "1700000003.000000"},
                {"ts": "1700000006.000000", "user": "U2", "text": "thanks", "thread_ts": "1700000003.000000"}
            ],
            "has_more": false
        }),
    );

    slack.page(
        Endpoint::ConversationsHistory,
        &[("channel", "C2")],
        None,
        json!({"ok": true, "messages": [], "has_more": false}),
    );

    slack.page(
        Endpoint::ConversationsHistory,
        &[("channel", "C3")],
        None,
        json!({
            "ok": true,
            "messages": [{"ts": "1700000100.000000", "user": "U2", "text": "deploy at 5"}],
            "has_more": false
        }),
    );

    slack
}
