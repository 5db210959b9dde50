//! Integration tests for hierarchy assembly over a scripted workspace

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use slack_history_dump::cli::run_dump;
use slack_history_dump::crawler::{ChannelSelector, CrawlError, PageCounter};
use slack_history_dump::fetcher::{ChannelListOptions, ChannelType, Endpoint, FetcherError, RawResponse};
use slack_history_dump::output::{ArchiveWriter, JsonArchiveWriter, CHANNELS_FILE};
use slack_history_dump::{ChannelRecord, TimeWindow};

use crate::support::{assembler, workspace, MockSlack, RecordingSleeper};

fn setup() -> (Arc<MockSlack>, Arc<RecordingSleeper>) {
    (Arc::new(workspace()), Arc::new(RecordingSleeper::default()))
}

fn channel<'a>(channels: &'a [ChannelRecord], name: &str) -> &'a ChannelRecord {
    channels
        .iter()
        .find(|c| c.name == name)
        .unwrap_or_else(|| panic!("#{name} not archived"))
}

#[tokio::test]
async fn test_full_crawl_assembles_hierarchy() {
    let (slack, sleeper) = setup();
    let archive = assembler(&slack, &sleeper)
        .build_archive(&ChannelSelector::All, &TimeWindow::unbounded())
        .await
        .unwrap();

    assert_eq!(archive.users.members.len(), 3);
    let names: Vec<&str> = archive.channels.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["general", "random", "dev"]);

    let general = channel(&archive.channels, "general");
    let history = general.history.as_ref().unwrap();
    assert_eq!(history.messages.len(), 4);

    let root = &history.messages[0];
    let replies = root.replies.as_ref().unwrap();
    let reply_ts: Vec<&str> = replies.messages.iter().map(|m| m.ts.as_str()).collect();
    assert_eq!(
        reply_ts,
        ["1700000004.000000", "1700000005.000000", "1700000006.000000"]
    );
    assert!(history.messages[1..].iter().all(|m| m.replies.is_none()));

    let stats = archive.stats();
    assert_eq!(stats.channels, 3);
    assert_eq!(stats.messages, 5);
    assert_eq!(stats.threads, 1);
    assert_eq!(stats.replies, 3);

    assert_eq!(slack.requests_to(Endpoint::ConversationsReplies).len(), 2);
    assert_eq!(sleeper.waits(), vec![Duration::from_secs(1); 2]);
}

#[tokio::test]
async fn test_channel_listing_filters_are_sent() {
    let (slack, sleeper) = setup();
    assembler(&slack, &sleeper)
        .with_channel_options(ChannelListOptions {
            exclude_archived: false,
            types: vec![ChannelType::Public],
        })
        .build_archive(&ChannelSelector::All, &TimeWindow::unbounded())
        .await
        .unwrap();

    let listing = slack.requests_to(Endpoint::ConversationsList);
    assert_eq!(listing.len(), 2);
    for request in &listing {
        assert_eq!(request.get("exclude_archived"), Some("false"));
        assert_eq!(request.get("types"), Some("public_channel"));
        assert_eq!(request.get("limit"), Some("100"));
    }
}

#[tokio::test]
async fn test_time_window_applies_to_every_history_page() {
    let (slack, sleeper) = setup();
    let window = TimeWindow::new(
        Some("1600000000.000000".to_string()),
        Some("1800000000.000000".to_string()),
    );
    assembler(&slack, &sleeper)
        .build_archive(&ChannelSelector::All, &window)
        .await
        .unwrap();

    let history = slack.requests_to(Endpoint::ConversationsHistory);
    assert_eq!(history.len(), 4);
    for request in &history {
        assert_eq!(request.get("oldest"), Some("1600000000.000000"));
        assert_eq!(request.get("latest"), Some("1800000000.000000"));
        assert_eq!(request.get("limit"), Some("1000"));
    }
    for request in slack.requests_to(Endpoint::ConversationsReplies) {
        assert_eq!(request.get("oldest"), None);
        assert_eq!(request.get("limit"), Some("10"));
    }
}

#[tokio::test]
async fn test_serialized_collections_are_closed() {
    let (slack, sleeper) = setup();
    let archive = assembler(&slack, &sleeper)
        .build_archive(&ChannelSelector::All, &TimeWindow::unbounded())
        .await
        .unwrap();

    let value = serde_json::to_value(&archive.channels).unwrap();
    let text = value.to_string();
    assert!(!text.contains("response_metadata"));
    assert!(!text.contains("next_cursor"));

    for channel in value.as_array().unwrap() {
        let history = &channel["history"];
        assert_eq!(history["has_more"], Value::Bool(false));
        for message in history["messages"].as_array().unwrap() {
            if let Some(replies) = message.get("replies_body") {
                assert_eq!(replies["has_more"], Value::Bool(false));
            }
        }
    }

    // Unknown attributes survive
    let general = &value[0];
    assert_eq!(general["topic"]["value"], "all hands");
    assert_eq!(general["history"]["messages"][0]["reply_count"], 3);
}

#[tokio::test]
async fn test_reply_sets_never_contain_the_root() {
    let (slack, sleeper) = setup();
    let archive = assembler(&slack, &sleeper)
        .build_archive(&ChannelSelector::All, &TimeWindow::unbounded())
        .await
        .unwrap();

    for channel in &archive.channels {
        for message in &channel.history.as_ref().unwrap().messages {
            if let Some(replies) = &message.replies {
                for reply in &replies.messages {
                    assert_ne!(reply.ts, message.ts);
                    assert_ne!(Some(reply.ts.as_str()), reply.thread_ts.as_deref());
                }
            }
        }
    }
}

#[tokio::test]
async fn test_user_index_holds_only_history_authors_in_directory() {
    let (slack, sleeper) = setup();
    let archive = assembler(&slack, &sleeper)
        .build_archive(&ChannelSelector::Named(vec!["general".to_string()]), &TimeWindow::unbounded())
        .await
        .unwrap();

    // U9 is unknown to the directory; U2 and U3 only appear in replies
    let ids: Vec<&str> = archive.channel_users.ids().collect();
    assert_eq!(ids, ["U1"]);
    assert_eq!(
        archive.channel_users.get("U1"),
        archive.users.members.iter().find(|u| u.id == "U1")
    );
}

#[tokio::test]
async fn test_user_index_spans_channels() {
    let (slack, sleeper) = setup();
    let archive = assembler(&slack, &sleeper)
        .build_archive(&ChannelSelector::All, &TimeWindow::unbounded())
        .await
        .unwrap();

    let ids: Vec<&str> = archive.channel_users.ids().collect();
    assert_eq!(ids, ["U1", "U2"]);
}

#[tokio::test]
async fn test_unmatched_names_are_skipped() {
    let (slack, sleeper) = setup();
    let selector = ChannelSelector::from_names(["general", "nope"]).unwrap();
    let archive = assembler(&slack, &sleeper)
        .build_archive(&selector, &TimeWindow::unbounded())
        .await
        .unwrap();

    let names: Vec<&str> = archive.channels.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["general"]);

    let history = slack.requests_to(Endpoint::ConversationsHistory);
    assert!(history.iter().all(|r| r.get("channel") == Some("C1")));
}

#[tokio::test]
async fn test_wildcard_selects_every_channel() {
    let (slack, sleeper) = setup();
    let selector = ChannelSelector::from_names(["*"]).unwrap();
    let archive = assembler(&slack, &sleeper)
        .build_archive(&selector, &TimeWindow::unbounded())
        .await
        .unwrap();

    assert_eq!(archive.channels.len(), 3);
}

#[tokio::test]
async fn test_no_match_yields_empty_archive() {
    let (slack, sleeper) = setup();
    let selector = ChannelSelector::from_names(["nope"]).unwrap();
    let archive = assembler(&slack, &sleeper)
        .build_archive(&selector, &TimeWindow::unbounded())
        .await
        .unwrap();

    assert!(archive.channels.is_empty());
    assert!(archive.channel_users.is_empty());
    assert_eq!(archive.users.members.len(), 3);
    assert!(slack.requests_to(Endpoint::ConversationsHistory).is_empty());
}

#[tokio::test]
async fn test_progress_reports_phases() {
    let (slack, sleeper) = setup();
    let counter = Arc::new(PageCounter::default());
    assembler(&slack, &sleeper)
        .with_progress(counter.clone())
        .build_archive(&ChannelSelector::All, &TimeWindow::unbounded())
        .await
        .unwrap();

    assert_eq!(counter.pages(), slack.requests().len());
    // users, channels, then history and threads for each of three channels
    assert_eq!(counter.phases(), 8);
}

#[tokio::test]
async fn test_failure_aborts_and_writes_nothing() {
    let (slack, sleeper) = setup();
    slack.replace(
        Endpoint::ConversationsHistory,
        &[("channel", "C3")],
        None,
        json!({"ok": false, "error": "not_in_channel"}),
    );

    let dir = tempfile::tempdir().unwrap();
    let writer = JsonArchiveWriter::new(dir.path());
    let result = run_dump(
        &assembler(&slack, &sleeper),
        &ChannelSelector::All,
        &TimeWindow::unbounded(),
        &writer,
    )
    .await;

    let error = result.unwrap_err();
    match error.fetch_error() {
        Some(FetcherError::ApiError { endpoint, code }) => {
            assert_eq!(*endpoint, Endpoint::ConversationsHistory);
            assert_eq!(code, "not_in_channel");
        }
        other => panic!("expected ApiError, got {other:?}"),
    }
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_failure_on_first_page_propagates_unchanged() {
    let slack = Arc::new(MockSlack::new());
    let sleeper = Arc::new(RecordingSleeper::default());
    slack.route(
        Endpoint::UsersList,
        &[],
        None,
        vec![RawResponse {
            status: 401,
            retry_after: None,
            body: "unauthorized".to_string(),
        }],
    );

    let result = assembler(&slack, &sleeper)
        .build_archive(&ChannelSelector::All, &TimeWindow::unbounded())
        .await;

    assert!(matches!(
        result,
        Err(CrawlError::Fetch(FetcherError::HttpError { status: 401, .. }))
    ));
    assert_eq!(slack.requests().len(), 1);
}

#[tokio::test]
async fn test_successful_dump_writes_archive() {
    let (slack, sleeper) = setup();
    let dir = tempfile::tempdir().unwrap();
    let writer = JsonArchiveWriter::new(dir.path());

    let summary = run_dump(
        &assembler(&slack, &sleeper),
        &ChannelSelector::Named(vec!["general".to_string()]),
        &TimeWindow::unbounded(),
        &writer,
    )
    .await
    .unwrap();

    assert_eq!(summary.files.len(), 3);
    assert_eq!(summary.stats.channels, 1);

    let text = std::fs::read_to_string(dir.path().join(CHANNELS_FILE)).unwrap();
    assert!(text.contains("🎉"));
    assert!(text.contains("\n    {"));
    let channels: Vec<ChannelRecord> = serde_json::from_str(&text).unwrap();
    assert_eq!(channels.len(), 1);
    assert_eq!(
        channels[0].history.as_ref().unwrap().messages[0]
            .replies
            .as_ref()
            .unwrap()
            .len(),
        3
    );

    // A second run replaces the files atomically
    writer
        .write_archive(
            &assembler(&slack, &sleeper)
                .build_archive(&ChannelSelector::All, &TimeWindow::unbounded())
                .await
                .unwrap(),
        )
        .unwrap();
    let channels: Vec<ChannelRecord> =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join(CHANNELS_FILE)).unwrap())
            .unwrap();
    assert_eq!(channels.len(), 3);
}
