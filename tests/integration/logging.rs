//! Integration tests for logging and tracing

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use slack_history_dump::crawler::ChannelSelector;
use slack_history_dump::fetcher::Endpoint;
use slack_history_dump::TimeWindow;

use crate::support::{assembler, workspace, RecordingSleeper};

/// Log sink shared between the subscriber and the test
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_crawl_logs_throttle_waits_and_unmatched_channels() {
    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("slack_history_dump=debug"))
        .with_ansi(false)
        .with_writer({
            let logs = logs.clone();
            move || logs.clone()
        })
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let slack = Arc::new(workspace());
    slack.throttle(Endpoint::UsersList, &[], None, &[2]);
    let sleeper = Arc::new(RecordingSleeper::default());

    let selector = ChannelSelector::from_names(["random", "missing"]).unwrap();
    let archive = assembler(&slack, &sleeper)
        .build_archive(&selector, &TimeWindow::unbounded())
        .await
        .unwrap();

    assert_eq!(archive.channels.len(), 1);
    assert_eq!(sleeper.waits(), vec![Duration::from_secs(12)]);

    let output = logs.contents();
    let throttle_line = output
        .lines()
        .find(|l| l.contains("rate limit exceeded"))
        .unwrap_or_else(|| panic!("no throttle warning in:\n{output}"));
    assert!(throttle_line.contains("WARN"));
    assert!(throttle_line.contains("users.list: rate limit exceeded (Retry-After 2s), waiting 12 seconds"));

    let unmatched_line = output
        .lines()
        .find(|l| l.contains("Requested channel not found"))
        .unwrap_or_else(|| panic!("no unmatched-channel warning in:\n{output}"));
    assert!(unmatched_line.contains("WARN"));
    assert!(unmatched_line.contains("channel=missing"));

    assert!(output.contains("Archive assembled"));
}
