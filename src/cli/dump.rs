//! Dump command: crawl the workspace and write the archive

use chrono::{DateTime, NaiveDate, Utc};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use super::{CliError, SpinnerProgress};
use crate::crawler::config::DEFAULT_BASE_URL;
use crate::crawler::{ChannelSelector, CrawlStats, HierarchyAssembler, RateLimitGuard, TokioSleeper};
use crate::fetcher::slack_http::SlackHttpClient;
use crate::metrics;
use crate::output::{ArchiveWriter, JsonArchiveWriter};
use crate::{Credential, TimeWindow};

/// Lower bound meaning "from the beginning"
const SINCE_UNBOUNDED: &str = "0";
/// Upper bound meaning "up to now"
const UNTIL_UNBOUNDED: &str = "now";

/// Dump the full history of a Slack workspace to JSON
#[derive(Parser, Debug)]
#[command(name = "slack-history-dump", version, about)]
pub struct Cli {
    /// Slack API token
    #[arg(short = 't', long, env = "SLACK_TOKEN", hide_env_values = true, value_parser = parse_credential)]
    pub token: Credential,

    /// Oldest message to retrieve: Slack ts, epoch seconds, YYYY-MM-DD or RFC3339
    #[arg(long, default_value = SINCE_UNBOUNDED)]
    pub since: String,

    /// Latest message to retrieve: Slack ts, epoch seconds, YYYY-MM-DD, RFC3339 or `now`
    #[arg(long, default_value = UNTIL_UNBOUNDED)]
    pub until: String,

    /// Directory receiving users.json, channels.json and channel-users.json
    #[arg(short = 'o', long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Slack Web API base URL
    #[arg(long, env = "SLACK_API_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Serve Prometheus metrics on this address while the dump runs
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,

    /// Disable the progress spinner
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,

    /// Channels to archive; `*` selects every channel
    #[arg(value_name = "CHANNEL_NAMES", required = true)]
    pub channels: Vec<String>,
}

fn parse_credential(s: &str) -> Result<Credential, String> {
    let token = s.trim();
    if token.is_empty() {
        return Err("token must not be empty".to_string());
    }
    Ok(Credential::new(token))
}

/// Outcome of a successful dump
#[derive(Debug, Clone, PartialEq)]
pub struct DumpSummary {
    /// Archive totals
    pub stats: CrawlStats,
    /// Documents written
    pub files: Vec<PathBuf>,
}

impl Cli {
    /// Channel selection from the positional names
    pub fn selector(&self) -> Result<ChannelSelector, CliError> {
        Ok(ChannelSelector::from_names(&self.channels)?)
    }

    /// History bounds from `--since` and `--until`
    pub fn time_window(&self) -> Result<TimeWindow, CliError> {
        let oldest = parse_since(&self.since)?;
        let latest = parse_until(&self.until)?;

        if let (Some(oldest), Some(latest)) = (&oldest, &latest) {
            if ts_seconds(oldest) >= ts_seconds(latest) {
                return Err(CliError::InvalidArgument(format!(
                    "--since ({oldest}) must be earlier than --until ({latest})"
                )));
            }
        }
        Ok(TimeWindow::new(oldest, latest))
    }

    /// Run the dump against the live API
    pub async fn execute(&self) -> Result<DumpSummary, CliError> {
        let selector = self.selector()?;
        let window = self.time_window()?;

        if let Some(addr) = self.metrics_addr {
            metrics::init_metrics(addr)?;
        }

        let client = SlackHttpClient::new(self.token.clone(), self.base_url.clone())?;
        let guard = RateLimitGuard::new(Arc::new(client), Arc::new(TokioSleeper));
        let progress = Arc::new(if self.quiet {
            SpinnerProgress::hidden()
        } else {
            SpinnerProgress::new()
        });
        let assembler = HierarchyAssembler::new(guard).with_progress(progress.clone());
        let writer = JsonArchiveWriter::new(&self.output_dir);

        info!(
            base_url = %self.base_url,
            selection = ?selector,
            oldest = ?window.oldest,
            latest = ?window.latest,
            "Starting dump"
        );

        let result = run_dump(&assembler, &selector, &window, &writer).await;
        progress.finish();
        let summary = result?;

        info!(
            channels = summary.stats.channels,
            messages = summary.stats.messages,
            files = summary.files.len(),
            "Dump complete"
        );
        Ok(summary)
    }
}

/// Crawl with `assembler`, then hand the archive to `writer`
///
/// The writer is only reached once the whole archive is assembled, so a
/// failed crawl leaves the output untouched.
pub async fn run_dump<W: ArchiveWriter + ?Sized>(
    assembler: &HierarchyAssembler,
    selector: &ChannelSelector,
    window: &TimeWindow,
    writer: &W,
) -> Result<DumpSummary, CliError> {
    let archive = assembler.build_archive(selector, window).await?;
    let files = writer.write_archive(&archive)?;
    Ok(DumpSummary {
        stats: archive.stats(),
        files,
    })
}

/// Parse `--since`; `0` means unbounded
///
/// Date-only input uses the start of the day (00:00:00 UTC).
pub fn parse_since(input: &str) -> Result<Option<String>, CliError> {
    let input = input.trim();
    if input.is_empty() || input == SINCE_UNBOUNDED {
        return Ok(None);
    }
    if let Some(ts) = try_parse_slack_ts(input) {
        return Ok(Some(ts));
    }
    if let Some(dt) = try_parse_datetime_rfc3339(input) {
        return Ok(Some(format_slack_ts(dt)));
    }

    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|e| CliError::InvalidArgument(format!("Invalid --since value '{input}': {e}")))?;
    let datetime = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| CliError::InvalidArgument("Invalid --since value".to_string()))?;
    Ok(Some(format_slack_ts(datetime.and_utc())))
}

/// Parse `--until`; `now` means unbounded
///
/// Date-only input uses the end of the day (23:59:59.999999 UTC) so the
/// given date is fully included.
pub fn parse_until(input: &str) -> Result<Option<String>, CliError> {
    let input = input.trim();
    if input.is_empty() || input.eq_ignore_ascii_case(UNTIL_UNBOUNDED) {
        return Ok(None);
    }
    if let Some(ts) = try_parse_slack_ts(input) {
        return Ok(Some(ts));
    }
    if let Some(dt) = try_parse_datetime_rfc3339(input) {
        return Ok(Some(format_slack_ts(dt)));
    }

    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|e| CliError::InvalidArgument(format!("Invalid --until value '{input}': {e}")))?;
    let datetime = date
        .and_hms_micro_opt(23, 59, 59, 999_999)
        .ok_or_else(|| CliError::InvalidArgument("Invalid --until value".to_string()))?;
    Ok(Some(format_slack_ts(datetime.and_utc())))
}

/// Accept `1700000000` or `1700000000.000100` verbatim
fn try_parse_slack_ts(input: &str) -> Option<String> {
    let (secs, micros) = match input.split_once('.') {
        Some((secs, micros)) => (secs, Some(micros)),
        None => (input, None),
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    if !all_digits(secs) {
        return None;
    }
    if let Some(micros) = micros {
        if !all_digits(micros) || micros.len() > 6 {
            return None;
        }
    }
    Some(input.to_string())
}

/// RFC3339 with or without a timezone designator (assumed UTC when absent)
fn try_parse_datetime_rfc3339(input: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(&format!("{input}Z")) {
        return Some(dt.with_timezone(&Utc));
    }
    None
}

fn format_slack_ts(dt: DateTime<Utc>) -> String {
    format!("{}.{:06}", dt.timestamp(), dt.timestamp_subsec_micros())
}

fn ts_seconds(ts: &str) -> f64 {
    ts.parse().unwrap_or(0.0)
}
