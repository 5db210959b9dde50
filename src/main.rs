//! Main entry point for the slack-history-dump CLI

use clap::Parser;
use slack_history_dump::cli::Cli;
use slack_history_dump::fetcher::diagnostics;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("slack_history_dump=info"));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    let result = cli.execute().await.map_err(|e| {
        if let Some(fetch_error) = e.fetch_error() {
            eprintln!("{}", diagnostics::format_failure(fetch_error));
        }
        anyhow::anyhow!(e)
    });

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }
}
