//! Human-facing messages for throttle waits and API failures.
//!
//! Slack reports logical failures as short error codes (`not_in_channel`,
//! `missing_scope`, ...). These helpers turn them into log lines with a
//! remediation hint so an aborted crawl says what to fix.

use std::time::Duration;

use super::{Endpoint, FetcherError};

/// Classification of failures for user messaging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Token missing, malformed, revoked or expired
    AuthFailed,
    /// Token lacks an OAuth scope the method requires
    MissingScope,
    /// Channel or thread does not exist or is not visible
    NotFound,
    /// Caller is not a member of the conversation
    NotInChannel,
    /// Request parameters rejected by the server
    InvalidRequest,
    /// Server reported an internal problem
    ServerError,
    /// Connection could not be established or timed out
    Network,
    /// Response did not follow the documented shape
    Protocol,
    /// Anything else
    Other,
}

impl FailureKind {
    /// Classify a Slack error code
    pub fn from_code(code: &str) -> Self {
        match code {
            "not_authed" | "invalid_auth" | "account_inactive" | "token_revoked"
            | "token_expired" | "no_permission" => Self::AuthFailed,
            "missing_scope" => Self::MissingScope,
            "channel_not_found" | "thread_not_found" | "user_not_found" => Self::NotFound,
            "not_in_channel" => Self::NotInChannel,
            "invalid_arguments" | "invalid_cursor" | "invalid_ts_latest"
            | "invalid_ts_oldest" | "invalid_limit" | "invalid_types" => Self::InvalidRequest,
            "internal_error" | "fatal_error" | "service_unavailable" | "request_timeout" => {
                Self::ServerError
            }
            _ => Self::Other,
        }
    }

    /// Classify any fetcher error
    pub fn from_error(error: &FetcherError) -> Self {
        match error {
            FetcherError::ApiError { code, .. } => Self::from_code(code),
            FetcherError::HttpError { status, .. } => match status {
                401 | 403 => Self::AuthFailed,
                404 => Self::NotFound,
                400..=499 => Self::InvalidRequest,
                _ => Self::ServerError,
            },
            FetcherError::NetworkError(_) => Self::Network,
            FetcherError::ParseError(_) | FetcherError::InvalidResponse(_) => Self::Protocol,
        }
    }

    /// Remediation hint
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::AuthFailed => "Check that the token is valid and has not been revoked",
            Self::MissingScope => {
                "Add the users:read, channels:read, groups:read, channels:history and groups:history scopes to the token"
            }
            Self::NotFound => "Check the channel names; only conversations visible to the token can be dumped",
            Self::NotInChannel => "Join the channel with the token's user, or drop it from the selection",
            Self::InvalidRequest => "Check the --since/--until values and channel names",
            Self::ServerError => "Slack may be having issues, try again later",
            Self::Network => "Check network connectivity and the --base-url value",
            Self::Protocol => "The API answered with an unexpected shape; check --base-url points at the Slack Web API",
            Self::Other => "See https://api.slack.com/methods for the meaning of the error code",
        }
    }
}

/// Log line for a throttle wait
pub fn format_throttle_wait(endpoint: Endpoint, retry_after: u64, wait: Duration) -> String {
    format!(
        "{endpoint}: rate limit exceeded (Retry-After {retry_after}s), waiting {} seconds",
        wait.as_secs()
    )
}

/// Log line for an `ok: false` response
pub fn format_api_failure(endpoint: Endpoint, code: &str) -> String {
    format!(
        "{endpoint} failed with `{code}`: {}",
        FailureKind::from_code(code).suggestion()
    )
}

/// Multi-line summary printed when a crawl aborts
pub fn format_failure(error: &FetcherError) -> String {
    let kind = FailureKind::from_error(error);
    let mut lines = vec![
        "[FAILED] Archive aborted, nothing was written".to_string(),
        format!("  Error: {error}"),
    ];
    if let FetcherError::ApiError { endpoint, .. } = error {
        lines.push(format!("  Method: {endpoint}"));
    }
    lines.push(format!("  Suggestion: {}", kind.suggestion()));
    lines.join("\n")
}
