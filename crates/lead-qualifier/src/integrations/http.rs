use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;

/// Error raised while constructing an HTTP adapter.
#[derive(Debug, thiserror::Error)]
pub enum IntegrationError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Whether a failed call is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailureKind {
    Transient,
    Permanent,
}

const BODY_EXCERPT_CHARS: usize = 300;

pub(crate) fn build_client(timeout: Duration) -> Result<Client, IntegrationError> {
    let client = Client::builder()
        .timeout(timeout)
        .user_agent(concat!("lead-qualifier/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Rate limiting, request timeouts, and server errors are transient. Other statuses are
/// treated as a rejected request.
pub(crate) fn classify_status(status: StatusCode) -> FailureKind {
    if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        FailureKind::Transient
    } else {
        FailureKind::Permanent
    }
}

pub(crate) fn classify_error(error: &reqwest::Error) -> FailureKind {
    if error.is_decode() || error.is_builder() {
        return FailureKind::Permanent;
    }
    match error.status() {
        Some(status) => classify_status(status),
        None => FailureKind::Transient,
    }
}

/// Status line plus a bounded excerpt of the body, for error messages.
pub(crate) fn describe_failure(response: Response) -> (FailureKind, String) {
    let status = response.status();
    let body = response.text().unwrap_or_default();
    let excerpt: String = body.chars().take(BODY_EXCERPT_CHARS).collect();
    let detail = if excerpt.trim().is_empty() {
        status.to_string()
    } else {
        format!("{status}: {}", excerpt.trim())
    };
    (classify_status(status), detail)
}
