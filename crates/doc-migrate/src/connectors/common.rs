//! Common utilities shared across connectors.
//!
//! HTTP client creation, URL validation and error-body decoding.

use crate::error::{Error, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

/// Default HTTP timeout for all connectors.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connect timeout for all connectors.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Creates a configured HTTP client with timeout.
#[must_use]
pub fn create_http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Validates that a base URL uses http or https.
pub fn validate_url(url: &str) -> Result<()> {
    let host = ["http://", "https://"]
        .iter()
        .find_map(|scheme| url.strip_prefix(scheme));

    match host {
        None => Err(Error::Config(format!(
            "Invalid URL scheme in '{}'. Allowed: http, https",
            url
        ))),
        Some(rest) if rest.trim().is_empty() => {
            Err(Error::Config(format!("Invalid URL format: {}", url)))
        }
        Some(_) => Ok(()),
    }
}

/// Joins a base URL and a path, tolerating a trailing slash on the base.
#[must_use]
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Extracts the API error message from a failed response body.
///
/// Falls back to the status reason when the body carries no `message`.
#[must_use]
pub fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| status_text(status))
}

/// Status line text, e.g. "404 Not Found".
#[must_use]
pub fn status_text(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}
