//! Helpers shared by the HTTP-based adapters

use multidash_core::DataSourceError;
use reqwest::{Response, StatusCode};
use serde_json::Value;
use url::Url;

/// Resolve a possibly relative URL against the backend base URL
pub(crate) fn resolve_url(base: &str, raw: &str) -> Result<Url, url::ParseError> {
    match Url::parse(raw) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(base)?.join(raw),
        Err(e) => Err(e),
    }
}

/// Join a path onto a base URL string without doubling slashes
pub(crate) fn join_path(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// `http`/`https` base URL to its `ws`/`wss` counterpart
pub(crate) fn to_ws_scheme(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("https") {
        format!("wss{}", rest)
    } else if let Some(rest) = url.strip_prefix("http") {
        format!("ws{}", rest)
    } else {
        url.to_string()
    }
}

/// Map a transport-level reqwest failure
pub(crate) fn transport_error(error: reqwest::Error) -> DataSourceError {
    if error.is_timeout() {
        DataSourceError::Timeout(format!("Request timed out: {}", error))
    } else {
        DataSourceError::fetch(error.to_string())
    }
}

/// `HTTP {status}: {reason}`
pub(crate) fn status_line(status: StatusCode) -> String {
    format!(
        "HTTP {}: {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown")
    )
}

pub(crate) fn reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown")
}

/// Decode a JSON response body
pub(crate) async fn read_json(response: Response) -> Result<Value, DataSourceError> {
    response
        .json::<Value>()
        .await
        .map_err(|e| DataSourceError::fetch(format!("Invalid JSON response: {}", e)))
}
