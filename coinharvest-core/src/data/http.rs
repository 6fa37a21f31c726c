//! Shared blocking HTTP plumbing for the REST providers.

use super::provider::{body_excerpt, DataError};
use std::time::Duration;

const USER_AGENT: &str = concat!("coinharvest/", env!("CARGO_PKG_VERSION"));

/// Build a blocking client with an explicit per-request timeout.
pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::blocking::Client, DataError> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| DataError::Client(e.to_string()))
}

/// Send a request and return the body of a 2xx response.
///
/// Transport failures map to `NetworkUnreachable`, non-2xx responses to
/// `HttpStatus` with the (truncated) body attached for diagnosis.
pub(crate) fn send_for_body(req: reqwest::blocking::RequestBuilder) -> Result<String, DataError> {
    let resp = req.send().map_err(|e| {
        if e.is_timeout() {
            DataError::NetworkUnreachable(format!("request timed out: {e}"))
        } else {
            DataError::NetworkUnreachable(e.to_string())
        }
    })?;

    let status = resp.status();
    let body = resp
        .text()
        .map_err(|e| DataError::NetworkUnreachable(format!("failed to read body: {e}")))?;

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(DataError::AuthenticationRequired(format!(
            "HTTP {}: {}",
            status.as_u16(),
            body_excerpt(&body)
        )));
    }

    if !status.is_success() {
        return Err(DataError::HttpStatus {
            status: status.as_u16(),
            body: body_excerpt(&body),
        });
    }

    Ok(body)
}

/// Decode a JSON body, keeping the raw text on failure.
pub(crate) fn decode_json<T: serde::de::DeserializeOwned>(
    body: &str,
    what: &str,
) -> Result<T, DataError> {
    serde_json::from_str(body).map_err(|e| DataError::ResponseFormatChanged {
        reason: format!("failed to parse {what}: {e}"),
        body: body_excerpt(body),
    })
}
