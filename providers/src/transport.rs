//! HTTP transport helpers.
//!
//! Thin wrappers around `reqwest` used by HTTP-based providers. Every call
//! builds its own client, so concurrent calls never share connection state.
//!
//! **Trust policy:** certificate verification is disabled unconditionally.
//! Every provider built on these helpers inherits this policy.

use base64::Engine;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::ProviderError;

/// Request headers as name/value pairs.
pub type Headers = HashMap<String, String>;

fn build_client(timeout_secs: u64) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ProviderError::Connection(format!("failed to build HTTP client: {e}")))
}

fn to_header_map(headers: &Headers) -> Result<HeaderMap, ProviderError> {
    headers
        .iter()
        .map(|(name, value)| {
            let name = HeaderName::try_from(name.as_str())
                .map_err(|e| ProviderError::InvalidConfig(format!("header name '{name}': {e}")))?;
            let value = HeaderValue::try_from(value.as_str())
                .map_err(|e| ProviderError::InvalidConfig(format!("header '{}': {e}", name.as_str())))?;
            Ok((name, value))
        })
        .collect()
}

/// Issues a GET request.
///
/// # Errors
///
/// Returns [`ProviderError::InvalidConfig`] for an unusable header and
/// [`ProviderError::Connection`] if the request cannot be sent or times out.
/// The response status is not inspected.
pub async fn get(
    headers: &Headers,
    url: &str,
    timeout_secs: u64,
) -> Result<reqwest::Response, ProviderError> {
    let client = build_client(timeout_secs)?;
    let request = client.get(url).headers(to_header_map(headers)?);

    request.send().await.map_err(|e| {
        tracing::error!(%url, error = %e, "GET request failed");
        ProviderError::Connection(e.to_string())
    })
}

/// Issues a POST request with a JSON content type.
///
/// Caller-supplied headers are applied after the default content type and
/// may override it.
///
/// # Errors
///
/// Returns [`ProviderError::InvalidConfig`] for an unusable header and
/// [`ProviderError::Connection`] if the request cannot be sent or times out.
/// The response status is not inspected.
pub async fn post(
    headers: &Headers,
    url: &str,
    body: impl Into<reqwest::Body>,
    timeout_secs: u64,
) -> Result<reqwest::Response, ProviderError> {
    let client = build_client(timeout_secs)?;
    let request = client
        .post(url)
        .header(CONTENT_TYPE, "application/json")
        .headers(to_header_map(headers)?)
        .body(body);

    request.send().await.map_err(|e| {
        tracing::error!(%url, error = %e, "POST request failed");
        ProviderError::Connection(e.to_string())
    })
}

/// Builds an `Authorization` header for basic auth.
///
/// Returns no headers when both username and password are empty.
///
/// # Example
///
/// ```
/// use providers::transport::basic_auth_header;
///
/// let headers = basic_auth_header("admin", "secret");
/// assert_eq!(headers["Authorization"], "Basic YWRtaW46c2VjcmV0");
///
/// assert!(basic_auth_header("", "").is_empty());
/// ```
#[must_use]
pub fn basic_auth_header(username: &str, password: &str) -> Headers {
    let mut headers = Headers::new();
    if !username.is_empty() || !password.is_empty() {
        let encoded =
            base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
        headers.insert("Authorization".to_string(), format!("Basic {encoded}"));
    }
    headers
}

/// Fails with [`ProviderError::BackendStatus`] unless the response is 2xx.
///
/// # Errors
///
/// Returns the status and body of a non-success response.
pub async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    Err(ProviderError::BackendStatus {
        status: status.as_u16(),
        message,
    })
}

/// Reads the full body and decodes it as JSON.
///
/// # Errors
///
/// Returns [`ProviderError::Connection`] if the body cannot be read and
/// [`ProviderError::MalformedResponse`] (including the body) if it does not
/// decode into `T`.
pub async fn decode_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ProviderError> {
    let body = response
        .bytes()
        .await
        .map_err(|e| ProviderError::Connection(format!("failed to read body: {e}")))?;

    serde_json::from_slice(&body).map_err(|e| {
        ProviderError::MalformedResponse(format!(
            "{e}, body: {}",
            String::from_utf8_lossy(&body)
        ))
    })
}
