//! Loki log-query provider.
//!
//! Translates a LogQL expression plus a time window into a `query_range`
//! request and flattens the returned streams into a single [`Record`].
//!
//! Requests go through [`crate::transport`], so certificate verification is
//! disabled for Loki endpoints.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use super::{cancellable, Provider, LOKI_PROVIDER_NAME};
use crate::config::DataSource;
use crate::error::ProviderError;
use crate::models::{Labels, QueryOptions, QueryOutput, Record};
use crate::transport::{self, Headers};
use crate::window::TimeWindow;

/// Timeout for range queries, independent of the data source's timeout.
pub const QUERY_TIMEOUT_SECS: u64 = 10;

const QUERY_RANGE_PATH: &str = "/loki/api/v1/query_range";
const LABELS_PATH: &str = "/loki/api/v1/labels";

/// Envelope of a `query_range` response.
#[derive(Debug, Deserialize)]
struct QueryRangeResponse {
    #[serde(default)]
    status: String,
    data: QueryRangeData,
}

#[derive(Debug, Deserialize)]
struct QueryRangeData {
    #[serde(rename = "resultType", default)]
    result_type: String,
    #[serde(default)]
    result: Vec<StreamResult>,
}

/// One stream: its label set and `[timestamp, line]` pairs.
///
/// Pairs stay untyped here so a malformed pair can be skipped without
/// rejecting the whole response.
#[derive(Debug, Deserialize)]
struct StreamResult {
    #[serde(default)]
    stream: Labels,
    #[serde(default)]
    values: Vec<serde_json::Value>,
}

/// Provider for a Loki backend.
///
/// # Example
///
/// ```
/// use providers::config::{DataSource, DataSourceKind, HttpConfig};
/// use providers::provider::{LokiProvider, Provider};
///
/// let source = DataSource::new("logs", DataSourceKind::Loki)
///     .with_http(HttpConfig::new("http://loki:3100"))
///     .with_label("env", "prod");
///
/// let provider = LokiProvider::new(&source).unwrap();
/// assert_eq!(provider.name(), "loki");
/// assert_eq!(provider.external_labels().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct LokiProvider {
    base_url: String,
    timeout: u64,
    headers: Headers,
    external_labels: Labels,
}

impl LokiProvider {
    /// Creates a provider from a data source.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidConfig`] if the data source has no HTTP endpoint.
    pub fn new(source: &DataSource) -> Result<Self, ProviderError> {
        let http = source.http.as_ref().ok_or_else(|| {
            ProviderError::InvalidConfig(format!(
                "data source '{}' requires an HTTP endpoint",
                source.name
            ))
        })?;

        let headers = source
            .auth
            .as_ref()
            .map(|auth| transport::basic_auth_header(&auth.username, &auth.password))
            .unwrap_or_default();

        Ok(Self {
            base_url: http.base_url().to_string(),
            timeout: http.timeout,
            headers,
            external_labels: source.labels.clone(),
        })
    }

    /// Builds the `query_range` URL for `options`, defaulting unset fields
    /// against `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if a window bound cannot be expressed in epoch nanoseconds.
    pub fn query_range_url(
        &self,
        options: &QueryOptions,
        now: DateTime<Utc>,
    ) -> Result<String, ProviderError> {
        let window = TimeWindow::resolve(options.start, options.end, now);

        Ok(format!(
            "{}{QUERY_RANGE_PATH}?query={}&direction={}&limit={}&start={}&end={}",
            self.base_url,
            urlencoding::encode(&options.query),
            options.effective_direction(),
            options.effective_limit(),
            window.start_nanos()?,
            window.end_nanos()?,
        ))
    }
}

/// Flattens streams into one record.
///
/// Every stream contributes its label set; every pair with at least two
/// elements contributes its second element. Returns the record and the
/// number of pairs taken.
fn flatten_streams(streams: Vec<StreamResult>) -> (Record, usize) {
    let mut record = Record::new(LOKI_PROVIDER_NAME);
    let mut skipped = 0usize;

    for stream in streams {
        record.metric.push(stream.stream);
        for pair in stream.values {
            match pair {
                serde_json::Value::Array(mut items) if items.len() >= 2 => {
                    record.message.push(items.swap_remove(1));
                }
                _ => skipped += 1,
            }
        }
    }

    if skipped > 0 {
        tracing::debug!(skipped, "Skipped malformed Loki value pairs");
    }

    let count = record.message.len();
    (record, count)
}

#[async_trait]
impl Provider for LokiProvider {
    fn name(&self) -> &'static str {
        LOKI_PROVIDER_NAME
    }

    async fn query(
        &self,
        options: &QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<QueryOutput, ProviderError> {
        let now = Utc::now();

        if options.is_noop() {
            return Ok(QueryOutput::empty());
        }

        let url = self.query_range_url(options, now)?;
        tracing::debug!(%url, "Querying Loki");

        let body: QueryRangeResponse = cancellable(cancel, async {
            let response = transport::get(&self.headers, &url, QUERY_TIMEOUT_SECS).await?;
            let response = transport::ensure_success(response).await?;
            transport::decode_json(response).await
        })
        .await?;

        tracing::debug!(
            status = %body.status,
            result_type = %body.data.result_type,
            streams = body.data.result.len(),
            "Loki query returned"
        );

        let (record, count) = flatten_streams(body.data.result);
        Ok(QueryOutput {
            records: vec![record],
            count,
        })
    }

    async fn check(&self, cancel: &CancellationToken) -> Result<(), ProviderError> {
        let url = format!("{}{LABELS_PATH}", self.base_url);

        let response =
            cancellable(cancel, transport::get(&self.headers, &url, self.timeout)).await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            tracing::error!(%url, status = status.as_u16(), "Loki is unhealthy");
            return Err(ProviderError::BackendStatus {
                status: status.as_u16(),
                message: format!("unhealthy status: {}", status.as_u16()),
            });
        }

        Ok(())
    }

    fn external_labels(&self) -> &Labels {
        &self.external_labels
    }
}
