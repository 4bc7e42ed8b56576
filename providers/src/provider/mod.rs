//! The provider contract and its backends.
//!
//! A provider is a pluggable adapter over one monitoring backend. The alert
//! evaluation pipeline selects one by data-source kind, calls
//! [`Provider::check`] to gate usage, then calls [`Provider::query`] on a
//! fixed cadence.

pub mod credential;
pub mod kubernetes;
pub mod loki;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::config::{DataSource, DataSourceKind};
use crate::error::ProviderError;
use crate::models::{Labels, QueryOptions, QueryOutput};

pub use credential::{resolve_credential, CredentialOrigin, ResolvedCredential};
pub use kubernetes::{EventPage, EventSource, KubeEventSource, KubernetesProvider};
pub use loki::LokiProvider;

/// Provider name tag for the Loki backend.
pub const LOKI_PROVIDER_NAME: &str = "loki";

/// Provider name tag for the Kubernetes backend.
pub const KUBERNETES_PROVIDER_NAME: &str = "kubernetes";

/// The contract every backend satisfies.
///
/// Calls hold no shared mutable state, so one provider may serve concurrent
/// calls. Every network call races against `cancel`; a canceled call returns
/// [`ProviderError::Cancelled`].
#[async_trait]
pub trait Provider: Send + Sync {
    /// Name tag placed on every record this provider emits.
    fn name(&self) -> &'static str;

    /// Runs one bounded query.
    ///
    /// An empty query expression yields an empty output, not an error. The
    /// returned count equals the number of messages across all records.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-success backend status,
    /// malformed response, or cancellation.
    async fn query(
        &self,
        options: &QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<QueryOutput, ProviderError>;

    /// Probes the backend once.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or unhealthy.
    async fn check(&self, cancel: &CancellationToken) -> Result<(), ProviderError>;

    /// Returns the configured external labels unmodified.
    fn external_labels(&self) -> &Labels;
}

/// Health status of a data source, derived from one [`Provider::check`].
///
/// `healthy` is true exactly when `error` is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Whether the probe succeeded.
    pub healthy: bool,
    /// The probe failure, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the probe finished.
    pub checked_at: DateTime<Utc>,
}

impl HealthStatus {
    /// Builds a status from a check result.
    #[must_use]
    pub fn from_check(result: &Result<(), ProviderError>) -> Self {
        Self {
            healthy: result.is_ok(),
            error: result.as_ref().err().map(ToString::to_string),
            checked_at: Utc::now(),
        }
    }

    /// Runs a check against `provider` and records the outcome.
    pub async fn probe(provider: &dyn Provider, cancel: &CancellationToken) -> Self {
        let result = provider.check(cancel).await;
        if let Err(e) = &result {
            tracing::warn!(provider = provider.name(), error = %e, "Health check failed");
        }
        Self::from_check(&result)
    }
}

/// Builds the provider matching the data source's kind.
///
/// # Errors
///
/// Returns an error if the data source fails validation or, for cluster
/// backends, if the credentials cannot be resolved.
pub async fn build(source: &DataSource) -> Result<Box<dyn Provider>, ProviderError> {
    source
        .validate_source()
        .map_err(|e| ProviderError::InvalidConfig(e.to_string()))?;

    tracing::debug!(name = %source.name, kind = %source.kind, "Building provider");

    match source.kind {
        DataSourceKind::Loki => Ok(Box::new(LokiProvider::new(source)?)),
        DataSourceKind::Kubernetes => Ok(Box::new(KubernetesProvider::connect(source).await?)),
    }
}

/// Awaits `fut` unless `cancel` fires first.
pub(crate) async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ProviderError::Cancelled),
        result = fut => result,
    }
}
