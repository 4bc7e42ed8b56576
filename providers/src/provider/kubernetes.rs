//! Kubernetes cluster-event provider.
//!
//! Polls the control plane for events matching a reason code within a
//! recency window. Events are listed in pages of [`PAGE_SIZE`] and followed
//! through continuation tokens until the backend returns none.
//!
//! The reason is sent as a field selector to keep pages small, but the
//! local filter is authoritative: older API servers may ignore the selector.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Event;
use kube::api::{Api, ListParams};
use serde::Serialize;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

use super::credential::{resolve_credential, ResolvedCredential};
use super::{cancellable, Provider, KUBERNETES_PROVIDER_NAME};
use crate::config::DataSource;
use crate::error::ProviderError;
use crate::models::{Labels, ObjectReference, QueryOptions, QueryOutput, Record, WarningEvent};
use crate::window::event_cutoff;

/// Number of events requested per page.
pub const PAGE_SIZE: u32 = 50;

/// One page of events as returned by the backend.
#[derive(Debug, Clone, Default)]
pub struct EventPage {
    /// Events on this page, in backend order.
    pub items: Vec<WarningEvent>,
    /// Token for the next page; `None` on the last page.
    pub continue_token: Option<String>,
}

/// Source of paged cluster events.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Lists one page of events whose reason matches `reason`.
    ///
    /// # Errors
    ///
    /// Returns an error if the page cannot be fetched.
    async fn list_events(
        &self,
        reason: &str,
        continue_token: Option<&str>,
    ) -> Result<EventPage, ProviderError>;

    /// Returns the server version string.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be reached.
    async fn server_version(&self) -> Result<String, ProviderError>;
}

/// [`EventSource`] backed by a `kube` client.
#[derive(Clone)]
pub struct KubeEventSource {
    client: kube::Client,
}

impl KubeEventSource {
    /// Wraps an existing client.
    #[must_use]
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    /// Builds a client from a resolved credential.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Credential`] if the kubeconfig cannot be
    /// turned into a client configuration.
    pub async fn from_credential(credential: ResolvedCredential) -> Result<Self, ProviderError> {
        let config = kube::Config::from_custom_kubeconfig(
            credential.kubeconfig,
            &kube::config::KubeConfigOptions::default(),
        )
        .await
        .map_err(|e| ProviderError::Credential(e.to_string()))?;

        let client = kube::Client::try_from(config)
            .map_err(|e| ProviderError::Credential(format!("failed to build client: {e}")))?;

        Ok(Self::new(client))
    }
}

#[async_trait]
impl EventSource for KubeEventSource {
    async fn list_events(
        &self,
        reason: &str,
        continue_token: Option<&str>,
    ) -> Result<EventPage, ProviderError> {
        let api: Api<Event> = Api::all(self.client.clone());
        let mut params = ListParams::default()
            .fields(&format!("reason={reason}"))
            .limit(PAGE_SIZE);
        if let Some(token) = continue_token {
            params = params.continue_token(token);
        }

        let list = api.list(&params).await?;

        Ok(EventPage {
            continue_token: list.metadata.continue_.filter(|t| !t.is_empty()),
            items: list.items.into_iter().map(to_warning_event).collect(),
        })
    }

    async fn server_version(&self) -> Result<String, ProviderError> {
        let info = self.client.apiserver_version().await?;
        Ok(info.git_version)
    }
}

/// Converts a timestamp wrapper to UTC through its RFC3339 wire form.
fn wire_time_to_utc<T: Serialize>(time: &T) -> Option<DateTime<Utc>> {
    let value = serde_json::to_value(time).ok()?;
    DateTime::parse_from_rfc3339(value.as_str()?)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

fn to_warning_event(event: Event) -> WarningEvent {
    // Events recorded through events.k8s.io carry eventTime instead.
    let last_timestamp = event
        .last_timestamp
        .as_ref()
        .and_then(wire_time_to_utc)
        .or_else(|| event.event_time.as_ref().and_then(wire_time_to_utc));

    WarningEvent {
        reason: event.reason.unwrap_or_default(),
        last_timestamp,
        involved_object: ObjectReference {
            kind: event.involved_object.kind.unwrap_or_default(),
            namespace: event.involved_object.namespace.unwrap_or_default(),
            name: event.involved_object.name.unwrap_or_default(),
        },
        event_type: event.type_.unwrap_or_default(),
        message: event.message.unwrap_or_default(),
        count: event.count.unwrap_or_default(),
    }
}

/// Groups events into one record per involved object, in first-seen order.
fn events_to_records(events: Vec<WarningEvent>) -> Vec<Record> {
    let mut index: HashMap<ObjectReference, usize> = HashMap::new();
    let mut records: Vec<Record> = Vec::new();

    for event in events {
        let slot = *index
            .entry(event.involved_object.clone())
            .or_insert_with(|| {
                records.push(Record::new(KUBERNETES_PROVIDER_NAME).with_metric(event.labels()));
                records.len() - 1
            });
        records[slot].message.push(event.message.into());
    }

    records
}

/// Provider for a Kubernetes cluster's warning events.
pub struct KubernetesProvider<S: EventSource = KubeEventSource> {
    events: S,
    external_labels: Labels,
}

impl KubernetesProvider<KubeEventSource> {
    /// Resolves the data source's credential and connects to the cluster.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Credential`] if the credential cannot be
    /// resolved or turned into a client.
    pub async fn connect(source: &DataSource) -> Result<Self, ProviderError> {
        let credential = resolve_credential(&source.kube_config)?;
        let events = KubeEventSource::from_credential(credential).await?;
        Ok(Self::with_source(events, source.labels.clone()))
    }
}

impl<S: EventSource> KubernetesProvider<S> {
    /// Creates a provider over any event source.
    #[must_use]
    pub fn with_source(events: S, external_labels: Labels) -> Self {
        Self {
            events,
            external_labels,
        }
    }

    /// Returns the underlying event source.
    #[must_use]
    pub fn event_source(&self) -> &S {
        &self.events
    }

    /// Returns events with the given reason last seen within `scope` minutes.
    ///
    /// Pages are fetched until the backend stops returning a continuation
    /// token. Events are returned in backend order. Cancellation is checked
    /// before every page and raced against every fetch.
    ///
    /// # Errors
    ///
    /// Returns the first page error or [`ProviderError::Cancelled`]; events
    /// gathered from earlier pages are discarded.
    pub async fn get_warning_events(
        &self,
        reason: &str,
        scope: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<WarningEvent>, ProviderError> {
        let cutoff = event_cutoff(Utc::now(), scope);
        let mut retained = Vec::new();
        let mut token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            if cancel.is_cancelled() {
                return Err(ProviderError::Cancelled);
            }

            let page = cancellable(cancel, self.events.list_events(reason, token.as_deref()))
                .await
                .inspect_err(|e| {
                    tracing::warn!(reason, page = pages + 1, error = %e, "Event page fetch failed");
                })?;
            pages += 1;

            let fetched = page.items.len();
            retained.extend(page.items.into_iter().filter(|e| e.matches(reason, cutoff)));
            tracing::debug!(reason, page = pages, fetched, retained = retained.len(), "Fetched event page");

            match page.continue_token {
                Some(next) if !next.is_empty() => token = Some(next),
                _ => break,
            }
        }

        tracing::info!(reason, scope, pages, matched = retained.len(), "Collected warning events");
        Ok(retained)
    }
}

#[async_trait]
impl<S: EventSource> Provider for KubernetesProvider<S> {
    fn name(&self) -> &'static str {
        KUBERNETES_PROVIDER_NAME
    }

    async fn query(
        &self,
        options: &QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<QueryOutput, ProviderError> {
        if options.is_noop() {
            return Ok(QueryOutput::empty());
        }

        let events = self
            .get_warning_events(&options.query, options.effective_scope(), cancel)
            .await?;

        Ok(QueryOutput::from_records(events_to_records(events)))
    }

    async fn check(&self, cancel: &CancellationToken) -> Result<(), ProviderError> {
        let version = cancellable(cancel, self.events.server_version()).await?;
        tracing::debug!(%version, "Kubernetes API server reachable");
        Ok(())
    }

    fn external_labels(&self) -> &Labels {
        &self.external_labels
    }
}
