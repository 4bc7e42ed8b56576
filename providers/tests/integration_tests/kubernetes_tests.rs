//! Integration tests for the Kubernetes event provider.
//!
//! Tests cover:
//! - Reason and recency filtering
//! - Continuation-token paging and termination
//! - Failure and cancellation mid-loop
//! - Record grouping through the provider contract

use chrono::{Duration, Utc};
use providers::models::{Labels, QueryOptions, WarningEvent};
use providers::provider::{HealthStatus, KubernetesProvider, Provider};
use providers::{CancellationToken, ProviderError};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use super::common::{page, ScriptedEventSource};

fn provider(source: ScriptedEventSource) -> KubernetesProvider<ScriptedEventSource> {
    KubernetesProvider::with_source(
        source,
        Labels::from([("cluster".to_string(), json!("prod"))]),
    )
}

fn event(reason: &str, age: Duration, name: &str) -> WarningEvent {
    WarningEvent::new(reason, Utc::now() - age)
        .with_object("Pod", "default", name)
        .with_message(format!("{reason} on {name}"))
}

#[tokio::test]
async fn test_only_matching_recent_events_are_retained() {
    let source = ScriptedEventSource::new(vec![Ok(page(
        vec![
            event("A", Duration::minutes(5), "fresh"),
            event("A", Duration::hours(2), "stale"),
            event("B", Duration::minutes(1), "other"),
        ],
        None,
    ))]);
    let provider = provider(source);

    let events = provider
        .get_warning_events("A", 60, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].involved_object.name, "fresh");
}

#[tokio::test]
async fn test_pagination_follows_tokens_until_exhausted() {
    let source = ScriptedEventSource::new(vec![
        Ok(page(vec![event("A", Duration::minutes(1), "p1")], Some("tok-1"))),
        Ok(page(vec![event("A", Duration::minutes(2), "p2")], Some("tok-2"))),
        Ok(page(vec![event("A", Duration::minutes(3), "p3")], None)),
        Ok(page(vec![event("A", Duration::minutes(4), "never")], None)),
    ]);
    let provider = provider(source);

    let events = provider
        .get_warning_events("A", 60, &CancellationToken::new())
        .await
        .unwrap();

    let names: Vec<_> = events
        .iter()
        .map(|e| e.involved_object.name.as_str())
        .collect();
    assert_eq!(names, vec!["p1", "p2", "p3"]);
    assert_eq!(provider_calls(&provider), 3);
}

fn provider_calls(provider: &KubernetesProvider<ScriptedEventSource>) -> usize {
    provider.event_source().calls()
}

#[tokio::test]
async fn test_pagination_passes_continuation_tokens() {
    let source = ScriptedEventSource::new(vec![
        Ok(page(Vec::new(), Some("tok-1"))),
        Ok(page(Vec::new(), Some("tok-2"))),
        Ok(page(Vec::new(), None)),
    ]);
    let provider = provider(source);

    provider
        .get_warning_events("A", 60, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        provider.event_source().tokens(),
        vec![None, Some("tok-1".to_string()), Some("tok-2".to_string())]
    );
}

#[tokio::test]
async fn test_empty_token_terminates_loop() {
    let source = ScriptedEventSource::new(vec![
        Ok(page(vec![event("A", Duration::minutes(1), "only")], Some(""))),
        Ok(page(vec![event("A", Duration::minutes(1), "never")], None)),
    ]);
    let provider = provider(source);

    let events = provider
        .get_warning_events("A", 60, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(provider.event_source().calls(), 1);
}

#[tokio::test]
async fn test_page_failure_discards_earlier_pages() {
    let source = ScriptedEventSource::new(vec![
        Ok(page(vec![event("A", Duration::minutes(1), "p1")], Some("tok-1"))),
        Err(ProviderError::BackendStatus {
            status: 410,
            message: "continue token expired".to_string(),
        }),
    ]);
    let provider = provider(source);

    let result = provider
        .get_warning_events("A", 60, &CancellationToken::new())
        .await;

    assert!(matches!(
        result,
        Err(ProviderError::BackendStatus { status: 410, .. })
    ));
    assert_eq!(provider.event_source().calls(), 2);
}

#[tokio::test]
async fn test_cancellation_between_pages() {
    let cancel = CancellationToken::new();
    let source = ScriptedEventSource::new(vec![
        Ok(page(vec![event("A", Duration::minutes(1), "p1")], Some("tok-1"))),
        Ok(page(vec![event("A", Duration::minutes(1), "p2")], None)),
    ])
    .cancel_after(1, cancel.clone());
    let provider = provider(source);

    let result = provider.get_warning_events("A", 60, &cancel).await;

    assert!(matches!(result, Err(ProviderError::Cancelled)));
    assert_eq!(provider.event_source().calls(), 1);
}

#[tokio::test]
async fn test_cancellation_during_page_fetch() {
    let source = ScriptedEventSource::new(vec![Ok(page(Vec::new(), Some("tok-1")))]).hang_after(1);
    let provider = provider(source);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        provider.get_warning_events("A", 60, &cancel),
    )
    .await
    .expect("cancellation must not hang");

    assert!(matches!(result, Err(ProviderError::Cancelled)));
    assert_eq!(provider.event_source().calls(), 2);
}

#[tokio::test]
async fn test_already_cancelled_makes_no_request() {
    let source = ScriptedEventSource::new(vec![Ok(page(Vec::new(), None))]);
    let provider = provider(source);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = provider.get_warning_events("A", 60, &cancel).await;

    assert!(matches!(result, Err(ProviderError::Cancelled)));
    assert_eq!(provider.event_source().calls(), 0);
}

#[tokio::test]
async fn test_query_groups_events_per_object() {
    let source = ScriptedEventSource::new(vec![
        Ok(page(
            vec![
                event("BackOff", Duration::minutes(1), "api-1"),
                event("BackOff", Duration::minutes(2), "api-2"),
            ],
            Some("tok-1"),
        )),
        Ok(page(
            vec![
                event("BackOff", Duration::minutes(3), "api-1"),
                event("BackOff", Duration::minutes(90), "api-3"),
            ],
            None,
        )),
    ]);
    let provider = provider(source);

    let output = provider
        .query(&QueryOptions::new("BackOff"), &CancellationToken::new())
        .await
        .unwrap();

    // The default scope of 60 minutes drops api-3.
    assert_eq!(output.records.len(), 2);
    assert_eq!(output.count, 3);
    assert_eq!(output.records[0].metric[0].get("name"), Some(&json!("api-1")));
    assert_eq!(output.records[0].message.len(), 2);
    assert_eq!(output.records[1].metric[0].get("name"), Some(&json!("api-2")));
    let total: usize = output.records.iter().map(|r| r.message.len()).sum();
    assert_eq!(total, output.count);
}

#[tokio::test]
async fn test_query_respects_scope() {
    let source = ScriptedEventSource::new(vec![Ok(page(
        vec![
            event("BackOff", Duration::minutes(10), "recent"),
            event("BackOff", Duration::minutes(90), "older"),
        ],
        None,
    ))]);
    let provider = provider(source);

    let output = provider
        .query(
            &QueryOptions::new("BackOff").with_scope(120),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(output.count, 2);
}

#[tokio::test]
async fn test_empty_query_is_noop() {
    let source = ScriptedEventSource::new(vec![Ok(page(Vec::new(), None))]);
    let provider = provider(source);

    let output = provider
        .query(&QueryOptions::default(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(output.records.is_empty());
    assert_eq!(output.count, 0);
    assert_eq!(provider.event_source().calls(), 0);
}

#[tokio::test]
async fn test_check_healthy_is_repeatable() {
    let provider = provider(ScriptedEventSource::new(Vec::new()));
    let cancel = CancellationToken::new();

    assert_ok!(provider.check(&cancel).await);
    assert_ok!(provider.check(&cancel).await);
}

#[tokio::test]
async fn test_check_unhealthy() {
    let provider = provider(ScriptedEventSource::new(Vec::new()).unhealthy());
    let cancel = CancellationToken::new();

    let err = assert_err!(provider.check(&cancel).await);
    assert!(matches!(err, ProviderError::Connection(_)));

    let status = HealthStatus::probe(&provider, &cancel).await;
    assert!(!status.healthy);
    assert_eq!(
        status.error.as_deref(),
        Some("Connection error: connection refused")
    );
}

#[tokio::test]
async fn test_external_labels_and_name() {
    let provider = provider(ScriptedEventSource::new(Vec::new()));

    assert_eq!(provider.name(), "kubernetes");
    assert_eq!(provider.external_labels().get("cluster"), Some(&json!("prod")));
}

#[tokio::test]
async fn test_connect_with_invalid_credential() {
    let source = providers::config::DataSource::new(
        "cluster",
        providers::config::DataSourceKind::Kubernetes,
    )
    .with_kube_config("/nonexistent/watchpost/kubeconfig");

    let result = KubernetesProvider::connect(&source).await;

    assert!(matches!(result, Err(ProviderError::Credential(_))));
}
