//! Integration tests for the kube-backed event source.
//!
//! A local API server stand-in answers `/api/v1/events` and `/version`, so
//! these tests cover the request parameters and error mapping of the real
//! client path.

use axum::http::StatusCode;
use chrono::{Duration, SecondsFormat, Utc};
use providers::models::QueryOptions;
use providers::provider::{EventSource, KubernetesProvider, Provider};
use providers::{CancellationToken, ProviderError};
use serde_json::json;
use tokio_test::assert_ok;

use super::common::{api_status, event_json, event_list, kubernetes_source, MockApiServer};

fn minutes_ago(minutes: i64) -> String {
    (Utc::now() - Duration::minutes(minutes)).to_rfc3339_opts(SecondsFormat::Secs, true)
}

async fn connect(server: &MockApiServer) -> KubernetesProvider {
    let base = server.serve().await;
    KubernetesProvider::connect(&kubernetes_source(&base))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_list_sends_reason_selector_and_page_size() {
    let server = MockApiServer::with_responses(vec![(
        StatusCode::OK,
        event_list(
            vec![event_json("BackOff", "api-1", &minutes_ago(1), "restarting")],
            "",
        ),
    )]);
    let provider = connect(&server).await;

    let page = provider
        .event_source()
        .list_events("BackOff", None)
        .await
        .unwrap();

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].involved_object.name, "api-1");
    assert!(page.continue_token.is_none());

    let requests = server.recorded();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].get("fieldSelector").map(String::as_str),
        Some("reason=BackOff")
    );
    assert_eq!(requests[0].get("limit").map(String::as_str), Some("50"));
    assert!(!requests[0].contains_key("continue"));
}

#[tokio::test]
async fn test_query_follows_continue_token_until_empty() {
    let server = MockApiServer::with_responses(vec![
        (
            StatusCode::OK,
            event_list(
                vec![event_json("BackOff", "api-1", &minutes_ago(1), "first")],
                "tok-1",
            ),
        ),
        (
            StatusCode::OK,
            event_list(
                vec![event_json("BackOff", "api-2", &minutes_ago(2), "second")],
                "",
            ),
        ),
        (
            StatusCode::OK,
            event_list(
                vec![event_json("BackOff", "never", &minutes_ago(1), "never")],
                "",
            ),
        ),
    ]);
    let provider = connect(&server).await;

    let output = provider
        .query(&QueryOptions::new("BackOff"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(output.count, 2);
    assert_eq!(output.records.len(), 2);
    assert_eq!(output.records[0].message, vec![json!("first")]);
    assert_eq!(output.records[1].message, vec![json!("second")]);

    let requests = server.recorded();
    assert_eq!(requests.len(), 2);
    assert!(!requests[0].contains_key("continue"));
    assert_eq!(requests[1].get("continue").map(String::as_str), Some("tok-1"));
    assert!(requests
        .iter()
        .all(|r| r.get("fieldSelector").map(String::as_str) == Some("reason=BackOff")));
}

#[tokio::test]
async fn test_expired_token_maps_to_backend_status() {
    let server = MockApiServer::with_responses(vec![
        (
            StatusCode::OK,
            event_list(
                vec![event_json("BackOff", "api-1", &minutes_ago(1), "first")],
                "tok-1",
            ),
        ),
        (StatusCode::GONE, api_status(410, "Expired", "expired")),
    ]);
    let provider = connect(&server).await;

    let result = provider
        .get_warning_events("BackOff", 60, &CancellationToken::new())
        .await;

    match result {
        Err(ProviderError::BackendStatus { status, message }) => {
            assert_eq!(status, 410);
            assert_eq!(message, "expired");
        }
        other => panic!("expected backend status error, got {other:?}"),
    }
    assert_eq!(server.recorded().len(), 2);
}

#[tokio::test]
async fn test_check_reads_server_version() {
    let server = MockApiServer::default();
    let provider = connect(&server).await;

    assert_ok!(provider.check(&CancellationToken::new()).await);
    assert_eq!(
        provider.event_source().server_version().await.unwrap(),
        "v1.30.2"
    );
}
