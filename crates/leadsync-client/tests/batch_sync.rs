use httpmock::prelude::*;
use leadsync_client::HubSpotClient;
use leadsync_core::{
    CrmConfig, ErrorEntry, HttpConfig, Record, RejectionGroup, SyncConfig, SyncService,
};
use serde_json::json;
use std::time::Duration;

const UPSERT_PATH: &str = "/crm/v3/objects/contacts/batch/upsert";

fn service(server: &MockServer, batch_size: usize) -> SyncService<HubSpotClient> {
    let crm = CrmConfig::new(server.base_url(), "test-token");
    let http = HttpConfig {
        timeout: Duration::from_secs(5),
    };
    let client = HubSpotClient::new(&crm, &http).unwrap();
    SyncService::new(
        client,
        SyncConfig {
            batch_size,
            ..SyncConfig::default()
        },
    )
    .unwrap()
}

fn records(emails: &[&str]) -> Vec<Record> {
    emails.iter().map(|e| Record::new(*e)).collect()
}

#[tokio::test]
async fn test_rejected_records_never_reach_upstream() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path(UPSERT_PATH).json_body(json!({
                "inputs": [
                    {"properties": {"email": "a@x.com"}, "id": "a@x.com", "idProperty": "email"},
                    {"properties": {"email": "b@x.com"}, "id": "b@x.com", "idProperty": "email"}
                ]
            }));
            then.status(200).json_body(json!({
                "results": [
                    {"email": "a@x.com", "new": true},
                    {"email": "b@x.com", "new": false}
                ]
            }));
        })
        .await;

    let summary = service(&server, 10)
        .sync_batch(records(&["a@x.com", "a@x.com", "", "bad", "b@x.com"]))
        .await
        .unwrap();

    mock.assert_hits_async(1).await;
    assert_eq!(summary.error_count, 3);
    assert_eq!(summary.created_count, 1);
    assert_eq!(summary.updated_count, 1);

    let errors = serde_json::to_value(&summary.errors).unwrap();
    assert_eq!(
        errors,
        json!({
            "duplicates": [{"email": "a@x.com"}],
            "empty_email": [{"email": ""}],
            "invalid_email": [{"email": "bad"}]
        })
    );
}

#[tokio::test]
async fn test_single_created_contact() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(UPSERT_PATH);
            then.status(200)
                .json_body(json!({"results": [{"email": "a@x.com", "new": true}]}));
        })
        .await;

    let summary = service(&server, 100)
        .sync_batch(records(&["a@x.com"]))
        .await
        .unwrap();

    assert_eq!(summary.created_count, 1);
    assert_eq!(summary.updated_count, 0);
    assert_eq!(summary.error_count, 0);
    assert_eq!(summary.details.response.len(), 1);
}

#[tokio::test]
async fn test_payload_without_results_fails_the_chunk() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(UPSERT_PATH);
            then.status(200).json_body(json!({"data": "rate limited"}));
        })
        .await;

    let input = records(&["a@x.com", "b@x.com", "c@x.com"]);
    let summary = service(&server, 100)
        .sync_batch(input.clone())
        .await
        .unwrap();

    assert_eq!(summary.error_count, 3);
    assert_eq!(
        summary.errors_in(RejectionGroup::UpstreamError),
        &[ErrorEntry::Upstream {
            error: json!({"data": "rate limited"}),
            data: input,
        }]
    );
}

#[tokio::test]
async fn test_large_batch_is_split_into_bounded_calls() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path(UPSERT_PATH);
            then.status(503).body("Service Unavailable");
        })
        .await;

    let input: Vec<Record> = (0..250)
        .map(|i| Record::new(format!("user{i}@x.com")))
        .collect();
    let summary = service(&server, 100).sync_batch(input).await.unwrap();

    mock.assert_hits_async(3).await;
    assert_eq!(summary.error_count, 250);

    let sizes: Vec<usize> = summary
        .errors_in(RejectionGroup::UpstreamError)
        .iter()
        .map(ErrorEntry::record_count)
        .collect();
    assert_eq!(sizes, vec![100, 100, 50]);
    assert!(summary
        .errors_in(RejectionGroup::UpstreamError)
        .iter()
        .all(|entry| matches!(
            entry,
            ErrorEntry::Upstream { error, .. } if error == "Service Unavailable"
        )));
}
