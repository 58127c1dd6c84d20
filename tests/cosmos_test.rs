//! Integration tests for CosmosStore using wiremock
//!
//! The mock server stands in for one regional replica of the database
//! account.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use geoshort::service::cosmos::API_VERSION;
use geoshort::service::{CosmosSettings, CosmosStore, DocumentStore, StoreError};
use geoshort::utils::retry::RetryConfig;
use serde_json::json;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DOC_PATH: &str = "/dbs/db/colls/items/docs/abc";

fn store(server: &MockServer, retry: RetryConfig) -> CosmosStore {
    let settings = CosmosSettings {
        endpoint: server.uri(),
        master_key: "c2VjcmV0LW1hc3Rlci1rZXk=".to_string(),
        database: "db".to_string(),
        collection: "items".to_string(),
        location: Some("westus".to_string()),
    };
    CosmosStore::new(&settings, Duration::from_secs(5), retry).unwrap()
}

/// Test a point read returns the document without system properties
#[tokio::test]
async fn test_read_document() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DOC_PATH))
        .and(header("x-ms-version", API_VERSION))
        .and(header("x-ms-documentdb-partitionkey", r#"["abc"]"#))
        .and(header_exists("authorization"))
        .and(header_exists("x-ms-date"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "abc",
            "url": "https://example.org/a/b/c",
            "_rid": "AAAA",
            "_etag": "\"0000\"",
            "_ts": 1700000000
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = store(&mock_server, RetryConfig::disabled());
    let document = store.get("abc").await.unwrap().expect("document should exist");

    assert_eq!(
        document.into_value(),
        json!({"id": "abc", "url": "https://example.org/a/b/c"})
    );
}

/// Test 404 maps to an absent document without retrying
#[tokio::test]
async fn test_missing_document() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DOC_PATH))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = store(&mock_server, RetryConfig::with_delays(3, 10, 50));
    assert!(store.get("abc").await.unwrap().is_none());
}

/// Test throttling is retried
#[tokio::test]
async fn test_throttled_then_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DOC_PATH))
        .respond_with(ResponseTemplate::new(429).insert_header("x-ms-retry-after-ms", "5"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(DOC_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "abc", "url": "u"})))
        .mount(&mock_server)
        .await;

    let store = store(&mock_server, RetryConfig::with_delays(2, 10, 50));
    let document = store.get("abc").await.unwrap().unwrap();
    assert_eq!(document.id(), Some("abc"));
}

/// Test a non-ASCII key reaches the store with an escaped partition key
#[tokio::test]
async fn test_read_non_ascii_key() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/dbs/db/colls/items/docs/caf%C3%A9"))
        .and(header("x-ms-documentdb-partitionkey", r#"["caf\u00e9"]"#))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": "café", "url": "https://example.fr"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = store(&mock_server, RetryConfig::disabled());
    let document = store.get("café").await.unwrap().expect("document should exist");
    assert_eq!(document.id(), Some("café"));
}

/// Test the wait requested by a throttled response is honored
#[tokio::test]
async fn test_throttled_waits_requested_delay() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DOC_PATH))
        .respond_with(ResponseTemplate::new(429).insert_header("x-ms-retry-after-ms", "150"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(DOC_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "abc", "url": "u"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    // backoff alone would wait 1ms
    let store = store(&mock_server, RetryConfig::with_delays(1, 1, 5));
    let started = std::time::Instant::now();
    let document = store.get("abc").await.unwrap().unwrap();

    assert_eq!(document.id(), Some("abc"));
    assert!(started.elapsed() >= Duration::from_millis(150));
}

/// Test retries stop after the configured budget
#[tokio::test]
async fn test_server_error_exhausts_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DOC_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let store = store(&mock_server, RetryConfig::with_delays(2, 10, 50));
    let err = store.get("abc").await.unwrap_err();
    assert!(matches!(err, StoreError::Unavailable(ref msg) if msg == "HTTP 503"));
}

/// Test a rejected key is not retried
#[tokio::test]
async fn test_unauthorized_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DOC_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = store(&mock_server, RetryConfig::with_delays(3, 10, 50));
    let err = store.get("abc").await.unwrap_err();
    assert!(matches!(err, StoreError::Unauthorized(401)));
    assert!(!err.is_recoverable());
}

/// Test the HTTP surface over a live store: found, missing and outage
#[tokio::test]
async fn test_routes_over_cosmos_store() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/dbs/db/colls/items/docs/test"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": "test", "url": "https://example.com"})),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/dbs/db/colls/items/docs/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/dbs/db/colls/items/docs/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let store: Arc<dyn DocumentStore> = Arc::new(store(&mock_server, RetryConfig::disabled()));

    let (status, body) = common::get(common::router_with(store.clone()), "/cosmos").await;
    assert_eq!((status, body.as_str()), (StatusCode::OK, "https://example.com"));

    let (status, _) = common::get(common::router_with(store.clone()), "/gone").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = common::get(common::router_with(store.clone()), "/broken").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    // ping is answered locally
    let (status, _) = common::get(common::router_with(store), "/api/ping").await;
    assert_eq!(status, StatusCode::OK);
}
