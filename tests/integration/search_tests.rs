//! Search client behavior against a mock endpoint

use crate::common::{page, search_client, search_client_with_timeout, search_item, SEARCH_PATH};
use bili_sweep::crawler::{ErrorPayload, SearchResponse};
use bili_sweep::ScraperError;
use std::time::Duration;
use wiremock::matchers::{header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_search_sends_query_and_headers() {
    let server = MockServer::start().await;
    let body = page(vec![search_item("BV1", "foo", 10)]);

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("search_type", "video"))
        .and(query_param("keyword", "原神"))
        .and(query_param("pn", "2"))
        .and(query_param("ps", "20"))
        .and(query_param("order", "pubdate"))
        .and(header("referer", "https://www.bilibili.com"))
        .and(header_exists("user-agent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let client = search_client(&server.uri(), 4);
    let response = client.search("原神", 2, 20).await.unwrap();

    assert_eq!(response, SearchResponse::Envelope(body));
}

#[tokio::test]
async fn test_client_error_is_rejected_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .expect(1)
        .mount(&server)
        .await;

    let client = search_client(&server.uri(), 4);
    let response = client.search("foo", 1, 20).await.unwrap();

    assert_eq!(
        response,
        SearchResponse::Rejected(ErrorPayload {
            code: 403,
            text: "forbidden".to_string(),
        })
    );
}

#[tokio::test]
async fn test_server_error_exhausts_retries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(502))
        .expect(4)
        .mount(&server)
        .await;

    let client = search_client(&server.uri(), 4);
    let result = client.search("foo", 3, 20).await;

    match result {
        Err(ScraperError::RetriesExhausted {
            keyword,
            page,
            attempts,
            ..
        }) => {
            assert_eq!(keyword, "foo");
            assert_eq!(page, 3);
            assert_eq!(attempts, 4);
        }
        other => panic!("expected RetriesExhausted, got {:?}", other),
    }
}

#[tokio::test]
async fn test_transient_failures_then_success() {
    let server = MockServer::start().await;
    let body = page(vec![search_item("BV1", "foo", 10)]);

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .with_priority(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .with_priority(3)
        .mount(&server)
        .await;

    let client = search_client(&server.uri(), 4);
    let response = client.search("foo", 1, 20).await.unwrap();

    assert_eq!(response, SearchResponse::Envelope(body));
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_undecodable_body_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>captcha</html>"))
        .expect(2)
        .mount(&server)
        .await;

    let client = search_client(&server.uri(), 2);
    let result = client.search("foo", 1, 20).await;

    assert!(matches!(
        result,
        Err(ScraperError::RetriesExhausted { attempts: 2, .. })
    ));
}

#[tokio::test]
async fn test_timeout_is_retried() {
    let server = MockServer::start().await;
    let body = page(vec![search_item("BV1", "foo", 10)]);

    // First answer arrives well after the client has given up
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(&body)
                .set_delay(Duration::from_millis(800)),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .with_priority(2)
        .mount(&server)
        .await;

    let client = search_client_with_timeout(&server.uri(), 4, Duration::from_millis(150));
    let response = client.search("foo", 1, 20).await.unwrap();

    assert_eq!(response, SearchResponse::Envelope(body));
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_persistent_timeout_exhausts_retries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(Vec::new()))
                .set_delay(Duration::from_millis(800)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let client = search_client_with_timeout(&server.uri(), 2, Duration::from_millis(150));
    let result = client.search("foo", 1, 20).await;

    match result {
        Err(ScraperError::RetriesExhausted {
            attempts, reason, ..
        }) => {
            assert_eq!(attempts, 2);
            assert_eq!(reason, "Request timeout");
        }
        other => panic!("expected RetriesExhausted, got {:?}", other),
    }
}
