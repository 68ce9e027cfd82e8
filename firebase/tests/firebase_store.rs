//! Integration tests for `FirebaseStore` against a local mock server

#![allow(clippy::unwrap_used)]

use pantry_core::document_store::{DocumentRequest, DocumentStore, DocumentStoreError};
use pantry_firebase::{FirebaseConfig, FirebaseStore};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn store_for(server: &MockServer) -> FirebaseStore {
    FirebaseStore::new(FirebaseConfig::new(server.uri())).unwrap()
}

#[tokio::test]
async fn post_sends_json_body_and_returns_generated_name() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ingredients.json"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"title": "Salt", "amount": "1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "-Nsalt"})))
        .expect(1)
        .mount(&server)
        .await;

    let body = store_for(&server)
        .execute(DocumentRequest::post(
            "ingredients",
            json!({"title": "Salt", "amount": "1"}),
        ))
        .await
        .unwrap();

    assert_eq!(body, json!({"name": "-Nsalt"}));
}

#[tokio::test]
async fn filtered_get_uses_json_quoted_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ingredients.json"))
        .and(query_param("orderBy", "\"title\""))
        .and(query_param("equalTo", "\"Salt\""))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"-Nsalt": {"title": "Salt", "amount": "1"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let body = store_for(&server)
        .execute(DocumentRequest::get("ingredients").filter_equal("title", "Salt"))
        .await
        .unwrap();

    assert_eq!(body["-Nsalt"]["title"], "Salt");
}

#[tokio::test]
async fn delete_targets_document_path() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/ingredients/-Nsalt.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .expect(1)
        .mount(&server)
        .await;

    let body = store_for(&server)
        .execute(DocumentRequest::delete("ingredients/-Nsalt"))
        .await
        .unwrap();

    assert!(body.is_null());
}

#[tokio::test]
async fn non_success_status_still_parses_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "Permission denied"})),
        )
        .mount(&server)
        .await;

    let body = store_for(&server)
        .execute(DocumentRequest::get("ingredients"))
        .await
        .unwrap();

    assert_eq!(body["error"], "Permission denied");
}

#[tokio::test]
async fn non_json_body_is_a_parse_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = store_for(&server)
        .execute(DocumentRequest::get("ingredients"))
        .await;

    assert!(matches!(result, Err(DocumentStoreError::ResponseParseFailed(_))));
}

#[tokio::test]
async fn slow_server_is_a_request_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let store = FirebaseStore::new(
        FirebaseConfig::new(server.uri()).with_timeout(Duration::from_millis(100)),
    )
    .unwrap();
    let result = store.execute(DocumentRequest::get("ingredients")).await;

    assert!(matches!(result, Err(DocumentStoreError::RequestFailed(_))));
}

#[tokio::test]
async fn unreachable_host_is_a_request_failure() {
    let store = FirebaseStore::new(FirebaseConfig::new("http://127.0.0.1:9")).unwrap();
    let result = store.execute(DocumentRequest::get("ingredients")).await;

    assert!(matches!(result, Err(DocumentStoreError::RequestFailed(_))));
}

#[tokio::test]
async fn delete_encodes_reserved_characters_in_the_key() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/ingredients/a%3Fx=1.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .expect(1)
        .mount(&server)
        .await;

    let body = store_for(&server)
        .execute(DocumentRequest::delete("ingredients/a?x=1"))
        .await
        .unwrap();

    assert!(body.is_null());
}

#[tokio::test]
async fn keys_that_escape_the_document_are_never_sent() {
    let server = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .expect(0)
        .mount(&server)
        .await;

    let store = store_for(&server);
    for target in ["ingredients/../users", "ingredients/a#b", "ingredients/.", "ingredients/$key"] {
        let result = store.execute(DocumentRequest::delete(target)).await;
        assert!(
            matches!(result, Err(DocumentStoreError::RequestFailed(_))),
            "{target} was not refused"
        );
    }
}
