// SPDX-License-Identifier: MIT OR Apache-2.0
//! Integration tests for [`fh_edge::PollingEdge`] against a mocked edge.

use fh_edge::PollingEdge;
use fh_repository::{FeatureHubRepository, FeatureRepository};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn feature_payload() -> serde_json::Value {
    serde_json::json!([{
        "features": [{
            "id": "f1",
            "key": "FLAG_A",
            "version": 1,
            "type": "BOOLEAN",
            "value": true,
            "l": false,
            "strategies": []
        }]
    }])
}

#[tokio::test]
async fn successful_round_dispatches_features_and_stores_cache_hints() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/features"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("etag", "\"v1\"")
                .insert_header("cache-control", "max-age=5")
                .set_body_json(feature_payload()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let repo = Arc::new(FeatureHubRepository::new());
    let edge = PollingEdge::new(
        reqwest::Client::new(),
        format!("{}/", server.uri()),
        vec!["key1".to_string()],
        repo.clone(),
        30,
    );

    edge.poll().await.unwrap();
    edge.close().await;

    assert!(repo.is_ready());
    assert!(repo.feature("FLAG_A").exists());
}

#[tokio::test]
async fn status_236_stops_further_polling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/features"))
        .respond_with(ResponseTemplate::new(236).set_body_json(feature_payload()))
        .expect(1)
        .mount(&server)
        .await;

    let repo = Arc::new(FeatureHubRepository::new());
    let edge = PollingEdge::new(
        reqwest::Client::new(),
        format!("{}/", server.uri()),
        vec!["key1".to_string()],
        repo.clone(),
        30,
    );

    edge.poll().await.unwrap();

    assert!(repo.is_ready());
    // A second poll would hit the mock again if the transport hadn't
    // stopped itself; `expect(1)` above asserts it never does.
}

#[tokio::test]
async fn status_404_marks_repository_failed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/features"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let repo = Arc::new(FeatureHubRepository::new());
    let edge = PollingEdge::new(
        reqwest::Client::new(),
        format!("{}/", server.uri()),
        vec!["key1".to_string()],
        repo.clone(),
        30,
    );

    edge.poll().await.unwrap();

    assert!(!repo.is_ready());
}

#[tokio::test]
async fn status_503_is_skipped_without_error_or_repository_update() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/features"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let repo = Arc::new(FeatureHubRepository::new());
    let edge = PollingEdge::new(
        reqwest::Client::new(),
        format!("{}/", server.uri()),
        vec!["key1".to_string()],
        repo.clone(),
        30,
    );

    edge.poll().await.unwrap();
    edge.close().await;

    assert!(!repo.is_ready());
}
