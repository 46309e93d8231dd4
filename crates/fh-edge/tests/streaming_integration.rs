// SPDX-License-Identifier: MIT OR Apache-2.0
//! Integration tests for [`fh_edge::StreamingEdge`] against a mocked edge.

use fh_edge::StreamingEdge;
use fh_repository::{FeatureHubRepository, FeatureRepository};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn feature_frame_is_parsed_and_dispatched_to_the_repository() {
    let server = MockServer::start().await;
    let body = "event: feature\ndata: {\"id\":\"f1\",\"key\":\"FLAG_A\",\"version\":1,\"type\":\"BOOLEAN\",\"value\":true,\"l\":false,\"strategies\":[]}\nid: 1\n\n";
    Mock::given(method("GET"))
        .and(path("/features/key1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let repo = Arc::new(FeatureHubRepository::new());
    let edge = StreamingEdge::new(
        reqwest::Client::new(),
        format!("{}/", server.uri()),
        vec!["key1".to_string()],
        repo.clone(),
    );

    edge.poll().await.unwrap();
    edge.close().await;

    assert!(repo.is_ready());
    assert!(repo.feature("FLAG_A").exists());
}

#[tokio::test]
async fn stale_config_frame_stops_the_transport() {
    let server = MockServer::start().await;
    let body = "event: config\ndata: {\"edge.stale\":true}\n\n";
    Mock::given(method("GET"))
        .and(path("/features/key1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let repo = Arc::new(FeatureHubRepository::new());
    let edge = StreamingEdge::new(
        reqwest::Client::new(),
        format!("{}/", server.uri()),
        vec!["key1".to_string()],
        repo.clone(),
    );

    // A stale config frame ends the connection with no feature data, so
    // `poll()` resolves once the loop settles rather than hanging forever.
    edge.poll().await.unwrap();

    assert!(!repo.is_ready());
}

#[tokio::test]
async fn not_found_marks_repository_failed_and_cancels() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/features/key1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let repo = Arc::new(FeatureHubRepository::new());
    let edge = StreamingEdge::new(
        reqwest::Client::new(),
        format!("{}/", server.uri()),
        vec!["key1".to_string()],
        repo.clone(),
    );

    edge.poll().await.unwrap();

    assert!(!repo.is_ready());
}
