//! Probe endpoint behavior over HTTP.

use crate::helpers::{assert_empty_body, assert_status, TestServer};
use probes::HealthState;
use reqwest::StatusCode;

#[tokio::test]
async fn test_initial_state() {
    let server = TestServer::start().await;

    // run() marks the process live before it binds
    assert_status(&server.get("/live").await, StatusCode::OK);
    assert_status(&server.get("/startup").await, StatusCode::SERVICE_UNAVAILABLE);
    assert_status(&server.get("/ready").await, StatusCode::SERVICE_UNAVAILABLE);

    server.stop().await.expect("clean shutdown");
}

#[tokio::test]
async fn test_probe_lifecycle() {
    let server = TestServer::start().await;

    server.state.mark_started();
    assert_status(&server.get("/startup").await, StatusCode::OK);
    assert_status(&server.get("/ready").await, StatusCode::SERVICE_UNAVAILABLE);

    server.state.ready();
    assert_status(&server.get("/startup").await, StatusCode::OK);
    assert_status(&server.get("/ready").await, StatusCode::OK);
    assert_status(&server.get("/live").await, StatusCode::OK);

    // Draining: no new traffic, but still started and live
    server.state.unready();
    assert_status(&server.get("/ready").await, StatusCode::SERVICE_UNAVAILABLE);
    assert_status(&server.get("/startup").await, StatusCode::OK);
    assert_status(&server.get("/live").await, StatusCode::OK);

    server.state.unlive();
    assert_status(&server.get("/live").await, StatusCode::SERVICE_UNAVAILABLE);

    server.stop().await.expect("clean shutdown");
}

#[tokio::test]
async fn test_ready_before_start() {
    let state = HealthState::new();
    state.ready();

    let server = TestServer::start_with(state).await;
    assert_status(&server.get("/startup").await, StatusCode::OK);
    assert_status(&server.get("/ready").await, StatusCode::OK);

    server.stop().await.expect("clean shutdown");
}

#[tokio::test]
async fn test_method_is_ignored() {
    let server = TestServer::start().await;
    server.state.ready();

    assert_status(&server.post("/ready", "ignored").await, StatusCode::OK);

    let response = server
        .client
        .head(format!("{}/startup", server.base_url))
        .send()
        .await
        .expect("HEAD request failed");
    assert_status(&response, StatusCode::OK);

    server.stop().await.expect("clean shutdown");
}

#[tokio::test]
async fn test_unknown_paths() {
    let server = TestServer::start().await;
    server.state.ready();

    for path in ["/", "/health", "/live/", "/ready/extra", "/READY"] {
        let response = server.get(path).await;
        assert_status(&response, StatusCode::NOT_FOUND);
    }

    server.stop().await.expect("clean shutdown");
}

#[tokio::test]
async fn test_query_string_ignored() {
    let server = TestServer::start().await;

    assert_status(&server.get("/live?verbose=1").await, StatusCode::OK);

    server.stop().await.expect("clean shutdown");
}

#[tokio::test]
async fn test_responses_have_no_body() {
    let server = TestServer::start().await;

    assert_empty_body(server.get("/live").await).await;
    assert_empty_body(server.get("/ready").await).await;
    assert_empty_body(server.get("/missing").await).await;

    server.stop().await.expect("clean shutdown");
}

#[tokio::test]
async fn test_keep_alive_reuse() {
    let server = TestServer::start().await;

    // The reqwest client pools connections; many sequential probes must all
    // succeed over the same keep-alive connection.
    for _ in 0..20 {
        assert_status(&server.get("/live").await, StatusCode::OK);
    }

    server.stop().await.expect("clean shutdown");
}
