//! Test helpers and utilities

use std::net::TcpListener as StdTcpListener;
use std::sync::Arc;
use std::time::Duration;

use probes::{HealthState, ProbeServer};
use reqwest::{Client, Response, StatusCode};
use tokio::task::JoinHandle;

/// Shutdown deadline used by tests.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Reserve a loopback port that is free right now.
pub fn free_port() -> u16 {
    StdTcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .map(|addr| addr.port())
        .expect("Failed to reserve a port")
}

/// A probe server running in a background task.
pub struct TestServer {
    pub base_url: String,
    pub port: u16,
    pub state: HealthState,
    pub server: Arc<ProbeServer>,
    pub client: Client,
    handle: Option<JoinHandle<probes::Result<()>>>,
}

#[allow(dead_code)]
impl TestServer {
    /// Start a server on a free port and wait until it accepts requests.
    pub async fn start() -> Self {
        Self::start_with(HealthState::new()).await
    }

    /// Start a server exposing `state`.
    pub async fn start_with(state: HealthState) -> Self {
        let port = free_port();
        let server = Arc::new(ProbeServer::new(state.clone()));

        let handle = {
            let server = server.clone();
            tokio::spawn(async move { server.run("127.0.0.1", port).await })
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        let test_server = Self {
            base_url: format!("http://127.0.0.1:{}", port),
            port,
            state,
            server,
            client,
            handle: Some(handle),
        };
        test_server.wait_for_listener(Duration::from_secs(5)).await;
        test_server
    }

    /// Make a GET request to the server
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("GET request failed")
    }

    /// Make a POST request with a body
    pub async fn post(&self, path: &str, body: &'static str) -> Response {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .body(body)
            .send()
            .await
            .expect("POST request failed")
    }

    /// Check if the listener answers at all
    pub async fn is_listening(&self) -> bool {
        self.client
            .get(format!("{}/live", self.base_url))
            .timeout(Duration::from_secs(2))
            .send()
            .await
            .is_ok()
    }

    /// Wait for the listener to accept requests
    pub async fn wait_for_listener(&self, timeout: Duration) {
        let start = std::time::Instant::now();
        while start.elapsed() < timeout {
            if self.is_listening().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("Probe server not listening after {:?}", timeout);
    }

    /// Shut the server down and return what `run` returned.
    pub async fn stop(mut self) -> probes::Result<()> {
        self.server.shutdown(SHUTDOWN_TIMEOUT).await?;
        let handle = self.handle.take().expect("server already stopped");
        handle.await.expect("server task panicked")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Assert that response has expected status
pub fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(
        response.status(),
        expected,
        "Expected status {}, got {}",
        expected,
        response.status()
    );
}

/// Assert that response has no body
pub async fn assert_empty_body(response: Response) {
    let body = response.bytes().await.expect("Failed to read body");
    assert!(body.is_empty(), "Expected empty body, got {} bytes", body.len());
}
