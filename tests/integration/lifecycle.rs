//! Start, stop and restart behavior of the probe server.

use std::sync::Arc;
use std::time::Duration;

use crate::helpers::{assert_status, free_port, TestServer, SHUTDOWN_TIMEOUT};
use probes::{Error, HealthState, ProbeServer};
use reqwest::StatusCode;
use tokio::task::JoinSet;

#[tokio::test]
async fn test_shutdown_when_idle() {
    let server = ProbeServer::new(HealthState::new());
    assert!(!server.is_running());
    server.shutdown(SHUTDOWN_TIMEOUT).await.unwrap();
    server.shutdown(SHUTDOWN_TIMEOUT).await.unwrap();
}

#[tokio::test]
async fn test_invalid_ports() {
    let state = HealthState::new();
    let server = ProbeServer::new(state.clone());

    for port in [0i64, -1, 65536, 100_000] {
        match server.run("127.0.0.1", port).await {
            Err(Error::InvalidPort(p)) => assert_eq!(p, port),
            other => panic!("port {} gave {:?}", port, other),
        }
    }

    assert!(!server.is_running());
    assert!(!state.is_live());
}

#[tokio::test]
async fn test_stop_and_restart() {
    let server = TestServer::start().await;
    let port = server.port;
    let state = server.state.clone();
    let probe_server = server.server.clone();

    server.stop().await.expect("clean shutdown");
    assert!(!probe_server.is_running());

    // Same handle, same port
    let handle = {
        let probe_server = probe_server.clone();
        tokio::spawn(async move { probe_server.run("127.0.0.1", port).await })
    };

    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/live", port);
    let mut response = None;
    for _ in 0..250 {
        if let Ok(r) = client.get(&url).send().await {
            response = Some(r);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let response = response.expect("restarted server never answered");
    assert_status(&response, StatusCode::OK);
    assert!(state.is_live());

    probe_server.shutdown(SHUTDOWN_TIMEOUT).await.unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_second_run_rejected() {
    let server = TestServer::start().await;

    match server.server.run("127.0.0.1", free_port()).await {
        Err(Error::AlreadyRunning) => {}
        other => panic!("expected AlreadyRunning, got {:?}", other),
    }

    // The first instance is unaffected
    assert_status(&server.get("/live").await, StatusCode::OK);
    server.stop().await.expect("clean shutdown");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_runs() {
    let server = Arc::new(ProbeServer::new(HealthState::new()));
    let port = free_port();

    let mut runs = JoinSet::new();
    for _ in 0..4 {
        let server = server.clone();
        runs.spawn(async move { server.run("127.0.0.1", port).await });
    }

    // The winner serves until shutdown, so the first three to finish are
    // the rejected ones.
    for _ in 0..3 {
        let result = tokio::time::timeout(Duration::from_secs(5), runs.join_next())
            .await
            .expect("rejected run did not return")
            .expect("run task missing")
            .expect("run task panicked");
        match result {
            Err(Error::AlreadyRunning) => {}
            other => panic!("expected AlreadyRunning, got {:?}", other),
        }
    }

    assert_eq!(runs.len(), 1);
    assert!(server.is_running());

    server.shutdown(SHUTDOWN_TIMEOUT).await.unwrap();
    let winner = tokio::time::timeout(Duration::from_secs(5), runs.join_next())
        .await
        .expect("winning run did not return after shutdown")
        .expect("run task missing")
        .expect("run task panicked");
    winner.unwrap();
}

#[tokio::test]
async fn test_port_in_use() {
    let blocker = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = blocker.local_addr().unwrap().port();

    let server = ProbeServer::new(HealthState::new());
    match server.run("127.0.0.1", port).await {
        Err(Error::Server { addr, .. }) => assert_eq!(addr, format!("127.0.0.1:{}", port)),
        other => panic!("expected Server error, got {:?}", other),
    }
    assert!(!server.is_running());
}

#[tokio::test]
async fn test_run_until_signal() {
    let state = HealthState::new();
    let server = ProbeServer::new(state.clone());
    let port = free_port();

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let signal = {
        let state = state.clone();
        async move {
            let _ = rx.await;
            state.unready();
        }
    };

    let run = server.run_until("127.0.0.1", port, signal, SHUTDOWN_TIMEOUT);
    let driver = async {
        let client = reqwest::Client::new();
        let url = format!("http://127.0.0.1:{}/live", port);
        for _ in 0..250 {
            if client.get(&url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        state.ready();
        let response = client
            .get(format!("http://127.0.0.1:{}/ready", port))
            .send()
            .await
            .unwrap();
        assert_status(&response, StatusCode::OK);
        tx.send(()).unwrap();
    };

    let (result, ()) = tokio::join!(run, driver);
    result.unwrap();
    assert!(!server.is_running());
    assert!(!state.is_ready());
    assert!(state.is_started());
}
