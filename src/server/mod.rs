//! HTTP server for the startup, readiness and liveness probes.
//!
//! [`ProbeServer`] serves three routes, each backed by one signal of a
//! [`HealthState`]:
//!
//! | Path | 200 | 503 |
//! |------|-----|-----|
//! | `/startup` | startup complete | starting |
//! | `/ready` | ready | not ready |
//! | `/live` | live | not live |
//!
//! Only one `run` may be active per server at a time; a second concurrent call
//! fails immediately with [`Error::AlreadyRunning`]. Once a run returns, the
//! server can be run again.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use probes::{HealthState, ProbeServer};
//!
//! let state = HealthState::new();
//! let server = Arc::new(ProbeServer::new(state.clone()));
//!
//! let task = {
//!     let server = Arc::clone(&server);
//!     tokio::spawn(async move { server.run("0.0.0.0", 8086).await })
//! };
//!
//! // ... initialization ...
//! state.ready();
//!
//! // On SIGTERM
//! state.unready();
//! server.shutdown(Duration::from_secs(10)).await?;
//! task.await??;
//! ```
//!
//! # Graceful Shutdown
//!
//! [`ProbeServer::shutdown`] closes the listener, lets open connections finish
//! their current request and waits for `run` to return. If the deadline passes
//! first, the remaining connections are dropped and
//! [`Error::ShutdownTimeout`] is returned; the server is stopped either way.

pub mod config;
mod handler;

use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

pub use config::{validate_port, ProbeServerConfig, DEFAULT_TIMEOUT};

use crate::error::{Error, Result};
use crate::health::{HealthState, ProbeType};
use crate::listener::{bind_address, AcceptError, TcpConnection, TcpListener};
use config::{ACCEPT_BACKOFF_MAX, ACCEPT_BACKOFF_MIN};
use handler::handle_probe_request;

/// Shutdown request broadcast to a running accept loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShutdownMode {
    Serve,
    /// Stop accepting, let open connections finish.
    Drain,
    /// Drop whatever is still open.
    Abort,
}

/// Why the accept loop ended.
#[derive(Debug)]
enum ServeExit {
    /// A shutdown was requested.
    Shutdown,
    /// The listener failed.
    Failed(io::Error),
}

/// Handles shared between a run and the callers that want to stop it.
struct ServeControl {
    mode: watch::Sender<ShutdownMode>,
    stopped: watch::Receiver<bool>,
    open_connections: Arc<AtomicUsize>,
}

/// HTTP server exposing a [`HealthState`] to probes.
pub struct ProbeServer {
    state: HealthState,
    config: ProbeServerConfig,
    running: AtomicBool,
    /// Present while a run is active.
    control: Mutex<Option<Arc<ServeControl>>>,
}

impl ProbeServer {
    /// Create a server with the default timeouts.
    pub fn new(state: HealthState) -> Self {
        Self::with_config(state, ProbeServerConfig::default())
    }

    pub fn with_config(state: HealthState, config: ProbeServerConfig) -> Self {
        Self {
            state,
            config,
            running: AtomicBool::new(false),
            control: Mutex::new(None),
        }
    }

    /// The state served by this server.
    pub fn state(&self) -> &HealthState {
        &self.state
    }

    pub fn config(&self) -> &ProbeServerConfig {
        &self.config
    }

    /// Whether a run currently owns the server.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Serve probes on `host:port` until [`shutdown`](Self::shutdown) is
    /// called or the listener fails.
    ///
    /// Marks the process live right before binding. An empty `host` binds
    /// every interface.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidPort`] if `port` is outside 1..=65535
    /// - [`Error::AlreadyRunning`] if another run is active
    /// - [`Error::Server`] if binding or accepting fails
    pub async fn run(&self, host: &str, port: impl Into<i64>) -> Result<()> {
        let port = validate_port(port.into())?;

        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::AlreadyRunning);
        }

        let (mode_tx, mode_rx) = watch::channel(ShutdownMode::Serve);
        let (stopped_tx, stopped_rx) = watch::channel(false);
        let open_connections = Arc::new(AtomicUsize::new(0));
        let _guard = RunGuard::publish(
            self,
            ServeControl {
                mode: mode_tx,
                stopped: stopped_rx,
                open_connections: Arc::clone(&open_connections),
            },
            stopped_tx,
        );

        let addr = bind_address(host, port);
        self.state.live();

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| Error::Server {
                addr: addr.clone(),
                source,
            })?
            .with_timeouts(self.config.read_timeout, self.config.write_timeout);

        match listener.local_addr() {
            Ok(local) => info!("Probe server listening on http://{}", local),
            Err(_) => info!("Probe server listening on http://{}", addr),
        }
        for probe in ProbeType::ALL {
            debug!("  {} probe: {}", probe, probe.path());
        }

        match self.serve(listener, mode_rx, open_connections).await {
            ServeExit::Shutdown => {
                info!("Probe server stopped");
                Ok(())
            }
            ServeExit::Failed(source) => {
                error!(error = %source, "Probe server listener failed");
                Err(Error::Server { addr, source })
            }
        }
    }

    /// Run until `signal` resolves, then shut down within `timeout`.
    ///
    /// Returns the first error from either the run or the shutdown.
    pub async fn run_until<F>(
        &self,
        host: &str,
        port: impl Into<i64>,
        signal: F,
        timeout: Duration,
    ) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let run = self.run(host, port);
        tokio::pin!(run);
        tokio::pin!(signal);

        tokio::select! {
            biased;
            result = &mut run => result,
            _ = &mut signal => {
                let (run_result, shutdown_result) = tokio::join!(run, self.shutdown(timeout));
                shutdown_result.and(run_result)
            }
        }
    }

    /// Gracefully stop the active run.
    ///
    /// Stops accepting connections, waits up to `timeout` for open ones to
    /// finish, and returns once `run` has released the server. Succeeds
    /// without doing anything when no run is active.
    pub async fn shutdown(&self, timeout: Duration) -> Result<()> {
        let control = self.control_slot().clone();
        let Some(control) = control else {
            debug!("Probe server not running, nothing to shut down");
            return Ok(());
        };

        info!(
            health = %self.state.snapshot(),
            "Shutting down probe server ({} open connections)",
            control.open_connections.load(Ordering::Relaxed)
        );
        control.mode.send_if_modified(|mode| {
            if *mode == ShutdownMode::Serve {
                *mode = ShutdownMode::Drain;
                true
            } else {
                false
            }
        });

        let mut stopped = control.stopped.clone();
        if tokio::time::timeout(timeout, wait_until(&mut stopped, |stopped| *stopped))
            .await
            .is_ok()
        {
            return Ok(());
        }

        let connections = control.open_connections.load(Ordering::Relaxed);
        warn!(
            "Drain timeout reached with {} open probe connections, closing them",
            connections
        );
        control.mode.send_replace(ShutdownMode::Abort);
        // Aborted connections end immediately, so this wait is short.
        wait_until(&mut stopped, |stopped| *stopped).await;
        Err(Error::ShutdownTimeout {
            timeout,
            connections,
        })
    }

    /// Accept loop. Returns once a shutdown completed or the listener broke.
    async fn serve(
        &self,
        listener: TcpListener,
        mut mode: watch::Receiver<ShutdownMode>,
        open_connections: Arc<AtomicUsize>,
    ) -> ServeExit {
        let graceful = GracefulShutdown::new();
        let mut connections = JoinSet::new();
        let mut backoff = ACCEPT_BACKOFF_MIN;

        let exit = loop {
            tokio::select! {
                result = listener.accept() => match result {
                    Ok(conn) => {
                        backoff = ACCEPT_BACKOFF_MIN;
                        self.spawn_connection(conn, &graceful, &mut connections, &open_connections);
                    }
                    Err(e) => match AcceptError::classify(&e) {
                        AcceptError::Connection => debug!(error = %e, "Accept error"),
                        AcceptError::Resources => {
                            warn!(error = %e, "Accept failed, retrying in {:?}", backoff);
                            tokio::time::sleep(backoff).await;
                            backoff = (backoff * 2).min(ACCEPT_BACKOFF_MAX);
                        }
                        AcceptError::Fatal => break ServeExit::Failed(e),
                    },
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                _ = wait_until(&mut mode, |mode| *mode != ShutdownMode::Serve) => {
                    break ServeExit::Shutdown;
                }
            }
        };

        drop(listener);

        if let ServeExit::Shutdown = exit {
            debug!(
                "Draining {} probe connections",
                open_connections.load(Ordering::Relaxed)
            );
            tokio::select! {
                _ = graceful.shutdown() => debug!("Probe connections drained"),
                _ = wait_until(&mut mode, |mode| *mode == ShutdownMode::Abort) => {
                    debug!("Drain aborted");
                }
            }
        }

        connections.shutdown().await;
        exit
    }

    fn spawn_connection(
        &self,
        conn: TcpConnection,
        graceful: &GracefulShutdown,
        connections: &mut JoinSet<()>,
        open_connections: &Arc<AtomicUsize>,
    ) {
        let remote_addr = conn.remote_addr();
        let state = self.state.clone();
        let service = service_fn(move |req| handle_probe_request(req, state.clone()));

        // Request reads are bounded by `TcpConnection`; hyper's header timer
        // would also run between keep-alive requests.
        let conn = http1::Builder::new()
            .header_read_timeout(None)
            .keep_alive(true)
            .serve_connection(TokioIo::new(conn), service);
        let conn = graceful.watch(conn);

        let guard = ConnectionGuard::new(open_connections);
        connections.spawn(async move {
            let _guard = guard;
            if let Err(e) = conn.await {
                debug!(remote_addr = %remote_addr, error = %e, "Probe connection error");
            }
        });
    }

    fn control_slot(&self) -> MutexGuard<'_, Option<Arc<ServeControl>>> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Publishes a run's [`ServeControl`] and releases the server when dropped,
/// whichever way `run` returns.
struct RunGuard<'a> {
    server: &'a ProbeServer,
    stopped: watch::Sender<bool>,
}

impl<'a> RunGuard<'a> {
    fn publish(
        server: &'a ProbeServer,
        control: ServeControl,
        stopped: watch::Sender<bool>,
    ) -> Self {
        *server.control_slot() = Some(Arc::new(control));
        Self { server, stopped }
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.server.control_slot().take();
        self.server.running.store(false, Ordering::SeqCst);
        self.stopped.send_replace(true);
    }
}

/// Counts an open connection until dropped. Also runs when the connection
/// task is aborted.
struct ConnectionGuard(Arc<AtomicUsize>);

impl ConnectionGuard {
    fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(Arc::clone(counter))
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Wait until the watched value satisfies `done`, or the sender is gone.
async fn wait_until<T>(rx: &mut watch::Receiver<T>, done: impl Fn(&T) -> bool) {
    loop {
        if done(&rx.borrow_and_update()) {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}
