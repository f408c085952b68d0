//! Probe server error types.

use std::fmt;
use std::io;
use std::time::Duration;

/// Errors returned by [`crate::ProbeServer`].
#[derive(Debug)]
pub enum Error {
    /// Port outside 1..=65535. Reported before any socket is touched.
    InvalidPort(i64),

    /// Another `run` call currently owns the server.
    AlreadyRunning,

    /// The listener failed for a reason other than a requested shutdown.
    Server { addr: String, source: io::Error },

    /// Connections were still open when the shutdown deadline passed.
    ShutdownTimeout {
        timeout: Duration,
        connections: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidPort(port) => write!(f, "invalid http port: {}", port),
            Error::AlreadyRunning => write!(f, "http server is already running"),
            Error::Server { addr, source } => {
                write!(f, "failed to start server on {}: {}", addr, source)
            }
            Error::ShutdownTimeout {
                timeout,
                connections,
            } => write!(
                f,
                "shutdown deadline of {}ms exceeded with {} open connections",
                timeout.as_millis(),
                connections
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Server { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type alias for probe server operations.
pub type Result<T> = std::result::Result<T, Error>;
