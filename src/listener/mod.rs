//! TCP listener for the probe server.
//!
//! Wraps a tokio listener and hands out [`TcpConnection`]s carrying the
//! server's read and write timeouts. Accept failures are classified so the
//! server can tell a transient hiccup from a dead socket.

mod tcp;

pub use tcp::TcpConnection;

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use tokio::net::TcpListener as TokioTcpListener;

/// Keep-alive probe period on accepted sockets.
const TCP_KEEPALIVE: Duration = Duration::from_secs(15);

/// Format `host:port` for binding.
///
/// An empty host binds every interface. IPv6 literals get bracketed.
pub fn bind_address(host: &str, port: u16) -> String {
    if host.is_empty() {
        format!("0.0.0.0:{}", port)
    } else if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// How the accept loop should react to an accept error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptError {
    /// The failed connection is gone; accept the next one.
    Connection,
    /// The process is out of descriptors or memory; retry after a pause.
    Resources,
    /// The listener itself is broken.
    Fatal,
}

impl AcceptError {
    pub fn classify(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut => return Self::Connection,
            _ => {}
        }

        match err.raw_os_error() {
            Some(libc::EMFILE) | Some(libc::ENFILE) | Some(libc::ENOBUFS) | Some(libc::ENOMEM) => {
                Self::Resources
            }
            Some(libc::EPROTO) => Self::Connection,
            _ => Self::Fatal,
        }
    }
}

/// A TCP listener that accepts plain TCP connections.
pub struct TcpListener {
    inner: TokioTcpListener,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
}

impl TcpListener {
    /// Bind to `addr`, resolving host names if needed.
    pub async fn bind(addr: &str) -> io::Result<Self> {
        let inner = TokioTcpListener::bind(addr).await?;
        Ok(Self {
            inner,
            read_timeout: None,
            write_timeout: None,
        })
    }

    /// Apply request read and write timeouts to every accepted connection.
    pub fn with_timeouts(mut self, read: Option<Duration>, write: Option<Duration>) -> Self {
        self.read_timeout = read;
        self.write_timeout = write;
        self
    }

    /// Accept the next connection.
    pub async fn accept(&self) -> io::Result<TcpConnection> {
        let (stream, remote_addr) = self.inner.accept().await?;

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "Failed to set TCP_NODELAY");
        }

        let keepalive = TcpKeepalive::new()
            .with_time(TCP_KEEPALIVE)
            .with_interval(TCP_KEEPALIVE);
        if let Err(e) = SockRef::from(&stream).set_tcp_keepalive(&keepalive) {
            tracing::debug!(error = %e, "Failed to set TCP keepalive");
        }

        Ok(TcpConnection::new(stream, remote_addr).with_timeouts(self.read_timeout, self.write_timeout))
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}
