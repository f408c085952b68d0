//! TCP connection with read and write deadlines.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio::time::Sleep;

/// An accepted TCP connection.
///
/// The read deadline starts with the first byte of a request and ends once
/// response bytes are written, so a keep-alive connection waiting for its
/// next request is never timed out. A write that stays pending for longer
/// than `write_timeout` fails the same way. Either error is `TimedOut`,
/// which makes hyper drop the connection.
pub struct TcpConnection {
    stream: TcpStream,
    remote_addr: SocketAddr,
    read_timeout: Option<Duration>,
    read_deadline: Option<Pin<Box<Sleep>>>,
    write_timeout: Option<Duration>,
    write_deadline: Option<Pin<Box<Sleep>>>,
}

impl TcpConnection {
    /// Create a new TCP connection.
    pub fn new(stream: TcpStream, remote_addr: SocketAddr) -> Self {
        Self {
            stream,
            remote_addr,
            read_timeout: None,
            read_deadline: None,
            write_timeout: None,
            write_deadline: None,
        }
    }

    /// Bound each request read by `read` and every pending write by `write`.
    pub fn with_timeouts(mut self, read: Option<Duration>, write: Option<Duration>) -> Self {
        self.read_timeout = read;
        self.write_timeout = write;
        self
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// A request started arriving. Keeps an already running deadline.
    fn arm_read_deadline(&mut self) {
        if self.read_deadline.is_none() {
            if let Some(timeout) = self.read_timeout {
                self.read_deadline = Some(Box::pin(tokio::time::sleep(timeout)));
            }
        }
    }

    /// Called after the inner stream returned `Pending` for a read.
    fn poll_read_deadline(&mut self, cx: &mut Context<'_>) -> Poll<io::Error> {
        let (Some(timeout), Some(deadline)) = (self.read_timeout, self.read_deadline.as_mut())
        else {
            return Poll::Pending;
        };

        match deadline.as_mut().poll(cx) {
            Poll::Ready(()) => {
                self.read_deadline = None;
                Poll::Ready(timed_out("read", timeout))
            }
            Poll::Pending => Poll::Pending,
        }
    }

    /// Called after the inner stream returned `Pending` for a write-side
    /// operation. Arms the deadline on first use.
    fn poll_write_deadline(&mut self, cx: &mut Context<'_>) -> Poll<io::Error> {
        let Some(timeout) = self.write_timeout else {
            return Poll::Pending;
        };

        let deadline = self
            .write_deadline
            .get_or_insert_with(|| Box::pin(tokio::time::sleep(timeout)));

        match deadline.as_mut().poll(cx) {
            Poll::Ready(()) => {
                self.write_deadline = None;
                Poll::Ready(timed_out("write", timeout))
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn finish_write<T>(
        &mut self,
        cx: &mut Context<'_>,
        poll: Poll<io::Result<T>>,
    ) -> Poll<io::Result<T>> {
        match poll {
            Poll::Ready(result) => {
                self.write_deadline = None;
                Poll::Ready(result)
            }
            Poll::Pending => self.poll_write_deadline(cx).map(Err),
        }
    }

    /// Response bytes went out: the request being read is complete.
    /// Flushes do not count, hyper flushes while still reading headers.
    fn finish_response_write(
        &mut self,
        cx: &mut Context<'_>,
        poll: Poll<io::Result<usize>>,
    ) -> Poll<io::Result<usize>> {
        if let Poll::Ready(Ok(n)) = poll {
            if n > 0 {
                self.read_deadline = None;
            }
        }
        self.finish_write(cx, poll)
    }
}

fn timed_out(op: &str, timeout: Duration) -> io::Error {
    io::Error::new(
        io::ErrorKind::TimedOut,
        format!("{} timed out after {}ms", op, timeout.as_millis()),
    )
}

impl AsyncRead for TcpConnection {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = &mut *self;
        let before = buf.filled().len();

        match Pin::new(&mut this.stream).poll_read(cx, buf) {
            Poll::Ready(Ok(())) => {
                if buf.filled().len() > before {
                    this.arm_read_deadline();
                }
                Poll::Ready(Ok(()))
            }
            Poll::Ready(Err(e)) => Poll::Ready(Err(e)),
            Poll::Pending => this.poll_read_deadline(cx).map(Err),
        }
    }
}

impl AsyncWrite for TcpConnection {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = &mut *self;
        let poll = Pin::new(&mut this.stream).poll_write(cx, buf);
        this.finish_response_write(cx, poll)
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        let this = &mut *self;
        let poll = Pin::new(&mut this.stream).poll_write_vectored(cx, bufs);
        this.finish_response_write(cx, poll)
    }

    fn is_write_vectored(&self) -> bool {
        self.stream.is_write_vectored()
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = &mut *self;
        let poll = Pin::new(&mut this.stream).poll_flush(cx);
        this.finish_write(cx, poll)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}
