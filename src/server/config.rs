//! Probe server configuration.
//!
//! The probe endpoints are meant to be cheap and predictable, so the
//! defaults are fixed: 3 second read and write timeouts and no idle timeout,
//! letting health checkers keep connections open between polls. The read
//! timeout only runs while a request is arriving.
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use probes::server::ProbeServerConfig;
//!
//! let config = ProbeServerConfig::default()
//!     .with_read_timeout(Some(Duration::from_secs(5)));
//! ```

use std::time::Duration;

use crate::error::{Error, Result};

/// Default read and write timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Pause after an accept failure caused by resource exhaustion.
pub(crate) const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(5);
pub(crate) const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Listener timeouts.
///
/// There is no idle timeout: keep-alive connections stay open
/// between requests for as long as the client holds them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeServerConfig {
    /// Time allowed to read a request, counted from its first byte. `None`
    /// disables it.
    pub read_timeout: Option<Duration>,
    /// Time a single socket write may stay blocked. `None` disables it.
    pub write_timeout: Option<Duration>,
}

impl Default for ProbeServerConfig {
    fn default() -> Self {
        Self {
            read_timeout: Some(DEFAULT_TIMEOUT),
            write_timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}

impl ProbeServerConfig {
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }
}

/// Check that `port` is a usable TCP port (1..=65535).
pub fn validate_port(port: i64) -> Result<u16> {
    match u16::try_from(port) {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(Error::InvalidPort(port)),
    }
}
