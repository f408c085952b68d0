//! Probe listener configuration.

use std::time::Duration;

use super::parse::{env_duration, env_opt, env_or, env_parse, Lookup};
use super::ConfigError;

/// Default probe port.
pub const DEFAULT_PORT: i64 = 8086;

/// Default time allowed for draining connections on shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Probe listener configuration loaded from environment.
#[derive(Clone, Debug)]
pub struct ProbeConfig {
    /// Host to bind (PROBE_HOST). Empty binds all interfaces.
    pub host: String,
    /// Port to bind (PROBE_PORT). Range is checked when the server starts.
    pub port: i64,
    /// Drain deadline on shutdown (SHUTDOWN_TIMEOUT).
    pub shutdown_timeout: Duration,
    /// Delay before the process reports itself started and ready (STARTUP_DELAY).
    pub startup_delay: Duration,
}

impl ProbeConfig {
    /// Load configuration through `lookup`.
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        let shutdown_timeout = match env_opt(lookup, "SHUTDOWN_TIMEOUT") {
            None => DEFAULT_SHUTDOWN_TIMEOUT,
            Some(_) => env_duration(lookup, "SHUTDOWN_TIMEOUT", "")?.ok_or_else(|| {
                ConfigError::Invalid {
                    key: "SHUTDOWN_TIMEOUT".into(),
                    message: "must be greater than zero".into(),
                }
            })?,
        };

        Ok(Self {
            host: env_or(lookup, "PROBE_HOST", ""),
            port: env_parse(lookup, "PROBE_PORT", DEFAULT_PORT)?,
            shutdown_timeout,
            startup_delay: env_duration(lookup, "STARTUP_DELAY", "0")?.unwrap_or_default(),
        })
    }
}
