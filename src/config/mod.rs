//! Configuration loaded from environment variables.
//!
//! # Example
//!
//! ```rust,ignore
//! use probes::config::Config;
//!
//! let config = Config::from_env()?;
//! println!("Probe port: {}", config.probe.port);
//! ```

mod error;
mod logging;
mod parse;
mod probe;

pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig, DEFAULT_FILTER};
pub use parse::parse_duration;
pub use probe::{ProbeConfig, DEFAULT_PORT, DEFAULT_SHUTDOWN_TIMEOUT};

/// Complete application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Probe listener configuration.
    pub probe: ProbeConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(parse::process_env)
    }

    /// Load configuration from an arbitrary key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            probe: ProbeConfig::from_lookup(&lookup)?,
            logging: LoggingConfig::from_lookup(&lookup)?,
        })
    }

    /// Print configuration summary to log.
    pub fn log_summary(&self) {
        use tracing::info;

        let host = if self.probe.host.is_empty() {
            "*"
        } else {
            self.probe.host.as_str()
        };

        info!("Configuration loaded:");
        info!("  Probe listener: {}:{}", host, self.probe.port);
        info!(
            "  Shutdown timeout: {}ms",
            self.probe.shutdown_timeout.as_millis()
        );
        if !self.probe.startup_delay.is_zero() {
            info!(
                "  Startup delay: {}ms",
                self.probe.startup_delay.as_millis()
            );
        }
        info!("  Log filter: {}", self.logging.filter);
    }
}
