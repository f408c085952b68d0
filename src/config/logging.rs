//! Logging configuration.

use super::parse::{env_opt, env_or, Lookup};
use super::ConfigError;

/// Default tracing filter when neither LOG_LEVEL nor RUST_LOG is set.
pub const DEFAULT_FILTER: &str = "probes=info";

/// Output format for log lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable, one event per line.
    Text,
    /// One JSON object per line.
    Json,
}

/// Logging configuration loaded from environment.
#[derive(Clone, Debug)]
pub struct LoggingConfig {
    /// Log level filter (from LOG_LEVEL or RUST_LOG).
    pub filter: String,
    /// Output format (from LOG_FORMAT).
    pub format: LogFormat,
    /// Service name for structured logging.
    pub service_name: String,
}

impl LoggingConfig {
    /// Load configuration through `lookup`.
    ///
    /// Priority: LOG_LEVEL > RUST_LOG > default
    ///
    /// LOG_LEVEL accepts simple values: trace, debug, info, warn, error
    /// RUST_LOG accepts full tracing filter syntax: probes=debug,hyper=warn
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        let format = match env_or(lookup, "LOG_FORMAT", "text").to_lowercase().as_str() {
            "text" | "" => LogFormat::Text,
            "json" => LogFormat::Json,
            other => {
                return Err(ConfigError::Invalid {
                    key: "LOG_FORMAT".into(),
                    message: format!("'{}', expected: text, json", other),
                })
            }
        };

        Ok(Self {
            filter: Self::resolve_log_filter(lookup),
            format,
            service_name: env_or(lookup, "SERVICE_NAME", "probes"),
        })
    }

    /// Resolve log filter.
    ///
    /// Priority: LOG_LEVEL > RUST_LOG > default (info)
    fn resolve_log_filter(lookup: Lookup<'_>) -> String {
        // 1. Check LOG_LEVEL first (simple: debug, info, warn, error)
        if let Some(level) = env_opt(lookup, "LOG_LEVEL") {
            let level = level.to_lowercase();
            match level.as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => {
                    return format!("probes={}", level);
                }
                _ => {
                    // Subscriber is not installed yet.
                    eprintln!(
                        "Warning: Invalid LOG_LEVEL '{}', expected: trace, debug, info, warn, error",
                        level
                    );
                }
            }
        }

        // 2. Check RUST_LOG (full tracing filter syntax)
        if let Some(filter) = env_opt(lookup, "RUST_LOG") {
            return filter;
        }

        DEFAULT_FILTER.to_string()
    }
}
