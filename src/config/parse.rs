//! Environment variable parsing utilities.
//!
//! Every helper reads through a [`Lookup`] so configuration can be loaded
//! from a map in tests instead of the process environment.

use std::str::FromStr;
use std::time::Duration;

use super::ConfigError;

/// Source of configuration values, keyed by environment variable name.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Read from the process environment.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get value with default.
pub fn env_or(lookup: Lookup<'_>, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}

/// Get optional value (None if empty or missing).
pub fn env_opt(lookup: Lookup<'_>, key: &str) -> Option<String> {
    lookup(key).filter(|s| !s.is_empty())
}

/// Parse value with type conversion. Empty or missing yields `default`.
pub fn env_parse<T: FromStr>(lookup: Lookup<'_>, key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env_opt(lookup, key) {
        Some(v) => v.trim().parse().map_err(|e: T::Err| ConfigError::Parse {
            key: key.into(),
            value: v,
            error: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Parse duration string (e.g., "500ms", "30s", "2m", "1h").
/// Returns None for "off" or "0".
pub fn parse_duration(s: &str) -> Result<Option<Duration>, String> {
    let s = s.trim().to_lowercase();

    if s == "off" || s == "0" || s.is_empty() {
        return Ok(None);
    }

    if let Some(num_str) = s.strip_suffix("ms") {
        let millis: u64 = num_str
            .parse()
            .map_err(|_| format!("invalid number: {}", num_str))?;
        return Ok(Some(Duration::from_millis(millis)));
    }

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('s') {
        (n, 1)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 3600)
    } else {
        // Try parsing as seconds
        return s
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|_| format!("invalid duration: {}", s));
    };

    let num: u64 = num_str
        .parse()
        .map_err(|_| format!("invalid number: {}", num_str))?;
    let secs = num
        .checked_mul(multiplier)
        .ok_or_else(|| format!("duration too large: {}", s))?;

    Ok(Some(Duration::from_secs(secs)))
}

/// Parse value as duration.
pub fn env_duration(
    lookup: Lookup<'_>,
    key: &str,
    default: &str,
) -> Result<Option<Duration>, ConfigError> {
    let value = env_or(lookup, key, default);
    parse_duration(&value).map_err(|e| ConfigError::Parse {
        key: key.into(),
        value,
        error: e,
    })
}
