//! probes - Kubernetes-style health probe endpoints for a process.
//!
//! A [`HealthState`] holds three signals (startup, readiness, liveness) that
//! the application flips as it starts, serves and drains. A [`ProbeServer`]
//! exposes them over HTTP:
//!
//! | Path       | 200 when           | 503 otherwise |
//! |------------|--------------------|---------------|
//! | `/startup` | started            |               |
//! | `/ready`   | ready              |               |
//! | `/live`    | live               |               |
//!
//! Any other path answers 404. Responses have no body.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use probes::{HealthState, ProbeServer};
//!
//! let state = HealthState::new();
//! let server = ProbeServer::new(state.clone());
//!
//! // Application finished warming up.
//! state.ready();
//!
//! let signal = async {
//!     let _ = tokio::signal::ctrl_c().await;
//! };
//! server
//!     .run_until("", 8086, signal, Duration::from_secs(10))
//!     .await?;
//! ```

/// Package version from Cargo.toml
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod error;
pub mod health;
pub mod listener;
pub mod logging;
pub mod server;

// Re-exports for convenience
pub use config::Config;
pub use error::{Error, Result};
pub use health::{HealthSnapshot, HealthState, ProbeType};
pub use server::{ProbeServer, ProbeServerConfig};
