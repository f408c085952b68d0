//! Health state for Kubernetes probes.
//!
//! Provides three independent signals:
//! - **Liveness**: Is the process alive? (restart container if failed)
//! - **Readiness**: Can the service handle traffic? (remove from LB if failed)
//! - **Startup**: Has initialization completed? (wait before other probes)
//!
//! The application flips the signals; [`crate::ProbeServer`] only reports them.
//!
//! # Kubernetes Integration
//!
//! ```yaml
//! startupProbe:
//!   httpGet:
//!     path: /startup
//!     port: 8086
//!   failureThreshold: 30
//!   periodSeconds: 2
//!
//! readinessProbe:
//!   httpGet:
//!     path: /ready
//!     port: 8086
//!   periodSeconds: 5
//!
//! livenessProbe:
//!   httpGet:
//!     path: /live
//!     port: 8086
//!   periodSeconds: 10
//! ```

mod state;
mod status;

pub use state::HealthState;
pub use status::{HealthSnapshot, ProbeType};
