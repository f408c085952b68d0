//! Probe kinds and health snapshots.

use serde::Serialize;

/// Health check probe types (Kubernetes-compatible).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeType {
    /// Liveness probe: restart container if failed.
    Liveness,
    /// Readiness probe: remove from load balancer if failed.
    Readiness,
    /// Startup probe: wait for initialization.
    Startup,
}

impl ProbeType {
    /// All probe kinds, in the order they are usually consulted.
    pub const ALL: [ProbeType; 3] = [Self::Startup, Self::Readiness, Self::Liveness];

    /// HTTP path serving this probe.
    pub const fn path(self) -> &'static str {
        match self {
            Self::Liveness => "/live",
            Self::Readiness => "/ready",
            Self::Startup => "/startup",
        }
    }

    /// Resolve a request path to a probe. Paths match exactly.
    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            "/live" => Some(Self::Liveness),
            "/ready" => Some(Self::Readiness),
            "/startup" => Some(Self::Startup),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProbeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Liveness => write!(f, "liveness"),
            Self::Readiness => write!(f, "readiness"),
            Self::Startup => write!(f, "startup"),
        }
    }
}

/// Point-in-time view of all three signals, read in one atomic load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    pub startup: bool,
    pub readiness: bool,
    pub liveness: bool,
}

impl HealthSnapshot {
    /// Value of the signal backing `probe`.
    pub fn get(&self, probe: ProbeType) -> bool {
        match probe {
            ProbeType::Liveness => self.liveness,
            ProbeType::Readiness => self.readiness,
            ProbeType::Startup => self.startup,
        }
    }
}

/// Renders as a JSON object, e.g. `{"startup":true,"readiness":false,"liveness":true}`.
impl std::fmt::Display for HealthSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| std::fmt::Error)?;
        f.write_str(&json)
    }
}
