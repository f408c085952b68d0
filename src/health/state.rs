//! Shared health state.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use super::{HealthSnapshot, ProbeType};

const STARTUP: u8 = 1 << 0;
const READINESS: u8 = 1 << 1;
const LIVENESS: u8 = 1 << 2;

/// The three probe signals of a process.
///
/// Cloning is cheap and every clone observes the same flags, so one instance
/// is created by the application and handed to [`crate::ProbeServer`].
///
/// All flags live in a single atomic bit set. `set_ready(true)` raises startup
/// and readiness in one operation, so readers never see a process that is
/// ready but not started. Startup is monotonic: nothing clears it.
#[derive(Debug, Clone, Default)]
pub struct HealthState {
    flags: Arc<AtomicU8>,
}

impl HealthState {
    /// Create a state with every signal down.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark startup as complete. Idempotent.
    pub fn mark_started(&self) {
        self.flags.fetch_or(STARTUP, Ordering::SeqCst);
    }

    /// Set readiness. `true` also marks startup complete.
    pub fn set_ready(&self, ready: bool) {
        if ready {
            self.flags.fetch_or(STARTUP | READINESS, Ordering::SeqCst);
        } else {
            self.flags.fetch_and(!READINESS, Ordering::SeqCst);
        }
    }

    /// Shorthand for `set_ready(true)`.
    pub fn ready(&self) {
        self.set_ready(true);
    }

    /// Shorthand for `set_ready(false)`.
    pub fn unready(&self) {
        self.set_ready(false);
    }

    /// Set liveness. Independent of the other signals.
    pub fn set_live(&self, live: bool) {
        if live {
            self.flags.fetch_or(LIVENESS, Ordering::SeqCst);
        } else {
            self.flags.fetch_and(!LIVENESS, Ordering::SeqCst);
        }
    }

    /// Shorthand for `set_live(true)`.
    pub fn live(&self) {
        self.set_live(true);
    }

    /// Shorthand for `set_live(false)`.
    pub fn unlive(&self) {
        self.set_live(false);
    }

    #[inline]
    pub fn is_started(&self) -> bool {
        self.load() & STARTUP != 0
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.load() & READINESS != 0
    }

    #[inline]
    pub fn is_live(&self) -> bool {
        self.load() & LIVENESS != 0
    }

    /// Read the signal backing `probe`.
    #[inline]
    pub fn check(&self, probe: ProbeType) -> bool {
        self.snapshot().get(probe)
    }

    /// All three signals from a single load.
    pub fn snapshot(&self) -> HealthSnapshot {
        let flags = self.load();
        HealthSnapshot {
            startup: flags & STARTUP != 0,
            readiness: flags & READINESS != 0,
            liveness: flags & LIVENESS != 0,
        }
    }

    #[inline]
    fn load(&self) -> u8 {
        self.flags.load(Ordering::SeqCst)
    }
}
