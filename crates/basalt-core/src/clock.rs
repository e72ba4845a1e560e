//! Module: clock
//! Responsibility: time injection for every component that reads the clock.
//! Does not own: polling cadence or deadline policy (config owns those).
//!
//! Invariants:
//! - All core timestamps flow through one `Clock` handle.
//! - `LogicalClock` never moves backward; tests control it explicitly.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use std::time::{SystemTime, UNIX_EPOCH};

///
/// Clock
///
/// Injection point for wall time. Production uses `SystemClock`; tests and
/// the reconciliation harness use `LogicalClock` so interleavings stay
/// deterministic.
///

pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> u64;
}

///
/// SystemClock
///

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        // A clock before the Unix epoch is a host misconfiguration; saturate
        // to zero rather than panic in the read path.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}

///
/// LogicalClock
///
/// Monotonic, manually advanced clock shared across components via `Arc`.
///

#[derive(Clone, Debug, Default)]
pub struct LogicalClock {
    millis: Arc<AtomicU64>,
}

impl LogicalClock {
    #[must_use]
    pub fn new(start_millis: u64) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(start_millis)),
        }
    }

    /// Advance the clock by `delta_millis` and return the new reading.
    pub fn advance(&self, delta_millis: u64) -> u64 {
        self.millis.fetch_add(delta_millis, Ordering::SeqCst) + delta_millis
    }

    /// Set the clock to an absolute reading; ignored if it would move backward.
    pub fn set_at_least(&self, millis: u64) {
        self.millis.fetch_max(millis, Ordering::SeqCst);
    }
}

impl Clock for LogicalClock {
    fn now_millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}

///
/// TESTS
///
