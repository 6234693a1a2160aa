//! Time source for the monitor loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Wall-clock reads and blocking sleeps
pub trait Clock {
    /// Current time
    fn now(&self) -> SystemTime;

    /// Block for `duration`
    fn sleep(&mut self, duration: Duration);
}

/// The real clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a caller can keep a handle while the
/// monitor owns another. Sleeping advances time unless the clock is frozen.
#[derive(Debug, Clone)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
    slept: Arc<AtomicU64>,
    sleeps: Arc<AtomicU64>,
    frozen: bool,
}

impl ManualClock {
    /// Clock reading `start`
    pub fn new(start: SystemTime) -> Self {
        let nanos = start
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        Self {
            nanos: Arc::new(AtomicU64::new(nanos)),
            slept: Arc::new(AtomicU64::new(0)),
            sleeps: Arc::new(AtomicU64::new(0)),
            frozen: false,
        }
    }

    /// Same clock, but `sleep` no longer advances time
    pub fn frozen(mut self) -> Self {
        self.frozen = true;
        self
    }

    /// Move time forward
    pub fn advance(&self, duration: Duration) {
        self.nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Total time requested through `sleep`
    pub fn total_slept(&self) -> Duration {
        Duration::from_nanos(self.slept.load(Ordering::SeqCst))
    }

    /// Number of `sleep` calls
    pub fn sleep_count(&self) -> u64 {
        self.sleeps.load(Ordering::SeqCst)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }

    fn sleep(&mut self, duration: Duration) {
        self.sleeps.fetch_add(1, Ordering::SeqCst);
        self.slept
            .fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
        if !self.frozen {
            self.advance(duration);
        }
    }
}
