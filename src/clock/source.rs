//! Physical time sources

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Source of physical (wall-clock) time in unix milliseconds
///
/// Implementations can use:
/// - The system clock (production)
/// - A manually driven clock (tests, simulations)
pub trait TimeSource: Send + Sync {
    /// Current physical time in milliseconds since the unix epoch
    fn now_millis(&self) -> u64;
}

/// Reads the operating system's wall clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_millis(&self) -> u64 {
        u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
    }
}

/// A clock that only moves when told to
///
/// Clones share the same underlying time, so a test can keep one handle and
/// hand another to a [`Clock`](super::Clock).
#[derive(Clone, Debug, Default)]
pub struct ManualTimeSource {
    millis: Arc<AtomicU64>,
}

impl ManualTimeSource {
    pub fn new(millis: u64) -> Self {
        ManualTimeSource {
            millis: Arc::new(AtomicU64::new(millis)),
        }
    }

    pub fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: u64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now_millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_source_shared() {
        let a = ManualTimeSource::new(10);
        let b = a.clone();
        a.advance(5);
        assert_eq!(b.now_millis(), 15);
        b.set(3);
        assert_eq!(a.now_millis(), 3);
    }

    #[test]
    fn test_system_source_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(SystemTimeSource.now_millis() > 1_577_836_800_000);
    }
}
