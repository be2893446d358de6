//! Wall-clock abstraction used for elapsed-time and rate reporting.

use std::sync::Arc;

use chrono::Utc;

/// Source of wall-clock time.
///
/// Injected wherever elapsed time is computed so that tests can supply a
/// deterministic clock.
pub trait Clock: Send + Sync {
    /// Current wall time as whole seconds since the Unix epoch.
    fn now_epoch(&self) -> i64;
}

/// Default [`Clock`] backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Tracks the wall-clock epoch of the last counter reset.
pub struct ReportClock {
    clock: Arc<dyn Clock>,
    last_reset: i64,
}

impl ReportClock {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let last_reset = clock.now_epoch();
        Self { clock, last_reset }
    }

    /// Record the current time as the new reset point.
    pub fn reset(&mut self) {
        self.last_reset = self.clock.now_epoch();
    }

    /// Seconds elapsed since the last reset, floored at zero.
    ///
    /// A backwards time-sync step can transiently place `now` before the
    /// stored reset point; the difference is floored, not drift-corrected.
    pub fn elapsed_secs(&self) -> u64 {
        let delta = self.clock.now_epoch() - self.last_reset;
        if delta < 0 {
            0
        } else {
            delta as u64
        }
    }

    /// Current wall time as seconds since the Unix epoch.
    pub fn now_epoch(&self) -> i64 {
        self.clock.now_epoch()
    }

    /// Epoch of the last reset.
    pub fn last_reset_epoch(&self) -> i64 {
        self.last_reset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    struct FakeClock(AtomicI64);

    impl Clock for FakeClock {
        fn now_epoch(&self) -> i64 {
            self.0.load(Ordering::Relaxed)
        }
    }

    #[test]
    fn elapsed_follows_clock() {
        let fake = Arc::new(FakeClock(AtomicI64::new(1_000)));
        let report = ReportClock::new(fake.clone());
        assert_eq!(report.elapsed_secs(), 0);
        fake.0.store(1_090, Ordering::Relaxed);
        assert_eq!(report.elapsed_secs(), 90);
    }

    #[test]
    fn backwards_step_floors_at_zero() {
        let fake = Arc::new(FakeClock(AtomicI64::new(1_000)));
        let report = ReportClock::new(fake.clone());
        fake.0.store(400, Ordering::Relaxed);
        assert_eq!(report.elapsed_secs(), 0);
    }

    #[test]
    fn reset_moves_reference_point() {
        let fake = Arc::new(FakeClock(AtomicI64::new(50)));
        let mut report = ReportClock::new(fake.clone());
        fake.0.store(200, Ordering::Relaxed);
        report.reset();
        assert_eq!(report.last_reset_epoch(), 200);
        assert_eq!(report.elapsed_secs(), 0);
    }
}
