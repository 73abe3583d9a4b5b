//! Frame clock.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Monotonic time source driving the frame loop.
pub trait Clock {
    /// Time since the clock started.
    fn now(&self) -> Duration;

    /// Advance to a new tick and return the time elapsed since the previous one.
    fn step(&mut self) -> Duration;

    /// Yield to the host scheduler at the end of a tick.
    fn pause(&mut self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

// ============================================================================
// SystemClock
// ============================================================================

/// Wall-clock backed by [`Instant`].
#[derive(Debug, Clone)]
pub struct SystemClock {
    start: Instant,
    last_step: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_step: now,
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn step(&mut self) -> Duration {
        let now = Instant::now();
        let dt = now.duration_since(self.last_step);
        self.last_step = now;
        dt
    }
}

// ============================================================================
// ManualClock
// ============================================================================

/// Shared, hand-driven clock.
///
/// Clones observe the same time, so a test can keep one handle and give the
/// other to the supervisor. `pause` never sleeps.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    inner: Arc<Mutex<ManualState>>,
}

#[derive(Debug, Default)]
struct ManualState {
    now: Duration,
    last_step: Duration,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jump to an absolute time. Time never moves backwards.
    pub fn set(&self, now: Duration) {
        let mut state = self.inner.lock();
        state.now = state.now.max(now);
    }

    pub fn set_millis(&self, millis: u64) {
        self.set(Duration::from_millis(millis));
    }

    pub fn advance(&self, by: Duration) {
        self.inner.lock().now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.inner.lock().now
    }

    fn step(&mut self) -> Duration {
        let mut state = self.inner.lock();
        let dt = state.now.saturating_sub(state.last_step);
        state.last_step = state.now;
        dt
    }

    fn pause(&mut self, _duration: Duration) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_step_reports_elapsed() {
        let mut clock = ManualClock::new();
        let handle = clock.clone();

        handle.set_millis(16);
        assert_eq!(clock.step(), Duration::from_millis(16));
        assert_eq!(clock.step(), Duration::ZERO);

        handle.advance(Duration::from_millis(4));
        assert_eq!(clock.step(), Duration::from_millis(4));
        assert_eq!(clock.now(), Duration::from_millis(20));
    }

    #[test]
    fn test_manual_clock_never_goes_back() {
        let clock = ManualClock::new();
        clock.set_millis(100);
        clock.set_millis(50);
        assert_eq!(clock.now(), Duration::from_millis(100));
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let mut clock = SystemClock::new();
        let a = clock.now();
        let _ = clock.step();
        assert!(clock.now() >= a);
    }
}
