//! Pipeline lifecycle state machine and the timed recovery schedule.
//!
//! Invalidation is never terminal: a failed or inconsistent buffer set is
//! retried on a throttle that escalates to a longer backoff after repeated
//! failures, continuing indefinitely until the population recovers.

use std::time::{Duration, Instant};

/// Lifecycle of one renderer's GPU resources.
///
/// `Invalidated` is entered whenever a consistency check fails (size
/// mismatch, missing buffer, mesh/argument mismatch) and always leads back
/// through `Initializing`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PipelineState {
    #[default]
    Uninitialized,
    Initializing,
    Ready,
    Invalidated,
}

/// Throttled retry interval while failures are still fresh.
pub const RETRY_INTERVAL: Duration = Duration::from_millis(500);
/// Longer backoff once failures persist.
pub const BACKOFF_INTERVAL: Duration = Duration::from_secs(3);
/// Consecutive failures before escalating to the backoff interval.
pub const BACKOFF_AFTER: u32 = 5;

/// Timed retry/backoff policy, independent of wall-clock so it is testable.
#[derive(Clone, Copy, Debug, Default)]
pub struct RecoverySchedule {
    last_attempt: Option<Instant>,
    failures: u32,
}

impl RecoverySchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an initialization attempt is due at `now`.
    pub fn should_attempt(&self, now: Instant) -> bool {
        match self.last_attempt {
            None => true,
            Some(last) => now.duration_since(last) >= self.interval(),
        }
    }

    /// Record that an attempt is being made at `now`.
    pub fn record_attempt(&mut self, now: Instant) {
        self.last_attempt = Some(now);
    }

    /// Record a failed attempt.
    pub fn record_failure(&mut self) {
        self.failures = self.failures.saturating_add(1);
    }

    /// Reset after a successful initialization.
    pub fn reset(&mut self) {
        self.last_attempt = None;
        self.failures = 0;
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    fn interval(&self) -> Duration {
        if self.failures >= BACKOFF_AFTER {
            BACKOFF_INTERVAL
        } else {
            RETRY_INTERVAL
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_attempt_is_immediate() {
        let sched = RecoverySchedule::new();
        assert!(sched.should_attempt(Instant::now()));
    }

    #[test]
    fn test_throttled_within_retry_interval() {
        let mut sched = RecoverySchedule::new();
        let t0 = Instant::now();
        sched.record_attempt(t0);
        sched.record_failure();

        assert!(!sched.should_attempt(t0 + Duration::from_millis(100)));
        assert!(sched.should_attempt(t0 + RETRY_INTERVAL));
    }

    #[test]
    fn test_escalates_to_backoff() {
        let mut sched = RecoverySchedule::new();
        let t0 = Instant::now();
        for _ in 0..BACKOFF_AFTER {
            sched.record_attempt(t0);
            sched.record_failure();
        }

        // Past the short retry interval but before the backoff interval
        assert!(!sched.should_attempt(t0 + RETRY_INTERVAL));
        assert!(!sched.should_attempt(t0 + Duration::from_secs(2)));
        assert!(sched.should_attempt(t0 + BACKOFF_INTERVAL));
    }

    #[test]
    fn test_never_gives_up() {
        let mut sched = RecoverySchedule::new();
        let mut t = Instant::now();
        for _ in 0..1000 {
            sched.record_attempt(t);
            sched.record_failure();
            t += BACKOFF_INTERVAL;
            assert!(sched.should_attempt(t), "recovery must keep retrying");
        }
    }

    #[test]
    fn test_reset_clears_backoff() {
        let mut sched = RecoverySchedule::new();
        let t0 = Instant::now();
        for _ in 0..BACKOFF_AFTER + 2 {
            sched.record_attempt(t0);
            sched.record_failure();
        }
        sched.reset();
        assert_eq!(sched.failures(), 0);
        assert!(sched.should_attempt(t0 + Duration::from_millis(1)));
    }

    #[test]
    fn test_default_state_is_uninitialized() {
        assert_eq!(PipelineState::default(), PipelineState::Uninitialized);
    }
}
