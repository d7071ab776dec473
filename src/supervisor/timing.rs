// src/supervisor/timing.rs

//! Retry, debounce and teardown timing.
//!
//! Every retry delay is drawn uniformly from a half-open [`JitterRange`] so
//! that supervisors failing together do not retry together.

use std::fmt;
use std::time::Duration;

use rand::Rng;

/// Half-open delay range `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitterRange {
    pub min: Duration,
    pub max: Duration,
}

impl JitterRange {
    pub const fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    /// Uniform sample in `[min, max)`. A degenerate range yields `min`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let lo = self.min.as_nanos();
        let hi = self.max.as_nanos();
        if hi <= lo {
            return self.min;
        }
        let span = u64::try_from(hi - lo).unwrap_or(u64::MAX);
        self.min + Duration::from_nanos(rng.random_range(0..span))
    }

    pub fn contains(&self, delay: Duration) -> bool {
        delay >= self.min && delay < self.max
    }
}

impl fmt::Display for JitterRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}, {:?})", self.min, self.max)
    }
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
pub fn duration_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Timing policy for one supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorTiming {
    /// Delay between `start()` and the first load attempt.
    pub first_attempt: Duration,
    /// Retry delay when the application directory or config is missing.
    pub missing_retry: JitterRange,
    /// Retry delay after a boundary or workload fault.
    pub fault_retry: JitterRange,
    /// Delay between a watch-triggered unload and the next load.
    pub reload_delay: JitterRange,
    /// Quiet period that ends a burst of filesystem events.
    pub debounce: Duration,
    pub teardown_attempts: u32,
    pub teardown_pause: Duration,
}

impl Default for SupervisorTiming {
    fn default() -> Self {
        Self {
            first_attempt: Duration::from_secs(1),
            missing_retry: JitterRange::new(Duration::from_secs(5 * 60), Duration::from_secs(10 * 60)),
            fault_retry: JitterRange::new(Duration::from_secs(30), Duration::from_secs(60)),
            reload_delay: JitterRange::new(Duration::from_secs(30), Duration::from_secs(60)),
            debounce: Duration::from_secs(5),
            teardown_attempts: 3,
            teardown_pause: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn defaults_match_the_documented_policy() {
        let t = SupervisorTiming::default();
        assert_eq!(t.first_attempt, Duration::from_secs(1));
        assert_eq!(t.missing_retry.min, Duration::from_secs(300));
        assert_eq!(t.missing_retry.max, Duration::from_secs(600));
        assert_eq!(t.fault_retry, t.reload_delay);
        assert_eq!(t.teardown_attempts, 3);
    }

    #[test]
    fn samples_stay_in_the_half_open_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let range = JitterRange::new(Duration::from_secs(30), Duration::from_secs(60));
        for _ in 0..1000 {
            assert!(range.contains(range.sample(&mut rng)));
        }
    }

    #[test]
    fn millis_saturate_instead_of_wrapping() {
        assert_eq!(duration_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(duration_millis(Duration::from_micros(999)), 0);
        assert_eq!(duration_millis(Duration::MAX), u64::MAX);
        assert_eq!(duration_millis(Duration::from_secs(u64::MAX / 1000 + 1)), u64::MAX);
    }

    #[test]
    fn degenerate_range_yields_min() {
        let mut rng = StdRng::seed_from_u64(1);
        let range = JitterRange::new(Duration::from_secs(5), Duration::from_secs(5));
        assert_eq!(range.sample(&mut rng), Duration::from_secs(5));
    }
}
