//! Shared speed level, mutated by button edges and read by the animation.
//!
//! [`RateState`] holds a level that bounces within `[-max_level, max_level]`,
//! its current heading, and the time of the last edge. One mutex guards all
//! of it; there is no other synchronization.
//!
//! # Locking
//!
//! Every critical section is a handful of integer operations. Nothing sleeps,
//! logs or calls out while the lock is held, so the edge path never waits on
//! the engine for more than that.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use rs_cylon::rate::{RateState, ScaleFactor};
//!
//! let rate = RateState::new(10);
//! assert_eq!(rate.read_sleep_factor(), ScaleFactor::Baseline);
//!
//! // Edges walk the level downwards first
//! rate.apply_edge(0);
//! rate.apply_edge(250);
//! let factor = rate.read_sleep_factor();
//! assert_eq!(factor, ScaleFactor::Faster(2));
//! assert_eq!(factor.apply(Duration::from_millis(100)), Duration::from_millis(50));
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::bounce::{Endpoint, Heading, Sweep};

/// Heading of the level at startup: the first edge makes the scan faster.
pub const INITIAL_HEADING: Heading = Heading::Down;

/// Shortest sleep a tick will ever request.
pub const MIN_SLEEP: Duration = Duration::from_millis(1);

/// Consistent `(level, direction)` pair read under the lock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateSnapshot {
    /// Current level
    pub level: i32,
    /// Direction the next edge moves the level
    pub direction: Heading,
}

/// Scale applied to the base tick period, derived from the level.
///
/// Positive levels lengthen the tick (slower scan), negative levels shorten
/// it (faster scan).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScaleFactor {
    /// Level 0: base period unchanged.
    Baseline,
    /// Level `n > 0`: base period multiplied by `n`.
    Slower(u32),
    /// Level `-n < 0`: base period divided by `n`.
    Faster(u32),
}

impl ScaleFactor {
    /// Map a level to its scale.
    ///
    /// # Examples
    ///
    /// ```
    /// use rs_cylon::rate::ScaleFactor;
    ///
    /// assert_eq!(ScaleFactor::from_level(0), ScaleFactor::Baseline);
    /// assert_eq!(ScaleFactor::from_level(4), ScaleFactor::Slower(4));
    /// assert_eq!(ScaleFactor::from_level(-3), ScaleFactor::Faster(3));
    /// ```
    pub fn from_level(level: i32) -> Self {
        match level {
            0 => ScaleFactor::Baseline,
            n if n > 0 => ScaleFactor::Slower(n.unsigned_abs()),
            n => ScaleFactor::Faster(n.unsigned_abs()),
        }
    }

    /// Multiplier applied to the base period.
    #[inline]
    pub fn numerator(&self) -> u32 {
        match self {
            ScaleFactor::Slower(n) => *n,
            _ => 1,
        }
    }

    /// Divisor applied to the base period.
    #[inline]
    pub fn denominator(&self) -> u32 {
        match self {
            ScaleFactor::Faster(n) => *n,
            _ => 1,
        }
    }

    /// `base × numerator / denominator`, never below [`MIN_SLEEP`].
    pub fn apply(&self, base: Duration) -> Duration {
        let scaled = base.saturating_mul(self.numerator()) / self.denominator().max(1);
        scaled.max(MIN_SLEEP)
    }
}

/// Result of one edge, captured inside the critical section.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EdgeRecord {
    /// Level after the edge
    pub level: i32,
    /// Direction for the next edge
    pub direction: Heading,
    /// Whether this edge hit a limit and turned the level around
    pub bounced: bool,
    /// Time since the previous edge, `None` for the first edge
    pub elapsed_ms: Option<u64>,
}

#[derive(Debug)]
struct RateInner {
    level: Sweep,
    last_event_ms: Option<u64>,
}

/// Mutex-guarded speed level shared between the edge handler and the engine.
///
/// Create one per running scanner and share it through an `Arc`.
#[derive(Debug)]
pub struct RateState {
    inner: Mutex<RateInner>,
    max_level: i32,
}

impl RateState {
    /// Create the state at level 0, heading down, with no edge seen.
    ///
    /// `max_level` below 1 is raised to 1.
    pub fn new(max_level: i32) -> Self {
        let max_level = max_level.max(1);
        Self {
            inner: Mutex::new(RateInner {
                level: Sweep::new(0, INITIAL_HEADING, -max_level, max_level, Endpoint::Reflect),
                last_event_ms: None,
            }),
            max_level,
        }
    }

    /// Level bound.
    #[inline]
    pub fn max_level(&self) -> i32 {
        self.max_level
    }

    // The guarded data is valid between any two statements, so a panic
    // elsewhere while holding the lock leaves nothing to repair.
    fn lock(&self) -> MutexGuard<'_, RateInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read level and direction together.
    pub fn snapshot(&self) -> RateSnapshot {
        let inner = self.lock();
        RateSnapshot {
            level: inner.level.value(),
            direction: inner.level.heading(),
        }
    }

    /// Scale factor for the next tick.
    pub fn read_sleep_factor(&self) -> ScaleFactor {
        ScaleFactor::from_level(self.lock().level.value())
    }

    /// Timestamp of the most recent edge.
    pub fn last_event_ms(&self) -> Option<u64> {
        self.lock().last_event_ms
    }

    /// Apply one edge at time `now_ms`.
    ///
    /// Steps the level in its current direction, turning around on reaching
    /// either limit, and records the interval since the previous edge. The
    /// whole update is one critical section.
    pub fn apply_edge(&self, now_ms: u64) -> EdgeRecord {
        let mut inner = self.lock();
        let stepped = inner.level.step();
        let elapsed_ms = inner.last_event_ms.map(|last| now_ms.saturating_sub(last));
        inner.last_event_ms = Some(now_ms);
        EdgeRecord {
            level: stepped.value,
            direction: stepped.heading,
            bounced: stepped.bounced,
            elapsed_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero_heading_down() {
        let rate = RateState::new(10);
        assert_eq!(
            rate.snapshot(),
            RateSnapshot {
                level: 0,
                direction: Heading::Down
            }
        );
        assert_eq!(rate.last_event_ms(), None);
    }

    #[test]
    fn max_level_floor() {
        assert_eq!(RateState::new(0).max_level(), 1);
        assert_eq!(RateState::new(-4).max_level(), 1);
    }

    #[test]
    fn three_edges_divide_by_three() {
        let rate = RateState::new(10);
        let levels: Vec<i32> = (0..3).map(|t| rate.apply_edge(t).level).collect();
        assert_eq!(levels, [-1, -2, -3]);
        assert_eq!(rate.read_sleep_factor(), ScaleFactor::Faster(3));
        assert_eq!(
            rate.read_sleep_factor().apply(Duration::from_millis(100)),
            Duration::from_millis(100) / 3
        );
    }

    #[test]
    fn bounces_off_lower_limit() {
        let rate = RateState::new(10);
        for t in 0..9 {
            assert!(!rate.apply_edge(t).bounced);
        }
        let tenth = rate.apply_edge(9);
        assert_eq!(tenth.level, -10);
        assert!(tenth.bounced);
        assert_eq!(tenth.direction, Heading::Up);

        let eleventh = rate.apply_edge(10);
        assert_eq!(eleventh.level, -9);
        assert!(!eleventh.bounced);
    }

    #[test]
    fn full_triangle_wave() {
        let rate = RateState::new(2);
        let levels: Vec<i32> = (0..10).map(|t| rate.apply_edge(t).level).collect();
        assert_eq!(levels, [-1, -2, -1, 0, 1, 2, 1, 0, -1, -2]);
    }

    #[test]
    fn elapsed_between_edges() {
        let rate = RateState::new(10);
        assert_eq!(rate.apply_edge(1_000).elapsed_ms, None);
        assert_eq!(rate.apply_edge(1_250).elapsed_ms, Some(250));
        assert_eq!(rate.apply_edge(1_900).elapsed_ms, Some(650));
        assert_eq!(rate.last_event_ms(), Some(1_900));
    }

    #[test]
    fn elapsed_saturates_on_clock_going_back() {
        let rate = RateState::new(10);
        rate.apply_edge(500);
        assert_eq!(rate.apply_edge(400).elapsed_ms, Some(0));
    }

    // =========================================================================
    // ScaleFactor Tests
    // =========================================================================

    #[test]
    fn scale_factor_arithmetic() {
        let base = Duration::from_millis(100);
        assert_eq!(ScaleFactor::Baseline.apply(base), base);
        assert_eq!(ScaleFactor::Slower(10).apply(base), Duration::from_millis(1000));
        assert_eq!(ScaleFactor::Faster(10).apply(base), Duration::from_millis(10));
    }

    #[test]
    fn scale_factor_fraction_parts() {
        assert_eq!(ScaleFactor::Baseline.numerator(), 1);
        assert_eq!(ScaleFactor::Baseline.denominator(), 1);
        assert_eq!(ScaleFactor::Slower(5).numerator(), 5);
        assert_eq!(ScaleFactor::Slower(5).denominator(), 1);
        assert_eq!(ScaleFactor::Faster(5).numerator(), 1);
        assert_eq!(ScaleFactor::Faster(5).denominator(), 5);
    }

    #[test]
    fn scale_factor_sleep_floor() {
        let base = Duration::from_millis(5);
        assert_eq!(ScaleFactor::Faster(10).apply(base), MIN_SLEEP);
    }

    #[test]
    fn poisoned_lock_still_readable() {
        use std::sync::Arc;

        let rate = Arc::new(RateState::new(10));
        rate.apply_edge(0);

        let poisoner = Arc::clone(&rate);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.inner.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert_eq!(rate.snapshot().level, -1);
        assert_eq!(rate.apply_edge(10).level, -2);
    }
}
