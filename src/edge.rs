//! Rising-edge handler for the speed button.
//!
//! [`EdgeHandler`] is what gets registered with an
//! [`EdgeInput`](crate::traits::EdgeInput). It runs in the collaborator's
//! notification context, so it does one short critical section on the
//! shared [`RateState`] and logs after the lock is released.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::bounce::Heading;
use crate::rate::{EdgeRecord, RateState};
use crate::traits::{Clock, EdgeAck, EdgeCallback};

/// Applies button edges to the shared rate state.
pub struct EdgeHandler<C: Clock> {
    rate: Arc<RateState>,
    clock: Arc<C>,
    edges: AtomicU64,
}

impl<C: Clock + Send + Sync + 'static> EdgeHandler<C> {
    /// Create a handler updating `rate`, timestamped by `clock`.
    pub fn new(rate: Arc<RateState>, clock: Arc<C>) -> Self {
        Self {
            rate,
            clock,
            edges: AtomicU64::new(0),
        }
    }

    /// Handle one rising edge.
    ///
    /// Always [`EdgeAck::Handled`]: the handler is only registered on the
    /// button line, so every edge it sees is meant for it.
    pub fn handle(&self) -> EdgeAck {
        let now_ms = self.clock.now_ms();
        let record = self.rate.apply_edge(now_ms);
        self.edges.fetch_add(1, Ordering::Relaxed);
        self.report(&record);
        EdgeAck::Handled
    }

    /// Number of edges handled so far.
    pub fn edges_seen(&self) -> u64 {
        self.edges.load(Ordering::Relaxed)
    }

    /// Shared rate state this handler writes to.
    pub fn rate(&self) -> &Arc<RateState> {
        &self.rate
    }

    /// Wrap a shared handler as an [`EdgeCallback`] for registration.
    pub fn into_callback(self: Arc<Self>) -> EdgeCallback {
        Box::new(move || self.handle())
    }

    fn report(&self, record: &EdgeRecord) {
        info!(
            level = record.level,
            elapsed_ms = record.elapsed_ms,
            "edge received"
        );
        if record.bounced {
            // The heading has already flipped: facing up means we hit the floor.
            let limit = match record.direction {
                Heading::Up => "minimum",
                Heading::Down => "maximum",
            };
            info!(
                level = record.level,
                elapsed_ms = record.elapsed_ms,
                limit,
                "level limit reached, reversing"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MockClock;

    fn handler() -> (Arc<EdgeHandler<MockClock>>, Arc<MockClock>) {
        let clock = Arc::new(MockClock::new());
        let rate = Arc::new(RateState::new(3));
        (Arc::new(EdgeHandler::new(rate, Arc::clone(&clock))), clock)
    }

    #[test]
    fn handle_updates_rate_and_counts() {
        let (h, _) = handler();
        assert_eq!(h.handle(), EdgeAck::Handled);
        assert_eq!(h.handle(), EdgeAck::Handled);
        assert_eq!(h.rate().snapshot().level, -2);
        assert_eq!(h.edges_seen(), 2);
    }

    #[test]
    fn handle_uses_clock_for_timestamps() {
        let (h, clock) = handler();
        clock.set(1_000);
        h.handle();
        clock.advance(300);
        h.handle();
        assert_eq!(h.rate().last_event_ms(), Some(1_300));
    }

    #[test]
    fn callback_drives_handler() {
        let (h, _) = handler();
        let mut cb = Arc::clone(&h).into_callback();
        for _ in 0..4 {
            assert!(cb().is_handled());
        }
        // -1, -2, -3 (bounce), -2
        assert_eq!(h.rate().snapshot().level, -2);
        assert_eq!(h.rate().snapshot().direction, Heading::Up);
        assert_eq!(h.edges_seen(), 4);
    }
}
