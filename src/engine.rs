//! The periodic animation task.
//!
//! [`AnimationEngine`] owns the output lines and the scan position. Each tick
//! it moves the lit line one step, reads the rate state once, and sleeps for
//! the scaled period. The sleep is a `recv_timeout` on a stop channel, so a
//! stop request cuts it short.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use rs_cylon::engine::AnimationEngine;
//! use rs_cylon::hal::MockLines;
//! use rs_cylon::rate::RateState;
//! use rs_cylon::traits::OutputLines;
//!
//! let lines = MockLines::new(3);
//! let mut setup = lines.clone();
//! for i in 0..3 {
//!     setup.configure_output(i).unwrap();
//! }
//! let rate = Arc::new(RateState::new(10));
//! let mut engine = AnimationEngine::new(lines.clone(), 3, rate, Duration::from_millis(100));
//!
//! let first = engine.tick();
//! assert_eq!(first.frame.on, 0);
//! assert_eq!(first.sleep, Duration::from_millis(100));
//! assert_eq!(lines.lit(), vec![0]);
//! ```

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use tracing::{debug, trace, warn};

use crate::position::{AnimationPosition, Frame};
use crate::rate::{RateState, ScaleFactor};
use crate::traits::OutputLines;

/// What a single tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickOutcome {
    /// Lines switched this tick
    pub frame: Frame,
    /// Scale read from the rate state
    pub factor: ScaleFactor,
    /// Sleep requested before the next tick
    pub sleep: Duration,
}

/// Returned by [`AnimationEngine::run`] when the loop exits.
#[derive(Debug)]
pub struct EngineExit<O> {
    /// The output lines, handed back for teardown
    pub lines: O,
    /// Ticks executed
    pub ticks: u64,
}

/// Sending half of the engine's stop channel.
///
/// Requesting a stop more than once is harmless. Dropping the handle also
/// stops the engine.
#[derive(Clone, Debug)]
pub struct StopHandle {
    tx: Sender<()>,
}

impl StopHandle {
    /// Create a linked stop handle and receiver.
    pub fn channel() -> (Self, Receiver<()>) {
        let (tx, rx) = crossbeam_channel::bounded(1);
        (Self { tx }, rx)
    }

    /// Ask the engine to stop after its current wait.
    pub fn request_stop(&self) {
        // Full means a stop is already pending; disconnected means the
        // engine is gone. Either way there is nothing left to do.
        let _ = self.tx.try_send(());
    }
}

/// Periodic animation task over a set of output lines.
pub struct AnimationEngine<O: OutputLines> {
    lines: O,
    position: AnimationPosition,
    rate: Arc<RateState>,
    base_period: Duration,
    ticks: u64,
}

impl<O: OutputLines> AnimationEngine<O> {
    /// Create an engine over `line_count` lines at the given base period.
    ///
    /// The lines must already be configured as outputs.
    pub fn new(lines: O, line_count: usize, rate: Arc<RateState>, base_period: Duration) -> Self {
        Self {
            lines,
            position: AnimationPosition::new(line_count),
            rate,
            base_period,
            ticks: 0,
        }
    }

    /// Scan position (next line to light, last line lit).
    pub fn position(&self) -> &AnimationPosition {
        &self.position
    }

    /// Output lines driven by this engine.
    pub fn lines(&self) -> &O {
        &self.lines
    }

    /// Ticks executed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Give the output lines back without running.
    pub fn into_lines(self) -> O {
        self.lines
    }

    /// Run one tick: switch lines, step the position, compute the next sleep.
    ///
    /// Line errors are logged and skipped; a tick always completes.
    pub fn tick(&mut self) -> TickOutcome {
        let frame = self.position.advance();

        if let Some(off) = frame.off {
            if let Err(e) = self.lines.set(off, false) {
                warn!(line = off, error = ?e, "failed to turn line off");
            }
        }
        if let Err(e) = self.lines.set(frame.on, true) {
            warn!(line = frame.on, error = ?e, "failed to turn line on");
        }

        // One read per tick; edges since the last tick are coalesced here.
        let factor = self.rate.read_sleep_factor();
        let sleep = factor.apply(self.base_period);
        self.ticks += 1;

        trace!(on = frame.on, sleep_ms = sleep.as_millis() as u64, "tick");

        TickOutcome {
            frame,
            factor,
            sleep,
        }
    }

    /// Tick until `stop` fires or disconnects, then hand the lines back.
    ///
    /// The stop request is honoured between ticks only. The last lit line is
    /// left on; turning it off is the caller's job.
    pub fn run(mut self, stop: Receiver<()>) -> EngineExit<O> {
        debug!(base_period_ms = self.base_period.as_millis() as u64, "animation engine started");

        let mut stopping = stop_pending(&stop);
        while !stopping {
            let outcome = self.tick();
            stopping = match stop.recv_timeout(outcome.sleep) {
                Err(RecvTimeoutError::Timeout) => false,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
            };
        }

        debug!(ticks = self.ticks, "animation engine stopped");
        EngineExit {
            lines: self.lines,
            ticks: self.ticks,
        }
    }
}

fn stop_pending(stop: &Receiver<()>) -> bool {
    match stop.try_recv() {
        Ok(()) | Err(TryRecvError::Disconnected) => true,
        Err(TryRecvError::Empty) => false,
    }
}
