//! Start/stop orchestration for a running scanner.
//!
//! [`Scanner::start`] acquires everything in order and unwinds on failure:
//!
//! 1. rate state
//! 2. output lines `0..N`, configured off
//! 3. input line, with debounce
//! 4. edge handler registration (failure here only degrades the scanner)
//! 5. animation thread
//!
//! [`Scanner::stop`] tears down in reverse: the engine is stopped and hands
//! the output lines back, the edge handler is removed, the input released,
//! and each output forced off and released.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use rs_cylon::{Scanner, ScannerConfig, StopReport};
//! use rs_cylon::hal::{MockClock, MockEdgeInput, MockLines};
//!
//! let lines = MockLines::new(4);
//! let button = MockEdgeInput::new();
//! let config = ScannerConfig::default().with_line_count(4).with_base_period_ms(5);
//!
//! let mut scanner = Scanner::start(config, lines.clone(), button.clone(), Arc::new(MockClock::new())).unwrap();
//! assert!(scanner.is_running());
//! assert!(scanner.degraded().is_none());
//!
//! assert!(matches!(scanner.stop().unwrap(), StopReport::Stopped { .. }));
//! assert_eq!(scanner.stop().unwrap(), StopReport::AlreadyStopped);
//! assert_eq!(lines.configured_count(), 0);
//! ```

use std::mem;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::{debug, error, info, warn};

use crate::config::ScannerConfig;
use crate::edge::EdgeHandler;
use crate::engine::{AnimationEngine, EngineExit, StopHandle};
use crate::error::{LineRole, Result, ScannerError};
use crate::rate::RateState;
use crate::traits::{Clock, EdgeInput, OutputLines};

/// Name given to the animation thread.
pub const ENGINE_THREAD_NAME: &str = "cylon-engine";

/// Outcome of [`Scanner::stop`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReport {
    /// The engine stopped and every line was released.
    Stopped {
        /// Ticks the engine ran
        ticks: u64,
    },
    /// Nothing to do: the scanner was already stopped.
    AlreadyStopped,
}

enum EngineSlot<O> {
    Running {
        stop: StopHandle,
        done: Receiver<EngineExit<O>>,
        thread: JoinHandle<()>,
    },
    Stopped,
}

/// A running scanner: animation thread, edge handler and the lines they use.
///
/// Dropping a running scanner stops it; errors from that implicit stop are
/// logged. Call [`stop`](Self::stop) to see them.
pub struct Scanner<O, I>
where
    O: OutputLines + Send + 'static,
    I: EdgeInput,
{
    config: ScannerConfig,
    rate: Arc<RateState>,
    input: I,
    input_held: bool,
    subscription: Option<I::Subscription>,
    engine: EngineSlot<O>,
    degraded: Option<ScannerError>,
}

impl<O, I> Scanner<O, I>
where
    O: OutputLines + Send + 'static,
    I: EdgeInput,
{
    /// Acquire the lines, install the edge handler and start animating.
    ///
    /// # Errors
    ///
    /// - [`ScannerError::Config`] if `config` is invalid (nothing acquired)
    /// - [`ScannerError::Acquisition`] if a line cannot be configured
    /// - [`ScannerError::Spawn`] if the animation thread cannot start
    ///
    /// In every error case, lines acquired so far are released before
    /// returning. A failed edge registration is not an error; see
    /// [`degraded`](Self::degraded).
    pub fn start<C>(config: ScannerConfig, mut outputs: O, mut input: I, clock: Arc<C>) -> Result<Self>
    where
        C: Clock + Send + Sync + 'static,
    {
        config.validate()?;
        info!(
            lines = config.line_count,
            base_period_ms = config.base_period_ms,
            max_level = config.max_level,
            debounce_ms = config.debounce_ms,
            "starting scanner"
        );

        let rate = Arc::new(RateState::new(config.max_level));

        for index in 0..config.line_count {
            if let Err(e) = outputs.configure_output(index) {
                let err = ScannerError::acquisition(LineRole::Output, index, e);
                error!(error = %err, "startup aborted");
                release_outputs(&mut outputs, index);
                return Err(err);
            }
        }
        debug!(lines = config.line_count, "output lines configured");

        let input_index = config.input_index;
        if let Err(e) = input.configure_input(input_index, config.debounce_ms) {
            let err = ScannerError::acquisition(LineRole::Input, input_index, e);
            error!(error = %err, "startup aborted");
            release_outputs(&mut outputs, config.line_count);
            return Err(err);
        }
        match input.read(input_index) {
            Ok(high) => info!(line = input_index, high, "button configured"),
            Err(e) => debug!(line = input_index, error = ?e, "button level unreadable"),
        }

        let handler = Arc::new(EdgeHandler::new(Arc::clone(&rate), clock));
        let (subscription, degraded) = match input.on_rising_edge(input_index, handler.into_callback()) {
            Ok(sub) => (Some(sub), None),
            Err(e) => {
                let err = ScannerError::registration(input_index, e);
                warn!(error = %err, "running without speed control");
                (None, Some(err))
            }
        };

        let engine = AnimationEngine::new(
            outputs,
            config.line_count,
            Arc::clone(&rate),
            config.base_period(),
        );
        // The engine waits here until the thread takes it, so a failed spawn
        // can still give the lines back.
        let parked = Arc::new(Mutex::new(Some(engine)));
        let (stop, stop_rx) = StopHandle::channel();
        let (done_tx, done) = crossbeam_channel::bounded(1);

        let thread_parked = Arc::clone(&parked);
        let spawned = thread::Builder::new()
            .name(ENGINE_THREAD_NAME.to_string())
            .spawn(move || {
                let engine = thread_parked
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
                if let Some(engine) = engine {
                    let _ = done_tx.send(engine.run(stop_rx));
                }
            });

        let thread = match spawned {
            Ok(thread) => thread,
            Err(e) => {
                error!(error = %e, "failed to spawn animation thread, unwinding");
                if let Some(sub) = subscription {
                    if let Err(e) = input.remove_edge(sub) {
                        warn!(error = ?e, "failed to remove edge handler");
                    }
                }
                if let Err(e) = input.release(input_index) {
                    warn!(line = input_index, error = ?e, "failed to release input line");
                }
                let engine = parked.lock().unwrap_or_else(PoisonError::into_inner).take();
                if let Some(engine) = engine {
                    release_outputs(&mut engine.into_lines(), config.line_count);
                }
                return Err(ScannerError::Spawn(e));
            }
        };

        info!(degraded = degraded.is_some(), "scanner running");

        Ok(Self {
            config,
            rate,
            input,
            input_held: true,
            subscription,
            engine: EngineSlot::Running { stop, done, thread },
            degraded,
        })
    }

    /// Stop the animation and release every line.
    ///
    /// Calling this again after it returned (successfully or not) is a no-op
    /// that reports [`StopReport::AlreadyStopped`].
    ///
    /// # Errors
    ///
    /// - [`ScannerError::StopTimeout`] if the engine did not exit within
    ///   [`ScannerConfig::stop_bound`]. The input line is still released but
    ///   the output lines stay with the stuck thread.
    /// - [`ScannerError::EngineLost`] if the engine thread died without
    ///   handing the output lines back.
    /// - [`ScannerError::Release`] for the first line that failed to
    ///   release. Every other line is still released.
    pub fn stop(&mut self) -> Result<StopReport> {
        let EngineSlot::Running { stop, done, thread } =
            mem::replace(&mut self.engine, EngineSlot::Stopped)
        else {
            return Ok(StopReport::AlreadyStopped);
        };

        stop.request_stop();
        let bound = self.config.stop_bound();
        let asked = Instant::now();
        let outcome = done.recv_timeout(bound);
        let waited_ms = asked.elapsed().as_millis() as u64;

        let mut first_err = self.release_input();

        let exit = match outcome {
            Ok(exit) => {
                let _ = thread.join();
                exit
            }
            Err(RecvTimeoutError::Timeout) => {
                let err = ScannerError::StopTimeout { waited_ms };
                error!(error = %err, "output lines may be left lit");
                return Err(err);
            }
            Err(RecvTimeoutError::Disconnected) => {
                let _ = thread.join();
                let err = ScannerError::EngineLost;
                error!(error = %err, "output lines were not released");
                return Err(err);
            }
        };

        let mut lines = exit.lines;
        for index in 0..self.config.line_count {
            if let Err(e) = lines.turn_off_and_release(index) {
                let err = ScannerError::release(LineRole::Output, index, e);
                warn!(error = %err, "teardown continuing");
                first_err.get_or_insert(err);
            }
        }

        info!(ticks = exit.ticks, waited_ms, "scanner stopped");
        match first_err {
            Some(err) => Err(err),
            None => Ok(StopReport::Stopped { ticks: exit.ticks }),
        }
    }

    fn release_input(&mut self) -> Option<ScannerError> {
        let index = self.config.input_index;
        let mut first_err = None;

        if let Some(sub) = self.subscription.take() {
            if let Err(e) = self.input.remove_edge(sub) {
                let err = ScannerError::release(LineRole::Input, index, e);
                warn!(error = %err, "failed to remove edge handler");
                first_err = Some(err);
            }
        }
        if mem::take(&mut self.input_held) {
            if let Err(e) = self.input.release(index) {
                let err = ScannerError::release(LineRole::Input, index, e);
                warn!(error = %err, "failed to release input line");
                first_err.get_or_insert(err);
            }
        }
        first_err
    }

    /// Whether the animation thread is still running.
    pub fn is_running(&self) -> bool {
        matches!(self.engine, EngineSlot::Running { .. })
    }

    /// Why the scanner is running without speed control, if it is.
    pub fn degraded(&self) -> Option<&ScannerError> {
        self.degraded.as_ref()
    }

    /// Shared rate state.
    pub fn rate(&self) -> &Arc<RateState> {
        &self.rate
    }

    /// Configuration the scanner was started with.
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }
}

impl<O, I> Drop for Scanner<O, I>
where
    O: OutputLines + Send + 'static,
    I: EdgeInput,
{
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!(error = %e, "scanner stop on drop failed");
        }
    }
}

/// Force off and release outputs `0..count`, logging failures.
fn release_outputs<O: OutputLines>(outputs: &mut O, count: usize) {
    for index in (0..count).rev() {
        if let Err(e) = outputs.turn_off_and_release(index) {
            warn!(line = index, error = ?e, "failed to release output line during unwind");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{LineEvent, MockClock, MockEdgeInput, MockLines};

    fn config(n: usize) -> ScannerConfig {
        ScannerConfig::default()
            .with_line_count(n)
            .with_base_period_ms(2)
    }

    #[test]
    fn invalid_config_acquires_nothing() {
        let lines = MockLines::new(3);
        let button = MockEdgeInput::new();
        let result = Scanner::start(
            config(0),
            lines.clone(),
            button.clone(),
            Arc::new(MockClock::new()),
        );
        assert!(matches!(result, Err(ScannerError::Config(_))));
        assert!(lines.history().is_empty());
        assert!(!button.is_configured());
    }

    #[test]
    fn unwind_releases_in_reverse_order() {
        let lines = MockLines::new(4).failing_configure_at(3);
        let result = Scanner::start(
            config(4),
            lines.clone(),
            MockEdgeInput::new(),
            Arc::new(MockClock::new()),
        );
        assert!(matches!(
            result,
            Err(ScannerError::Acquisition {
                role: LineRole::Output,
                index: 3,
                ..
            })
        ));
        assert_eq!(lines.released(), vec![2, 1, 0]);
    }

    #[test]
    fn stop_turns_off_before_release() {
        let lines = MockLines::new(2);
        let mut scanner = Scanner::start(
            config(2),
            lines.clone(),
            MockEdgeInput::new(),
            Arc::new(MockClock::new()),
        )
        .unwrap();
        scanner.stop().unwrap();

        let history = lines.history();
        for index in 0..2 {
            let off = history
                .iter()
                .rposition(|e| *e == LineEvent::Set(index, false))
                .unwrap();
            let released = history
                .iter()
                .position(|e| *e == LineEvent::Released(index))
                .unwrap();
            assert!(off < released);
        }
        assert!(!scanner.is_running());
    }

    #[test]
    fn drop_stops_running_scanner() {
        let lines = MockLines::new(3);
        let button = MockEdgeInput::new();
        {
            let _scanner = Scanner::start(
                config(3),
                lines.clone(),
                button.clone(),
                Arc::new(MockClock::new()),
            )
            .unwrap();
        }
        assert_eq!(lines.configured_count(), 0);
        assert!(lines.lit().is_empty());
        assert!(!button.is_subscribed());
        assert_eq!(button.release_count(), 1);
    }
}
