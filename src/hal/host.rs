//! Desktop implementations for running the scanner in a terminal.
//!
//! | Type | Trait | Purpose |
//! |------|-------|---------|
//! | [`StdClock`] | [`Clock`] | Milliseconds since construction |
//! | [`TerminalLines`] | [`OutputLines`] | Draws the row of lines to a writer |
//! | [`ChannelEdgeInput`] | [`EdgeInput`] | Button fed by an [`EdgeSender`] |
//!
//! [`ChannelEdgeInput`] runs registered callbacks on its own dispatcher
//! thread, one edge at a time, the way a GPIO notification context would.
//!
//! [`Clock`]: crate::traits::Clock
//! [`OutputLines`]: crate::traits::OutputLines
//! [`EdgeInput`]: crate::traits::EdgeInput

use std::io::{self, Write};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, trace};

use crate::traits::{Clock, EdgeCallback, EdgeInput, OutputLines};

/// Name of the thread that delivers edges to the registered callback.
pub const DISPATCH_THREAD_NAME: &str = "cylon-button";

// ============================================================================
// Clock
// ============================================================================

/// Monotonic clock counting milliseconds from its creation.
#[derive(Clone, Copy, Debug)]
pub struct StdClock {
    start: Instant,
}

impl StdClock {
    /// Creates a clock that reads 0 now.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

// ============================================================================
// Terminal Lines
// ============================================================================

/// Error returned by [`TerminalLines`].
#[derive(Debug, thiserror::Error)]
pub enum TerminalLineError {
    /// Index past the end of the row.
    #[error("line {0} is out of range")]
    InvalidIndex(usize),
    /// Line used before being configured.
    #[error("line {0} is not configured as an output")]
    NotConfigured(usize),
    /// Writing the row failed.
    #[error("failed to draw lines: {0}")]
    Io(#[from] io::Error),
}

/// A row of output lines drawn as text, one character per line.
///
/// Every change redraws the row in place: `#` for on, `.` for off.
///
/// ```rust
/// use rs_cylon::hal::TerminalLines;
/// use rs_cylon::traits::OutputLines;
///
/// let mut lines = TerminalLines::new(4, Vec::new());
/// for i in 0..4 {
///     lines.configure_output(i).unwrap();
/// }
/// lines.set(2, true).unwrap();
/// assert_eq!(lines.row(), "..#.");
/// ```
#[derive(Debug)]
pub struct TerminalLines<W: Write> {
    states: Vec<bool>,
    configured: Vec<bool>,
    out: W,
}

impl TerminalLines<io::Stdout> {
    /// Draws to standard output.
    pub fn stdout(n: usize) -> Self {
        Self::new(n, io::stdout())
    }
}

impl<W: Write> TerminalLines<W> {
    /// Creates `n` unconfigured lines drawing to `out`.
    pub fn new(n: usize, out: W) -> Self {
        Self {
            states: vec![false; n],
            configured: vec![false; n],
            out,
        }
    }

    /// Current row as text.
    pub fn row(&self) -> String {
        self.states
            .iter()
            .map(|&on| if on { '#' } else { '.' })
            .collect()
    }

    /// The underlying writer.
    pub fn writer(&self) -> &W {
        &self.out
    }

    fn check(&self, index: usize) -> Result<(), TerminalLineError> {
        match self.configured.get(index) {
            None => Err(TerminalLineError::InvalidIndex(index)),
            Some(false) => Err(TerminalLineError::NotConfigured(index)),
            Some(true) => Ok(()),
        }
    }

    fn draw(&mut self) -> Result<(), TerminalLineError> {
        let row = self.row();
        write!(self.out, "\r[{row}]")?;
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> OutputLines for TerminalLines<W> {
    type Error = TerminalLineError;

    fn line_count(&self) -> usize {
        self.states.len()
    }

    fn configure_output(&mut self, index: usize) -> Result<(), TerminalLineError> {
        let slot = self
            .configured
            .get_mut(index)
            .ok_or(TerminalLineError::InvalidIndex(index))?;
        *slot = true;
        self.states[index] = false;
        Ok(())
    }

    fn set(&mut self, index: usize, on: bool) -> Result<(), TerminalLineError> {
        self.check(index)?;
        self.states[index] = on;
        self.draw()
    }

    fn release(&mut self, index: usize) -> Result<(), TerminalLineError> {
        let slot = self
            .configured
            .get_mut(index)
            .ok_or(TerminalLineError::InvalidIndex(index))?;
        *slot = false;
        Ok(())
    }
}

// ============================================================================
// Channel Edge Input
// ============================================================================

/// Error returned by [`ChannelEdgeInput`].
#[derive(Debug, thiserror::Error)]
pub enum ChannelInputError {
    /// Operation on a line other than the configured one.
    #[error("input line {0} is not the configured line")]
    WrongIndex(usize),
    /// Line used before being configured.
    #[error("input line is not configured")]
    NotConfigured,
    /// A callback is already installed.
    #[error("an edge callback is already installed")]
    AlreadySubscribed,
    /// The dispatcher thread could not be started.
    #[error("failed to spawn edge dispatcher: {0}")]
    Spawn(#[from] io::Error),
    /// The dispatcher thread panicked inside the callback.
    #[error("edge dispatcher panicked")]
    DispatcherPanicked,
}

/// Sending side of a [`ChannelEdgeInput`]. Each call is one rising edge.
#[derive(Clone, Debug)]
pub struct EdgeSender {
    tx: Sender<()>,
}

impl EdgeSender {
    /// Deliver one rising edge. Returns `false` once the input is gone.
    pub fn press(&self) -> bool {
        self.tx.send(()).is_ok()
    }
}

/// Handle for a running dispatcher, returned by
/// [`on_rising_edge`](EdgeInput::on_rising_edge).
#[derive(Debug)]
pub struct Dispatcher {
    stop: Sender<()>,
    thread: JoinHandle<Receiver<()>>,
}

/// Button input driven from a channel.
///
/// Edges sent before a callback is installed stay queued and are delivered
/// once one is. Edges closer together than the debounce window are dropped
/// by the dispatcher.
///
/// ```rust
/// use std::sync::mpsc;
/// use rs_cylon::hal::ChannelEdgeInput;
/// use rs_cylon::traits::{EdgeAck, EdgeInput};
///
/// let (mut button, sender) = ChannelEdgeInput::channel();
/// button.configure_input(0, 0).unwrap();
///
/// let (seen_tx, seen_rx) = mpsc::channel();
/// let sub = button
///     .on_rising_edge(0, Box::new(move || {
///         seen_tx.send(()).unwrap();
///         EdgeAck::Handled
///     }))
///     .unwrap();
///
/// sender.press();
/// seen_rx.recv().unwrap();
/// button.remove_edge(sub).unwrap();
/// ```
#[derive(Debug)]
pub struct ChannelEdgeInput {
    edges: Option<Receiver<()>>,
    configured: Option<(usize, u32)>,
    clock: StdClock,
}

impl ChannelEdgeInput {
    /// Creates an unconfigured input and the sender that feeds it.
    pub fn channel() -> (Self, EdgeSender) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let input = Self {
            edges: Some(rx),
            configured: None,
            clock: StdClock::new(),
        };
        (input, EdgeSender { tx })
    }

    fn check_index(&self, index: usize) -> Result<u32, ChannelInputError> {
        match self.configured {
            Some((i, debounce_ms)) if i == index => Ok(debounce_ms),
            Some(_) => Err(ChannelInputError::WrongIndex(index)),
            None => Err(ChannelInputError::NotConfigured),
        }
    }
}

impl EdgeInput for ChannelEdgeInput {
    type Error = ChannelInputError;
    type Subscription = Dispatcher;

    fn configure_input(&mut self, index: usize, debounce_ms: u32) -> Result<(), ChannelInputError> {
        self.configured = Some((index, debounce_ms));
        Ok(())
    }

    /// A terminal button is momentary, so the line reads low between edges.
    fn read(&self, index: usize) -> Result<bool, ChannelInputError> {
        self.check_index(index)?;
        Ok(false)
    }

    fn on_rising_edge(
        &mut self,
        index: usize,
        mut callback: EdgeCallback,
    ) -> Result<Dispatcher, ChannelInputError> {
        let debounce_ms = u64::from(self.check_index(index)?);
        let edges = self
            .edges
            .take()
            .ok_or(ChannelInputError::AlreadySubscribed)?;
        let (stop, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let clock = self.clock;

        // The receiver only moves into the closure if spawn succeeds, so
        // hand it over through a channel that can be drained on failure.
        let (handoff, handoff_rx) = crossbeam_channel::bounded::<Receiver<()>>(1);
        let reclaim = handoff_rx.clone();
        let _ = handoff.send(edges);

        let spawned = thread::Builder::new()
            .name(DISPATCH_THREAD_NAME.into())
            .spawn(move || {
                let Ok(edges) = handoff_rx.recv() else {
                    return crossbeam_channel::never();
                };
                let mut last_accepted: Option<u64> = None;
                loop {
                    crossbeam_channel::select! {
                        recv(stop_rx) -> _ => break,
                        recv(edges) -> msg => {
                            if msg.is_err() {
                                // Every sender is gone; wait for the stop.
                                let _ = stop_rx.recv();
                                break;
                            }
                            let now = clock.now_ms();
                            if let Some(last) = last_accepted {
                                if now.saturating_sub(last) < debounce_ms {
                                    trace!(now_ms = now, "edge debounced");
                                    continue;
                                }
                            }
                            last_accepted = Some(now);
                            let _ = callback();
                        }
                    }
                }
                edges
            });

        match spawned {
            Ok(thread) => {
                debug!(index, debounce_ms, "edge dispatcher started");
                Ok(Dispatcher { stop, thread })
            }
            Err(e) => {
                if let Ok(edges) = reclaim.try_recv() {
                    self.edges = Some(edges);
                }
                Err(ChannelInputError::Spawn(e))
            }
        }
    }

    fn remove_edge(&mut self, subscription: Dispatcher) -> Result<(), ChannelInputError> {
        let Dispatcher { stop, thread } = subscription;
        let _ = stop.send(());
        let edges = thread
            .join()
            .map_err(|_| ChannelInputError::DispatcherPanicked)?;
        self.edges = Some(edges);
        debug!("edge dispatcher stopped");
        Ok(())
    }

    fn release(&mut self, _index: usize) -> Result<(), ChannelInputError> {
        self.configured = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::EdgeAck;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn counting_callback() -> (EdgeCallback, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let cb: EdgeCallback = Box::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
            EdgeAck::Handled
        });
        (cb, count)
    }

    fn wait_for(count: &AtomicUsize, n: usize) {
        for _ in 0..200 {
            if count.load(Ordering::SeqCst) >= n {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("expected {n} edges, saw {}", count.load(Ordering::SeqCst));
    }

    // ========================================================================
    // StdClock
    // ========================================================================

    #[test]
    fn std_clock_is_monotonic() {
        let clock = StdClock::new();
        let a = clock.now_ms();
        thread::sleep(Duration::from_millis(5));
        assert!(clock.now_ms() >= a + 5);
    }

    // ========================================================================
    // TerminalLines
    // ========================================================================

    #[test]
    fn terminal_draws_each_change() {
        let mut lines = TerminalLines::new(3, Vec::new());
        for i in 0..3 {
            lines.configure_output(i).unwrap();
        }
        lines.set(0, true).unwrap();
        lines.set(0, false).unwrap();
        lines.set(1, true).unwrap();

        let drawn = String::from_utf8(lines.writer().clone()).unwrap();
        assert_eq!(drawn, "\r[#..]\r[...]\r[.#.]");
    }

    #[test]
    fn terminal_rejects_unconfigured_lines() {
        let mut lines = TerminalLines::new(2, Vec::new());
        assert!(matches!(
            lines.set(0, true),
            Err(TerminalLineError::NotConfigured(0))
        ));
        assert!(matches!(
            lines.configure_output(5),
            Err(TerminalLineError::InvalidIndex(5))
        ));
    }

    #[test]
    fn terminal_turn_off_and_release() {
        let mut lines = TerminalLines::new(2, Vec::new());
        lines.configure_output(1).unwrap();
        lines.set(1, true).unwrap();
        lines.turn_off_and_release(1).unwrap();
        assert_eq!(lines.row(), "..");
        assert!(lines.set(1, true).is_err());
    }

    // ========================================================================
    // ChannelEdgeInput
    // ========================================================================

    #[test]
    fn delivers_edges_on_dispatcher_thread() {
        let (mut input, sender) = ChannelEdgeInput::channel();
        input.configure_input(0, 0).unwrap();
        let (cb, count) = counting_callback();
        let sub = input.on_rising_edge(0, cb).unwrap();

        for _ in 0..3 {
            assert!(sender.press());
        }
        wait_for(&count, 3);
        input.remove_edge(sub).unwrap();
    }

    #[test]
    fn debounce_drops_close_edges() {
        let (mut input, sender) = ChannelEdgeInput::channel();
        input.configure_input(0, 10_000).unwrap();
        let (cb, count) = counting_callback();

        // Queue a burst before subscribing so it arrives back to back
        for _ in 0..5 {
            sender.press();
        }
        let sub = input.on_rising_edge(0, cb).unwrap();
        wait_for(&count, 1);
        thread::sleep(Duration::from_millis(20));
        input.remove_edge(sub).unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn no_callback_after_removal() {
        let (mut input, sender) = ChannelEdgeInput::channel();
        input.configure_input(0, 0).unwrap();
        let (cb, count) = counting_callback();
        let sub = input.on_rising_edge(0, cb).unwrap();
        input.remove_edge(sub).unwrap();

        sender.press();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(count.load(Ordering::SeqCst), 0);

        // Queued edge goes to the next subscriber
        let (cb, again) = counting_callback();
        let sub = input.on_rising_edge(0, cb).unwrap();
        wait_for(&again, 1);
        input.remove_edge(sub).unwrap();
    }

    #[test]
    fn second_subscription_is_rejected() {
        let (mut input, _sender) = ChannelEdgeInput::channel();
        input.configure_input(0, 0).unwrap();
        let (cb, _) = counting_callback();
        let sub = input.on_rising_edge(0, cb).unwrap();
        let (cb, _) = counting_callback();
        assert!(matches!(
            input.on_rising_edge(0, cb),
            Err(ChannelInputError::AlreadySubscribed)
        ));
        input.remove_edge(sub).unwrap();
    }

    #[test]
    fn wrong_index_and_unconfigured() {
        let (mut input, _sender) = ChannelEdgeInput::channel();
        assert!(matches!(input.read(0), Err(ChannelInputError::NotConfigured)));
        input.configure_input(2, 0).unwrap();
        assert!(matches!(input.read(0), Err(ChannelInputError::WrongIndex(0))));
        assert!(!input.read(2).unwrap());
        input.release(2).unwrap();
        assert!(matches!(input.read(2), Err(ChannelInputError::NotConfigured)));
    }
}
