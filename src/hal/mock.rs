//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for the hardware traits, enabling
//! development and testing on desktop without physical LEDs or buttons.
//!
//! All mocks are cheap to clone and share their state between clones, so a
//! test can hand one clone to the scanner (which moves it into the engine
//! thread) and keep another to fire edges and inspect the lines.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockLines`] | [`OutputLines`] | Records line states and every operation |
//! | [`MockEdgeInput`] | [`EdgeInput`] | Fires registered callbacks on demand |
//! | [`MockClock`] | [`Clock`] | Controllable time source |
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use rs_cylon::{Scanner, ScannerConfig};
//! use rs_cylon::hal::{MockClock, MockEdgeInput, MockLines};
//!
//! let lines = MockLines::new(10);
//! let button = MockEdgeInput::new();
//! let clock = Arc::new(MockClock::new());
//!
//! let mut scanner = Scanner::start(
//!     ScannerConfig::default(),
//!     lines.clone(),
//!     button.clone(),
//!     clock,
//! ).unwrap();
//!
//! button.trigger();
//! assert_eq!(scanner.rate().snapshot().level, -1);
//!
//! scanner.stop().unwrap();
//! assert!(lines.lit().is_empty());
//! ```
//!
//! [`OutputLines`]: crate::traits::OutputLines
//! [`EdgeInput`]: crate::traits::EdgeInput
//! [`Clock`]: crate::traits::Clock

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::traits::{Clock, EdgeAck, EdgeCallback, EdgeInput, OutputLines};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Output Lines
// ============================================================================

/// Error returned by the mock hardware.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MockLineError {
    /// Index past the end of the line array.
    InvalidIndex(usize),
    /// Line used before being configured.
    NotConfigured(usize),
    /// Failure injected by the test.
    Injected(usize),
}

/// One recorded operation on a [`MockLines`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineEvent {
    /// `configure_output(index)` succeeded.
    Configured(usize),
    /// `set(index, on)` succeeded.
    Set(usize, bool),
    /// `release(index)` released a configured line.
    Released(usize),
}

#[derive(Debug, Default)]
struct LinesInner {
    states: Vec<bool>,
    configured: Vec<bool>,
    history: Vec<LineEvent>,
    fail_configure_at: Option<usize>,
    fail_release_at: Option<usize>,
    fail_sets: bool,
}

/// Mock output line array for testing.
///
/// Tracks on/off state, which lines are configured, and a full history of
/// operations.
///
/// # Example
///
/// ```rust
/// use rs_cylon::hal::{LineEvent, MockLines};
/// use rs_cylon::traits::OutputLines;
///
/// let mut lines = MockLines::new(3);
/// lines.configure_output(0).unwrap();
/// lines.set(0, true).unwrap();
/// lines.turn_off_and_release(0).unwrap();
///
/// assert_eq!(
///     lines.history(),
///     vec![
///         LineEvent::Configured(0),
///         LineEvent::Set(0, true),
///         LineEvent::Set(0, false),
///         LineEvent::Released(0),
///     ]
/// );
///
/// // Using a line that isn't configured is an error
/// assert!(lines.set(1, true).is_err());
/// ```
#[derive(Clone, Debug)]
pub struct MockLines {
    inner: Arc<Mutex<LinesInner>>,
}

impl MockLines {
    /// Creates `n` unconfigured lines, all off.
    pub fn new(n: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LinesInner {
                states: vec![false; n],
                configured: vec![false; n],
                ..LinesInner::default()
            })),
        }
    }

    /// Make `configure_output(index)` fail.
    pub fn failing_configure_at(self, index: usize) -> Self {
        lock(&self.inner).fail_configure_at = Some(index);
        self
    }

    /// Make `release(index)` fail.
    pub fn failing_release_at(self, index: usize) -> Self {
        lock(&self.inner).fail_release_at = Some(index);
        self
    }

    /// Make every `set()` fail (or stop failing).
    pub fn fail_sets(&self, fail: bool) {
        lock(&self.inner).fail_sets = fail;
    }

    /// Indices of lines currently on, ascending.
    pub fn lit(&self) -> Vec<usize> {
        lock(&self.inner)
            .states
            .iter()
            .enumerate()
            .filter_map(|(i, on)| on.then_some(i))
            .collect()
    }

    /// Whether line `index` is on.
    pub fn is_on(&self, index: usize) -> bool {
        lock(&self.inner).states.get(index).copied().unwrap_or(false)
    }

    /// Whether line `index` is currently configured.
    pub fn is_configured(&self, index: usize) -> bool {
        lock(&self.inner).configured.get(index).copied().unwrap_or(false)
    }

    /// Number of lines currently configured.
    pub fn configured_count(&self) -> usize {
        lock(&self.inner).configured.iter().filter(|c| **c).count()
    }

    /// All recorded operations, in order.
    pub fn history(&self) -> Vec<LineEvent> {
        lock(&self.inner).history.clone()
    }

    /// Lines turned on, in the order they were turned on.
    pub fn lit_sequence(&self) -> Vec<usize> {
        lock(&self.inner)
            .history
            .iter()
            .filter_map(|e| match e {
                LineEvent::Set(i, true) => Some(*i),
                _ => None,
            })
            .collect()
    }

    /// Lines released, in release order.
    pub fn released(&self) -> Vec<usize> {
        lock(&self.inner)
            .history
            .iter()
            .filter_map(|e| match e {
                LineEvent::Released(i) => Some(*i),
                _ => None,
            })
            .collect()
    }
}

impl OutputLines for MockLines {
    type Error = MockLineError;

    fn line_count(&self) -> usize {
        lock(&self.inner).states.len()
    }

    fn configure_output(&mut self, index: usize) -> Result<(), MockLineError> {
        let mut inner = lock(&self.inner);
        if index >= inner.states.len() {
            return Err(MockLineError::InvalidIndex(index));
        }
        if inner.fail_configure_at == Some(index) {
            return Err(MockLineError::Injected(index));
        }
        inner.configured[index] = true;
        inner.states[index] = false;
        inner.history.push(LineEvent::Configured(index));
        Ok(())
    }

    fn set(&mut self, index: usize, on: bool) -> Result<(), MockLineError> {
        let mut inner = lock(&self.inner);
        if index >= inner.states.len() {
            return Err(MockLineError::InvalidIndex(index));
        }
        if inner.fail_sets {
            return Err(MockLineError::Injected(index));
        }
        if !inner.configured[index] {
            return Err(MockLineError::NotConfigured(index));
        }
        inner.states[index] = on;
        inner.history.push(LineEvent::Set(index, on));
        Ok(())
    }

    fn release(&mut self, index: usize) -> Result<(), MockLineError> {
        let mut inner = lock(&self.inner);
        if index >= inner.states.len() {
            return Err(MockLineError::InvalidIndex(index));
        }
        if inner.fail_release_at == Some(index) {
            return Err(MockLineError::Injected(index));
        }
        if inner.configured[index] {
            inner.configured[index] = false;
            inner.history.push(LineEvent::Released(index));
        }
        Ok(())
    }
}

// ============================================================================
// Edge Input
// ============================================================================

/// Error returned by [`MockEdgeInput`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MockInputError {
    /// Operation on a line other than the configured one.
    WrongIndex(usize),
    /// Line used before being configured.
    NotConfigured,
    /// Subscription does not match the installed callback.
    UnknownSubscription,
    /// Failure injected by the test.
    Injected,
}

/// Token for a callback installed on a [`MockEdgeInput`].
#[derive(Debug, PartialEq, Eq)]
pub struct MockSubscription(u64);

#[derive(Debug, Default)]
struct InputInner {
    configured: Option<(usize, u32)>,
    level: bool,
    subscription: Option<u64>,
    next_id: u64,
    last_accepted_ms: Option<u64>,
    fail_configure: bool,
    fail_register: bool,
    releases: usize,
    removals: usize,
    edges_fired: usize,
}

/// Mock button for testing.
///
/// Callbacks run synchronously on the thread calling
/// [`trigger`](Self::trigger) or [`press_at`](Self::press_at), which stands
/// in for the platform's notification context. Edges never overlap: a second
/// trigger waits for the first callback to return, and
/// [`remove_edge`](EdgeInput::remove_edge) waits for an in-flight callback.
///
/// # Example
///
/// ```rust
/// use rs_cylon::hal::MockEdgeInput;
/// use rs_cylon::traits::{EdgeAck, EdgeInput};
///
/// let mut button = MockEdgeInput::new();
/// button.configure_input(0, 200).unwrap();
/// let sub = button
///     .on_rising_edge(0, Box::new(|| EdgeAck::Handled))
///     .unwrap();
///
/// assert_eq!(button.trigger(), Some(EdgeAck::Handled));
///
/// // Debounced presses: the second one is inside the 200ms window
/// assert_eq!(button.press_at(1_000), Some(EdgeAck::Handled));
/// assert_eq!(button.press_at(1_150), None);
/// assert_eq!(button.press_at(1_250), Some(EdgeAck::Handled));
///
/// button.remove_edge(sub).unwrap();
/// assert_eq!(button.trigger(), None);
/// ```
#[derive(Clone)]
pub struct MockEdgeInput {
    inner: Arc<Mutex<InputInner>>,
    callback: Arc<Mutex<Option<EdgeCallback>>>,
}

impl fmt::Debug for MockEdgeInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockEdgeInput")
            .field("inner", &*lock(&self.inner))
            .finish_non_exhaustive()
    }
}

impl Default for MockEdgeInput {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEdgeInput {
    /// Creates an unconfigured input, low, with no callback.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(InputInner::default())),
            callback: Arc::new(Mutex::new(None)),
        }
    }

    /// Make `configure_input()` fail.
    pub fn failing_configure(self) -> Self {
        lock(&self.inner).fail_configure = true;
        self
    }

    /// Make `on_rising_edge()` fail.
    pub fn failing_registration(self) -> Self {
        lock(&self.inner).fail_register = true;
        self
    }

    /// Set the level returned by `read()`.
    pub fn set_level(&self, high: bool) {
        lock(&self.inner).level = high;
    }

    /// Fire a rising edge, bypassing debounce.
    ///
    /// Returns the callback's answer, or `None` if no callback is installed.
    pub fn trigger(&self) -> Option<EdgeAck> {
        let mut callback = lock(&self.callback);
        let cb = callback.as_mut()?;
        let ack = cb();
        lock(&self.inner).edges_fired += 1;
        Some(ack)
    }

    /// Fire a rising edge at time `now_ms`, subject to the debounce window.
    ///
    /// Returns `None` when the edge was swallowed by debounce or nothing is
    /// installed.
    pub fn press_at(&self, now_ms: u64) -> Option<EdgeAck> {
        {
            let mut inner = lock(&self.inner);
            let debounce_ms = u64::from(inner.configured.map(|(_, d)| d).unwrap_or(0));
            if let Some(last) = inner.last_accepted_ms {
                if now_ms.saturating_sub(last) < debounce_ms {
                    return None;
                }
            }
            inner.last_accepted_ms = Some(now_ms);
        }
        self.trigger()
    }

    /// Whether a callback is currently installed.
    pub fn is_subscribed(&self) -> bool {
        lock(&self.inner).subscription.is_some()
    }

    /// Whether the input is currently configured.
    pub fn is_configured(&self) -> bool {
        lock(&self.inner).configured.is_some()
    }

    /// Debounce window passed to `configure_input()`, if configured.
    pub fn debounce_ms(&self) -> Option<u32> {
        lock(&self.inner).configured.map(|(_, d)| d)
    }

    /// Number of successful `release()` calls on a configured line.
    pub fn release_count(&self) -> usize {
        lock(&self.inner).releases
    }

    /// Number of successful `remove_edge()` calls.
    pub fn removal_count(&self) -> usize {
        lock(&self.inner).removals
    }

    /// Number of edges delivered to a callback.
    pub fn edges_fired(&self) -> usize {
        lock(&self.inner).edges_fired
    }

    fn check_index(inner: &InputInner, index: usize) -> Result<(), MockInputError> {
        match inner.configured {
            Some((i, _)) if i == index => Ok(()),
            Some(_) => Err(MockInputError::WrongIndex(index)),
            None => Err(MockInputError::NotConfigured),
        }
    }
}

impl EdgeInput for MockEdgeInput {
    type Error = MockInputError;
    type Subscription = MockSubscription;

    fn configure_input(&mut self, index: usize, debounce_ms: u32) -> Result<(), MockInputError> {
        let mut inner = lock(&self.inner);
        if inner.fail_configure {
            return Err(MockInputError::Injected);
        }
        inner.configured = Some((index, debounce_ms));
        Ok(())
    }

    fn read(&self, index: usize) -> Result<bool, MockInputError> {
        let inner = lock(&self.inner);
        Self::check_index(&inner, index)?;
        Ok(inner.level)
    }

    fn on_rising_edge(
        &mut self,
        index: usize,
        callback: EdgeCallback,
    ) -> Result<MockSubscription, MockInputError> {
        // Same lock order as `trigger` and `remove_edge`: callback, then inner.
        let mut slot = lock(&self.callback);
        let mut inner = lock(&self.inner);
        Self::check_index(&inner, index)?;
        if inner.fail_register {
            return Err(MockInputError::Injected);
        }
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscription = Some(id);
        *slot = Some(callback);
        Ok(MockSubscription(id))
    }

    fn remove_edge(&mut self, subscription: MockSubscription) -> Result<(), MockInputError> {
        // Take the callback lock first so an in-flight edge finishes.
        let mut callback = lock(&self.callback);
        let mut inner = lock(&self.inner);
        if inner.subscription != Some(subscription.0) {
            return Err(MockInputError::UnknownSubscription);
        }
        inner.subscription = None;
        inner.removals += 1;
        *callback = None;
        Ok(())
    }

    fn release(&mut self, index: usize) -> Result<(), MockInputError> {
        let mut inner = lock(&self.inner);
        if inner.configured.is_none() {
            return Ok(());
        }
        Self::check_index(&inner, index)?;
        inner.configured = None;
        inner.releases += 1;
        Ok(())
    }
}

// ============================================================================
// Clock
// ============================================================================

/// Mock clock for testing.
///
/// Provides a controllable time source for testing time-dependent behavior.
/// Uses an atomic so it can be shared with an edge handler through an `Arc`.
///
/// # Example
///
/// ```rust
/// use rs_cylon::hal::MockClock;
/// use rs_cylon::traits::Clock;
///
/// let clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.set(1000);
/// assert_eq!(clock.now_ms(), 1000);
///
/// clock.advance(500);
/// assert_eq!(clock.now_ms(), 1500);
/// ```
#[derive(Debug, Default)]
pub struct MockClock {
    current_ms: AtomicU64,
}

impl MockClock {
    /// Creates a new mock clock starting at 0ms.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the current time in milliseconds.
    pub fn set(&self, ms: u64) {
        self.current_ms.store(ms, Ordering::SeqCst);
    }

    /// Advances the clock by the given duration.
    pub fn advance(&self, ms: u64) {
        self.current_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.current_ms.load(Ordering::SeqCst)
    }
}
