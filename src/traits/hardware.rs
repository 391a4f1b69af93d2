//! Hardware abstraction traits for output lines, the edge input, and time.
//!
//! This module defines the collaborator interfaces that let rs-cylon run on
//! different platforms (ESP32 GPIO, a terminal simulation, test mocks).
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`OutputLines`] | Indexed array of binary outputs (the LEDs) |
//! | [`EdgeInput`] | Input line with rising-edge notification (the button) |
//! | [`Clock`] | Monotonic millisecond time source |
//!
//! # Implementation
//!
//! For testing and desktop development, use the mock implementations
//! from [`crate::hal::mock`]. For ESP32 hardware, use the
//! implementations from `hal::esp32` (requires `esp32` feature).
//!
//! # Example
//!
//! ```rust
//! use rs_cylon::traits::OutputLines;
//! use rs_cylon::hal::MockLines;
//!
//! let mut lines = MockLines::new(4);
//! lines.configure_output(2).unwrap();
//! lines.set(2, true).unwrap();
//!
//! assert!(lines.is_on(2));
//! assert_eq!(lines.lit(), vec![2]);
//! ```

use alloc::boxed::Box;

/// Acknowledgment returned by an edge callback to the notification source.
///
/// Mirrors the handled/not-handled result of an interrupt handler. The
/// scanner's handler always answers [`Handled`](Self::Handled) since every
/// rising edge on its registered line is meaningful.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeAck {
    /// The edge was consumed.
    Handled,
    /// The edge was not meant for this handler.
    NotHandled,
}

impl EdgeAck {
    /// Returns `true` for [`EdgeAck::Handled`].
    #[inline]
    pub const fn is_handled(&self) -> bool {
        matches!(self, EdgeAck::Handled)
    }
}

/// Callback invoked by an [`EdgeInput`] once per debounced rising edge.
///
/// Runs in the collaborator's notification context: it must return quickly
/// and never sleep.
pub type EdgeCallback = Box<dyn FnMut() -> EdgeAck + Send + 'static>;

/// Indexed array of binary output lines.
///
/// Implement this for whatever drives the indicators: GPIO pins, a shift
/// register, a terminal renderer. Indices run from `0` to
/// `line_count() - 1`; an out-of-range index is an error, never a panic.
///
/// # Implementation Notes
///
/// - `configure_output()` acquires the line, sets it as an output and drives
///   it low ("off")
/// - `set()` is only called on configured lines
/// - `release()` gives the line back to the platform; it should tolerate
///   being called on a line that is already released
///
/// # Example Implementation
///
/// ```rust,ignore
/// use rs_cylon::traits::OutputLines;
///
/// struct ShiftRegister { bits: u16 }
///
/// impl OutputLines for ShiftRegister {
///     type Error = ();
///
///     fn line_count(&self) -> usize { 16 }
///
///     fn configure_output(&mut self, index: usize) -> Result<(), ()> {
///         self.set(index, false)
///     }
///
///     fn set(&mut self, index: usize, on: bool) -> Result<(), ()> {
///         if on { self.bits |= 1 << index } else { self.bits &= !(1 << index) }
///         // Clock bits out...
///         Ok(())
///     }
///
///     fn release(&mut self, _index: usize) -> Result<(), ()> {
///         Ok(())
///     }
/// }
/// ```
pub trait OutputLines {
    /// Error type for line operations.
    type Error: core::fmt::Debug;

    /// Number of addressable lines.
    fn line_count(&self) -> usize;

    /// Acquire line `index` as an output, initially off.
    fn configure_output(&mut self, index: usize) -> Result<(), Self::Error>;

    /// Drive line `index` on or off.
    fn set(&mut self, index: usize, on: bool) -> Result<(), Self::Error>;

    /// Release line `index` back to the platform.
    fn release(&mut self, index: usize) -> Result<(), Self::Error>;

    /// Convenience method used at teardown.
    ///
    /// Forces the line off, then releases it.
    fn turn_off_and_release(&mut self, index: usize) -> Result<(), Self::Error> {
        self.set(index, false)?;
        self.release(index)
    }
}

/// Input line with rising-edge notification.
///
/// Debouncing is the implementation's job: the callback registered with
/// [`on_rising_edge`](Self::on_rising_edge) must only see edges that survived
/// the `debounce_ms` window given to
/// [`configure_input`](Self::configure_input).
pub trait EdgeInput {
    /// Error type for input operations.
    type Error: core::fmt::Debug;

    /// Token returned by a successful registration, consumed by
    /// [`remove_edge`](Self::remove_edge).
    type Subscription;

    /// Acquire line `index` as an input with the given debounce window.
    fn configure_input(&mut self, index: usize, debounce_ms: u32) -> Result<(), Self::Error>;

    /// Read the current level of line `index`.
    fn read(&self, index: usize) -> Result<bool, Self::Error>;

    /// Install `callback` to run on each rising edge of line `index`.
    fn on_rising_edge(
        &mut self,
        index: usize,
        callback: EdgeCallback,
    ) -> Result<Self::Subscription, Self::Error>;

    /// Remove a previously installed callback.
    ///
    /// After this returns the callback is never invoked again.
    fn remove_edge(&mut self, subscription: Self::Subscription) -> Result<(), Self::Error>;

    /// Release line `index` back to the platform.
    fn release(&mut self, index: usize) -> Result<(), Self::Error>;
}

/// Time source trait for `no_std` compatibility.
///
/// Provides monotonic time in milliseconds for edge interval measurement.
/// On desktop, this wraps `std::time::Instant`. On embedded, use a hardware
/// timer.
///
/// # Example
///
/// ```rust
/// use rs_cylon::traits::Clock;
/// use rs_cylon::hal::MockClock;
///
/// let clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.advance(100);
/// assert_eq!(clock.now_ms(), 100);
/// ```
pub trait Clock {
    /// Returns current time in milliseconds since an arbitrary epoch.
    ///
    /// Must be monotonically increasing.
    fn now_ms(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for &C {
    #[inline]
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    // =========================================================================
    // EdgeAck Tests
    // =========================================================================

    #[test]
    fn edge_ack_is_handled() {
        assert!(EdgeAck::Handled.is_handled());
        assert!(!EdgeAck::NotHandled.is_handled());
    }

    #[test]
    fn edge_ack_debug() {
        assert_eq!(format!("{:?}", EdgeAck::Handled), "Handled");
        assert_eq!(format!("{:?}", EdgeAck::NotHandled), "NotHandled");
    }

    // =========================================================================
    // OutputLines Default Methods Tests
    // =========================================================================

    struct TestLines {
        states: Vec<bool>,
        calls: Vec<&'static str>,
    }

    impl TestLines {
        fn new(n: usize) -> Self {
            Self {
                states: vec![false; n],
                calls: Vec::new(),
            }
        }
    }

    impl OutputLines for TestLines {
        type Error = ();

        fn line_count(&self) -> usize {
            self.states.len()
        }

        fn configure_output(&mut self, _index: usize) -> Result<(), ()> {
            self.calls.push("configure");
            Ok(())
        }

        fn set(&mut self, index: usize, on: bool) -> Result<(), ()> {
            self.calls.push("set");
            *self.states.get_mut(index).ok_or(())? = on;
            Ok(())
        }

        fn release(&mut self, _index: usize) -> Result<(), ()> {
            self.calls.push("release");
            Ok(())
        }
    }

    #[test]
    fn turn_off_and_release_default_impl() {
        let mut lines = TestLines::new(3);
        lines.set(1, true).unwrap();
        lines.calls.clear();

        lines.turn_off_and_release(1).unwrap();

        assert!(!lines.states[1]);
        assert_eq!(lines.calls, vec!["set", "release"]);
    }

    #[test]
    fn turn_off_and_release_stops_on_set_error() {
        let mut lines = TestLines::new(2);

        assert!(lines.turn_off_and_release(5).is_err());
        // release must not run when the line could not be forced off
        assert_eq!(lines.calls, vec!["set"]);
    }

    // =========================================================================
    // Clock Tests
    // =========================================================================

    struct FixedClock(u64);

    impl Clock for FixedClock {
        fn now_ms(&self) -> u64 {
            self.0
        }
    }

    #[test]
    fn clock_by_reference() {
        let clock = FixedClock(42);
        let by_ref = &clock;
        assert_eq!(Clock::now_ms(&by_ref), 42);
    }
}
