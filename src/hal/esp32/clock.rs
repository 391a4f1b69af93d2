//! ESP32 clock using the ESP-IDF high resolution timer.

use crate::traits::Clock;

/// Milliseconds since boot, read from `esp_timer_get_time()`.
///
/// Used to timestamp button edges and to apply the debounce window on the
/// dispatcher thread.
///
/// # Example
///
/// ```ignore
/// use rs_cylon::hal::esp32::Esp32Clock;
/// use rs_cylon::traits::Clock;
///
/// let clock = Esp32Clock::new();
/// let pressed_at = clock.now_ms();
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Esp32Clock;

impl Esp32Clock {
    /// Creates a new ESP32 clock instance.
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Default for Esp32Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for Esp32Clock {
    #[inline]
    fn now_ms(&self) -> u64 {
        // Reads a free-running timer; no side effects.
        let micros = unsafe { esp_idf_hal::sys::esp_timer_get_time() };
        (micros / 1000) as u64
    }
}
