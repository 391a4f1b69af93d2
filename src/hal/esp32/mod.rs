//! ESP32 hardware abstraction layer for the LED scanner.
//!
//! This module provides hardware implementations for a row of LEDs on plain
//! GPIOs and a single push button that speeds the sweep up or down.
//!
//! # Hardware Configuration
//!
//! - **LEDs**: One GPIO per LED through a current-limiting resistor, active high
//! - **Button**: Momentary switch to 3.3V, internal pull-down
//!
//! # Pin Assignments
//!
//! GPIO numbers come from [`PinConfig`](crate::config::PinConfig). See the
//! [`pins`] module for the defaults.

mod button;
mod clock;
mod lines;

pub use button::{ButtonSubscription, Esp32Button, Esp32ButtonError};
pub use clock::Esp32Clock;
pub use lines::{Esp32LineError, Esp32Lines};

/// Pin assignments for the SuperMini ESP32-C3.
///
/// The config defaults are for a board with a much larger GPIO space, so the
/// ESP32 binary overrides them with these. GPIO8 and GPIO9 are skipped
/// (onboard LED and BOOT strap).
pub mod pins {
    // =========================================================================
    // LEDs
    // =========================================================================

    /// LED GPIOs, left to right.
    pub const LEDS: [u32; 10] = [0, 1, 2, 3, 4, 5, 6, 7, 10, 20];

    // =========================================================================
    // Button
    // =========================================================================

    /// Speed button GPIO.
    pub const BUTTON: u32 = 21;
}
