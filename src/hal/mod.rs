//! Hardware Abstraction Layer implementations.
//!
//! This module contains concrete implementations of the traits
//! defined in [`crate::traits`] for various platforms.
//!
//! # Available Implementations
//!
//! - `mock`: Test implementations for desktop development
//! - `host`: Terminal rendering and a channel-fed button for the desktop binary
//! - `esp32`: GPIO lines and a button interrupt on ESP-IDF (requires `esp32` feature)

pub mod host;
pub mod mock;

#[cfg(feature = "esp32")]
pub mod esp32;

pub use host::*;
pub use mock::*;

#[cfg(feature = "esp32")]
pub use esp32::*;
