//! Trait definitions for hardware abstraction.
//!
//! This module defines the collaborator abstractions that allow rs-cylon to
//! run on different hardware (ESP32 GPIO, terminal simulation, test mocks).
//!
//! # Hardware Abstraction
//!
//! The key hardware traits are:
//!
//! - [`OutputLines`]: The indexed LED array driven by the animation engine
//! - [`EdgeInput`]: The button line with rising-edge notification
//! - [`Clock`]: Time source for edge interval measurement

pub mod hardware;

pub use hardware::*;
