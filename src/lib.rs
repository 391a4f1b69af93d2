//! # rs-cylon
//!
//! A bouncing "cylon" scanner for a row of output lines, with a push button
//! that changes the sweep speed.
//!
//! ## Features
//!
//! - **Hardware abstraction**: Traits for output lines, an edge-triggered input, and a clock
//! - **Bouncing speed level**: Each button press steps a level that reverses at ±`max_level`
//! - **Periodic animation**: One lit line sweeps end to end, sleeping a scaled base period per step
//! - **Clean shutdown**: Stop cuts the current sleep short and turns every line off
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `traits` - Hardware abstractions
//! - `bounce` - Bounded value that reverses direction at its limits
//! - `position` - Scan position across the output lines
//! - `rate` - Shared speed level and its sleep scale
//! - `edge` - Button edge handler
//! - `engine` - Periodic animation task
//! - `lifecycle` - Start/stop orchestration
//! - `hal` - Concrete implementations (mock for testing, host for desktop, esp32 for hardware)
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use rs_cylon::{
//!     Scanner, ScannerConfig, StopReport,
//!     hal::{MockClock, MockEdgeInput, MockLines},
//! };
//!
//! let lines = MockLines::new(10);
//! let button = MockEdgeInput::new();
//! let clock = Arc::new(MockClock::new());
//!
//! let mut scanner = Scanner::start(
//!     ScannerConfig::default(),
//!     lines.clone(),
//!     button.clone(),
//!     Arc::clone(&clock),
//! )
//! .unwrap();
//!
//! // Two presses from the initial downward heading: level -2, twice as fast
//! button.trigger();
//! button.trigger();
//! assert_eq!(scanner.rate().snapshot().level, -2);
//!
//! assert!(matches!(scanner.stop().unwrap(), StopReport::Stopped { .. }));
//! assert!(lines.lit().is_empty());
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

/// Bounded value that sweeps between two limits and reverses at them.
pub mod bounce;
/// Shared configuration for desktop and ESP32.
pub mod config;
/// Scan position across the output lines.
pub mod position;
/// Core traits for hardware abstraction.
pub mod traits;

/// Button edge handler.
#[cfg(feature = "std")]
pub mod edge;
/// Periodic animation task.
#[cfg(feature = "std")]
pub mod engine;
/// Startup and shutdown errors.
#[cfg(feature = "std")]
pub mod error;
/// Hardware abstraction layer with mock implementations for testing.
#[cfg(feature = "std")]
pub mod hal;
/// Start/stop orchestration.
#[cfg(feature = "std")]
pub mod lifecycle;
/// Shared speed level and its sleep scale.
#[cfg(feature = "std")]
pub mod rate;

// Re-exports for convenience
pub use bounce::{Endpoint, Heading, Stepped, Sweep};
pub use config::{Config, ConfigError, PinConfig, ScannerConfig};
pub use position::{AnimationPosition, Frame};
pub use traits::{Clock, EdgeAck, EdgeCallback, EdgeInput, OutputLines};

#[cfg(feature = "std")]
pub use edge::EdgeHandler;
#[cfg(feature = "std")]
pub use engine::{AnimationEngine, EngineExit, StopHandle, TickOutcome};
#[cfg(feature = "std")]
pub use error::{LineRole, ScannerError};
#[cfg(feature = "std")]
pub use lifecycle::{Scanner, StopReport};
#[cfg(feature = "std")]
pub use rate::{EdgeRecord, RateSnapshot, RateState, ScaleFactor};
