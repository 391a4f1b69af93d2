//! Shared configuration system for desktop and ESP32.
//!
//! Uses `heapless::Vec` for the pin map so the config stays `no_std`
//! compatible while remaining ergonomic on desktop with `std`.
//!
//! All values are static for a run; there is no hot reload.
//!
//! # Example
//!
//! ```rust
//! use rs_cylon::config::{Config, PinConfig, ScannerConfig};
//!
//! // Use defaults
//! let config = Config::default();
//! assert_eq!(config.scanner.line_count, 10);
//!
//! // Or customize
//! let config = Config::default()
//!     .with_scanner(ScannerConfig::default().with_line_count(4).with_base_period_ms(50))
//!     .with_pins(PinConfig::default().with_output_pins(&[2, 3, 4, 5]).with_input_pin(9));
//! assert!(config.validate().is_ok());
//! ```

use core::fmt;
use core::time::Duration;

use heapless::Vec as HVec;

/// Maximum number of output lines a scanner can drive.
pub const MAX_LINES: usize = 32;

/// Upper limit accepted for `base_period_ms`.
pub const MAX_BASE_PERIOD_MS: u32 = 10_000;

/// Upper limit accepted for `max_level`.
pub const MAX_LEVEL_LIMIT: i32 = 1000;

/// Pin numbers for the output lines, indexed like the lines themselves.
pub type PinMap = HVec<u32, MAX_LINES>;

/// Board wiring the scanner was first built for (ten LEDs).
pub const DEFAULT_OUTPUT_PINS: [u32; 10] = [65, 46, 26, 44, 68, 67, 47, 45, 69, 66];

/// Default button pin for [`DEFAULT_OUTPUT_PINS`] wiring.
pub const DEFAULT_INPUT_PIN: u32 = 27;

/// Create a PinMap from a slice, dropping anything past [`MAX_LINES`]
pub fn pin_map(pins: &[u32]) -> PinMap {
    let take = pins.len().min(MAX_LINES);
    let mut map = PinMap::new();
    // Cannot fail: `take` never exceeds capacity.
    let _ = map.extend_from_slice(&pins[..take]);
    map
}

// ============================================================================
// Errors
// ============================================================================

/// Reason a configuration was rejected by `validate()`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// `line_count` is zero or above [`MAX_LINES`].
    LineCount(usize),
    /// `base_period_ms` is outside `1..=MAX_BASE_PERIOD_MS`.
    BasePeriod(u32),
    /// `max_level` is outside `1..=MAX_LEVEL_LIMIT`.
    MaxLevel(i32),
    /// The pin map has fewer entries than there are lines.
    PinMapTooShort {
        /// Lines requested
        lines: usize,
        /// Pins available
        pins: usize,
    },
    /// The same GPIO appears twice among the used output pins and the
    /// button pin.
    DuplicatePin(u32),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::LineCount(n) => {
                write!(f, "line_count must be between 1 and {MAX_LINES}, got {n}")
            }
            ConfigError::BasePeriod(ms) => {
                write!(f, "base_period_ms must be between 1 and {MAX_BASE_PERIOD_MS}, got {ms}")
            }
            ConfigError::MaxLevel(n) => {
                write!(f, "max_level must be between 1 and {MAX_LEVEL_LIMIT}, got {n}")
            }
            ConfigError::PinMapTooShort { lines, pins } => {
                write!(f, "pin map has {pins} output pins but {lines} lines are configured")
            }
            ConfigError::DuplicatePin(pin) => write!(f, "pin {pin} is assigned more than once"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

// ============================================================================
// Main Config
// ============================================================================

/// Complete application configuration
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Animation and rate settings
    pub scanner: ScannerConfig,
    /// Pin assignments for hardware backends
    pub pins: PinConfig,
}

impl Config {
    /// Set scanner configuration
    pub fn with_scanner(mut self, scanner: ScannerConfig) -> Self {
        self.scanner = scanner;
        self
    }

    /// Set pin configuration
    pub fn with_pins(mut self, pins: PinConfig) -> Self {
        self.pins = pins;
        self
    }

    /// Validate scanner settings and check the pin map covers every line.
    ///
    /// Backends that address lines by index alone (mocks, the terminal
    /// simulation) only need [`ScannerConfig::validate`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scanner.validate()?;
        if self.pins.output_pins.len() < self.scanner.line_count {
            return Err(ConfigError::PinMapTooShort {
                lines: self.scanner.line_count,
                pins: self.pins.output_pins.len(),
            });
        }
        self.pins.check_unique(self.scanner.line_count)?;
        Ok(())
    }
}

// ============================================================================
// Scanner Config
// ============================================================================

/// Animation engine and rate state configuration
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScannerConfig {
    /// Number of output lines (N)
    pub line_count: usize,
    /// Tick period at level 0, in milliseconds
    pub base_period_ms: u32,
    /// Level bound; the level bounces within `[-max_level, max_level]`
    pub max_level: i32,
    /// Debounce window handed to the input line, in milliseconds
    pub debounce_ms: u32,
    /// Index of the input line on the edge input
    pub input_index: usize,
    /// Extra time allowed on top of the longest tick when stopping
    pub stop_grace_ms: u32,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            line_count: 10,
            base_period_ms: 100,
            max_level: 10,
            debounce_ms: 200,
            input_index: 0,
            stop_grace_ms: 500,
        }
    }
}

impl ScannerConfig {
    /// Set the number of lines
    pub fn with_line_count(mut self, n: usize) -> Self {
        self.line_count = n;
        self
    }

    /// Set the base tick period
    pub fn with_base_period_ms(mut self, ms: u32) -> Self {
        self.base_period_ms = ms;
        self
    }

    /// Set the level bound
    pub fn with_max_level(mut self, max: i32) -> Self {
        self.max_level = max;
        self
    }

    /// Set the debounce window
    pub fn with_debounce_ms(mut self, ms: u32) -> Self {
        self.debounce_ms = ms;
        self
    }

    /// Set the input line index
    pub fn with_input_index(mut self, index: usize) -> Self {
        self.input_index = index;
        self
    }

    /// Set the stop grace period
    pub fn with_stop_grace_ms(mut self, ms: u32) -> Self {
        self.stop_grace_ms = ms;
        self
    }

    /// Base tick period as a [`Duration`]
    #[inline]
    pub fn base_period(&self) -> Duration {
        Duration::from_millis(u64::from(self.base_period_ms))
    }

    /// Longest sleep a tick can request (base period at `+max_level`)
    pub fn max_sleep(&self) -> Duration {
        let factor = u64::from(self.max_level.max(1).unsigned_abs());
        Duration::from_millis(u64::from(self.base_period_ms).saturating_mul(factor))
    }

    /// Upper bound on how long a stop may take before it is a timeout
    pub fn stop_bound(&self) -> Duration {
        self.max_sleep() + Duration::from_millis(u64::from(self.stop_grace_ms))
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.line_count == 0 || self.line_count > MAX_LINES {
            return Err(ConfigError::LineCount(self.line_count));
        }
        if !(1..=MAX_BASE_PERIOD_MS).contains(&self.base_period_ms) {
            return Err(ConfigError::BasePeriod(self.base_period_ms));
        }
        if !(1..=MAX_LEVEL_LIMIT).contains(&self.max_level) {
            return Err(ConfigError::MaxLevel(self.max_level));
        }
        Ok(())
    }
}

// ============================================================================
// Pin Config
// ============================================================================

/// Platform pin numbers for the output lines and the button
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PinConfig {
    /// Output pin for each line index
    pub output_pins: PinMap,
    /// Button pin
    pub input_pin: u32,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            output_pins: pin_map(&DEFAULT_OUTPUT_PINS),
            input_pin: DEFAULT_INPUT_PIN,
        }
    }
}

impl PinConfig {
    /// Set the output pin map
    pub fn with_output_pins(mut self, pins: &[u32]) -> Self {
        self.output_pins = pin_map(pins);
        self
    }

    /// Set the button pin
    pub fn with_input_pin(mut self, pin: u32) -> Self {
        self.input_pin = pin;
        self
    }

    /// Pin number for output line `index`
    pub fn output_pin(&self, index: usize) -> Option<u32> {
        self.output_pins.get(index).copied()
    }

    /// Check that the first `lines` output pins and the button pin are all
    /// distinct.
    pub fn check_unique(&self, lines: usize) -> Result<(), ConfigError> {
        let used = &self.output_pins[..lines.min(self.output_pins.len())];
        for (i, pin) in used.iter().enumerate() {
            if used[..i].contains(pin) || *pin == self.input_pin {
                return Err(ConfigError::DuplicatePin(*pin));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
