//! ESP32-C3 SuperMini LED scanner.
//!
//! This is the main entry point for the physical hardware. It starts the
//! scanner on the LED row and button from [`pins`], then reports the speed
//! level every few seconds. The sweep itself runs on its own thread.
//!
//! # Build
//!
//! ```bash
//! cargo build --release --features esp32 --bin esp32_main
//! espflash flash --monitor target/riscv32imc-esp-espidf/release/esp32_main
//! ```
//!
//! Set `RUST_LOG=rs_cylon=debug` at build time for per-edge logging.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rs_cylon::hal::esp32::{pins, Esp32Button, Esp32Clock, Esp32Lines};
use rs_cylon::{Config, PinConfig, Scanner, ScannerConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Status report interval.
const REPORT_INTERVAL: Duration = Duration::from_secs(5);

fn main() -> anyhow::Result<()> {
    // Initialize ESP-IDF
    esp_idf_hal::sys::link_patches();

    let filter = EnvFilter::try_new(option_env!("RUST_LOG").unwrap_or("rs_cylon=info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .init();

    info!("rs-cylon SuperMini scanner");

    // =========================================================================
    // Configuration
    // =========================================================================
    let config = Config::default()
        .with_scanner(ScannerConfig::default().with_line_count(pins::LEDS.len()))
        .with_pins(
            PinConfig::default()
                .with_output_pins(&pins::LEDS)
                .with_input_pin(pins::BUTTON),
        );
    config.validate()?;

    // =========================================================================
    // Start
    // =========================================================================
    let lines = Esp32Lines::new(&config.pins.output_pins);
    let button = Esp32Button::new(config.scanner.input_index, config.pins.input_pin);
    let scanner = Scanner::start(
        config.scanner.clone(),
        lines,
        button,
        Arc::new(Esp32Clock::new()),
    )?;

    if let Some(e) = scanner.degraded() {
        warn!(error = %e, "button unavailable, sweeping at base speed");
    }

    // =========================================================================
    // Status Loop
    // =========================================================================
    loop {
        thread::sleep(REPORT_INTERVAL);
        let snapshot = scanner.rate().snapshot();
        info!(
            level = snapshot.level,
            direction = ?snapshot.direction,
            "speed level"
        );
    }
}
