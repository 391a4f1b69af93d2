//! Terminal LED scanner.
//!
//! Draws the row of lines in place on stdout. Press Enter to send a button
//! edge; type `q` and Enter (or close stdin) to stop. Logs go to stderr and
//! honour `RUST_LOG`.
//!
//! ```bash
//! RUST_LOG=rs_cylon=info cargo run --features cli --bin desktop_scanner -- --lines 12
//! ```

use std::io::{self, BufRead};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use rs_cylon::hal::{ChannelEdgeInput, EdgeSender, StdClock, TerminalLines};
use rs_cylon::{Scanner, ScannerConfig, StopReport};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Bouncing LED scanner in the terminal", long_about = None)]
struct Cli {
    /// Number of lines in the row.
    #[arg(short = 'n', long, default_value_t = 10)]
    lines: usize,

    /// Tick period at speed level 0, in milliseconds.
    #[arg(short, long, default_value_t = 100)]
    base_period_ms: u32,

    /// Speed level bound; the level bounces within ±max.
    #[arg(short, long, default_value_t = 10)]
    max_level: i32,

    /// Button debounce window, in milliseconds.
    #[arg(short, long, default_value_t = 200)]
    debounce_ms: u32,

    /// Stop on its own after this many seconds.
    #[arg(long)]
    duration_secs: Option<u64>,
}

impl Cli {
    fn scanner_config(&self) -> ScannerConfig {
        ScannerConfig::default()
            .with_line_count(self.lines)
            .with_base_period_ms(self.base_period_ms)
            .with_max_level(self.max_level)
            .with_debounce_ms(self.debounce_ms)
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = cli.scanner_config();
    config.validate().context("invalid scanner options")?;

    let (button, edges) = ChannelEdgeInput::channel();
    let mut scanner = Scanner::start(
        config.clone(),
        TerminalLines::stdout(config.line_count),
        button,
        Arc::new(StdClock::new()),
    )
    .context("failed to start scanner")?;

    if let Some(e) = scanner.degraded() {
        tracing::warn!(error = %e, "button unavailable, sweeping at base speed");
    }

    let quit = spawn_stdin_reader(edges)?;
    wait_for_quit(&quit, cli.duration_secs.map(Duration::from_secs));

    let report = scanner.stop().context("failed to stop scanner")?;
    println!();
    if let StopReport::Stopped { ticks } = report {
        let snapshot = scanner.rate().snapshot();
        tracing::info!(ticks, level = snapshot.level, "scanner stopped");
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .try_init();
}

/// Turns each line on stdin into a button edge. The returned channel fires
/// (or disconnects) when the user asks to quit.
fn spawn_stdin_reader(edges: EdgeSender) -> anyhow::Result<Receiver<()>> {
    let (quit_tx, quit_rx) = crossbeam_channel::bounded(1);
    thread::Builder::new()
        .name("cylon-stdin".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().eq_ignore_ascii_case("q") {
                    break;
                }
                if !edges.press() {
                    break;
                }
            }
            let _ = quit_tx.send(());
        })
        .context("failed to spawn stdin reader")?;
    Ok(quit_rx)
}

fn wait_for_quit(quit: &Receiver<()>, limit: Option<Duration>) {
    match limit {
        Some(limit) => match quit.recv_timeout(limit) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
            Err(RecvTimeoutError::Timeout) => tracing::info!(?limit, "run time elapsed"),
        },
        None => {
            let _ = quit.recv();
        }
    }
}
