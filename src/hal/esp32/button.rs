//! Push button on a GPIO with a rising-edge interrupt.
//!
//! The interrupt handler only posts a task notification. A dispatcher thread
//! waits on it, applies the debounce window, runs the edge callback and
//! re-arms the interrupt, so the callback never runs in ISR context.
//!
//! # Wiring
//!
//! - Button between the GPIO and 3.3V
//! - Internal pull-down holds the line low when released

use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use esp_idf_hal::delay::TickType;
use esp_idf_hal::gpio::{AnyIOPin, Input, InterruptType, PinDriver, Pull};
use esp_idf_hal::sys::{EspError, TickType_t};
use esp_idf_hal::task::notification::{Notification, Notifier};
use tracing::{debug, trace, warn};

use super::Esp32Clock;
use crate::traits::{Clock, EdgeCallback, EdgeInput};

/// Name of the thread that delivers button edges.
pub const DISPATCH_THREAD_NAME: &str = "cylon-button";

/// How often the dispatcher wakes without an edge to check for a stop.
const POLL_MS: u64 = 100;

const DISPATCH_STACK_SIZE: usize = 4096;

type ButtonDriver = PinDriver<'static, AnyIOPin, Input>;

/// Error returned by [`Esp32Button`].
#[derive(Debug, thiserror::Error)]
pub enum Esp32ButtonError {
    /// Operation on a line other than the button's.
    #[error("input line {0} is not the button line")]
    WrongIndex(usize),
    /// Line used before being configured.
    #[error("button line is not configured")]
    NotConfigured,
    /// Line configured twice without a release in between.
    #[error("button line is already configured")]
    AlreadyConfigured,
    /// The driver is on the dispatcher thread while a callback is installed.
    #[error("button line is owned by the edge dispatcher")]
    Subscribed,
    /// The dispatcher thread could not be started.
    #[error("failed to spawn edge dispatcher: {0}")]
    Spawn(#[from] std::io::Error),
    /// The dispatcher thread exited without returning the driver.
    #[error("edge dispatcher exited without returning the button line")]
    DispatcherLost,
    /// The GPIO driver refused the operation.
    #[error("gpio error: {0}")]
    Esp(#[from] EspError),
}

/// Handle for a running dispatcher, returned by
/// [`on_rising_edge`](EdgeInput::on_rising_edge).
pub struct ButtonSubscription {
    stop: Arc<AtomicBool>,
    notifier: Arc<Notifier>,
    thread: JoinHandle<ButtonDriver>,
}

/// The speed button.
///
/// # Example
///
/// ```ignore
/// use rs_cylon::hal::esp32::Esp32Button;
/// use rs_cylon::traits::{EdgeAck, EdgeInput};
///
/// let mut button = Esp32Button::new(0, 27);
/// button.configure_input(0, 200)?;
/// let sub = button.on_rising_edge(0, Box::new(|| EdgeAck::Handled))?;
/// ```
pub struct Esp32Button {
    index: usize,
    gpio: u32,
    debounce_ms: u32,
    driver: Option<ButtonDriver>,
    subscribed: bool,
}

impl Esp32Button {
    /// Creates the button for line `index` on GPIO `gpio`. Nothing is
    /// claimed until [`configure_input`](EdgeInput::configure_input).
    pub fn new(index: usize, gpio: u32) -> Self {
        Self {
            index,
            gpio,
            debounce_ms: 0,
            driver: None,
            subscribed: false,
        }
    }

    fn check_index(&self, index: usize) -> Result<(), Esp32ButtonError> {
        if index != self.index {
            return Err(Esp32ButtonError::WrongIndex(index));
        }
        Ok(())
    }

    fn take_driver(&mut self) -> Result<ButtonDriver, Esp32ButtonError> {
        if self.subscribed {
            return Err(Esp32ButtonError::Subscribed);
        }
        self.driver.take().ok_or(Esp32ButtonError::NotConfigured)
    }
}

impl EdgeInput for Esp32Button {
    type Error = Esp32ButtonError;
    type Subscription = ButtonSubscription;

    fn configure_input(&mut self, index: usize, debounce_ms: u32) -> Result<(), Esp32ButtonError> {
        self.check_index(index)?;
        if self.driver.is_some() || self.subscribed {
            return Err(Esp32ButtonError::AlreadyConfigured);
        }
        // SAFETY: the button holds at most one driver for its GPIO, and
        // `Config::validate` keeps that GPIO out of the LED pin map.
        let pin = unsafe { AnyIOPin::new(self.gpio as i32) };
        let mut driver = PinDriver::input(pin)?;
        driver.set_pull(Pull::Down)?;
        driver.set_interrupt_type(InterruptType::PosEdge)?;
        self.driver = Some(driver);
        self.debounce_ms = debounce_ms;
        Ok(())
    }

    fn read(&self, index: usize) -> Result<bool, Esp32ButtonError> {
        self.check_index(index)?;
        if self.subscribed {
            return Err(Esp32ButtonError::Subscribed);
        }
        let driver = self.driver.as_ref().ok_or(Esp32ButtonError::NotConfigured)?;
        Ok(driver.is_high())
    }

    fn on_rising_edge(
        &mut self,
        index: usize,
        callback: EdgeCallback,
    ) -> Result<ButtonSubscription, Esp32ButtonError> {
        self.check_index(index)?;
        let driver = self.take_driver()?;
        let stop = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let debounce_ms = u64::from(self.debounce_ms);

        let thread_stop = Arc::clone(&stop);
        let thread = thread::Builder::new()
            .name(DISPATCH_THREAD_NAME.into())
            .stack_size(DISPATCH_STACK_SIZE)
            .spawn(move || dispatch(driver, callback, debounce_ms, thread_stop, ready_tx))?;

        // The notifier is bound to the dispatcher's task, so it is created
        // there and sent back once the interrupt is armed.
        match ready_rx.recv() {
            Ok(Ok(notifier)) => {
                self.subscribed = true;
                debug!(gpio = self.gpio, debounce_ms, "button interrupt armed");
                Ok(ButtonSubscription {
                    stop,
                    notifier,
                    thread,
                })
            }
            Ok(Err(e)) => {
                self.driver = thread.join().ok();
                Err(Esp32ButtonError::Esp(e))
            }
            Err(_) => {
                self.driver = thread.join().ok();
                Err(Esp32ButtonError::DispatcherLost)
            }
        }
    }

    fn remove_edge(&mut self, subscription: ButtonSubscription) -> Result<(), Esp32ButtonError> {
        let ButtonSubscription {
            stop,
            notifier,
            thread,
        } = subscription;
        stop.store(true, Ordering::Release);
        // Wakes the dispatcher early; otherwise it sees the flag on its
        // next poll.
        unsafe { notifier.notify_and_yield(NonZeroU32::MIN) };
        self.subscribed = false;
        let driver = thread
            .join()
            .map_err(|_| Esp32ButtonError::DispatcherLost)?;
        self.driver = Some(driver);
        debug!(gpio = self.gpio, "button interrupt removed");
        Ok(())
    }

    fn release(&mut self, index: usize) -> Result<(), Esp32ButtonError> {
        self.check_index(index)?;
        if self.subscribed {
            return Err(Esp32ButtonError::Subscribed);
        }
        self.driver.take();
        Ok(())
    }
}

/// Dispatcher thread body. Hands the driver back once stopped.
fn dispatch(
    mut driver: ButtonDriver,
    mut callback: EdgeCallback,
    debounce_ms: u64,
    stop: Arc<AtomicBool>,
    ready: crossbeam_channel::Sender<Result<Arc<Notifier>, EspError>>,
) -> ButtonDriver {
    let notification = Notification::new();
    let notifier = notification.notifier();

    let isr_notifier = Arc::clone(&notifier);
    let armed = unsafe {
        driver.subscribe(move || {
            isr_notifier.notify_and_yield(NonZeroU32::MIN);
        })
    }
    .and_then(|()| driver.enable_interrupt());

    if let Err(e) = armed {
        let _ = driver.unsubscribe();
        let _ = ready.send(Err(e));
        return driver;
    }
    if ready.send(Ok(notifier)).is_err() {
        let _ = driver.unsubscribe();
        return driver;
    }

    let clock = Esp32Clock::new();
    let timeout: TickType_t = TickType::new_millis(POLL_MS).into();
    let mut last_accepted: Option<u64> = None;

    while !stop.load(Ordering::Acquire) {
        if notification.wait(timeout).is_none() {
            continue;
        }
        if stop.load(Ordering::Acquire) {
            break;
        }

        let now = clock.now_ms();
        let bounced = last_accepted.is_some_and(|last| now.saturating_sub(last) < debounce_ms);
        if bounced {
            trace!(now_ms = now, "button edge debounced");
        } else {
            last_accepted = Some(now);
            let _ = callback();
        }

        // The interrupt disables itself after firing.
        if let Err(e) = driver.enable_interrupt() {
            warn!(error = ?e, "failed to re-arm button interrupt");
        }
    }

    let _ = driver.disable_interrupt();
    if let Err(e) = driver.unsubscribe() {
        warn!(error = ?e, "failed to remove button interrupt");
    }
    driver
}
