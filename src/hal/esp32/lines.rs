//! LED output lines on plain GPIO pins.
//!
//! Each line is one GPIO driven push-pull, high for on. Pins are claimed in
//! [`configure_output`](OutputLines::configure_output) and handed back to the
//! platform when the driver is dropped in
//! [`release`](OutputLines::release).

use esp_idf_hal::gpio::{AnyOutputPin, Output, PinDriver};
use esp_idf_hal::sys::EspError;

use crate::config::PinMap;
use crate::traits::OutputLines;

/// Error returned by [`Esp32Lines`].
#[derive(Debug, thiserror::Error)]
pub enum Esp32LineError {
    /// Index past the end of the pin map.
    #[error("line {0} has no pin assigned")]
    InvalidIndex(usize),
    /// Line used before being configured.
    #[error("line {0} is not configured as an output")]
    NotConfigured(usize),
    /// Line configured twice without a release in between.
    #[error("line {0} is already configured")]
    AlreadyConfigured(usize),
    /// Another configured line already drives this GPIO.
    #[error("gpio {0} is already driven by another line")]
    PinInUse(u32),
    /// The GPIO driver refused the operation.
    #[error("gpio error: {0}")]
    Esp(#[from] EspError),
}

/// A row of LEDs, one per GPIO in the pin map.
///
/// # Example
///
/// ```ignore
/// use rs_cylon::config::PinConfig;
/// use rs_cylon::hal::esp32::Esp32Lines;
/// use rs_cylon::traits::OutputLines;
///
/// let pins = PinConfig::default();
/// let mut lines = Esp32Lines::new(&pins.output_pins);
/// lines.configure_output(0)?;
/// lines.set(0, true)?;
/// ```
pub struct Esp32Lines {
    pins: PinMap,
    drivers: Vec<Option<PinDriver<'static, AnyOutputPin, Output>>>,
}

impl Esp32Lines {
    /// Creates lines for the given GPIO numbers. Nothing is claimed yet.
    pub fn new(pins: &PinMap) -> Self {
        let mut drivers = Vec::with_capacity(pins.len());
        drivers.resize_with(pins.len(), || None);
        Self {
            pins: pins.clone(),
            drivers,
        }
    }

    fn driver(
        &mut self,
        index: usize,
    ) -> Result<&mut PinDriver<'static, AnyOutputPin, Output>, Esp32LineError> {
        self.drivers
            .get_mut(index)
            .ok_or(Esp32LineError::InvalidIndex(index))?
            .as_mut()
            .ok_or(Esp32LineError::NotConfigured(index))
    }
}

impl OutputLines for Esp32Lines {
    type Error = Esp32LineError;

    fn line_count(&self) -> usize {
        self.pins.len()
    }

    fn configure_output(&mut self, index: usize) -> Result<(), Esp32LineError> {
        let gpio = *self
            .pins
            .get(index)
            .ok_or(Esp32LineError::InvalidIndex(index))?;

        if self.drivers[index].is_some() {
            return Err(Esp32LineError::AlreadyConfigured(index));
        }
        let in_use = self
            .pins
            .iter()
            .zip(&self.drivers)
            .any(|(p, d)| *p == gpio && d.is_some());
        if in_use {
            return Err(Esp32LineError::PinInUse(gpio));
        }

        // SAFETY: at most one live driver exists per GPIO in this row; the
        // checks above refuse a second claim until the first is released.
        let pin = unsafe { AnyOutputPin::new(gpio as i32) };
        let mut driver = PinDriver::output(pin)?;
        driver.set_low()?;
        self.drivers[index] = Some(driver);
        Ok(())
    }

    fn set(&mut self, index: usize, on: bool) -> Result<(), Esp32LineError> {
        let driver = self.driver(index)?;
        if on {
            driver.set_high()?;
        } else {
            driver.set_low()?;
        }
        Ok(())
    }

    fn release(&mut self, index: usize) -> Result<(), Esp32LineError> {
        let slot = self
            .drivers
            .get_mut(index)
            .ok_or(Esp32LineError::InvalidIndex(index))?;
        // Dropping the driver resets the pin.
        slot.take();
        Ok(())
    }
}
