//! Bus transport contract and chip-select framing.
//!
//! The bench has one SPI channel and a handful of GPIO control lines. The
//! transport knows nothing about addressing: whichever device has its CS
//! held low while [`Transport::exchange`] runs is the device that listens.
//! Protocols therefore own the CS discipline, and [`with_selected`] is the
//! one place where a line is asserted around an exchange.

use core::fmt;

use embedded_hal::delay::DelayNs;

use crate::error::BenchError;

/// Physical line number on the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[repr(transparent)]
pub struct PinId(pub u8);

impl PinId {
    /// Return the raw line number.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GPIO{}", self.0)
    }
}

/// Logic level of a GPIO line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    /// High (logic 1). Chip selects are idle high.
    High,
    /// Low (logic 0). Chip selects are asserted low.
    Low,
}

impl From<bool> for Level {
    fn from(value: bool) -> Self {
        if value {
            Self::High
        } else {
            Self::Low
        }
    }
}

impl From<Level> for bool {
    fn from(value: Level) -> Self {
        matches!(value, Level::High)
    }
}

/// Blocking access to the shared SPI channel and its control lines.
///
/// One transaction at a time, no queuing. The [`DelayNs`] supertrait is the
/// monotonic delay used for settle times and conversion pulses; on hardware
/// it must be a real timer, not a cycle-count estimate.
pub trait Transport: DelayNs {
    /// Full-duplex exchange: `buffer` is clocked out and overwritten with
    /// the bytes clocked in.
    fn exchange(&mut self, buffer: &mut [u8]) -> Result<(), BenchError>;

    /// Drive a GPIO line.
    fn set_line(&mut self, pin: PinId, level: Level) -> Result<(), BenchError>;

    /// Sample a GPIO line.
    fn read_line(&mut self, pin: PinId) -> Result<Level, BenchError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn exchange(&mut self, buffer: &mut [u8]) -> Result<(), BenchError> {
        (**self).exchange(buffer)
    }

    fn set_line(&mut self, pin: PinId, level: Level) -> Result<(), BenchError> {
        (**self).set_line(pin, level)
    }

    fn read_line(&mut self, pin: PinId) -> Result<Level, BenchError> {
        (**self).read_line(pin)
    }
}

/// Assert every line in `lines`, run `f`, then drive every line back high.
///
/// The release runs on every path, including when `f` or one of the
/// assertions fails; a CS left low would make its device swallow the next
/// unrelated transaction on the bus. The first error wins.
pub fn with_selected<T, R, F>(bus: &mut T, lines: &[PinId], f: F) -> Result<R, BenchError>
where
    T: Transport + ?Sized,
    F: FnOnce(&mut T) -> Result<R, BenchError>,
{
    let mut touched = lines.len();
    let mut asserted = Ok(());
    for (idx, &pin) in lines.iter().enumerate() {
        if let Err(err) = bus.set_line(pin, Level::Low) {
            touched = idx.saturating_add(1);
            asserted = Err(err);
            break;
        }
    }

    let outcome = asserted.and_then(|()| f(bus));

    let mut released = Ok(());
    for &pin in lines.iter().take(touched) {
        if let Err(err) = bus.set_line(pin, Level::High) {
            released = released.and(Err(err));
        }
    }

    let value = outcome?;
    released?;
    Ok(value)
}
