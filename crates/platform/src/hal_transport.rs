//! [`Transport`] over embedded-hal 1.0 traits.
//!
//! The bench drives every chip select by hand (the MCP23S17 fan-out means
//! most selects are not controller GPIOs at all), so the adapter takes a
//! raw [`SpiBus`] rather than an `SpiDevice`: the bus never touches CS.
//!
//! Control lines are registered by [`PinId`] in a fixed-capacity table.
//! On the controller `P` is typically an `embedded_hal::digital` flex pin
//! type that implements both [`OutputPin`] and [`InputPin`], so that
//! bring-up can read back what it drove.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiBus;
use heapless::Vec;

use crate::config::CONTROL_LINE_COUNT;
use crate::error::{BenchError, ConfigError};
use crate::transport::{Level, PinId, Transport};

/// Transport over an embedded-hal SPI bus, a set of GPIO lines and a delay.
///
/// `N` is the line table capacity; it defaults to the bench's six control
/// lines.
pub struct HalTransport<SPI, P, D, const N: usize = CONTROL_LINE_COUNT> {
    spi: SPI,
    lines: Vec<(PinId, P), N>,
    delay: D,
}

impl<SPI, P, D, const N: usize> HalTransport<SPI, P, D, N>
where
    SPI: SpiBus<u8>,
    P: OutputPin + InputPin,
    D: DelayNs,
{
    /// Create a transport with an empty line table.
    pub fn new(spi: SPI, delay: D) -> Self {
        Self {
            spi,
            lines: Vec::new(),
            delay,
        }
    }

    /// Register `pin` as line `id`.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::DuplicatePin`] if `id` is already registered
    /// - [`ConfigError::LineTableFull`] if `N` lines are already registered
    pub fn with_line(mut self, id: PinId, pin: P) -> Result<Self, ConfigError> {
        if self.lines.iter().any(|(known, _)| *known == id) {
            return Err(ConfigError::DuplicatePin(id));
        }
        self.lines
            .push((id, pin))
            .map_err(|_| ConfigError::LineTableFull)?;
        Ok(self)
    }

    /// Number of registered lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Give back the bus, the line table and the delay.
    pub fn release(self) -> (SPI, Vec<(PinId, P), N>, D) {
        (self.spi, self.lines, self.delay)
    }

    fn line(&mut self, id: PinId) -> Result<&mut P, BenchError> {
        self.lines
            .iter_mut()
            .find(|(known, _)| *known == id)
            .map(|(_, pin)| pin)
            .ok_or(BenchError::Line(id))
    }
}

impl<SPI, P, D, const N: usize> DelayNs for HalTransport<SPI, P, D, N>
where
    D: DelayNs,
{
    fn delay_ns(&mut self, ns: u32) {
        self.delay.delay_ns(ns);
    }

    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}

impl<SPI, P, D, const N: usize> Transport for HalTransport<SPI, P, D, N>
where
    SPI: SpiBus<u8>,
    P: OutputPin + InputPin,
    D: DelayNs,
{
    fn exchange(&mut self, buffer: &mut [u8]) -> Result<(), BenchError> {
        self.spi
            .transfer_in_place(buffer)
            .map_err(|_| BenchError::Transport)?;
        // Flush so the last byte is clocked in before the caller releases CS.
        self.spi.flush().map_err(|_| BenchError::Transport)
    }

    fn set_line(&mut self, pin: PinId, level: Level) -> Result<(), BenchError> {
        let line = self.line(pin)?;
        let driven = match level {
            Level::High => line.set_high(),
            Level::Low => line.set_low(),
        };
        driven.map_err(|_| BenchError::Line(pin))
    }

    fn read_line(&mut self, pin: PinId) -> Result<Level, BenchError> {
        let line = self.line(pin)?;
        line.is_high()
            .map(Level::from)
            .map_err(|_| BenchError::Line(pin))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };
    use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};

    use crate::transport::with_selected;

    type TestTransport = HalTransport<SpiMock<u8>, PinMock, NoopDelay>;

    /// Pin with no expectations, already checked so it can be dropped
    /// inside a rejected registration.
    fn idle_pin() -> PinMock {
        let mut pin = PinMock::new(&[]);
        pin.done();
        pin
    }

    #[test]
    fn exchange_transfers_in_place_then_flushes() {
        let mut spi = SpiMock::new(&[
            SpiTransaction::transfer_in_place(vec![0x43, 0x14, 0x00], vec![0x00, 0x00, 0xF7]),
            SpiTransaction::flush(),
        ]);
        let mut bus: TestTransport = HalTransport::new(spi.clone(), NoopDelay);

        let mut frame = [0x43, 0x14, 0x00];
        bus.exchange(&mut frame).unwrap();
        assert_eq!(frame[2], 0xF7, "response byte must overwrite the buffer");

        spi.done();
    }

    #[test]
    fn set_and_read_line_reach_the_registered_pin() {
        let mut cs = PinMock::new(&[
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
            PinTransaction::get(PinState::High),
        ]);
        let mut spi = SpiMock::new(&[]);
        let mut bus: TestTransport = HalTransport::new(spi.clone(), NoopDelay)
            .with_line(PinId(21), cs.clone())
            .unwrap();

        bus.set_line(PinId(21), Level::Low).unwrap();
        bus.set_line(PinId(21), Level::High).unwrap();
        assert_eq!(bus.read_line(PinId(21)).unwrap(), Level::High);

        spi.done();
        cs.done();
    }

    #[test]
    fn unknown_line_is_a_line_error() {
        let mut spi = SpiMock::new(&[]);
        let mut bus: TestTransport = HalTransport::new(spi.clone(), NoopDelay);
        assert_eq!(
            bus.set_line(PinId(7), Level::High),
            Err(BenchError::Line(PinId(7)))
        );
        assert_eq!(bus.read_line(PinId(7)), Err(BenchError::Line(PinId(7))));
        spi.done();
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut spi = SpiMock::new(&[]);
        let result = TestTransport::new(spi.clone(), NoopDelay)
            .with_line(PinId(23), idle_pin())
            .unwrap()
            .with_line(PinId(23), idle_pin());
        assert!(matches!(result, Err(ConfigError::DuplicatePin(PinId(23)))));
        spi.done();
    }

    #[test]
    fn line_table_capacity_is_enforced() {
        let mut spi = SpiMock::new(&[]);
        let bus = HalTransport::<_, _, _, 2>::new(spi.clone(), NoopDelay)
            .with_line(PinId(1), idle_pin())
            .unwrap()
            .with_line(PinId(2), idle_pin())
            .unwrap();
        assert_eq!(bus.line_count(), 2);
        let result = bus.with_line(PinId(3), idle_pin());
        assert!(matches!(result, Err(ConfigError::LineTableFull)));
        spi.done();
    }

    #[test]
    fn selected_exchange_frames_cs_around_transfer() {
        let mut cs = PinMock::new(&[
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ]);
        let mut spi = SpiMock::new(&[
            SpiTransaction::transfer_in_place(vec![0x0B, 0xFF], vec![0x00, 0x00]),
            SpiTransaction::flush(),
        ]);
        let mut bus: TestTransport = HalTransport::new(spi.clone(), NoopDelay)
            .with_line(PinId(24), cs.clone())
            .unwrap();

        with_selected(&mut bus, &[PinId(24)], |bus| bus.exchange(&mut [0x0B, 0xFF])).unwrap();

        spi.done();
        cs.done();
    }
}
