//! AD8802 12-channel DAC.
//!
//! Both chips share the channel nibbles and differ only by CS. A write is
//! one two-byte frame, `[channel nibble, code]`, framed by the chip's CS.

use bench_platform::ad8802::{frame, output_code};
use bench_platform::{
    with_selected, BenchError, DacChannel, DacChip, DacConfig, OutputVoltage, Transport,
};
use tracing::{debug, trace};

/// Frame that sets `channel` to `voltage`.
pub fn encode(channel: DacChannel, voltage: OutputVoltage) -> [u8; 2] {
    frame(channel, output_code(voltage))
}

/// Protocol driver for the bench's two AD8802 chips.
#[derive(Debug, Clone, Copy)]
pub struct Ad8802 {
    config: DacConfig,
}

impl Ad8802 {
    /// Create the protocol for the given wiring.
    pub const fn new(config: DacConfig) -> Self {
        Self { config }
    }

    /// Drive every channel of both chips to 0 V.
    pub fn initialize<T>(&self, bus: &mut T) -> Result<(), BenchError>
    where
        T: Transport + ?Sized,
    {
        debug!("dac: zero all channels");
        for chip in DacChip::ALL {
            for channel in DacChannel::ALL {
                self.apply(bus, chip, channel, OutputVoltage::ZERO)?;
            }
        }
        Ok(())
    }

    /// Set `channel` of `chip` to `volts`.
    ///
    /// # Errors
    ///
    /// [`BenchError::OutOfRange`] for negative, NaN or above-full-scale
    /// requests; nothing is sent in that case.
    pub fn apply_voltage<T>(
        &self,
        bus: &mut T,
        channel: DacChannel,
        volts: f64,
        chip: DacChip,
    ) -> Result<(), BenchError>
    where
        T: Transport + ?Sized,
    {
        let voltage = OutputVoltage::try_new(volts)?;
        self.apply(bus, chip, channel, voltage)
    }

    /// Write a raw 8-bit output code.
    pub fn apply_code<T>(
        &self,
        bus: &mut T,
        channel: DacChannel,
        code: u8,
        chip: DacChip,
    ) -> Result<(), BenchError>
    where
        T: Transport + ?Sized,
    {
        self.send(bus, chip, frame(channel, code))
    }

    fn apply<T>(
        &self,
        bus: &mut T,
        chip: DacChip,
        channel: DacChannel,
        voltage: OutputVoltage,
    ) -> Result<(), BenchError>
    where
        T: Transport + ?Sized,
    {
        self.send(bus, chip, encode(channel, voltage))
    }

    fn send<T>(&self, bus: &mut T, chip: DacChip, mut frame: [u8; 2]) -> Result<(), BenchError>
    where
        T: Transport + ?Sized,
    {
        let [nibble, code] = frame;
        trace!(?chip, nibble, code, "dac: write");
        with_selected(bus, &[self.config.chip_select(chip)], |bus| {
            bus.exchange(&mut frame)
        })
    }
}
