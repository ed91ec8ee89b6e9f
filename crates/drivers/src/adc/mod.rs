//! LTC2380-24 ADC.
//!
//! Every read runs one full conversion cycle (see [`cycle`]) and decodes
//! the 5-byte frame: a 24-bit two's-complement result followed by the
//! number of samples the converter averaged.

pub mod cycle;

use bench_platform::ltc2380::{self, FRAME_LEN};
use bench_platform::{AdcConfig, BenchError, Level, Quantity, RawSample, Reading, Transport};
use tracing::{debug, trace, warn};

use self::cycle::Cycle;

/// Sign-extended result held in the first three bytes of a read frame.
pub fn decode_frame(frame: &[u8; FRAME_LEN]) -> RawSample {
    ltc2380::decode_frame(frame).0
}

/// Protocol driver for the bench ADC.
#[derive(Debug, Clone, Copy)]
pub struct Ltc2380 {
    config: AdcConfig,
}

impl Ltc2380 {
    /// Create the protocol for the given wiring.
    pub const fn new(config: AdcConfig) -> Self {
        Self { config }
    }

    /// Park CNV low and CS high so the next cycle starts idle.
    pub fn initialize<T>(&self, bus: &mut T) -> Result<(), BenchError>
    where
        T: Transport + ?Sized,
    {
        debug!("adc: park control lines");
        bus.set_line(self.config.cnv, Level::Low)?;
        bus.set_line(self.config.cs, Level::High)
    }

    /// Convert once and scale the result.
    pub fn read<T>(&self, bus: &mut T, quantity: Quantity) -> Result<Reading, BenchError>
    where
        T: Transport + ?Sized,
    {
        let (raw, averaged) = self.convert(bus)?;
        let reading = Reading {
            quantity,
            raw,
            averaged,
            value: raw.scale(quantity),
        };
        debug!(?quantity, raw = raw.get(), value = reading.value, "adc: read");
        Ok(reading)
    }

    /// Convert once and return the unscaled result.
    pub fn read_raw<T>(&self, bus: &mut T) -> Result<RawSample, BenchError>
    where
        T: Transport + ?Sized,
    {
        self.convert(bus).map(|(raw, _)| raw)
    }

    /// One cycle. On failure CNV gets one best-effort drive low so the
    /// next cycle still sees a rising edge.
    fn convert<T>(&self, bus: &mut T) -> Result<(RawSample, u16), BenchError>
    where
        T: Transport + ?Sized,
    {
        let frame = match run_cycle(bus, &self.config) {
            Ok(frame) => frame,
            Err(err) => {
                if let Err(park) = bus.set_line(self.config.cnv, Level::Low) {
                    warn!(%park, "adc: CNV could not be parked after failed cycle");
                }
                return Err(err);
            }
        };
        trace!(?frame, "adc: frame");
        Ok(ltc2380::decode_frame(&frame))
    }
}

fn run_cycle<T>(bus: &mut T, config: &AdcConfig) -> Result<[u8; FRAME_LEN], BenchError>
where
    T: Transport + ?Sized,
{
    Cycle::new(bus, config).trigger()?.start()?.clock()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    use bench_platform::{BenchConfig, PinId};
    use bench_testing::{Event, SimulatedBench};

    const CFG: AdcConfig = BenchConfig::DEFAULT.adc;

    #[test]
    fn decode_extremes() {
        assert_eq!(decode_frame(&[0x7F, 0xFF, 0xFF, 0, 0]).get(), 8_388_607);
        assert_eq!(decode_frame(&[0x80, 0x00, 0x00, 0, 0]).get(), -8_388_608);
    }

    #[test]
    fn read_follows_conversion_cycle() {
        let mut bench = SimulatedBench::new(BenchConfig::DEFAULT);
        bench.set_adc_input(RawSample::new(1234), 1);
        Ltc2380::new(CFG).read_raw(&mut bench).unwrap();

        let cnv = PinId(29);
        let cs = PinId(25);
        assert_eq!(
            bench.trace(),
            &[
                Event::Line { pin: cnv, level: Level::High },
                Event::Delay { ns: 30 },
                Event::Line { pin: cnv, level: Level::Low },
                Event::Line { pin: cs, level: Level::Low },
                Event::Exchange {
                    tx: vec![0; 5],
                    rx: vec![0x00, 0x04, 0xD2, 0x00, 0x01],
                },
                Event::Line { pin: cs, level: Level::High },
            ]
        );
    }

    #[test]
    fn voltage_and_current_scale_the_same_sample() {
        let mut bench = SimulatedBench::new(BenchConfig::DEFAULT);
        let adc = Ltc2380::new(CFG);
        bench.set_adc_input(RawSample::new(-7995), 4);

        let volts = adc.read(&mut bench, Quantity::Voltage).unwrap();
        let amps = adc.read(&mut bench, Quantity::Current).unwrap();

        assert_eq!(volts.raw, amps.raw);
        assert_eq!(volts.averaged, 4);
        assert!((volts.value - (-7995.0 * 20.0 * 1.023)).abs() < 1e-6);
        assert!((amps.value + 10_000.0).abs() < 1e-6);
    }

    #[test]
    fn failed_exchange_releases_cs_and_reports_transport() {
        let mut bench = SimulatedBench::new(BenchConfig::DEFAULT);
        bench.fail_exchange(0);
        let err = Ltc2380::new(CFG).read(&mut bench, Quantity::Voltage).unwrap_err();
        assert_eq!(err, BenchError::Transport);
        bench.assert_lines_idle().unwrap();
    }

    #[test]
    fn failed_cnv_release_is_retried_so_next_read_converts() {
        let mut bench = SimulatedBench::new(BenchConfig::DEFAULT);
        let adc = Ltc2380::new(CFG);
        // Drive 0 raises CNV, drive 1 (the drop) fails.
        bench.fail_line_drive(PinId(29), 1);

        let err = adc.read_raw(&mut bench).unwrap_err();
        assert_eq!(err, BenchError::Line(PinId(29)));
        assert_eq!(bench.line(PinId(29)), Some(Level::Low));
        bench.assert_lines_idle().unwrap();

        bench.set_adc_input(RawSample::new(-5), 1);
        assert_eq!(adc.read_raw(&mut bench).unwrap().get(), -5);
        assert_eq!(bench.adc().conversions(), 2);
    }

    #[test]
    fn initialize_parks_lines_idle() {
        let mut bench = SimulatedBench::new(BenchConfig::DEFAULT);
        bench.set_line(PinId(25), Level::Low).unwrap();
        bench.set_line(PinId(29), Level::High).unwrap();
        Ltc2380::new(CFG).initialize(&mut bench).unwrap();
        bench.assert_lines_idle().unwrap();
    }
}
