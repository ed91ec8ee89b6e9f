//! Staged bench bring-up.
//!
//! Bring-up order (see [`BRING_UP_ORDER`]):
//!   1. Lines: every control line driven to its idle level and read back
//!   2. Expander fan-out: HAEN, primary outputs, secondary outputs
//!   3. DAC: all 24 outputs to 0 V
//!   4. ADC: CNV low, CS high
//!
//! A failing line aborts the boards stage; with a CS stuck low every frame
//! would reach the wrong chip. A failing board is logged and the remaining
//! boards still run, so one dead board does not hide the state of the others.

use bench_platform::{
    BenchConfig, BenchError, DacChannel, DacChip, ExpanderAddress, Quantity, RawSample, Reading,
    Transport,
};
use tracing::{error, info};

use crate::adc::Ltc2380;
use crate::dac::Ad8802;
use crate::expander::FanOut;

/// One step of bring-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Control lines parked at idle and verified.
    Lines,
    /// Expander fan-out initialized.
    Expander,
    /// Both DACs zeroed.
    Dac,
    /// ADC parked.
    Adc,
}

/// Steps in the order [`Bench::bring_up`] runs them.
///
/// # Invariants
///
/// - `Lines` comes first: board initialization relies on idle chip selects.
/// - `Expander` precedes `Dac`/`Adc`: until HAEN is set and the primary
///   latches are high, secondaries may still be selected and would listen
///   to DAC and ADC frames.
pub const BRING_UP_ORDER: [Step; 4] = [Step::Lines, Step::Expander, Step::Dac, Step::Adc];

/// What happened to one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// Completed.
    Ready,
    /// Ran and failed.
    Failed(BenchError),
    /// Not attempted because an earlier stage failed.
    Skipped,
}

/// Per-step result of [`Bench::bring_up`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BringUpReport {
    outcomes: [StepOutcome; BRING_UP_ORDER.len()],
}

impl BringUpReport {
    fn new() -> Self {
        Self {
            outcomes: [StepOutcome::Skipped; BRING_UP_ORDER.len()],
        }
    }

    fn record(&mut self, step: Step, outcome: StepOutcome) {
        if let Some((_, slot)) = BRING_UP_ORDER
            .iter()
            .zip(self.outcomes.iter_mut())
            .find(|(s, _)| **s == step)
        {
            *slot = outcome;
        }
    }

    /// True only if every step completed.
    pub fn is_ready(&self) -> bool {
        self.outcomes.iter().all(|o| *o == StepOutcome::Ready)
    }

    /// Outcome of `step`.
    pub fn outcome(&self, step: Step) -> StepOutcome {
        BRING_UP_ORDER
            .iter()
            .zip(self.outcomes.iter())
            .find(|(s, _)| **s == step)
            .map_or(StepOutcome::Skipped, |(_, o)| *o)
    }

    /// Steps that ran and failed, in bring-up order.
    pub fn failures(&self) -> impl Iterator<Item = (Step, BenchError)> + '_ {
        BRING_UP_ORDER
            .iter()
            .zip(self.outcomes.iter())
            .filter_map(|(step, outcome)| match outcome {
                StepOutcome::Failed(err) => Some((*step, *err)),
                _ => None,
            })
    }
}

/// The bench: owns the bus and the three chip protocols.
pub struct Bench<T> {
    bus: T,
    config: BenchConfig,
    fan_out: FanOut,
    dac: Ad8802,
    adc: Ltc2380,
}

impl<T: Transport> Bench<T> {
    /// Wrap `bus` with the wiring in `config`.
    ///
    /// # Errors
    ///
    /// [`BenchError::Config`] if the wiring tables conflict.
    pub fn new(bus: T, config: BenchConfig) -> Result<Self, BenchError> {
        config.validate()?;
        Ok(Self {
            bus,
            config,
            fan_out: FanOut::new(config.expander),
            dac: Ad8802::new(config.dac),
            adc: Ltc2380::new(config.adc),
        })
    }

    /// Wiring in use.
    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Run every bring-up step and report each outcome.
    pub fn bring_up(&mut self) -> BringUpReport {
        let mut report = BringUpReport::new();

        info!("bring-up: lines");
        match self.park_lines() {
            Ok(()) => report.record(Step::Lines, StepOutcome::Ready),
            Err(err) => {
                error!(%err, "bring-up: control lines failed, boards skipped");
                report.record(Step::Lines, StepOutcome::Failed(err));
                return report;
            }
        }

        for step in [Step::Expander, Step::Dac, Step::Adc] {
            info!(?step, "bring-up: board");
            let result = match step {
                Step::Expander => self.fan_out.initialize(&mut self.bus),
                Step::Dac => self.dac.initialize(&mut self.bus),
                Step::Adc => self.adc.initialize(&mut self.bus),
                Step::Lines => Ok(()),
            };
            let outcome = match result {
                Ok(()) => StepOutcome::Ready,
                Err(err) => {
                    error!(?step, %err, "bring-up: board failed");
                    StepOutcome::Failed(err)
                }
            };
            report.record(step, outcome);
        }

        if report.is_ready() {
            info!("bring-up: complete");
        }
        report
    }

    /// Drive every control line to its idle level and read it back.
    ///
    /// # Errors
    ///
    /// - [`BenchError::Line`] if a line cannot be driven or sampled
    /// - [`BenchError::Initialization`] if a line reads back the wrong level
    pub fn park_lines(&mut self) -> Result<(), BenchError> {
        for (pin, level) in self.config.idle_lines() {
            self.bus.set_line(pin, level)?;
        }
        for (pin, level) in self.config.idle_lines() {
            if self.bus.read_line(pin)? != level {
                return Err(BenchError::Initialization(pin));
            }
        }
        Ok(())
    }

    // ── Operations ──────────────────────────────────────────────────────────

    /// See [`FanOut::enable_pin`].
    pub fn enable_pin(&mut self, address: ExpanderAddress) -> Result<(), BenchError> {
        self.fan_out.enable_pin(&mut self.bus, address)
    }

    /// See [`FanOut::disable_pin`].
    pub fn disable_pin(&mut self, address: ExpanderAddress) -> Result<(), BenchError> {
        self.fan_out.disable_pin(&mut self.bus, address)
    }

    /// See [`Ad8802::apply_voltage`].
    pub fn apply_voltage(
        &mut self,
        channel: DacChannel,
        volts: f64,
        chip: DacChip,
    ) -> Result<(), BenchError> {
        self.dac.apply_voltage(&mut self.bus, channel, volts, chip)
    }

    /// See [`Ad8802::apply_code`].
    pub fn apply_code(
        &mut self,
        channel: DacChannel,
        code: u8,
        chip: DacChip,
    ) -> Result<(), BenchError> {
        self.dac.apply_code(&mut self.bus, channel, code, chip)
    }

    /// See [`Ltc2380::read`].
    pub fn read(&mut self, quantity: Quantity) -> Result<Reading, BenchError> {
        self.adc.read(&mut self.bus, quantity)
    }

    /// See [`Ltc2380::read_raw`].
    pub fn read_raw(&mut self) -> Result<RawSample, BenchError> {
        self.adc.read_raw(&mut self.bus)
    }

    // ── Access ──────────────────────────────────────────────────────────────

    /// Fan-out protocol, for operations not forwarded here.
    pub fn fan_out(&self) -> &FanOut {
        &self.fan_out
    }

    /// Shared access to the bus.
    pub fn transport(&self) -> &T {
        &self.bus
    }

    /// Exclusive access to the bus.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.bus
    }

    /// Give the bus back.
    pub fn into_transport(self) -> T {
        self.bus
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    use bench_platform::{ConfigError, Level, PinId};
    use bench_testing::SimulatedBench;

    fn bench() -> Bench<SimulatedBench> {
        Bench::new(SimulatedBench::new(BenchConfig::DEFAULT), BenchConfig::DEFAULT).unwrap()
    }

    #[test]
    fn order_starts_with_lines_then_expander() {
        assert_eq!(BRING_UP_ORDER[0], Step::Lines);
        assert_eq!(BRING_UP_ORDER[1], Step::Expander);
    }

    #[test]
    fn conflicting_wiring_is_rejected() {
        let mut config = BenchConfig::DEFAULT;
        config.dac.second_cs = config.dac.first_cs;
        let result = Bench::new(SimulatedBench::new(BenchConfig::DEFAULT), config);
        assert!(matches!(
            result,
            Err(BenchError::Config(ConfigError::DuplicatePin(PinId(23))))
        ));
    }

    #[test]
    fn healthy_bench_is_ready() {
        let mut bench = bench();
        let report = bench.bring_up();
        assert!(report.is_ready());
        assert_eq!(report.failures().count(), 0);
        bench.transport().assert_lines_idle().unwrap();
    }

    #[test]
    fn stuck_line_skips_boards() {
        let mut bench = bench();
        bench.transport_mut().stuck_line(PinId(22), Level::Low);
        let report = bench.bring_up();

        assert!(!report.is_ready());
        assert_eq!(
            report.outcome(Step::Lines),
            StepOutcome::Failed(BenchError::Initialization(PinId(22)))
        );
        for step in [Step::Expander, Step::Dac, Step::Adc] {
            assert_eq!(report.outcome(step), StepOutcome::Skipped);
        }
        assert_eq!(bench.transport().exchanges().count(), 0);
    }

    #[test]
    fn failing_board_does_not_stop_the_others() {
        let mut bench = bench();
        // The first exchange is the expander's HAEN broadcast.
        bench.transport_mut().fail_exchange(0);
        let report = bench.bring_up();

        assert_eq!(
            report.failures().collect::<Vec<_>>(),
            vec![(Step::Expander, BenchError::Transport)]
        );
        assert_eq!(report.outcome(Step::Dac), StepOutcome::Ready);
        assert_eq!(report.outcome(Step::Adc), StepOutcome::Ready);
    }

    #[test]
    fn operations_reach_the_bus() {
        let mut bench = bench();
        assert!(bench.bring_up().is_ready());

        let address = ExpanderAddress::new(0, 3, 3, 2).unwrap();
        bench.enable_pin(address).unwrap();
        bench
            .apply_voltage(DacChannel::Out7, 5.0, DacChip::First)
            .unwrap();
        bench.transport_mut().set_adc_input(RawSample::new(42), 1);
        let raw = bench.read_raw().unwrap();

        let sim = bench.into_transport();
        assert_eq!(sim.secondary_latch(3), Some(0x0004));
        assert_eq!(sim.dac_output(DacChip::First, DacChannel::Out7), 255);
        assert_eq!(raw.get(), 42);
    }
}
