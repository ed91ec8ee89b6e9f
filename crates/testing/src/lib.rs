//! Simulated SPI peripheral bench.
//!
//! [`SimulatedBench`] implements [`Transport`] by modelling every chip on
//! the bus at register level: two MCP23S17 primaries on physical chip
//! selects, thirty-two secondaries whose chip selects are the primaries'
//! output bits, two AD8802 DACs and one LTC2380-24 ADC. Every line change,
//! exchange and delay is recorded in a trace.
//!
//! # Quick start
//!
//! ```no_run
//! use bench_platform::{BenchConfig, Level, PinId, Transport};
//! use bench_testing::{Event, SimulatedBench};
//!
//! let mut bench = SimulatedBench::new(BenchConfig::DEFAULT);
//! bench.set_line(PinId(23), Level::Low).unwrap();
//! bench.exchange(&mut [0x02, 0x80]).unwrap();
//! bench.set_line(PinId(23), Level::High).unwrap();
//!
//! assert_eq!(bench.exchanges().count(), 1);
//! assert!(matches!(bench.trace()[0], Event::Line { level: Level::Low, .. }));
//! ```
//!
//! # Secondary numbering
//!
//! Secondary `n` hangs off output bit `n % 16` of primary `n / 16`; see
//! [`SimulatedBench::wired_secondary`].
//!
//! # Failure injection
//!
//! - [`SimulatedBench::fail_exchange`]: the nth upcoming exchange fails
//! - [`SimulatedBench::fail_line`]: a line can no longer be driven or read
//! - [`SimulatedBench::fail_line_drive`]: one upcoming drive of a line fails
//! - [`SimulatedBench::stuck_line`]: a line reads back a fixed level

#![warn(clippy::all)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![allow(clippy::module_name_repetitions)]

pub mod chip;

use std::collections::{BTreeMap, BTreeSet};

use bench_platform::mcp23s17::{PRIMARY_ADDRESS, SECONDARY_ADDRESS};
use bench_platform::{
    BenchConfig, BenchError, DacChannel, DacChip, Level, PinId, Primary, RawSample, Transport,
};
use embedded_hal::delay::DelayNs;

pub use chip::{AdcModel, DacModel, ExpanderModel};

/// Secondaries per primary.
pub const SECONDARIES_PER_PRIMARY: usize = 16;
/// Secondaries on the bench.
pub const SECONDARY_COUNT: usize = 32;

// ─────────────────────────────────────────────────────────────────────────────
// Trace
// ─────────────────────────────────────────────────────────────────────────────

/// One recorded bus event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A control line was driven.
    Line {
        /// Line driven.
        pin: PinId,
        /// Level driven.
        level: Level,
    },
    /// A completed exchange.
    Exchange {
        /// Bytes clocked out.
        tx: Vec<u8>,
        /// Bytes clocked in.
        rx: Vec<u8>,
    },
    /// An exchange that the transport rejected; no device saw it.
    ExchangeFailed {
        /// Bytes that would have been clocked out.
        tx: Vec<u8>,
    },
    /// A blocking delay.
    Delay {
        /// Duration in nanoseconds.
        ns: u32,
    },
}

/// Every piece of chip and line state, for whole-bench comparisons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchSnapshot {
    /// Control line levels.
    pub lines: BTreeMap<PinId, Level>,
    /// Primary register files.
    pub primaries: [ExpanderModel; 2],
    /// Secondary register files in wiring order.
    pub secondaries: Vec<ExpanderModel>,
    /// DAC output codes.
    pub dacs: [DacModel; 2],
}

// ─────────────────────────────────────────────────────────────────────────────
// SimulatedBench
// ─────────────────────────────────────────────────────────────────────────────

/// A [`Transport`] backed by chip models instead of hardware.
pub struct SimulatedBench {
    config: BenchConfig,
    lines: BTreeMap<PinId, Level>,
    primaries: [ExpanderModel; 2],
    secondaries: Vec<ExpanderModel>,
    dacs: [DacModel; 2],
    adc: AdcModel,
    trace: Vec<Event>,
    peak_selected: usize,
    exchange_count: usize,
    failing_exchange: Option<usize>,
    failing_lines: BTreeSet<PinId>,
    failing_drives: BTreeMap<PinId, usize>,
    stuck_lines: BTreeMap<PinId, Level>,
}

impl SimulatedBench {
    /// Bench with every chip at power-on and every control line at its
    /// idle level.
    pub fn new(config: BenchConfig) -> Self {
        Self {
            config,
            lines: config.idle_lines().into_iter().collect(),
            primaries: [
                ExpanderModel::power_on(PRIMARY_ADDRESS),
                ExpanderModel::power_on(PRIMARY_ADDRESS),
            ],
            secondaries: (0..SECONDARY_COUNT)
                .map(|_| ExpanderModel::power_on(SECONDARY_ADDRESS))
                .collect(),
            dacs: [DacModel::default(), DacModel::default()],
            adc: AdcModel::default(),
            trace: Vec::new(),
            peak_selected: 0,
            exchange_count: 0,
            failing_exchange: None,
            failing_lines: BTreeSet::new(),
            failing_drives: BTreeMap::new(),
            stuck_lines: BTreeMap::new(),
        }
    }

    /// Wiring the bench was built with.
    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Index of the secondary whose CS is output bit `primary_pin` of `primary`.
    #[allow(clippy::arithmetic_side_effects)] // at most 1 * 16 + 15
    pub fn wired_secondary(primary: Primary, primary_pin: u8) -> usize {
        usize::from(primary.index()) * SECONDARIES_PER_PRIMARY + usize::from(primary_pin % 16)
    }

    // ── State inspection ────────────────────────────────────────────────────

    /// Current level of a control line.
    pub fn line(&self, pin: PinId) -> Option<Level> {
        self.lines.get(&pin).copied()
    }

    /// Register file of a primary.
    pub fn primary(&self, primary: Primary) -> &ExpanderModel {
        let [first, second] = &self.primaries;
        match primary {
            Primary::First => first,
            Primary::Second => second,
        }
    }

    /// Register file of secondary `index` (wiring order).
    pub fn secondary(&self, index: usize) -> Option<&ExpanderModel> {
        self.secondaries.get(index)
    }

    /// 16-bit output latch of secondary `index`.
    pub fn secondary_latch(&self, index: usize) -> Option<u16> {
        self.secondary(index).map(ExpanderModel::latch)
    }

    /// Output code of a DAC channel.
    pub fn dac_output(&self, chip: DacChip, channel: DacChannel) -> u8 {
        self.dac(chip).output(channel.address())
    }

    /// The ADC model.
    pub fn adc(&self) -> &AdcModel {
        &self.adc
    }

    /// Set the value the next ADC conversion produces.
    pub fn set_adc_input(&mut self, raw: RawSample, averaged: u16) {
        self.adc.set_input(raw, averaged);
    }

    /// Secondaries whose CS is currently asserted.
    pub fn selected_secondaries(&self) -> Vec<usize> {
        (0..SECONDARY_COUNT)
            .filter(|&index| self.secondary_selected(index))
            .collect()
    }

    /// Most secondaries seen selected at once since the last [`reset_peak`](Self::reset_peak).
    pub fn peak_selected_secondaries(&self) -> usize {
        self.peak_selected
    }

    /// Restart peak tracking from the current selection.
    pub fn reset_peak(&mut self) {
        self.peak_selected = self.selected_secondaries().len();
    }

    /// Copy of every chip and line state.
    pub fn snapshot(&self) -> BenchSnapshot {
        BenchSnapshot {
            lines: self.lines.clone(),
            primaries: self.primaries.clone(),
            secondaries: self.secondaries.clone(),
            dacs: self.dacs.clone(),
        }
    }

    // ── Trace ───────────────────────────────────────────────────────────────

    /// Every event since construction or the last [`clear_trace`](Self::clear_trace).
    pub fn trace(&self) -> &[Event] {
        &self.trace
    }

    /// Drop the recorded trace.
    pub fn clear_trace(&mut self) {
        self.trace.clear();
    }

    /// Bytes clocked out by each completed exchange, in order.
    pub fn exchanges(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.trace.iter().filter_map(|event| match event {
            Event::Exchange { tx, .. } => Some(tx.as_slice()),
            _ => None,
        })
    }

    /// Levels driven on `pin`, in order.
    pub fn line_history(&self, pin: PinId) -> Vec<Level> {
        self.trace
            .iter()
            .filter_map(|event| match event {
                Event::Line { pin: p, level } if *p == pin => Some(*level),
                _ => None,
            })
            .collect()
    }

    /// Check every control line is at its idle level.
    pub fn assert_lines_idle(&self) -> Result<(), String> {
        for (pin, idle) in self.config.idle_lines() {
            let actual = self.line(pin);
            if actual != Some(idle) {
                return Err(format!("{pin} is {actual:?}, expected {idle:?}"));
            }
        }
        Ok(())
    }

    // ── Failure injection ───────────────────────────────────────────────────

    /// Make the `nth` upcoming exchange fail (0 = the next one).
    pub fn fail_exchange(&mut self, nth: usize) {
        self.failing_exchange = Some(self.exchange_count.saturating_add(nth));
    }

    /// Make every access to `pin` fail.
    pub fn fail_line(&mut self, pin: PinId) {
        self.failing_lines.insert(pin);
    }

    /// Make the `nth` upcoming drive of `pin` fail once (0 = the next one).
    pub fn fail_line_drive(&mut self, pin: PinId, nth: usize) {
        self.failing_drives.insert(pin, nth);
    }

    /// Make `pin` read back `level` whatever is driven.
    pub fn stuck_line(&mut self, pin: PinId, level: Level) {
        self.stuck_lines.insert(pin, level);
    }

    // ── Bus model ───────────────────────────────────────────────────────────

    fn dac(&self, chip: DacChip) -> &DacModel {
        let [first, second] = &self.dacs;
        match chip {
            DacChip::First => first,
            DacChip::Second => second,
        }
    }

    fn is_low(&self, pin: PinId) -> bool {
        self.lines.get(&pin) == Some(&Level::Low)
    }

    #[allow(clippy::arithmetic_side_effects, clippy::cast_possible_truncation)] // index < 32
    fn secondary_selected(&self, index: usize) -> bool {
        let bit = (index % SECONDARIES_PER_PRIMARY) as u8;
        let owner = if index < SECONDARIES_PER_PRIMARY {
            Primary::First
        } else {
            Primary::Second
        };
        self.primary(owner).drives_low(bit)
    }

    fn track_peak(&mut self) {
        self.peak_selected = self.peak_selected.max(self.selected_secondaries().len());
    }

    /// Clock `tx` through every device whose CS is low at frame start; the
    /// devices' MISO outputs are OR-ed together.
    fn clock_frame(&mut self, tx: &[u8]) -> Vec<u8> {
        let mut rx = vec![0u8; tx.len()];
        let mut merge = |response: &[u8]| {
            for (out, byte) in rx.iter_mut().zip(response) {
                *out |= byte;
            }
        };

        let selected = self.selected_secondaries();
        let primary_cs = self.config.expander.chip_selects();
        let dac_cs = DacChip::ALL.map(|chip| self.config.dac.chip_select(chip));
        let adc_selected = self.is_low(self.config.adc.cs);

        for (model, cs) in self.primaries.iter_mut().zip(primary_cs) {
            if self.lines.get(&cs) == Some(&Level::Low) {
                if let Some(response) = model.clock(tx) {
                    merge(&response);
                }
            }
        }
        for index in selected {
            if let Some(response) = self.secondaries.get_mut(index).and_then(|m| m.clock(tx)) {
                merge(&response);
            }
        }
        for (model, cs) in self.dacs.iter_mut().zip(dac_cs) {
            if self.lines.get(&cs) == Some(&Level::Low) {
                model.clock(tx);
            }
        }
        if adc_selected {
            merge(&self.adc.clock(tx.len()));
        }
        rx
    }
}

impl DelayNs for SimulatedBench {
    fn delay_ns(&mut self, ns: u32) {
        self.trace.push(Event::Delay { ns });
    }
}

impl Transport for SimulatedBench {
    fn exchange(&mut self, buffer: &mut [u8]) -> Result<(), BenchError> {
        let index = self.exchange_count;
        self.exchange_count = self.exchange_count.saturating_add(1);
        let tx = buffer.to_vec();

        if self.failing_exchange == Some(index) {
            self.failing_exchange = None;
            tracing::debug!(?tx, "simulated exchange failure");
            self.trace.push(Event::ExchangeFailed { tx });
            return Err(BenchError::Transport);
        }

        self.track_peak();
        let rx = self.clock_frame(&tx);
        self.track_peak();

        for (out, byte) in buffer.iter_mut().zip(&rx) {
            *out = *byte;
        }
        tracing::trace!(?tx, ?rx, "exchange");
        self.trace.push(Event::Exchange { tx, rx });
        Ok(())
    }

    fn set_line(&mut self, pin: PinId, level: Level) -> Result<(), BenchError> {
        if self.failing_lines.contains(&pin) {
            return Err(BenchError::Line(pin));
        }
        if let Some(remaining) = self.failing_drives.get_mut(&pin) {
            if *remaining == 0 {
                self.failing_drives.remove(&pin);
                return Err(BenchError::Line(pin));
            }
            *remaining = remaining.saturating_sub(1);
        }
        let slot = self.lines.get_mut(&pin).ok_or(BenchError::Line(pin))?;
        let previous = core::mem::replace(slot, level);
        if pin == self.config.adc.cnv && previous == Level::Low && level == Level::High {
            self.adc.convert();
        }
        self.trace.push(Event::Line { pin, level });
        Ok(())
    }

    fn read_line(&mut self, pin: PinId) -> Result<Level, BenchError> {
        if self.failing_lines.contains(&pin) {
            return Err(BenchError::Line(pin));
        }
        if let Some(level) = self.stuck_lines.get(&pin) {
            return Ok(*level);
        }
        self.line(pin).ok_or(BenchError::Line(pin))
    }
}
