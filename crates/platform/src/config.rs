//! Bench wiring and timing tables.
//!
//! Physical line numbers, SPI settings and settle times are fixed per bench
//! build. They are loaded once (from [`BenchConfig::DEFAULT`] or, with the
//! `serde` feature, from a JSON/TOML file) and never mutated afterwards.
//!
//! # Default wiring
//!
//! | Role                  | Line   | Idle |
//! |-----------------------|--------|------|
//! | Primary expander 0 CS | GPIO21 | high |
//! | Primary expander 1 CS | GPIO22 | high |
//! | DAC 0 CS              | GPIO23 | high |
//! | DAC 1 CS              | GPIO24 | high |
//! | ADC CS                | GPIO25 | high |
//! | ADC CNV               | GPIO29 | low  |

use heapless::Vec;

use crate::error::ConfigError;
use crate::transport::{Level, PinId};
use crate::types::{DacChip, Primary};

/// Number of control lines the bench drives.
pub const CONTROL_LINE_COUNT: usize = 6;

/// SPI channel settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SpiSettings {
    /// Controller SPI channel.
    pub channel: u8,
    /// Clock frequency in Hz.
    pub frequency_hz: u32,
}

/// Primary expander wiring and timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ExpanderConfig {
    /// CS of primary 0.
    pub first_cs: PinId,
    /// CS of primary 1.
    pub second_cs: PinId,
    /// Delay before and after every primary transaction, in microseconds.
    pub settle_us: u32,
}

impl ExpanderConfig {
    /// CS line of `primary`.
    pub const fn chip_select(&self, primary: Primary) -> PinId {
        match primary {
            Primary::First => self.first_cs,
            Primary::Second => self.second_cs,
        }
    }

    /// Both primary CS lines, in bus order.
    pub const fn chip_selects(&self) -> [PinId; 2] {
        [self.first_cs, self.second_cs]
    }
}

/// DAC wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DacConfig {
    /// CS of DAC 0.
    pub first_cs: PinId,
    /// CS of DAC 1.
    pub second_cs: PinId,
}

impl DacConfig {
    /// CS line of `chip`.
    pub const fn chip_select(&self, chip: DacChip) -> PinId {
        match chip {
            DacChip::First => self.first_cs,
            DacChip::Second => self.second_cs,
        }
    }
}

/// ADC wiring and conversion timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct AdcConfig {
    /// CS of the ADC.
    pub cs: PinId,
    /// Conversion start line.
    pub cnv: PinId,
    /// CNV high time in nanoseconds.
    pub pulse_ns: u32,
}

/// Complete bench configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct BenchConfig {
    /// SPI channel settings.
    pub spi: SpiSettings,
    /// Expander wiring.
    pub expander: ExpanderConfig,
    /// DAC wiring.
    pub dac: DacConfig,
    /// ADC wiring.
    pub adc: AdcConfig,
}

impl BenchConfig {
    /// Wiring of the reference bench.
    pub const DEFAULT: Self = Self {
        spi: SpiSettings {
            channel: 0,
            frequency_hz: 8_000_000,
        },
        expander: ExpanderConfig {
            first_cs: PinId(21),
            second_cs: PinId(22),
            settle_us: 100,
        },
        dac: DacConfig {
            first_cs: PinId(23),
            second_cs: PinId(24),
        },
        adc: AdcConfig {
            cs: PinId(25),
            cnv: PinId(29),
            pulse_ns: crate::ltc2380::CONVERSION_PULSE_NS,
        },
    };

    /// Every control line with its idle level: chip selects high, CNV low.
    pub const fn idle_lines(&self) -> [(PinId, Level); CONTROL_LINE_COUNT] {
        [
            (self.expander.first_cs, Level::High),
            (self.expander.second_cs, Level::High),
            (self.dac.first_cs, Level::High),
            (self.dac.second_cs, Level::High),
            (self.adc.cs, Level::High),
            (self.adc.cnv, Level::Low),
        ]
    }

    /// Check the tables for conflicts.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::DuplicatePin`] if one line has two roles
    /// - [`ConfigError::ZeroFrequency`] for a 0 Hz SPI clock
    /// - [`ConfigError::ZeroPulseWidth`] for a 0 ns CNV pulse
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.spi.frequency_hz == 0 {
            return Err(ConfigError::ZeroFrequency);
        }
        if self.adc.pulse_ns == 0 {
            return Err(ConfigError::ZeroPulseWidth);
        }
        let mut seen: Vec<PinId, CONTROL_LINE_COUNT> = Vec::new();
        for (pin, _) in self.idle_lines() {
            if seen.contains(&pin) {
                return Err(ConfigError::DuplicatePin(pin));
            }
            seen.push(pin).map_err(|_| ConfigError::LineTableFull)?;
        }
        Ok(())
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_wiring_is_valid() {
        assert_eq!(BenchConfig::DEFAULT.validate(), Ok(()));
    }

    #[test]
    fn default_matches_reference_bench() {
        let cfg = BenchConfig::default();
        assert_eq!(cfg.spi.frequency_hz, 8_000_000);
        assert_eq!(cfg.expander.chip_select(Primary::First), PinId(21));
        assert_eq!(cfg.expander.chip_select(Primary::Second), PinId(22));
        assert_eq!(cfg.dac.chip_select(DacChip::Second), PinId(24));
        assert_eq!(cfg.adc.cnv, PinId(29));
        assert_eq!(cfg.expander.settle_us, 100);
    }

    #[test]
    fn idle_levels_keep_selects_high_and_cnv_low() {
        let lines = BenchConfig::DEFAULT.idle_lines();
        let lows: std::vec::Vec<_> = lines
            .iter()
            .filter(|(_, level)| *level == Level::Low)
            .collect();
        assert_eq!(lows, [&(PinId(29), Level::Low)]);
    }

    #[test]
    fn shared_line_is_rejected() {
        let mut cfg = BenchConfig::DEFAULT;
        cfg.dac.second_cs = cfg.adc.cs;
        assert_eq!(cfg.validate(), Err(ConfigError::DuplicatePin(PinId(25))));
    }

    #[test]
    fn zero_timing_is_rejected() {
        let mut cfg = BenchConfig::DEFAULT;
        cfg.spi.frequency_hz = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroFrequency));

        let mut cfg = BenchConfig::DEFAULT;
        cfg.adc.pulse_ns = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroPulseWidth));
    }
}
