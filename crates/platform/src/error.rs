//! Error taxonomy for bench operations.
//!
//! Every protocol operation returns [`BenchError`]; nothing is signalled
//! through sentinel values. Transport failures propagate immediately and
//! are never retried.

use core::fmt;

use thiserror_no_std::Error;

use crate::transport::PinId;

/// Which input a [`OutOfRangeError`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RangeKind {
    /// Primary expander index (0–1).
    PrimaryIndex,
    /// Primary output bit carrying a secondary's CS (0–15).
    PrimaryPin,
    /// Secondary expander index (0–31).
    SecondaryIndex,
    /// Output bit within a secondary (0–15).
    SecondaryPin,
    /// DAC channel index (0–11).
    DacChannel,
    /// Requested DAC output voltage.
    Voltage,
}

impl fmt::Display for RangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PrimaryIndex => "primary index",
            Self::PrimaryPin => "primary pin",
            Self::SecondaryIndex => "secondary index",
            Self::SecondaryPin => "secondary pin",
            Self::DacChannel => "DAC channel",
            Self::Voltage => "voltage",
        };
        f.write_str(name)
    }
}

/// Error returned when an input is outside its supported range.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("{kind} {value} outside [{min}, {max}]")]
pub struct OutOfRangeError {
    /// The input that was rejected.
    pub kind: RangeKind,
    /// The value that was out of range.
    pub value: f64,
    /// The inclusive minimum allowed value.
    pub min: f64,
    /// The inclusive maximum allowed value.
    pub max: f64,
}

impl OutOfRangeError {
    /// Build an error for an integer index with an inclusive `0..=max` range.
    pub fn index(kind: RangeKind, value: u8, max: u8) -> Self {
        Self {
            kind,
            value: f64::from(value),
            min: 0.0,
            max: f64::from(max),
        }
    }
}

/// Configuration table errors, detected once at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// The same physical line is assigned to two roles.
    #[error("line {0} is assigned to more than one role")]
    DuplicatePin(PinId),
    /// SPI clock of 0 Hz.
    #[error("SPI frequency must be non-zero")]
    ZeroFrequency,
    /// ADC conversion pulse width of 0 ns.
    #[error("ADC conversion pulse width must be non-zero")]
    ZeroPulseWidth,
    /// More lines than the transport's line table can hold.
    #[error("line table is full")]
    LineTableFull,
}

/// Errors reported by bench operations.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BenchError {
    /// The SPI exchange reported a failure (e.g. bus not ready).
    #[error("SPI exchange failed")]
    Transport,
    /// A GPIO line could not be driven or read.
    #[error("GPIO line {0} could not be accessed")]
    Line(PinId),
    /// A post-initialization check failed on the given line.
    #[error("line {0} failed post-initialization verification")]
    Initialization(PinId),
    /// An input value was rejected.
    #[error("{0}")]
    OutOfRange(OutOfRangeError),
    /// The configuration tables are incomplete or conflicting.
    #[error("invalid configuration: {0}")]
    Config(ConfigError),
}

impl From<OutOfRangeError> for BenchError {
    fn from(err: OutOfRangeError) -> Self {
        Self::OutOfRange(err)
    }
}

impl From<ConfigError> for BenchError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}
