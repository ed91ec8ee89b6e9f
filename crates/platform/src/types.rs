//! Bench domain newtypes.
//!
//! These types keep raw indices away from the protocol code:
//! - `ExpanderAddress`: validated (primary, primary pin, secondary, secondary pin)
//! - `DacChannel`: closed set of 12 AD8802 outputs, each with a fixed nibble
//! - `OutputVoltage`: validated 0–5 V request
//! - `RawSample` / `Reading`: decoded LTC2380 results

use crate::ad8802::MAX_OUTPUT_VOLTAGE;
use crate::error::{OutOfRangeError, RangeKind};
use crate::ltc2380::{CURRENT_DIVIDE, CURRENT_MULTIPLY, VOLTAGE_ERROR_OFFSET, VOLTAGE_MULTIPLY};

// ── Primary ──────────────────────────────────────────────────────────────────

/// One of the two primary expanders, each addressed by its own physical CS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Primary {
    /// Gates secondaries 0–15.
    First,
    /// Gates secondaries 16–31.
    Second,
}

impl Primary {
    /// Both primaries, in bus order.
    pub const ALL: [Self; 2] = [Self::First, Self::Second];

    /// Zero-based index of this primary.
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }
}

impl TryFrom<u8> for Primary {
    type Error = OutOfRangeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::First),
            1 => Ok(Self::Second),
            _ => Err(OutOfRangeError::index(RangeKind::PrimaryIndex, value, 1)),
        }
    }
}

// ── Port ─────────────────────────────────────────────────────────────────────

/// 8-bit port of a 16-bit expander: bits 0–7 on A, 8–15 on B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Port {
    /// Bits 0–7.
    A,
    /// Bits 8–15.
    B,
}

impl Port {
    /// Port holding bit `pin` (0–15) of a 16-bit expander.
    #[must_use]
    pub const fn of_pin(pin: u8) -> Self {
        if pin < 8 {
            Self::A
        } else {
            Self::B
        }
    }
}

/// Single-bit mask for `pin` within its 8-bit port.
#[must_use]
#[allow(clippy::arithmetic_side_effects)] // pin % 8 < 8, shift cannot overflow
const fn port_bit(pin: u8) -> u8 {
    1 << (pin % 8)
}

// ── ExpanderAddress ──────────────────────────────────────────────────────────

/// A digital output reachable through the expander fan-out.
///
/// `primary` and `primary_pin` pick which secondary's CS is asserted;
/// `secondary_pin` picks the bit within that secondary's output latch.
/// `secondary` is the bench label of the chip and carries no bus meaning:
/// the wiring alone ties a label to a primary output bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExpanderAddress {
    primary: Primary,
    primary_pin: u8,
    secondary: u8,
    secondary_pin: u8,
}

impl ExpanderAddress {
    /// Highest expander bit (16-bit expanders).
    pub const MAX_PIN: u8 = 15;
    /// Highest secondary label (32 secondaries).
    pub const MAX_SECONDARY: u8 = 31;

    /// Validate and build an address.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] naming the first field outside its range.
    pub fn new(
        primary: u8,
        primary_pin: u8,
        secondary: u8,
        secondary_pin: u8,
    ) -> Result<Self, OutOfRangeError> {
        let primary = Primary::try_from(primary)?;
        if primary_pin > Self::MAX_PIN {
            return Err(OutOfRangeError::index(
                RangeKind::PrimaryPin,
                primary_pin,
                Self::MAX_PIN,
            ));
        }
        if secondary > Self::MAX_SECONDARY {
            return Err(OutOfRangeError::index(
                RangeKind::SecondaryIndex,
                secondary,
                Self::MAX_SECONDARY,
            ));
        }
        if secondary_pin > Self::MAX_PIN {
            return Err(OutOfRangeError::index(
                RangeKind::SecondaryPin,
                secondary_pin,
                Self::MAX_PIN,
            ));
        }
        Ok(Self {
            primary,
            primary_pin,
            secondary,
            secondary_pin,
        })
    }

    /// Owning primary.
    pub const fn primary(&self) -> Primary {
        self.primary
    }

    /// Primary output bit wired to the secondary's CS.
    pub const fn primary_pin(&self) -> u8 {
        self.primary_pin
    }

    /// Bench label of the secondary.
    pub const fn secondary(&self) -> u8 {
        self.secondary
    }

    /// Output bit within the secondary.
    pub const fn secondary_pin(&self) -> u8 {
        self.secondary_pin
    }

    /// Primary port carrying the secondary's CS.
    pub const fn select_port(&self) -> Port {
        Port::of_pin(self.primary_pin)
    }

    /// Primary latch value asserting only this secondary's CS on its port.
    pub const fn select_mask(&self) -> u8 {
        !port_bit(self.primary_pin)
    }

    /// Secondary port holding the output bit.
    pub const fn latch_port(&self) -> Port {
        Port::of_pin(self.secondary_pin)
    }

    /// Bit of the output within the secondary's latch.
    pub const fn latch_bit(&self) -> u8 {
        port_bit(self.secondary_pin)
    }
}

// ── DacChip / DacChannel ─────────────────────────────────────────────────────

/// One of the two AD8802 chips; they share channel nibbles and differ by CS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DacChip {
    /// First DAC.
    First,
    /// Second DAC.
    Second,
}

impl DacChip {
    /// Both chips.
    pub const ALL: [Self; 2] = [Self::First, Self::Second];
}

/// AD8802 output channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DacChannel {
    /// Output 1.
    Out1 = 0x0,
    /// Output 2.
    Out2 = 0x1,
    /// Output 3.
    Out3 = 0x2,
    /// Output 4.
    Out4 = 0x3,
    /// Output 5.
    Out5 = 0x4,
    /// Output 6.
    Out6 = 0x5,
    /// Output 7.
    Out7 = 0x6,
    /// Output 8.
    Out8 = 0x7,
    /// Output 9.
    Out9 = 0x8,
    /// Output 10.
    Out10 = 0x9,
    /// Output 11.
    Out11 = 0xA,
    /// Output 12.
    Out12 = 0xB,
}

impl DacChannel {
    /// All twelve channels in address order.
    pub const ALL: [Self; 12] = [
        Self::Out1,
        Self::Out2,
        Self::Out3,
        Self::Out4,
        Self::Out5,
        Self::Out6,
        Self::Out7,
        Self::Out8,
        Self::Out9,
        Self::Out10,
        Self::Out11,
        Self::Out12,
    ];

    /// 4-bit address nibble sent in the low byte of the input word.
    #[must_use]
    pub const fn address(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for DacChannel {
    type Error = OutOfRangeError;

    /// Zero-based channel index (0–11).
    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(usize::from(index))
            .copied()
            .ok_or_else(|| OutOfRangeError::index(RangeKind::DacChannel, index, 11))
    }
}

// ── OutputVoltage ────────────────────────────────────────────────────────────

/// Requested DAC output, validated to `0.0..=MAX_OUTPUT_VOLTAGE`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct OutputVoltage(f64);

impl OutputVoltage {
    /// 0 V, the safe idle level.
    pub const ZERO: Self = Self(0.0);

    /// Full scale.
    pub const MAX: Self = Self(MAX_OUTPUT_VOLTAGE);

    /// Create an `OutputVoltage`, rejecting negative, too-large and NaN inputs.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] if `volts` is not within `0.0..=5.0`.
    pub fn try_new(volts: f64) -> Result<Self, OutOfRangeError> {
        if (0.0..=MAX_OUTPUT_VOLTAGE).contains(&volts) {
            Ok(Self(volts))
        } else {
            Err(OutOfRangeError {
                kind: RangeKind::Voltage,
                value: volts,
                min: 0.0,
                max: MAX_OUTPUT_VOLTAGE,
            })
        }
    }

    /// Return the voltage in volts.
    #[must_use]
    pub fn get(self) -> f64 {
        self.0
    }
}

// ── ADC results ──────────────────────────────────────────────────────────────

/// How the caller wants an ADC sample interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Quantity {
    /// Scale by the voltage divider calibration.
    Voltage,
    /// Scale by the shunt calibration.
    Current,
}

/// Sign-extended 24-bit LTC2380 conversion result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct RawSample(i32);

impl RawSample {
    /// Largest positive 24-bit two's-complement value.
    pub const MAX: Self = Self(0x7F_FFFF);
    /// Most negative 24-bit two's-complement value.
    pub const MIN: Self = Self(-0x80_0000);

    /// Wrap an already sign-extended value, saturating to the 24-bit range.
    #[must_use]
    pub fn new(value: i32) -> Self {
        Self(value.clamp(Self::MIN.0, Self::MAX.0))
    }

    /// Return the signed value.
    #[must_use]
    pub fn get(self) -> i32 {
        self.0
    }

    /// Engineering value under the given interpretation.
    #[must_use]
    pub fn scale(self, quantity: Quantity) -> f64 {
        let raw = f64::from(self.0);
        match quantity {
            Quantity::Voltage => raw * VOLTAGE_MULTIPLY * VOLTAGE_ERROR_OFFSET,
            Quantity::Current => raw / CURRENT_DIVIDE * CURRENT_MULTIPLY,
        }
    }
}

/// A decoded ADC read.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reading {
    /// Interpretation applied to `value`.
    pub quantity: Quantity,
    /// Sign-extended conversion result.
    pub raw: RawSample,
    /// Number of samples the converter averaged (trailing frame bytes).
    pub averaged: u16,
    /// Engineering value: `raw` scaled per `quantity`.
    pub value: f64,
}
