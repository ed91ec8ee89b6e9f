//! AD8802 12-channel 8-bit TrimDAC input word.
//!
//! Reference: Analog Devices AD8802/AD8804 datasheet.
//!
//! The serial input register takes a 12-bit word: 4 address bits selecting
//! the output followed by 8 data bits. On this bench the word is shifted
//! as two bytes, address nibble first.

use crate::types::{DacChannel, OutputVoltage};

/// Full-scale output of the bench's DAC reference.
pub const MAX_OUTPUT_VOLTAGE: f64 = 5.0;

/// Number of steps the full-scale range is divided into.
pub const DIVISION_FACTOR: f64 = 256.0;

/// Largest 8-bit output code.
pub const MAX_CODE: u8 = u8::MAX;

/// Number of outputs per chip.
pub const CHANNEL_COUNT: usize = 12;

/// Output code for a voltage: `round(v / 5.0 * 256)`, saturated at 255.
///
/// 5.0 V would map to 256; it is clamped to the top code instead of
/// wrapping to 0.
#[must_use]
pub fn output_code(voltage: OutputVoltage) -> u8 {
    code_for_steps(voltage.get() / MAX_OUTPUT_VOLTAGE * DIVISION_FACTOR)
}

/// Nearest code to `steps` (half away from zero), saturated at [`MAX_CODE`].
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // non-negative, clamped before narrowing
fn code_for_steps(steps: f64) -> u8 {
    let rounded = libm::round(steps).clamp(0.0, f64::from(MAX_CODE));
    rounded as u8
}

/// 16-bit input word: code in the high byte, channel nibble in the low byte.
#[must_use]
pub fn input_word(channel: DacChannel, code: u8) -> u16 {
    (u16::from(code) << 8) | u16::from(channel.address())
}

/// Two-byte frame as shifted on the wire: `[address nibble, code]`.
#[must_use]
pub fn frame(channel: DacChannel, code: u8) -> [u8; 2] {
    let [high, low] = input_word(channel, code).to_be_bytes();
    [low & 0x0F, high]
}

/// Inverse of [`output_code`] for display: volts produced by `code`.
#[must_use]
pub fn code_voltage(code: u8) -> f64 {
    f64::from(code) * MAX_OUTPUT_VOLTAGE / DIVISION_FACTOR
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn volts(v: f64) -> OutputVoltage {
        OutputVoltage::try_new(v).unwrap()
    }

    #[test]
    fn rounding_is_exact_at_half_step_boundaries() {
        assert_eq!(code_for_steps(0.499_999_999_999_999_94), 0);
        assert_eq!(code_for_steps(0.5), 1);
        assert_eq!(code_for_steps(127.499_999_999_999_99), 127);
        assert_eq!(code_for_steps(255.5), 255);
    }

    #[test]
    fn zero_volts_is_code_zero() {
        assert_eq!(output_code(OutputVoltage::ZERO), 0);
    }

    #[test]
    fn half_scale_is_code_128() {
        assert_eq!(output_code(volts(2.5)), 128);
    }

    #[test]
    fn full_scale_saturates_at_255() {
        assert_eq!(output_code(OutputVoltage::MAX), 255);
        assert_eq!(output_code(volts(4.99)), 255);
    }

    #[test]
    fn code_rounds_to_nearest() {
        // 1.0 V -> 51.2 steps
        assert_eq!(output_code(volts(1.0)), 51);
        // 0.01 V -> 0.512 steps
        assert_eq!(output_code(volts(0.01)), 1);
    }

    #[test]
    fn frame_sends_nibble_then_code() {
        assert_eq!(frame(DacChannel::Out3, 128), [0x02, 0x80]);
        assert_eq!(frame(DacChannel::Out12, 255), [0x0B, 0xFF]);
        assert_eq!(frame(DacChannel::Out1, 0), [0x00, 0x00]);
    }

    #[test]
    fn input_word_layout() {
        assert_eq!(input_word(DacChannel::Out11, 0x5A), 0x5A0A);
    }

    #[test]
    fn code_voltage_inverts_within_one_step() {
        let v = 3.3;
        let back = code_voltage(output_code(volts(v)));
        assert!((back - v).abs() <= MAX_OUTPUT_VOLTAGE / DIVISION_FACTOR);
    }

    #[test]
    fn channel_count_matches_enum() {
        assert_eq!(DacChannel::ALL.len(), CHANNEL_COUNT);
    }
}
