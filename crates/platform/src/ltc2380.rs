//! LTC2380-24 24-bit SAR ADC read frame and bench calibration.
//!
//! Reference: Analog Devices LTC2380-24 datasheet.
//!
//! A conversion starts on the rising edge of CNV. Once it completes, five
//! bytes are clocked out with CS low: three bytes of two's-complement
//! result, MSB first, then the 16-bit count of samples averaged into it.

use crate::types::RawSample;

/// Bytes clocked per read.
pub const FRAME_LEN: usize = 5;

/// Minimum CNV high time in nanoseconds.
pub const CONVERSION_PULSE_NS: u32 = 30;

/// Voltage channel divider ratio.
pub const VOLTAGE_MULTIPLY: f64 = 20.0;
/// Voltage channel gain correction.
pub const VOLTAGE_ERROR_OFFSET: f64 = 1.023;
/// Current channel shunt divisor.
pub const CURRENT_DIVIDE: f64 = 7.995;
/// Current channel scale.
pub const CURRENT_MULTIPLY: f64 = 10.0;

/// Decode a read frame into `(sample, averaged count)`.
///
/// The 24-bit result is placed in the top of an `i32` and arithmetically
/// shifted down, which sign-extends it.
#[must_use]
#[allow(clippy::arithmetic_side_effects)] // arithmetic shift of an i32 cannot overflow
pub fn decode_frame(frame: &[u8; FRAME_LEN]) -> (RawSample, u16) {
    let [b0, b1, b2, c0, c1] = *frame;
    let raw = i32::from_be_bytes([b0, b1, b2, 0]) >> 8;
    (RawSample::new(raw), u16::from_be_bytes([c0, c1]))
}

/// Encode a sample into the frame the converter would shift out.
#[must_use]
#[allow(clippy::arithmetic_side_effects)] // shift of an in-range sample
pub fn encode_frame(sample: RawSample, averaged: u16) -> [u8; FRAME_LEN] {
    let [b0, b1, b2, _] = (sample.get() << 8).to_be_bytes();
    let [c0, c1] = averaged.to_be_bytes();
    [b0, b1, b2, c0, c1]
}
