//! Register-level models of the chips on the bench bus.
//!
//! Each model sees a frame only when the simulated bench decides its CS is
//! low at the start of the frame; it then clocks the whole frame and
//! returns the bytes it drove on MISO.

use bench_platform::ltc2380::{encode_frame, FRAME_LEN};
use bench_platform::mcp23s17::{
    decode_opcode, iodir, olat, GPIOA, GPIOB, INTCAPA, INTCAPB, INTFA, INTFB, IOCON, IOCON_ALT,
    IOCON_HAEN, IODIRA, IODIRB, OLATA, OLATB, REGISTER_COUNT,
};
use bench_platform::{Port, RawSample};

// ── MCP23S17 ─────────────────────────────────────────────────────────────────

/// MCP23S17 register file (IOCON.BANK = 0, sequential addressing).
///
/// With HAEN clear the chip ignores the address bits of the opcode and
/// answers every frame; with HAEN set it answers only its strapped address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpanderModel {
    strap: u8,
    regs: [u8; REGISTER_COUNT],
}

impl ExpanderModel {
    /// Power-on state: both ports inputs, latches zero, HAEN clear.
    pub fn power_on(strap: u8) -> Self {
        let mut regs = [0u8; REGISTER_COUNT];
        for reg in [IODIRA, IODIRB] {
            if let Some(slot) = regs.get_mut(usize::from(reg)) {
                *slot = 0xFF;
            }
        }
        Self { strap, regs }
    }

    /// Current value of `reg` (0 for addresses past the map).
    pub fn register(&self, reg: u8) -> u8 {
        self.regs.get(usize::from(reg)).copied().unwrap_or(0)
    }

    /// Whether hardware addressing is enabled.
    pub fn haen(&self) -> bool {
        self.register(IOCON) & IOCON_HAEN != 0
    }

    /// 16-bit output latch, port B in the high byte.
    pub fn latch(&self) -> u16 {
        u16::from_be_bytes([self.register(OLATB), self.register(OLATA)])
    }

    /// Whether output `bit` (0–15) is configured as an output and driven low.
    #[allow(clippy::arithmetic_side_effects)] // bit % 8 < 8
    pub fn drives_low(&self, bit: u8) -> bool {
        let port = Port::of_pin(bit);
        let mask = 1u8 << (bit % 8);
        self.register(iodir(port)) & mask == 0 && self.register(olat(port)) & mask == 0
    }

    /// Clock one frame. `None` if the chip does not answer the opcode.
    pub fn clock(&mut self, tx: &[u8]) -> Option<Vec<u8>> {
        let (&opcode, rest) = tx.split_first()?;
        let (address, read) = decode_opcode(opcode)?;
        if self.haen() && address != self.strap {
            return None;
        }
        let (&start, data) = rest.split_first()?;

        let mut rx = vec![0u8; tx.len()];
        let mut reg = start;
        for (out, &byte) in rx.iter_mut().skip(2).zip(data) {
            if read {
                *out = self.read(reg);
            } else {
                self.write(reg, byte);
            }
            reg = next_register(reg);
        }
        Some(rx)
    }

    fn read(&self, reg: u8) -> u8 {
        match reg {
            GPIOA => self.register(OLATA),
            GPIOB => self.register(OLATB),
            other => self.register(other),
        }
    }

    fn write(&mut self, reg: u8, value: u8) {
        let target = match reg {
            IOCON | IOCON_ALT => {
                self.store(IOCON, value);
                IOCON_ALT
            }
            GPIOA => OLATA,
            GPIOB => OLATB,
            INTFA | INTFB | INTCAPA | INTCAPB => return,
            other => other,
        };
        self.store(target, value);
    }

    fn store(&mut self, reg: u8, value: u8) {
        if let Some(slot) = self.regs.get_mut(usize::from(reg)) {
            *slot = value;
        }
    }
}

#[allow(clippy::arithmetic_side_effects, clippy::cast_possible_truncation)] // < REGISTER_COUNT
fn next_register(reg: u8) -> u8 {
    ((usize::from(reg) + 1) % REGISTER_COUNT) as u8
}

// ── AD8802 ───────────────────────────────────────────────────────────────────

/// AD8802 with a 12-bit input shift register and twelve output codes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DacModel {
    outputs: [u8; 12],
}

impl DacModel {
    /// Output code of channel `nibble`.
    pub fn output(&self, nibble: u8) -> u8 {
        self.outputs.get(usize::from(nibble)).copied().unwrap_or(0)
    }

    /// Latch the last 12 bits shifted in when CS rises.
    pub fn clock(&mut self, tx: &[u8]) {
        let tail = tx.len().saturating_sub(2);
        let Some([hi, lo]) = tx.get(tail..).and_then(|t| <[u8; 2]>::try_from(t).ok()) else {
            return;
        };
        let word = u16::from_be_bytes([hi, lo]) & 0x0FFF;
        let [address, code] = word.to_be_bytes();
        if let Some(slot) = self.outputs.get_mut(usize::from(address)) {
            *slot = code;
        }
    }
}

// ── LTC2380-24 ───────────────────────────────────────────────────────────────

/// LTC2380-24 whose input is set by the test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdcModel {
    input: RawSample,
    averaged: u16,
    result: [u8; FRAME_LEN],
    conversions: usize,
}

impl Default for AdcModel {
    fn default() -> Self {
        Self {
            input: RawSample::new(0),
            averaged: 1,
            result: [0; FRAME_LEN],
            conversions: 0,
        }
    }
}

impl AdcModel {
    /// Set the value the next conversion will produce.
    pub fn set_input(&mut self, input: RawSample, averaged: u16) {
        self.input = input;
        self.averaged = averaged;
    }

    /// CNV rising edge.
    pub fn convert(&mut self) {
        self.result = encode_frame(self.input, self.averaged);
        self.conversions = self.conversions.saturating_add(1);
    }

    /// Conversions started so far.
    pub fn conversions(&self) -> usize {
        self.conversions
    }

    /// Shift out the last result.
    pub fn clock(&self, len: usize) -> Vec<u8> {
        let mut rx = vec![0u8; len];
        for (out, byte) in rx.iter_mut().zip(self.result) {
            *out = byte;
        }
        rx
    }
}
