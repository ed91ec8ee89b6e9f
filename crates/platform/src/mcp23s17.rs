//! MCP23S17 16-bit SPI I/O expander register map.
//!
//! Reference: Microchip MCP23S17 datasheet (DS20001952C), IOCON.BANK = 0.
//!
//! Every transaction is three bytes: `[opcode, register, data]`. The opcode
//! is `0b0100_A2A1A0_R/W`; hardware addressing (IOCON.HAEN) must be enabled
//! before the address bits are honoured, otherwise every chip on a CS line
//! answers as address 0.

use crate::types::Port;

/// IODIRA: port A direction (1 = input). Power-on value 0xFF.
pub const IODIRA: u8 = 0x00;
/// IODIRB: port B direction (1 = input). Power-on value 0xFF.
pub const IODIRB: u8 = 0x01;
/// IPOLA: port A input polarity.
pub const IPOLA: u8 = 0x02;
/// IPOLB: port B input polarity.
pub const IPOLB: u8 = 0x03;
/// GPINTENA: port A interrupt-on-change enable.
pub const GPINTENA: u8 = 0x04;
/// GPINTENB: port B interrupt-on-change enable.
pub const GPINTENB: u8 = 0x05;
/// DEFVALA: port A default compare value.
pub const DEFVALA: u8 = 0x06;
/// DEFVALB: port B default compare value.
pub const DEFVALB: u8 = 0x07;
/// INTCONA: port A interrupt control.
pub const INTCONA: u8 = 0x08;
/// INTCONB: port B interrupt control.
pub const INTCONB: u8 = 0x09;
/// IOCON: shared configuration register (BANK, MIRROR, SEQOP, DISSLW, HAEN, ODR, INTPOL).
pub const IOCON: u8 = 0x0A;
/// IOCON mirror at the port B address.
pub const IOCON_ALT: u8 = 0x0B;
/// GPPUA: port A pull-up enable.
pub const GPPUA: u8 = 0x0C;
/// GPPUB: port B pull-up enable.
pub const GPPUB: u8 = 0x0D;
/// INTFA: port A interrupt flags.
pub const INTFA: u8 = 0x0E;
/// INTFB: port B interrupt flags.
pub const INTFB: u8 = 0x0F;
/// INTCAPA: port A interrupt capture.
pub const INTCAPA: u8 = 0x10;
/// INTCAPB: port B interrupt capture.
pub const INTCAPB: u8 = 0x11;
/// GPIOA: port A pin levels.
pub const GPIOA: u8 = 0x12;
/// GPIOB: port B pin levels.
pub const GPIOB: u8 = 0x13;
/// OLATA: port A output latch.
pub const OLATA: u8 = 0x14;
/// OLATB: port B output latch.
pub const OLATB: u8 = 0x15;

/// Number of addressable registers with IOCON.BANK = 0.
pub const REGISTER_COUNT: usize = 0x16;

/// IOCON value enabling hardware address pins (HAEN, bit 3).
pub const IOCON_HAEN: u8 = 1 << 3;

/// Fixed upper nibble of every opcode.
pub const OPCODE_BASE: u8 = 0x40;
/// R/W bit of the opcode: set for a read.
pub const OPCODE_READ: u8 = 0x01;

/// Hardware address strapped on the primaries (A2..A0 = 001).
pub const PRIMARY_ADDRESS: u8 = 1;
/// Hardware address strapped on the secondaries (A2..A0 = 000).
pub const SECONDARY_ADDRESS: u8 = 0;

/// Opcode writing to the primaries.
pub const PRIMARY_WRITE: u8 = write_opcode(PRIMARY_ADDRESS);
/// Opcode reading from the primaries.
pub const PRIMARY_READ: u8 = read_opcode(PRIMARY_ADDRESS);
/// Opcode writing to the secondaries.
pub const SECONDARY_WRITE: u8 = write_opcode(SECONDARY_ADDRESS);
/// Opcode reading from the secondaries.
pub const SECONDARY_READ: u8 = read_opcode(SECONDARY_ADDRESS);

/// Latch value with every primary output high: no secondary selected.
pub const DESELECT_ALL: u8 = 0xFF;
/// Latch value with every primary output low: every secondary on the port selected.
pub const SELECT_ALL: u8 = 0x00;

/// Build the write opcode for a 3-bit hardware address.
#[must_use]
#[allow(clippy::arithmetic_side_effects)] // (address & 0x07) << 1 <= 0x0E
pub const fn write_opcode(address: u8) -> u8 {
    OPCODE_BASE | ((address & 0x07) << 1)
}

/// Build the read opcode for a 3-bit hardware address.
#[must_use]
pub const fn read_opcode(address: u8) -> u8 {
    write_opcode(address) | OPCODE_READ
}

/// Split an opcode into `(hardware address, is_read)`, or `None` if the
/// fixed nibble does not match.
#[must_use]
#[allow(clippy::arithmetic_side_effects)] // shift of a masked byte
pub const fn decode_opcode(opcode: u8) -> Option<(u8, bool)> {
    if opcode & 0xF0 != OPCODE_BASE {
        return None;
    }
    Some(((opcode >> 1) & 0x07, opcode & OPCODE_READ != 0))
}

/// Direction register for a port.
#[must_use]
pub const fn iodir(port: Port) -> u8 {
    match port {
        Port::A => IODIRA,
        Port::B => IODIRB,
    }
}

/// Output latch register for a port.
#[must_use]
pub const fn olat(port: Port) -> u8 {
    match port {
        Port::A => OLATA,
        Port::B => OLATB,
    }
}

/// Pin level register for a port.
#[must_use]
pub const fn gpio(port: Port) -> u8 {
    match port {
        Port::A => GPIOA,
        Port::B => GPIOB,
    }
}

/// Write frame `[opcode, register, value]`.
#[must_use]
pub const fn write_frame(opcode: u8, register: u8, value: u8) -> [u8; 3] {
    [opcode, register, value]
}

/// Read frame `[opcode, register, 0x00]`; the value arrives in the third byte.
#[must_use]
pub const fn read_frame(opcode: u8, register: u8) -> [u8; 3] {
    [opcode, register, 0x00]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn opcodes_match_strapped_addresses() {
        assert_eq!(PRIMARY_WRITE, 0x42);
        assert_eq!(PRIMARY_READ, 0x43);
        assert_eq!(SECONDARY_WRITE, 0x40);
        assert_eq!(SECONDARY_READ, 0x41);
    }

    #[test]
    fn iocon_haen_is_bit_three() {
        assert_eq!(IOCON_HAEN, 0x08);
    }

    #[test]
    fn decode_opcode_recovers_address_and_direction() {
        assert_eq!(decode_opcode(PRIMARY_WRITE), Some((1, false)));
        assert_eq!(decode_opcode(PRIMARY_READ), Some((1, true)));
        assert_eq!(decode_opcode(SECONDARY_READ), Some((0, true)));
        assert_eq!(decode_opcode(read_opcode(7)), Some((7, true)));
    }

    #[test]
    fn decode_opcode_rejects_foreign_bytes() {
        assert_eq!(decode_opcode(0x00), None);
        assert_eq!(decode_opcode(0xFF), None);
        assert_eq!(decode_opcode(0x50), None);
    }

    #[test]
    fn port_register_selection() {
        assert_eq!(iodir(Port::A), IODIRA);
        assert_eq!(iodir(Port::B), IODIRB);
        assert_eq!(olat(Port::A), 0x14);
        assert_eq!(olat(Port::B), 0x15);
        assert_eq!(gpio(Port::B), GPIOB);
    }

    #[test]
    fn register_map_is_contiguous() {
        let all = [
            IODIRA, IODIRB, IPOLA, IPOLB, GPINTENA, GPINTENB, DEFVALA, DEFVALB, INTCONA,
            INTCONB, IOCON, IOCON_ALT, GPPUA, GPPUB, INTFA, INTFB, INTCAPA, INTCAPB, GPIOA,
            GPIOB, OLATA, OLATB,
        ];
        assert_eq!(all.len(), REGISTER_COUNT);
        for (expected, reg) in all.iter().enumerate() {
            assert_eq!(usize::from(*reg), expected);
        }
    }

    #[test]
    fn frames_are_opcode_register_value() {
        assert_eq!(write_frame(PRIMARY_WRITE, OLATA, 0xF7), [0x42, 0x14, 0xF7]);
        assert_eq!(read_frame(SECONDARY_READ, OLATB), [0x41, 0x15, 0x00]);
    }
}
