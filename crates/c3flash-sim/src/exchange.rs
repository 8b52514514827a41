//! Per-transaction decoder state
//!
//! Everything the chip has latched since CS went low: the opcode, the
//! bytes that followed it on IO0, the nibbles that followed it on IO0-IO3,
//! and how far into its answer it is.

use alloc::vec::Vec;

use c3flash_core::spi::{opcodes, AddressWidth};

/// What the chip does on the next rising edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    /// Latch IO0
    SingleIn,
    /// Latch IO0-IO3
    QuadIn,
    /// Drive IO1
    SingleOut,
    /// Drive IO0-IO3
    QuadOut,
    /// Command refused; clocks are ignored until CS rises
    Ignore,
}

#[derive(Debug, Default)]
pub(crate) struct Exchange {
    pub opcode: Option<u8>,
    pub rejected: bool,
    shift: u8,
    bits: u8,
    pub bytes: Vec<u8>,
    pub nibbles: Vec<u8>,
    pub out_index: usize,
    pub out_clock: u8,
    pub out_byte: u8,
}

/// Bytes of single lane address after each addressed opcode
const ADDRESS_BYTES: usize = AddressWidth::SingleLane.clocks() / 8;
/// Quad lane address nibbles plus the two mode nibbles of 0xE3
const OCTAL_READ_PREAMBLE: usize = AddressWidth::QuadLane.clocks() + 2;
/// Dummy bytes before the unique ID
const UNIQUE_ID_DUMMY_BYTES: usize = 4;

impl Exchange {
    pub fn phase(&self) -> Phase {
        let Some(opcode) = self.opcode else {
            return Phase::SingleIn;
        };
        if self.rejected {
            return Phase::Ignore;
        }

        match opcode {
            opcodes::RDSR | opcodes::RDSR2 | opcodes::RDID => Phase::SingleOut,
            opcodes::REMS | opcodes::READ if self.bytes.len() < ADDRESS_BYTES => Phase::SingleIn,
            opcodes::REMS | opcodes::READ => Phase::SingleOut,
            opcodes::RDUID if self.bytes.len() < UNIQUE_ID_DUMMY_BYTES => Phase::SingleIn,
            opcodes::RDUID => Phase::SingleOut,
            opcodes::OWRQ if self.nibbles.len() < OCTAL_READ_PREAMBLE => Phase::QuadIn,
            opcodes::OWRQ => Phase::QuadOut,
            opcodes::QPP if self.bytes.len() < ADDRESS_BYTES => Phase::SingleIn,
            opcodes::QPP => Phase::QuadIn,
            _ => Phase::SingleIn,
        }
    }

    /// Shift one bit in, returning a byte once eight have arrived
    pub fn shift_in(&mut self, bit: bool) -> Option<u8> {
        self.shift = (self.shift << 1) | bit as u8;
        self.bits += 1;
        if self.bits == 8 {
            self.bits = 0;
            Some(self.shift)
        } else {
            None
        }
    }

    /// Whether CS rose on a byte boundary
    ///
    /// Write commands that end mid-byte are discarded by the chip.
    pub fn byte_aligned(&self) -> bool {
        self.bits == 0 && self.nibbles.len() % 2 == 0
    }

    /// 24-bit address sent on the single lane
    pub fn single_address(&self) -> Option<u32> {
        let addr = self.bytes.get(..ADDRESS_BYTES)?;
        Some(addr.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32))
    }

    /// 24-bit address sent on the quad lanes
    pub fn quad_address(&self) -> Option<u32> {
        let addr = self.nibbles.get(..AddressWidth::QuadLane.clocks())?;
        Some(addr.iter().fold(0u32, |acc, &n| (acc << 4) | n as u32))
    }

    /// Data bytes following the address of a single lane program
    pub fn single_payload(&self) -> &[u8] {
        self.bytes.get(ADDRESS_BYTES..).unwrap_or(&[])
    }

    /// Data bytes assembled from nibble pairs of a quad program
    pub fn quad_payload(&self) -> Vec<u8> {
        self.nibbles
            .chunks_exact(2)
            .map(|pair| (pair[0] << 4) | pair[1])
            .collect()
    }

    /// Whether the next output clock starts a new byte
    pub fn needs_output_byte(&self) -> bool {
        self.out_clock == 0
    }

    /// Count one output clock; `clocks_per_byte` is 8 or 2
    pub fn advance_output(&mut self, clocks_per_byte: u8) {
        self.out_clock += 1;
        if self.out_clock == clocks_per_byte {
            self.out_clock = 0;
            self.out_index += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shift_byte(exchange: &mut Exchange, byte: u8) -> Option<u8> {
        let mut out = None;
        for i in (0..8).rev() {
            out = exchange.shift_in((byte >> i) & 1 != 0);
        }
        out
    }

    #[test]
    fn test_phases_of_quad_read() {
        let mut exchange = Exchange::default();
        assert_eq!(exchange.phase(), Phase::SingleIn);
        exchange.opcode = Some(opcodes::OWRQ);
        assert_eq!(exchange.phase(), Phase::QuadIn);
        exchange.nibbles.extend_from_slice(&[0, 2, 1, 0, 0, 0, 0]);
        assert_eq!(exchange.phase(), Phase::QuadIn);
        exchange.nibbles.push(0);
        assert_eq!(exchange.phase(), Phase::QuadOut);
        assert_eq!(exchange.quad_address(), Some(0x021000));
    }

    #[test]
    fn test_phases_of_quad_program() {
        let mut exchange = Exchange::default();
        exchange.opcode = Some(opcodes::QPP);
        assert_eq!(exchange.phase(), Phase::SingleIn);
        exchange.bytes.extend_from_slice(&[0x01, 0x02, 0x00]);
        assert_eq!(exchange.phase(), Phase::QuadIn);
        exchange.nibbles.extend_from_slice(&[0xA, 0x5, 0x3]);
        assert!(!exchange.byte_aligned());
        exchange.nibbles.push(0xC);
        assert_eq!(exchange.quad_payload(), [0xA5, 0x3C]);
        assert_eq!(exchange.single_address(), Some(0x010200));
    }

    #[test]
    fn test_shift_in_is_msb_first() {
        let mut exchange = Exchange::default();
        assert_eq!(shift_byte(&mut exchange, 0x9F), Some(0x9F));
        assert!(exchange.byte_aligned());
        exchange.shift_in(true);
        assert!(!exchange.byte_aligned());
    }

    #[test]
    fn test_rejected_command_ignores_clocks() {
        let mut exchange = Exchange::default();
        exchange.opcode = Some(opcodes::READ);
        exchange.rejected = true;
        assert_eq!(exchange.phase(), Phase::Ignore);
    }
}
