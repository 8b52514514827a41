//! Page address encodings
//!
//! Every access starts on a page boundary, so the low address byte is
//! always zero. The same page goes out in one of two widths depending on
//! the command: three bytes on the single lane, or six nibbles on the quad
//! lanes.

use crate::error::{Error, Result};
use crate::layout::{PAGE_COUNT, PAGE_SIZE};

/// How an address phase is clocked onto the bus
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AddressWidth {
    /// 3 bytes, MSB first, one bit per clock (24 clocks)
    #[default]
    SingleLane,
    /// 6 nibbles, MSB first, four bits per clock (6 clocks)
    QuadLane,
}

impl AddressWidth {
    /// Number of clock pulses the address phase occupies
    pub const fn clocks(&self) -> usize {
        match self {
            Self::SingleLane => 24,
            Self::QuadLane => 6,
        }
    }
}

/// A validated page number
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageAddress(u16);

impl PageAddress {
    /// Validate a page number against the chip size
    pub fn new(page: u16) -> Result<Self> {
        if (page as usize) < PAGE_COUNT {
            Ok(Self(page))
        } else {
            Err(Error::AddressOutOfBounds)
        }
    }

    /// The page number
    pub const fn page(&self) -> u16 {
        self.0
    }

    /// Byte address of the first byte in the page
    pub const fn byte_address(&self) -> u32 {
        (self.0 as u32) * PAGE_SIZE as u32
    }

    /// Bytes remaining from the start of this page to the end of the chip
    pub const fn bytes_to_end(&self) -> usize {
        (PAGE_COUNT - self.0 as usize) * PAGE_SIZE
    }

    /// Single lane encoding: `[A23..A16, A15..A8, A7..A0]`
    pub const fn to_bytes(&self) -> [u8; 3] {
        let addr = self.byte_address();
        [(addr >> 16) as u8, (addr >> 8) as u8, addr as u8]
    }

    /// Quad lane encoding: one nibble per clock, A23..A20 first
    pub const fn to_nibbles(&self) -> [u8; 6] {
        let addr = self.byte_address();
        [
            ((addr >> 20) & 0xF) as u8,
            ((addr >> 16) & 0xF) as u8,
            ((addr >> 12) & 0xF) as u8,
            ((addr >> 8) & 0xF) as u8,
            ((addr >> 4) & 0xF) as u8,
            (addr & 0xF) as u8,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_lane_encoding() {
        let page = PageAddress::new(0x0ABC).unwrap();
        assert_eq!(page.to_bytes(), [0x0A, 0xBC, 0x00]);
        assert_eq!(page.byte_address(), 0x0ABC00);
    }

    #[test]
    fn test_quad_lane_encoding() {
        let page = PageAddress::new(0x0ABC).unwrap();
        assert_eq!(page.to_nibbles(), [0x0, 0xA, 0xB, 0xC, 0x0, 0x0]);
    }

    #[test]
    fn test_out_of_range() {
        assert!(PageAddress::new(4095).is_ok());
        assert_eq!(PageAddress::new(4096), Err(Error::AddressOutOfBounds));
        assert_eq!(PageAddress::new(4095).unwrap().bytes_to_end(), 256);
    }
}
