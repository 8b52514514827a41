//! Chip identification

use super::SerialFlash;
use crate::error::{Error, Result};
use crate::protocol::{self, DEFAULT_BUSY_TIMEOUT_MS};
use crate::spi::opcodes;
use crate::transport::Transport;

/// Identity codes reported by the chip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct ChipIdentity {
    /// JEDEC manufacturer (0x9F, byte 0)
    pub manufacturer: u8,
    /// JEDEC memory type (0x9F, byte 1)
    pub memory_type: u8,
    /// JEDEC capacity (0x9F, byte 2)
    pub capacity: u8,
    /// Manufacturer from the 0x90 command
    pub rems_manufacturer: u8,
    /// Device from the 0x90 command
    pub rems_device: u8,
}

/// What a Winbond W25Q80BV reports
pub const EXPECTED_IDENTITY: ChipIdentity = ChipIdentity {
    manufacturer: 0xEF,
    memory_type: 0x40,
    capacity: 0x14,
    rems_manufacturer: 0xEF,
    rems_device: 0x13,
};

impl ChipIdentity {
    /// The three JEDEC bytes packed as `0xMMTTCC`
    pub const fn jedec_id(&self) -> u32 {
        (self.manufacturer as u32) << 16 | (self.memory_type as u32) << 8 | self.capacity as u32
    }

    /// Name of the last field that differs from `expected`
    pub fn mismatch(&self, expected: &ChipIdentity) -> Option<&'static str> {
        [
            (self.manufacturer == expected.manufacturer, "JEDEC manufacturer"),
            (self.memory_type == expected.memory_type, "memory type"),
            (self.capacity == expected.capacity, "capacity"),
            (self.rems_manufacturer == expected.rems_manufacturer, "manufacturer ID"),
            (self.rems_device == expected.rems_device, "device ID"),
        ]
        .into_iter()
        .filter(|(ok, _)| !ok)
        .map(|(_, field)| field)
        .last()
    }
}

impl core::fmt::Display for ChipIdentity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "JEDEC {:06X}, manufacturer/device {:02X}/{:02X}",
            self.jedec_id(),
            self.rems_manufacturer,
            self.rems_device
        )
    }
}

impl<T: Transport> SerialFlash<T> {
    /// Read the JEDEC and manufacturer/device codes
    pub fn read_identity(&mut self) -> Result<ChipIdentity> {
        self.ensure_ready()?;
        protocol::wait_not_busy(&mut self.bus, DEFAULT_BUSY_TIMEOUT_MS)?;

        let mut jedec = [0u8; 3];
        {
            let mut txn = self.bus.select();
            txn.write_byte(opcodes::RDID)?;
            txn.read_bytes(&mut jedec)?;
        }

        let mut rems = [0u8; 2];
        {
            let mut txn = self.bus.select();
            txn.write_byte(opcodes::REMS)?;
            txn.write_bytes(&[0, 0, 0])?;
            txn.read_bytes(&mut rems)?;
        }

        Ok(ChipIdentity {
            manufacturer: jedec[0],
            memory_type: jedec[1],
            capacity: jedec[2],
            rems_manufacturer: rems[0],
            rems_device: rems[1],
        })
    }

    /// Check that the chip is a W25Q80BV
    ///
    /// A mismatch is logged and reported as [`Error::IdentityMismatch`];
    /// what to do about it is the caller's call.
    pub fn verify_chip_identity(&mut self) -> Result<()> {
        let identity = self.read_identity()?;
        match identity.mismatch(&EXPECTED_IDENTITY) {
            None => {
                log::debug!("flash: {}", identity);
                Ok(())
            }
            Some(field) => {
                log::warn!("flash: unexpected {} ({})", field, identity);
                Err(Error::IdentityMismatch)
            }
        }
    }

    /// Read the 64-bit factory unique ID, folded into 32 bits
    ///
    /// Four dummy bytes follow the opcode, then the first four ID bytes are
    /// read MSB first.
    pub fn read_unique_id(&mut self) -> Result<u32> {
        self.ensure_ready()?;
        protocol::wait_not_busy(&mut self.bus, DEFAULT_BUSY_TIMEOUT_MS)?;

        let mut id = [0u8; 4];
        let mut txn = self.bus.select();
        txn.write_byte(opcodes::RDUID)?;
        txn.write_bytes(&[0; 4])?;
        txn.read_bytes(&mut id)?;
        Ok(u32::from_be_bytes(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jedec_id_packing() {
        assert_eq!(EXPECTED_IDENTITY.jedec_id(), 0xEF4014);
    }

    #[test]
    fn test_mismatch_reports_last_bad_field() {
        assert_eq!(EXPECTED_IDENTITY.mismatch(&EXPECTED_IDENTITY), None);

        let mut other = EXPECTED_IDENTITY;
        other.capacity = 0x15;
        assert_eq!(other.mismatch(&EXPECTED_IDENTITY), Some("capacity"));

        other.rems_device = 0x14;
        assert_eq!(other.mismatch(&EXPECTED_IDENTITY), Some("device ID"));
    }
}
