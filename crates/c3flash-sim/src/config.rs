//! Simulator configuration

use c3flash_core::flash::{ChipIdentity, EXPECTED_IDENTITY};
use c3flash_core::protect::StatusRegisters;

/// How long the chip stays busy after each operation, in microseconds
///
/// Time only moves when the host calls `delay_us`, so these are virtual.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimTiming {
    /// Non-volatile status register write
    pub status_write_us: u32,
    /// Page program
    pub page_program_us: u32,
    /// 4K sector erase
    pub sector_erase_us: u32,
    /// 64K block erase
    pub block_erase_us: u32,
    /// Chip erase
    pub chip_erase_us: u32,
}

impl SimTiming {
    /// Every operation completes immediately
    pub const fn instant() -> Self {
        Self {
            status_write_us: 0,
            page_program_us: 0,
            sector_erase_us: 0,
            block_erase_us: 0,
            chip_erase_us: 0,
        }
    }
}

impl Default for SimTiming {
    /// Datasheet typical values
    fn default() -> Self {
        Self {
            status_write_us: 10_000,
            page_program_us: 700,
            sector_erase_us: 30_000,
            block_erase_us: 150_000,
            chip_erase_us: 2_000_000,
        }
    }
}

/// Configuration for the simulated chip
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Codes answered to 0x9F and 0x90
    pub identity: ChipIdentity,
    /// 64-bit unique ID answered to 0x4B
    pub unique_id: u64,
    /// Busy durations
    pub timing: SimTiming,
    /// Non-volatile status registers at power on
    pub power_on_status: StatusRegisters,
}

impl Default for SimConfig {
    /// A factory fresh W25Q80BV: nothing protected, QE clear
    fn default() -> Self {
        Self {
            identity: EXPECTED_IDENTITY,
            unique_id: 0xD164_3C2B_1F07_5A90,
            timing: SimTiming::default(),
            power_on_status: StatusRegisters::default(),
        }
    }
}

impl SimConfig {
    /// Same chip answering with different identity codes
    pub fn with_identity(identity: ChipIdentity) -> Self {
        Self {
            identity,
            ..Self::default()
        }
    }
}
