//! Status register and protection types

use bitflags::bitflags;

use crate::layout::FLASH_SIZE;
use crate::spi::opcodes;

use super::ranges::decode_range;

bitflags! {
    /// Status register 1
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "std", serde(transparent))]
    pub struct Status1: u8 {
        /// Erase, program or status write in progress
        const BUSY = opcodes::SR1_BUSY;
        /// Write enable latch
        const WEL  = opcodes::SR1_WEL;
        /// Block protect bit 0
        const BP0  = opcodes::SR1_BP0;
        /// Block protect bit 1
        const BP1  = opcodes::SR1_BP1;
        /// Block protect bit 2
        const BP2  = opcodes::SR1_BP2;
        /// Protect from the bottom instead of the top
        const TB   = opcodes::SR1_TB;
        /// 4K sector granularity instead of 64K blocks
        const SEC  = opcodes::SR1_SEC;
        /// Status register protect 0
        const SRP0 = opcodes::SR1_SRP0;
    }
}

bitflags! {
    /// Status register 2
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "std", serde(transparent))]
    pub struct Status2: u8 {
        /// Status register protect 1
        const SRP1 = opcodes::SR2_SRP1;
        /// Quad enable; the quad opcodes are ignored while clear
        const QE   = opcodes::SR2_QE;
        /// Security register lock 1
        const LB1  = opcodes::SR2_LB1;
        /// Security register lock 2
        const LB2  = opcodes::SR2_LB2;
        /// Security register lock 3
        const LB3  = opcodes::SR2_LB3;
        /// Complement the protected range
        const CMP  = opcodes::SR2_CMP;
        /// Erase/program suspended
        const SUS  = opcodes::SR2_SUS;
    }
}

/// Both status registers as read from the chip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusRegisters {
    /// Status register 1
    pub sr1: Status1,
    /// Status register 2
    pub sr2: Status2,
}

impl StatusRegisters {
    /// Build from raw register bytes. Undefined bits are dropped.
    pub const fn from_bytes(sr1: u8, sr2: u8) -> Self {
        Self {
            sr1: Status1::from_bits_truncate(sr1),
            sr2: Status2::from_bits_truncate(sr2),
        }
    }

    /// The block protection bits
    pub fn protect_bits(&self) -> ProtectBits {
        ProtectBits::from_status(self.sr1.bits(), self.sr2.bits())
    }

    /// Address range these registers protect
    pub fn protected_range(&self) -> ProtectedRange {
        decode_range(&self.protect_bits(), FLASH_SIZE)
    }

    /// The profile these registers match, if any
    pub fn profile(&self) -> Option<ProtectionProfile> {
        let bits = (
            self.sr1.bits() & PROTECT_MASK_SR1,
            self.sr2.bits() & PROTECT_MASK_SR2,
        );
        ProtectionProfile::ALL
            .into_iter()
            .find(|p| p.status_bits() == bits)
    }
}

impl core::fmt::Display for StatusRegisters {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "SR1=0x{:02X} SR2=0x{:02X}", self.sr1.bits(), self.sr2.bits())
    }
}

/// SR1 bits a profile writes (BUSY and WEL are read-only)
const PROTECT_MASK_SR1: u8 = 0xFC;
/// SR2 bits a profile writes
const PROTECT_MASK_SR2: u8 = opcodes::SR2_QE | opcodes::SR2_CMP | opcodes::SR2_SRP1;

/// Named protection settings
///
/// | Profile    | SR1          | SR2      | Protected            |
/// |------------|--------------|----------|----------------------|
/// | `All`      | BP2|BP1|BP0  | QE       | whole chip           |
/// | `None`     | 0            | QE       | nothing              |
/// | `NotPrefs` | TB|BP1       | CMP|QE   | everything above 128K|
///
/// Every profile keeps QE set so quad commands keep working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub enum ProtectionProfile {
    /// Nothing may be written or erased
    All,
    /// Everything may be written or erased
    None,
    /// Only preferences and profiles (pages 0 - 511) may be written or erased
    NotPrefs,
}

impl ProtectionProfile {
    /// Every profile, most restrictive first
    pub const ALL: [Self; 3] = [Self::All, Self::NotPrefs, Self::None];

    /// `(SR1, SR2)` written for this profile
    pub const fn status_bits(&self) -> (u8, u8) {
        match self {
            Self::All => (
                opcodes::SR1_BP0 | opcodes::SR1_BP1 | opcodes::SR1_BP2,
                opcodes::SR2_QE,
            ),
            Self::None => (0, opcodes::SR2_QE),
            Self::NotPrefs => (
                opcodes::SR1_TB | opcodes::SR1_BP1,
                opcodes::SR2_CMP | opcodes::SR2_QE,
            ),
        }
    }

    /// Address range the chip refuses to write while this profile is active
    pub fn protected_range(&self) -> ProtectedRange {
        let (sr1, sr2) = self.status_bits();
        StatusRegisters::from_bytes(sr1, sr2).protected_range()
    }
}

impl core::fmt::Display for ProtectionProfile {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::None => write!(f, "none"),
            Self::NotPrefs => write!(f, "not-prefs"),
        }
    }
}

/// Where a protection change is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub enum Persistence {
    /// Volatile copy only (VWREN); lost on power cycle
    #[default]
    Temporary,
    /// Volatile and non-volatile copies (WREN); takes up to 15 ms
    Permanent,
}

impl core::fmt::Display for Persistence {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Temporary => write!(f, "temporary"),
            Self::Permanent => write!(f, "permanent"),
        }
    }
}

/// Last protection setting the engine applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct ProtectionState {
    /// Profile written
    pub profile: ProtectionProfile,
    /// How it was written
    pub persistence: Persistence,
}

/// Decoded block protection bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProtectBits {
    /// BP2..BP0 as a 3-bit value
    pub bp: u8,
    /// Top/bottom select
    pub tb: bool,
    /// Sector (4K) granularity
    pub sec: bool,
    /// Complement
    pub cmp: bool,
}

impl ProtectBits {
    /// Number of BP bits on the W25Q80BV
    pub const BP_COUNT: u8 = 3;

    /// Pull the protection bits out of raw register values
    pub const fn from_status(sr1: u8, sr2: u8) -> Self {
        Self {
            bp: (sr1 >> 2) & 0x07,
            tb: sr1 & opcodes::SR1_TB != 0,
            sec: sr1 & opcodes::SR1_SEC != 0,
            cmp: sr2 & opcodes::SR2_CMP != 0,
        }
    }
}

/// A protected address range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct ProtectedRange {
    /// Start address of protected region
    pub start: u32,
    /// Length of protected region in bytes
    pub len: u32,
}

impl ProtectedRange {
    /// Create a new protected range
    pub const fn new(start: u32, len: u32) -> Self {
        Self { start, len }
    }

    /// Create a range representing no protection
    pub const fn none() -> Self {
        Self { start: 0, len: 0 }
    }

    /// Create a range representing full chip protection
    pub const fn full(size: u32) -> Self {
        Self {
            start: 0,
            len: size,
        }
    }

    /// Check if this range protects any part of the chip
    pub const fn is_protected(&self) -> bool {
        self.len > 0
    }

    /// Get the end address (exclusive)
    pub const fn end(&self) -> u32 {
        self.start.saturating_add(self.len)
    }

    /// Check if an address is within the protected range
    pub const fn contains(&self, addr: u32) -> bool {
        addr >= self.start && addr < self.end()
    }

    /// Check if a range overlaps with the protected region
    pub const fn overlaps(&self, start: u32, len: u32) -> bool {
        let range_end = start.saturating_add(len);
        len > 0 && self.len > 0 && !(range_end <= self.start || start >= self.end())
    }
}

impl core::fmt::Display for ProtectedRange {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.len == 0 {
            write!(f, "none")
        } else {
            write!(
                f,
                "0x{:06x}-0x{:06x} ({} bytes)",
                self.start,
                self.end(),
                self.len
            )
        }
    }
}
