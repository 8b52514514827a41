//! W25Q80BV command opcodes and status register bits
//!
//! Only the subset the engine (and the simulator) actually speaks.

// ============================================================================
// Write control
// ============================================================================

/// Write Enable - required before any program, erase or persistent SR write
pub const WREN: u8 = 0x06;
/// Write Disable - clears WEL bit in status register
pub const WRDI: u8 = 0x04;
/// Write Enable for Volatile Status Register
pub const VWREN: u8 = 0x50;

// ============================================================================
// Status register operations
// ============================================================================

/// Read Status Register 1
pub const RDSR: u8 = 0x05;
/// Read Status Register 2
pub const RDSR2: u8 = 0x35;
/// Write Status Register (SR1, optionally followed by SR2)
pub const WRSR: u8 = 0x01;

// ============================================================================
// Identification
// ============================================================================

/// Read JEDEC ID (manufacturer, memory type, capacity)
pub const RDID: u8 = 0x9F;
/// Read Manufacturer / Device ID
pub const REMS: u8 = 0x90;
/// Read Unique ID
pub const RDUID: u8 = 0x4B;

// ============================================================================
// Read
// ============================================================================

/// Read Data, single lane
pub const READ: u8 = 0x03;
/// Octal Word Read Quad I/O (address and data on four lanes)
pub const OWRQ: u8 = 0xE3;

// ============================================================================
// Program
// ============================================================================

/// Page Program, single lane
pub const PP: u8 = 0x02;
/// Quad Input Page Program (address single lane, data on four lanes)
pub const QPP: u8 = 0x32;

// ============================================================================
// Erase
// ============================================================================

/// Sector Erase 4KB
pub const SE_20: u8 = 0x20;
/// Block Erase 64KB
pub const BE_D8: u8 = 0xD8;
/// Chip Erase
pub const CE_60: u8 = 0x60;
/// Chip Erase (alternate opcode)
pub const CE_C7: u8 = 0xC7;

// ============================================================================
// Status register bit definitions
// ============================================================================

/// Status Register 1: Busy
pub const SR1_BUSY: u8 = 0x01;
/// Status Register 1: Write Enable Latch
pub const SR1_WEL: u8 = 0x02;
/// Status Register 1: Block Protect bit 0
pub const SR1_BP0: u8 = 0x04;
/// Status Register 1: Block Protect bit 1
pub const SR1_BP1: u8 = 0x08;
/// Status Register 1: Block Protect bit 2
pub const SR1_BP2: u8 = 0x10;
/// Status Register 1: Top/Bottom Protect
pub const SR1_TB: u8 = 0x20;
/// Status Register 1: Sector/Block Protect
pub const SR1_SEC: u8 = 0x40;
/// Status Register 1: Status Register Protect 0
pub const SR1_SRP0: u8 = 0x80;

/// Status Register 2: Status Register Protect 1
pub const SR2_SRP1: u8 = 0x01;
/// Status Register 2: Quad Enable
pub const SR2_QE: u8 = 0x02;
/// Status Register 2: Security Register Lock 1
pub const SR2_LB1: u8 = 0x08;
/// Status Register 2: Security Register Lock 2
pub const SR2_LB2: u8 = 0x10;
/// Status Register 2: Security Register Lock 3
pub const SR2_LB3: u8 = 0x20;
/// Status Register 2: Complement Protect
pub const SR2_CMP: u8 = 0x40;
/// Status Register 2: Suspend Status
pub const SR2_SUS: u8 = 0x80;
