//! Command sequences and the busy monitor
//!
//! Thin helpers over [`Bus`](crate::transport::Bus) that speak the
//! W25Q80BV command set. Each helper opens its own transaction, so the chip
//! is deselected again by the time it returns, whether it succeeded or not.
//!
//! The busy monitor polls status register 1 every
//! [`BUSY_POLL_INTERVAL_US`] microseconds. A wait that runs out returns
//! [`Error::Timeout`](crate::Error::Timeout) and is never retried.

mod commands;

pub use commands::*;

/// Delay between busy polls
pub const BUSY_POLL_INTERVAL_US: u32 = 100;

/// Wait before any state-changing command, for whatever was in flight
pub const DEFAULT_BUSY_TIMEOUT_MS: u32 = 50;
/// Non-volatile status register write
pub const STATUS_WRITE_TIMEOUT_MS: u32 = 15;
/// 4K sector erase
pub const SECTOR_ERASE_TIMEOUT_MS: u32 = 400;
/// 64K block erase
pub const BLOCK_ERASE_TIMEOUT_MS: u32 = 1000;
/// Whole chip erase
pub const CHIP_ERASE_TIMEOUT_MS: u32 = 6000;

/// Number of status polls that fit in `timeout_ms`
pub const fn max_polls(timeout_ms: u32) -> u32 {
    timeout_ms.saturating_mul(1000) / BUSY_POLL_INTERVAL_US
}
