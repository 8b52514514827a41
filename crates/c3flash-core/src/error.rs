//! Error types for c3flash-core
//!
//! A single `Copy` error enum shared by every layer of the engine. Nothing in
//! the engine retries: each variant is handed straight back to the caller,
//! which decides whether to halt, degrade or prompt the user.

use core::fmt;

use crate::transport::LaneMode;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The chip did not clear its busy flag within the allowed time.
    ///
    /// The effect of the command in flight is undefined; re-read the
    /// affected area rather than assuming success or failure.
    Timeout,
    /// JEDEC or manufacturer/device ID did not match the expected part
    IdentityMismatch,
    /// Bitmap index is outside the bitmap address table
    InvalidIndex,
    /// Preferences, profile or 64K block argument is outside its range
    InvalidBlock,
    /// Page is not aligned to the erase granularity
    InvalidAlignment,
    /// Page or read length runs past the end of the chip
    AddressOutOfBounds,
    /// Buffer is larger than a page, or too small for the operation
    BufferTooSmall,
    /// A transport operation was issued in the wrong lane mode
    LaneMisuse {
        /// Mode the operation requires
        expected: LaneMode,
        /// Mode the bus was actually in
        actual: LaneMode,
    },
    /// `begin()` has not been called yet
    NotInitialized,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timed out waiting for flash to become ready"),
            Self::IdentityMismatch => write!(f, "flash chip identity mismatch"),
            Self::InvalidIndex => write!(f, "bitmap index out of range"),
            Self::InvalidBlock => write!(f, "block number out of range"),
            Self::InvalidAlignment => write!(f, "page is not sector aligned"),
            Self::AddressOutOfBounds => write!(f, "address out of bounds"),
            Self::BufferTooSmall => write!(f, "buffer size invalid for a page operation"),
            Self::LaneMisuse { expected, actual } => write!(
                f,
                "transport in {:?} mode, operation requires {:?}",
                actual, expected
            ),
            Self::NotInitialized => write!(f, "flash engine not initialized (call begin)"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
