//! Streaming quad reads
//!
//! A read session keeps one Octal Word Read Quad I/O transaction open so a
//! caller can pull a large bitmap through a small buffer, interleaving
//! flash reads with display writes. The chip increments its internal
//! address on its own; the session only has to keep clocking.

use super::SerialFlash;
use crate::error::{Error, Result};
use crate::protocol::{self, DEFAULT_BUSY_TIMEOUT_MS};
use crate::spi::{opcodes, PageAddress};
use crate::transport::{LaneMode, Transaction, Transport};

/// Mode byte sent after the address; anything but `0bxx10_xxxx` keeps the
/// chip out of continuous read mode
const MODE_NIBBLES: [u8; 2] = [0, 0];

/// An open streaming read
///
/// Holds the engine's bus for as long as it lives, so no other flash
/// operation can run until it is ended or dropped. Dropping deselects the
/// chip and returns the data lines to single lane mode.
pub struct ReadSession<'a, T: Transport> {
    txn: Transaction<'a, T>,
    start_page: u16,
    bytes_read: usize,
    remaining: usize,
}

impl<T: Transport> ReadSession<'_, T> {
    /// Stream the next `dest.len()` bytes
    ///
    /// Fails with [`Error::AddressOutOfBounds`] without clocking anything if
    /// the read would run past the end of the chip.
    pub fn continue_read(&mut self, dest: &mut [u8]) -> Result<()> {
        if dest.len() > self.remaining {
            return Err(Error::AddressOutOfBounds);
        }
        self.txn.read_quad(dest)?;
        self.bytes_read += dest.len();
        self.remaining -= dest.len();
        Ok(())
    }

    /// Page the session started at
    pub fn start_page(&self) -> u16 {
        self.start_page
    }

    /// Bytes streamed so far, including the initial read
    pub fn bytes_read(&self) -> usize {
        self.bytes_read
    }

    /// Bytes left before the end of the chip
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Deselect the chip and restore single lane mode
    pub fn end_read(self) {
        log::trace!(
            "flash: read session from page {} ended after {} bytes",
            self.start_page,
            self.bytes_read
        );
    }
}

impl<T: Transport> SerialFlash<T> {
    /// Start a streaming read at `page` and fill `dest`
    ///
    /// Sends 0xE3 on the single lane, then the address and mode byte as
    /// eight nibbles, then turns the lines around and reads. Keep reading
    /// with [`ReadSession::continue_read`].
    pub fn start_read(&mut self, page: u16, dest: &mut [u8]) -> Result<ReadSession<'_, T>> {
        self.ensure_ready()?;
        let addr = PageAddress::new(page)?;
        let available = addr.bytes_to_end();
        if dest.len() > available {
            return Err(Error::AddressOutOfBounds);
        }

        protocol::wait_not_busy(&mut self.bus, DEFAULT_BUSY_TIMEOUT_MS)?;

        log::trace!("flash: read session from page {}", page);
        let mut txn = self.bus.select();
        txn.write_byte(opcodes::OWRQ)?;
        txn.set_mode(LaneMode::QuadWrite);
        txn.write_nibbles(&addr.to_nibbles())?;
        txn.write_nibbles(&MODE_NIBBLES)?;
        txn.set_mode(LaneMode::QuadRead);
        txn.read_quad(dest)?;

        Ok(ReadSession {
            txn,
            start_page: page,
            bytes_read: dest.len(),
            remaining: available - dest.len(),
        })
    }

    /// Read `dest.len()` bytes from `page` in one go
    pub fn read(&mut self, page: u16, dest: &mut [u8]) -> Result<()> {
        self.start_read(page, dest)?.end_read();
        Ok(())
    }
}
