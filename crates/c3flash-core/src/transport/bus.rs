//! Chip-select scoped transactions
//!
//! [`Bus::select`] asserts CS and returns a [`Transaction`]. Dropping the
//! transaction deasserts CS and puts the data lines back in single lane
//! mode, so an early `?` return can never leave the chip selected or the
//! lines pointing the wrong way.

use super::{bitbang, LaneMode, Transport};
use crate::error::{Error, Result};

/// Owner of the transport and its current lane mode
pub struct Bus<T: Transport> {
    transport: T,
    mode: LaneMode,
}

impl<T: Transport> Bus<T> {
    /// Wrap a transport. Pins are not touched until [`Bus::idle`].
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            mode: LaneMode::Single,
        }
    }

    /// Put the pins in their resting state: CS high, SCK high, single lane
    pub fn idle(&mut self) {
        self.transport.set_lane_mode(LaneMode::Single);
        self.mode = LaneMode::Single;
        self.transport.set_cs(false);
        self.transport.set_sck(true);
    }

    /// Assert CS and start a transaction
    pub fn select(&mut self) -> Transaction<'_, T> {
        self.transport.set_cs(true);
        Transaction { bus: self }
    }

    /// Current lane mode
    pub fn mode(&self) -> LaneMode {
        self.mode
    }

    /// Block for `us` microseconds
    pub fn delay_us(&mut self, us: u32) {
        self.transport.delay_us(us);
    }

    /// Borrow the transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Give the transport back
    pub fn into_inner(self) -> T {
        self.transport
    }
}

/// An open, chip-selected exchange
///
/// Every data operation checks the lane mode first and fails with
/// [`Error::LaneMisuse`] without clocking anything if it does not match.
pub struct Transaction<'a, T: Transport> {
    bus: &'a mut Bus<T>,
}

impl<T: Transport> Transaction<'_, T> {
    /// Switch data line direction/width mid-transaction
    pub fn set_mode(&mut self, mode: LaneMode) {
        if self.bus.mode != mode {
            log::trace!("bus: lane mode {:?} -> {:?}", self.bus.mode, mode);
            self.bus.transport.set_lane_mode(mode);
            self.bus.mode = mode;
        }
    }

    /// Current lane mode
    pub fn mode(&self) -> LaneMode {
        self.bus.mode
    }

    fn require(&self, expected: LaneMode) -> Result<()> {
        if self.bus.mode == expected {
            Ok(())
        } else {
            Err(Error::LaneMisuse {
                expected,
                actual: self.bus.mode,
            })
        }
    }

    /// Write a byte on the single lane
    pub fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.require(LaneMode::Single)?;
        bitbang::single::write_byte(&mut self.bus.transport, byte);
        Ok(())
    }

    /// Write bytes on the single lane
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.require(LaneMode::Single)?;
        bitbang::single::write_bytes(&mut self.bus.transport, bytes);
        Ok(())
    }

    /// Read a byte from the single lane
    pub fn read_byte(&mut self) -> Result<u8> {
        self.require(LaneMode::Single)?;
        Ok(bitbang::single::read_byte(&mut self.bus.transport))
    }

    /// Read bytes from the single lane
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        self.require(LaneMode::Single)?;
        bitbang::single::read_bytes(&mut self.bus.transport, buf);
        Ok(())
    }

    /// Drive raw nibbles, one per clock
    pub fn write_nibbles(&mut self, nibbles: &[u8]) -> Result<()> {
        self.require(LaneMode::QuadWrite)?;
        for &nibble in nibbles {
            bitbang::quad::write_nibble(&mut self.bus.transport, nibble);
        }
        Ok(())
    }

    /// Write bytes on the quad lanes, high nibble first
    pub fn write_quad(&mut self, bytes: &[u8]) -> Result<()> {
        self.require(LaneMode::QuadWrite)?;
        bitbang::quad::write_bytes(&mut self.bus.transport, bytes);
        Ok(())
    }

    /// Read bytes from the quad lanes, high nibble first
    pub fn read_quad(&mut self, buf: &mut [u8]) -> Result<()> {
        self.require(LaneMode::QuadRead)?;
        bitbang::quad::read_bytes(&mut self.bus.transport, buf);
        Ok(())
    }
}

impl<T: Transport> Drop for Transaction<'_, T> {
    fn drop(&mut self) {
        self.bus.transport.set_cs(false);
        if self.bus.mode != LaneMode::Single {
            self.bus.transport.set_lane_mode(LaneMode::Single);
            self.bus.mode = LaneMode::Single;
        }
    }
}
