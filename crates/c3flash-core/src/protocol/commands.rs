//! W25Q80BV command helpers

use super::{max_polls, BUSY_POLL_INTERVAL_US};
use crate::error::{Error, Result};
use crate::spi::{opcodes, PageAddress};
use crate::transport::{Bus, Transport};

/// Read status register 1
pub fn read_status1<T: Transport>(bus: &mut Bus<T>) -> Result<u8> {
    read_register(bus, opcodes::RDSR)
}

/// Read status register 2
pub fn read_status2<T: Transport>(bus: &mut Bus<T>) -> Result<u8> {
    read_register(bus, opcodes::RDSR2)
}

fn read_register<T: Transport>(bus: &mut Bus<T>, opcode: u8) -> Result<u8> {
    let mut txn = bus.select();
    txn.write_byte(opcode)?;
    txn.read_byte()
}

/// Send a bare one-byte command in its own transaction
pub fn send_command<T: Transport>(bus: &mut Bus<T>, opcode: u8) -> Result<()> {
    log::trace!("flash: command 0x{:02X}", opcode);
    bus.select().write_byte(opcode)
}

/// Send the Write Enable command
pub fn write_enable<T: Transport>(bus: &mut Bus<T>) -> Result<()> {
    send_command(bus, opcodes::WREN)
}

/// Send an opcode followed by a single lane page address
///
/// Used by the erase commands, which take effect when CS rises.
pub fn send_address_command<T: Transport>(
    bus: &mut Bus<T>,
    opcode: u8,
    page: PageAddress,
) -> Result<()> {
    log::trace!("flash: command 0x{:02X} page {}", opcode, page.page());
    let mut txn = bus.select();
    txn.write_byte(opcode)?;
    txn.write_bytes(&page.to_bytes())
}

/// Write both status registers in one WRSR transaction
///
/// The caller must have sent WREN or VWREN first.
pub fn write_status12<T: Transport>(bus: &mut Bus<T>, sr1: u8, sr2: u8) -> Result<()> {
    let mut txn = bus.select();
    txn.write_byte(opcodes::WRSR)?;
    txn.write_bytes(&[sr1, sr2])
}

/// Wait for the BUSY bit to clear
///
/// Polls status register 1 every [`BUSY_POLL_INTERVAL_US`] microseconds,
/// giving up after `timeout_ms` worth of polls.
pub fn wait_not_busy<T: Transport>(bus: &mut Bus<T>, timeout_ms: u32) -> Result<()> {
    for _ in 0..max_polls(timeout_ms) {
        let status = read_status1(bus)?;
        if status & opcodes::SR1_BUSY == 0 {
            return Ok(());
        }
        bus.delay_us(BUSY_POLL_INTERVAL_US);
    }

    log::warn!("flash: still busy after {} ms", timeout_ms);
    Err(Error::Timeout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LaneMode;

    /// Answers every single lane read with the same status byte and counts
    /// transactions and delay time.
    struct StatusStub {
        status: u8,
        bit: u8,
        cs: bool,
        selects: usize,
        delayed_us: u64,
        busy_until_us: u64,
    }

    impl StatusStub {
        fn new(busy_until_us: u64) -> Self {
            Self {
                status: 0,
                bit: 0,
                cs: false,
                selects: 0,
                delayed_us: 0,
                busy_until_us,
            }
        }
    }

    impl Transport for StatusStub {
        fn set_cs(&mut self, active: bool) {
            if active && !self.cs {
                self.selects += 1;
                self.bit = 0;
                self.status = if self.delayed_us < self.busy_until_us {
                    opcodes::SR1_BUSY
                } else {
                    0
                };
            }
            self.cs = active;
        }

        fn set_sck(&mut self, high: bool) {
            if high {
                self.bit = self.bit.wrapping_add(1);
            }
        }

        fn set_mosi(&mut self, _high: bool) {}

        fn get_miso(&self) -> bool {
            // Bits 9..16 of the transaction are the status byte
            match self.bit {
                9..=16 => (self.status >> (16 - self.bit)) & 1 != 0,
                _ => false,
            }
        }

        fn set_lane_mode(&mut self, _mode: LaneMode) {}

        fn set_quad_io(&mut self, _nibble: u8) {}

        fn get_quad_io(&self) -> u8 {
            0
        }

        fn delay_us(&mut self, us: u32) {
            self.delayed_us += us as u64;
        }
    }

    #[test]
    fn test_wait_returns_once_busy_clears() {
        let mut bus = Bus::new(StatusStub::new(1_000));
        bus.idle();
        wait_not_busy(&mut bus, 50).unwrap();
        // 10 busy polls, then one clear
        assert_eq!(bus.transport().selects, 11);
        assert!(!bus.transport().cs);
    }

    #[test]
    fn test_wait_times_out() {
        let mut bus = Bus::new(StatusStub::new(u64::MAX));
        bus.idle();
        assert_eq!(wait_not_busy(&mut bus, 15), Err(Error::Timeout));
        assert_eq!(bus.transport().selects, 150);
        assert_eq!(bus.transport().delayed_us, 15_000);
        assert!(!bus.transport().cs);
    }

    #[test]
    fn test_read_status_register() {
        let mut bus = Bus::new(StatusStub::new(u64::MAX));
        bus.idle();
        assert_eq!(read_status1(&mut bus).unwrap(), opcodes::SR1_BUSY);
    }

    #[test]
    fn test_max_polls() {
        assert_eq!(max_polls(50), 500);
        assert_eq!(max_polls(6000), 60_000);
        assert_eq!(max_polls(0), 0);
    }
}
