//! The flash engine: protection, erase and program

use crate::error::{Error, Result};
use crate::layout::{
    prefs_slot_page, Region, PAGES_PER_BLOCK, PAGES_PER_SECTOR, PAGE_SIZE, PREFS_SLOTS,
    USER_BLOCKS,
};
use crate::protect::{Persistence, ProtectionProfile, ProtectionState, StatusRegisters};
use crate::protocol::{
    self, BLOCK_ERASE_TIMEOUT_MS, CHIP_ERASE_TIMEOUT_MS, DEFAULT_BUSY_TIMEOUT_MS,
    SECTOR_ERASE_TIMEOUT_MS, STATUS_WRITE_TIMEOUT_MS,
};
use crate::spi::{opcodes, PageAddress};
use crate::transport::{Bus, LaneMode, Transport};

/// W25Q80BV storage engine
///
/// Owns the transport and the shadow of the last protection setting it
/// applied. Every operation takes `&mut self`, so only one thing talks to
/// the chip at a time; a [`ReadSession`](super::ReadSession) holds that
/// borrow until it ends.
///
/// Nothing here retries. Erase helpers that lift protection always try to
/// put [`ProtectionProfile::All`] back, even when the erase itself failed.
pub struct SerialFlash<T: Transport> {
    pub(super) bus: Bus<T>,
    initialized: bool,
    protection: Option<ProtectionState>,
}

impl<T: Transport> SerialFlash<T> {
    /// Wrap a transport. Call [`begin`](Self::begin) before anything else.
    pub fn new(transport: T) -> Self {
        Self {
            bus: Bus::new(transport),
            initialized: false,
            protection: None,
        }
    }

    /// Put the pins in their idle state and protect the whole chip
    ///
    /// CS goes inactive, SCK high, data lines single lane. Then
    /// [`ProtectionProfile::All`] is applied temporarily.
    pub fn begin(&mut self) -> Result<()> {
        self.bus.idle();
        self.initialized = true;
        log::debug!("flash: bus idle, protecting chip");
        self.set_protection(ProtectionProfile::All, Persistence::Temporary)
    }

    /// Whether [`begin`](Self::begin) has run
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Last protection setting applied through this engine
    pub fn protection(&self) -> Option<ProtectionState> {
        self.protection
    }

    /// Borrow the transport
    pub fn transport(&self) -> &T {
        self.bus.transport()
    }

    /// Mutably borrow the transport
    pub fn transport_mut(&mut self) -> &mut T {
        self.bus.transport_mut()
    }

    /// Give the transport back
    pub fn into_inner(self) -> T {
        self.bus.into_inner()
    }

    pub(super) fn ensure_ready(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    /// Poll until the chip is idle or `timeout_ms` passes
    pub fn wait_not_busy(&mut self, timeout_ms: u32) -> Result<()> {
        self.ensure_ready()?;
        protocol::wait_not_busy(&mut self.bus, timeout_ms)
    }

    /// Read both status registers
    pub fn status_registers(&mut self) -> Result<StatusRegisters> {
        self.ensure_ready()?;
        let sr1 = protocol::read_status1(&mut self.bus)?;
        let sr2 = protocol::read_status2(&mut self.bus)?;
        let regs = StatusRegisters::from_bytes(sr1, sr2);
        log::debug!("flash: {}", regs);
        Ok(regs)
    }

    /// Apply a protection profile
    ///
    /// `Temporary` enables a volatile status register write (0x50) and is
    /// lost at power off. `Permanent` uses a regular write enable (0x06) so
    /// the non-volatile copy is updated too, which takes up to 15 ms.
    ///
    /// Protection is never restored automatically: a caller that narrows it
    /// to write something must put [`ProtectionProfile::All`] back.
    pub fn set_protection(
        &mut self,
        profile: ProtectionProfile,
        persistence: Persistence,
    ) -> Result<()> {
        self.ensure_ready()?;
        protocol::wait_not_busy(&mut self.bus, DEFAULT_BUSY_TIMEOUT_MS)?;

        let enable = match persistence {
            Persistence::Temporary => opcodes::VWREN,
            Persistence::Permanent => opcodes::WREN,
        };
        protocol::send_command(&mut self.bus, enable)?;

        let (sr1, sr2) = profile.status_bits();
        protocol::write_status12(&mut self.bus, sr1, sr2)?;
        protocol::wait_not_busy(&mut self.bus, STATUS_WRITE_TIMEOUT_MS)?;

        log::debug!("flash: protection {} ({})", profile, persistence);
        self.protection = Some(ProtectionState {
            profile,
            persistence,
        });
        Ok(())
    }

    /// Open or close the preferences and profile area for writing
    ///
    /// Shorthand for a temporary `NotPrefs` or `All`.
    pub fn allow_writing_to_prefs(&mut self, allow: bool) -> Result<()> {
        let profile = if allow {
            ProtectionProfile::NotPrefs
        } else {
            ProtectionProfile::All
        };
        self.set_protection(profile, Persistence::Temporary)
    }

    /// Erase the whole chip
    ///
    /// The chip is left completely unprotected, with `None` written
    /// permanently so QE survives a power cycle. Bitmap provisioning relies
    /// on this.
    pub fn erase_chip(&mut self) -> Result<()> {
        self.ensure_ready()?;
        log::info!("flash: erasing chip");
        protocol::wait_not_busy(&mut self.bus, DEFAULT_BUSY_TIMEOUT_MS)?;
        self.set_protection(ProtectionProfile::None, Persistence::Temporary)?;
        protocol::write_enable(&mut self.bus)?;
        protocol::send_command(&mut self.bus, opcodes::CE_60)?;
        protocol::wait_not_busy(&mut self.bus, CHIP_ERASE_TIMEOUT_MS)?;
        self.set_protection(ProtectionProfile::None, Persistence::Permanent)
    }

    /// Erase the 4K sector starting at `page`
    ///
    /// `page` must be a multiple of 16. Only sectors in the preferences and
    /// profile area actually erase: the operation runs under `NotPrefs` and
    /// restores `All` afterwards.
    pub fn erase_sector_4k(&mut self, page: u16) -> Result<()> {
        self.ensure_ready()?;
        if page % PAGES_PER_SECTOR != 0 {
            return Err(Error::InvalidAlignment);
        }
        let addr = PageAddress::new(page)?;

        log::debug!("flash: erase 4K sector at page {}", page);
        self.with_user_area_unlocked(|flash| {
            flash.erase_unit(opcodes::SE_20, addr, SECTOR_ERASE_TIMEOUT_MS)
        })
    }

    /// Erase 64K block 0 or 1, the preferences and profile area
    pub fn erase_block_64k(&mut self, index: u8) -> Result<()> {
        self.ensure_ready()?;
        let addr = user_block_address(index)?;

        log::debug!("flash: erase 64K block {}", index);
        self.with_user_area_unlocked(|flash| {
            flash.erase_unit(opcodes::BE_D8, addr, BLOCK_ERASE_TIMEOUT_MS)
        })
    }

    /// Erase preferences slot `slot` (0 - 3)
    pub fn erase_prefs_block(&mut self, slot: u8) -> Result<()> {
        self.ensure_ready()?;
        if slot >= PREFS_SLOTS {
            log::warn!("flash: prefs slot {} out of range", slot);
            return Err(Error::InvalidBlock);
        }
        self.erase_sector_4k(prefs_slot_page(slot))
    }

    /// Erase the 4K profile sector starting at `page`
    ///
    /// `page` must be sector aligned and inside pages 64 - 511.
    pub fn erase_profile_block(&mut self, page: u16) -> Result<()> {
        self.ensure_ready()?;
        if page % PAGES_PER_SECTOR != 0 || !Region::Profiles.pages().contains(&page) {
            log::warn!("flash: profile block {} out of range", page);
            return Err(Error::InvalidBlock);
        }
        self.erase_sector_4k(page)
    }

    /// Erase all preferences and profiles (the lowest 128K)
    pub fn factory_reset(&mut self) -> Result<()> {
        self.ensure_ready()?;
        log::info!("flash: factory reset of preferences and profiles");
        self.with_user_area_unlocked(|flash| {
            for index in 0..USER_BLOCKS {
                let addr = user_block_address(index)?;
                flash.erase_unit(opcodes::BE_D8, addr, BLOCK_ERASE_TIMEOUT_MS)?;
            }
            Ok(())
        })
    }

    /// Program up to one page with the quad input page program command
    ///
    /// Writes start at the page boundary. The page must already be erased and
    /// the protection profile must allow the write; neither is checked. An
    /// empty `data` does nothing.
    pub fn program_page(&mut self, page: u16, data: &[u8]) -> Result<()> {
        self.ensure_ready()?;
        let Some(addr) = self.program_target(page, data)? else {
            return Ok(());
        };

        protocol::wait_not_busy(&mut self.bus, DEFAULT_BUSY_TIMEOUT_MS)?;
        protocol::write_enable(&mut self.bus)?;

        log::trace!("flash: quad program {} bytes at page {}", data.len(), page);
        let mut txn = self.bus.select();
        txn.write_byte(opcodes::QPP)?;
        txn.write_bytes(&addr.to_bytes())?;
        txn.set_mode(LaneMode::QuadWrite);
        txn.write_quad(data)
    }

    /// Program up to one page on the single lane
    ///
    /// Slower than [`program_page`](Self::program_page) but works with QE
    /// clear.
    pub fn program_page_single(&mut self, page: u16, data: &[u8]) -> Result<()> {
        self.ensure_ready()?;
        let Some(addr) = self.program_target(page, data)? else {
            return Ok(());
        };

        protocol::wait_not_busy(&mut self.bus, DEFAULT_BUSY_TIMEOUT_MS)?;
        protocol::write_enable(&mut self.bus)?;

        log::trace!("flash: program {} bytes at page {}", data.len(), page);
        let mut txn = self.bus.select();
        txn.write_byte(opcodes::PP)?;
        txn.write_bytes(&addr.to_bytes())?;
        txn.write_bytes(data)
    }

    /// Read from a page boundary on the single lane
    pub fn read_single(&mut self, page: u16, dest: &mut [u8]) -> Result<()> {
        self.ensure_ready()?;
        let addr = PageAddress::new(page)?;
        if dest.len() > addr.bytes_to_end() {
            return Err(Error::AddressOutOfBounds);
        }

        protocol::wait_not_busy(&mut self.bus, DEFAULT_BUSY_TIMEOUT_MS)?;

        let mut txn = self.bus.select();
        txn.write_byte(opcodes::READ)?;
        txn.write_bytes(&addr.to_bytes())?;
        txn.read_bytes(dest)
    }

    /// Validate a program request; `None` means there is nothing to write
    fn program_target(&self, page: u16, data: &[u8]) -> Result<Option<PageAddress>> {
        if data.len() > PAGE_SIZE {
            return Err(Error::BufferTooSmall);
        }
        let addr = PageAddress::new(page)?;
        Ok((!data.is_empty()).then_some(addr))
    }

    fn erase_unit(&mut self, opcode: u8, addr: PageAddress, timeout_ms: u32) -> Result<()> {
        protocol::write_enable(&mut self.bus)?;
        protocol::send_address_command(&mut self.bus, opcode, addr)?;
        protocol::wait_not_busy(&mut self.bus, timeout_ms)
    }

    /// Run `op` with the preferences and profile area writable
    ///
    /// `All` is put back whatever `op` returned; the first error wins.
    fn with_user_area_unlocked<F>(&mut self, op: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let unlocked = protocol::wait_not_busy(&mut self.bus, DEFAULT_BUSY_TIMEOUT_MS)
            .and_then(|()| self.set_protection(ProtectionProfile::NotPrefs, Persistence::Temporary));

        let result = match unlocked {
            Ok(()) => op(self),
            Err(e) => Err(e),
        };

        let restored = self.set_protection(ProtectionProfile::All, Persistence::Temporary);
        if let (Err(e), Ok(())) = (&result, &restored) {
            log::warn!("flash: operation failed ({}), protection restored", e);
        }
        result.and(restored)
    }
}

fn user_block_address(index: u8) -> Result<PageAddress> {
    if index >= USER_BLOCKS {
        log::warn!("flash: 64K block {} out of range", index);
        return Err(Error::InvalidBlock);
    }
    PageAddress::new(index as u16 * PAGES_PER_BLOCK)
}
