//! c3flash-sim - Pin-level W25Q80BV simulator
//!
//! [`SimFlash`] implements [`Transport`] and decodes the bit-serial protocol
//! edge by edge, the way the real chip sees it. It models what the engine
//! has to get right:
//!
//! - 1 MiB of NOR memory: erase sets bytes to 0xFF, program can only clear
//!   bits and wraps inside the page
//! - volatile and non-volatile status registers, WEL and the 0x50 volatile
//!   write latch
//! - block protection decoded from BP/TB/SEC/CMP; writes and erases into a
//!   protected range are silently dropped
//! - the QE gate: quad commands are ignored while QE is clear
//! - busy timing on a virtual clock that only `delay_us` advances; while
//!   busy the chip answers status reads and nothing else
//! - bus contention when host and chip drive the same data line
//!
//! Write commands take effect when CS rises, as on the real part.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod config;
mod exchange;
#[cfg(feature = "std")]
mod image;

use alloc::vec;
use alloc::vec::Vec;

use c3flash_core::layout::{FLASH_SIZE, PAGE_SIZE};
use c3flash_core::protect::{ProtectedRange, StatusRegisters};
use c3flash_core::spi::opcodes;
use c3flash_core::transport::{LaneMode, Transport};

pub use config::{SimConfig, SimTiming};
#[cfg(feature = "std")]
pub use image::ImageError;

use exchange::{Exchange, Phase};

const SECTOR_SIZE: u32 = 4 * 1024;
const BLOCK_SIZE: u32 = 64 * 1024;

/// SR1 bits WRSR can change
const SR1_WRITABLE: u8 = 0xFC;
/// SR2 bits WRSR can change freely
const SR2_WRITABLE: u8 = opcodes::SR2_SRP1 | opcodes::SR2_QE | opcodes::SR2_CMP;
/// SR2 one-time-programmable lock bits; can be set, never cleared
const SR2_LOCKS: u8 = opcodes::SR2_LB1 | opcodes::SR2_LB2 | opcodes::SR2_LB3;

/// What the chip is driving onto the data lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Drive {
    Float,
    Single(bool),
    Quad(u8),
}

/// Counters for inspecting what reached the chip
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimStats {
    /// CS assertions
    pub transactions: u64,
    /// Erases that changed memory
    pub erases: u64,
    /// Programs that changed memory
    pub programs: u64,
    /// Status register writes that took effect
    pub status_writes: u64,
    /// Commands refused or dropped (busy, no WEL, QE clear, protected)
    pub ignored: u64,
    /// Clock edges where host and chip both drove a data line
    pub contentions: u64,
}

/// Simulated W25Q80BV
#[derive(Debug)]
pub struct SimFlash {
    config: SimConfig,
    data: Vec<u8>,

    sr1: u8,
    sr2: u8,
    nv_sr1: u8,
    nv_sr2: u8,
    wel: bool,
    volatile_write: bool,

    now_us: u64,
    busy_until_us: u64,
    stuck_busy: bool,

    cs: bool,
    sck: bool,
    mosi: bool,
    host_mode: LaneMode,
    host_io: u8,
    drive: Drive,

    exchange: Exchange,
    stats: SimStats,
}

impl SimFlash {
    /// A chip with erased memory and the configured power-on registers
    pub fn new(config: SimConfig) -> Self {
        let nv_sr1 = config.power_on_status.sr1.bits() & SR1_WRITABLE;
        let nv_sr2 = config.power_on_status.sr2.bits() & (SR2_WRITABLE | SR2_LOCKS);
        Self {
            config,
            data: vec![0xFF; FLASH_SIZE as usize],
            sr1: nv_sr1,
            sr2: nv_sr2,
            nv_sr1,
            nv_sr2,
            wel: false,
            volatile_write: false,
            now_us: 0,
            busy_until_us: 0,
            stuck_busy: false,
            cs: false,
            sck: true,
            mosi: false,
            host_mode: LaneMode::Single,
            host_io: 0xF,
            drive: Drive::Float,
            exchange: Exchange::default(),
            stats: SimStats::default(),
        }
    }

    /// A factory fresh W25Q80BV
    pub fn new_default() -> Self {
        Self::new(SimConfig::default())
    }

    /// A chip pre-loaded with `initial_data`, the rest erased
    pub fn with_data(config: SimConfig, initial_data: &[u8]) -> Self {
        let mut flash = Self::new(config);
        let len = core::cmp::min(initial_data.len(), flash.data.len());
        flash.data[..len].copy_from_slice(&initial_data[..len]);
        flash
    }

    /// Memory contents
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable memory contents, bypassing protection
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Bytes of one page
    pub fn page(&self, page: u16) -> &[u8] {
        let start = page as usize * PAGE_SIZE;
        &self.data[start..start + PAGE_SIZE]
    }

    /// Configuration the chip was built with
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Volatile status registers, including BUSY and WEL
    pub fn status(&self) -> StatusRegisters {
        StatusRegisters::from_bytes(self.status1(), self.sr2)
    }

    /// Non-volatile status registers
    pub fn nv_status(&self) -> StatusRegisters {
        StatusRegisters::from_bytes(self.nv_sr1, self.nv_sr2)
    }

    /// Range the current volatile registers protect
    pub fn protected_range(&self) -> ProtectedRange {
        StatusRegisters::from_bytes(self.sr1, self.sr2).protected_range()
    }

    /// Counters since creation
    pub fn stats(&self) -> SimStats {
        self.stats
    }

    /// Whether CS is asserted
    pub fn is_selected(&self) -> bool {
        self.cs
    }

    /// Lane mode the host last configured
    pub fn host_lane_mode(&self) -> LaneMode {
        self.host_mode
    }

    /// Virtual time in microseconds
    pub fn now_us(&self) -> u64 {
        self.now_us
    }

    /// Whether an operation is still in progress
    pub fn is_busy(&self) -> bool {
        self.stuck_busy || self.now_us < self.busy_until_us
    }

    /// Hold BUSY set regardless of timing
    pub fn set_stuck_busy(&mut self, stuck: bool) {
        self.stuck_busy = stuck;
    }

    /// Remove power and apply it again
    ///
    /// Volatile registers reload from the non-volatile copies, latches clear,
    /// anything in flight is abandoned.
    pub fn power_cycle(&mut self) {
        log::debug!("sim: power cycle");
        self.sr1 = self.nv_sr1;
        self.sr2 = self.nv_sr2;
        self.wel = false;
        self.volatile_write = false;
        self.busy_until_us = self.now_us;
        self.exchange = Exchange::default();
        self.drive = Drive::Float;
        self.cs = false;
    }

    fn status1(&self) -> u8 {
        let mut sr1 = self.sr1;
        if self.is_busy() {
            sr1 |= opcodes::SR1_BUSY;
        }
        if self.wel {
            sr1 |= opcodes::SR1_WEL;
        }
        sr1
    }

    fn quad_enabled(&self) -> bool {
        self.sr2 & opcodes::SR2_QE != 0
    }

    fn set_busy(&mut self, duration_us: u32) {
        self.busy_until_us = self.now_us + duration_us as u64;
    }

    fn ignore(&mut self, what: &str) {
        log::debug!("sim: ignored {}", what);
        self.stats.ignored += 1;
    }

    // ------------------------------------------------------------------
    // Pin level decoding
    // ------------------------------------------------------------------

    fn select(&mut self) {
        self.stats.transactions += 1;
        self.exchange = Exchange::default();
        self.drive = Drive::Float;
    }

    fn deselect(&mut self) {
        let exchange = core::mem::take(&mut self.exchange);
        self.drive = Drive::Float;
        self.execute(&exchange);
    }

    /// Decide whether the chip acts on `opcode`
    fn accept(&mut self, opcode: u8) {
        let status_read = matches!(opcode, opcodes::RDSR | opcodes::RDSR2);
        let quad = matches!(opcode, opcodes::QPP | opcodes::OWRQ);
        let known = matches!(
            opcode,
            opcodes::WREN
                | opcodes::WRDI
                | opcodes::VWREN
                | opcodes::RDSR
                | opcodes::RDSR2
                | opcodes::WRSR
                | opcodes::RDID
                | opcodes::REMS
                | opcodes::RDUID
                | opcodes::READ
                | opcodes::OWRQ
                | opcodes::PP
                | opcodes::QPP
                | opcodes::SE_20
                | opcodes::BE_D8
                | opcodes::CE_60
                | opcodes::CE_C7
        );

        let rejected = if !known {
            Some("unsupported opcode")
        } else if self.is_busy() && !status_read {
            Some("command while busy")
        } else if quad && !self.quad_enabled() {
            Some("quad command with QE clear")
        } else {
            None
        };

        if let Some(reason) = rejected {
            log::debug!("sim: opcode 0x{:02X} refused: {}", opcode, reason);
            self.stats.ignored += 1;
            self.exchange.rejected = true;
        }
        self.exchange.opcode = Some(opcode);
    }

    /// IO0 as the chip sees it
    fn host_io0(&self) -> bool {
        match self.host_mode {
            LaneMode::Single => self.mosi,
            LaneMode::QuadWrite => self.host_io & 1 != 0,
            LaneMode::QuadRead => true,
        }
    }

    /// IO0-IO3 as the chip sees them
    fn host_nibble(&self) -> u8 {
        match self.host_mode {
            LaneMode::QuadWrite => self.host_io,
            // IO1 floats high, IO2/IO3 are held high as WP#/HOLD#
            LaneMode::Single => 0b1110 | self.mosi as u8,
            LaneMode::QuadRead => 0xF,
        }
    }

    fn contention(&mut self) {
        if self.stats.contentions == 0 {
            log::warn!(
                "sim: bus contention, host in {:?} while chip drives",
                self.host_mode
            );
        }
        self.stats.contentions += 1;
    }

    fn output_byte(&self, index: usize) -> u8 {
        let id = &self.config.identity;
        match self.exchange.opcode {
            Some(opcodes::RDSR) => self.status1(),
            Some(opcodes::RDSR2) => self.sr2,
            Some(opcodes::RDID) => [id.manufacturer, id.memory_type, id.capacity]
                .get(index)
                .copied()
                .unwrap_or(0xFF),
            Some(opcodes::REMS) => [id.rems_manufacturer, id.rems_device][index % 2],
            Some(opcodes::RDUID) => self.config.unique_id.to_be_bytes()[index % 8],
            Some(opcodes::READ) => self.memory_byte(self.exchange.single_address(), index),
            Some(opcodes::OWRQ) => self.memory_byte(self.exchange.quad_address(), index),
            _ => 0xFF,
        }
    }

    fn memory_byte(&self, addr: Option<u32>, index: usize) -> u8 {
        let addr = addr.unwrap_or(0) as usize;
        self.data[(addr + index) % self.data.len()]
    }

    fn clock(&mut self) {
        match self.exchange.phase() {
            Phase::SingleIn => {
                self.drive = Drive::Float;
                let bit = self.host_io0();
                if let Some(byte) = self.exchange.shift_in(bit) {
                    if self.exchange.opcode.is_none() {
                        self.accept(byte);
                    } else {
                        self.exchange.bytes.push(byte);
                    }
                }
            }
            Phase::QuadIn => {
                self.drive = Drive::Float;
                let nibble = self.host_nibble();
                self.exchange.nibbles.push(nibble);
            }
            Phase::SingleOut => {
                if self.host_mode == LaneMode::QuadWrite {
                    self.contention();
                }
                if self.exchange.needs_output_byte() {
                    self.exchange.out_byte = self.output_byte(self.exchange.out_index);
                }
                let shift = 7 - self.exchange.out_clock;
                self.drive = Drive::Single((self.exchange.out_byte >> shift) & 1 != 0);
                self.exchange.advance_output(8);
            }
            Phase::QuadOut => {
                if self.host_mode != LaneMode::QuadRead {
                    self.contention();
                }
                if self.exchange.needs_output_byte() {
                    self.exchange.out_byte = self.output_byte(self.exchange.out_index);
                }
                let nibble = if self.exchange.out_clock == 0 {
                    self.exchange.out_byte >> 4
                } else {
                    self.exchange.out_byte & 0xF
                };
                self.drive = Drive::Quad(nibble);
                self.exchange.advance_output(2);
            }
            Phase::Ignore => self.drive = Drive::Float,
        }
    }

    // ------------------------------------------------------------------
    // Command execution (on CS rising)
    // ------------------------------------------------------------------

    fn execute(&mut self, exchange: &Exchange) {
        let Some(opcode) = exchange.opcode else {
            return;
        };
        // 0x50 only applies to the command right after it
        let volatile_write = core::mem::take(&mut self.volatile_write);
        if exchange.rejected {
            return;
        }
        if !exchange.byte_aligned() {
            self.ignore("command ended mid-byte");
            return;
        }

        match opcode {
            opcodes::WREN => self.wel = true,
            opcodes::WRDI => self.wel = false,
            opcodes::VWREN => self.volatile_write = true,
            opcodes::WRSR => self.write_status(&exchange.bytes, volatile_write),
            opcodes::CE_60 | opcodes::CE_C7 => self.erase_chip(),
            opcodes::SE_20 => self.erase(exchange.single_address(), SECTOR_SIZE),
            opcodes::BE_D8 => self.erase(exchange.single_address(), BLOCK_SIZE),
            opcodes::PP => self.program(exchange.single_address(), exchange.single_payload()),
            opcodes::QPP => {
                let payload = exchange.quad_payload();
                self.program(exchange.single_address(), &payload)
            }
            _ => {}
        }
    }

    /// Take WEL for a write command, reporting whether it was set
    fn take_write_enable(&mut self, what: &str) -> bool {
        if core::mem::take(&mut self.wel) {
            true
        } else {
            self.ignore(what);
            false
        }
    }

    fn write_status(&mut self, bytes: &[u8], volatile_write: bool) {
        let Some(&new_sr1) = bytes.first() else {
            return;
        };
        // A one-byte write clears the freely writable SR2 bits
        let new_sr2 = bytes.get(1).copied().unwrap_or(0);

        let persist = if volatile_write {
            false
        } else if self.take_write_enable("status write without WEL") {
            true
        } else {
            return;
        };

        self.sr1 = new_sr1 & SR1_WRITABLE;
        self.sr2 = (new_sr2 & SR2_WRITABLE) | ((self.sr2 | new_sr2) & SR2_LOCKS);
        if persist {
            self.nv_sr1 = self.sr1;
            self.nv_sr2 = self.sr2;
            self.set_busy(self.config.timing.status_write_us);
        }
        self.stats.status_writes += 1;
        log::trace!(
            "sim: status {} SR1=0x{:02X} SR2=0x{:02X}",
            if persist { "persisted" } else { "set" },
            self.sr1,
            self.sr2
        );
    }

    fn erase_chip(&mut self) {
        if !self.take_write_enable("chip erase without WEL") {
            return;
        }
        // Any protected block blocks the whole command
        if self.protected_range().is_protected() {
            self.ignore("chip erase with protection active");
            return;
        }
        self.data.fill(0xFF);
        self.set_busy(self.config.timing.chip_erase_us);
        self.stats.erases += 1;
        log::trace!("sim: chip erased");
    }

    fn erase(&mut self, addr: Option<u32>, size: u32) {
        if !self.take_write_enable("erase without WEL") {
            return;
        }
        let Some(addr) = addr else {
            self.ignore("erase without address");
            return;
        };
        let start = (addr % FLASH_SIZE) & !(size - 1);
        if self.protected_range().overlaps(start, size) {
            self.ignore("erase of protected area");
            return;
        }

        self.data[start as usize..(start + size) as usize].fill(0xFF);
        let duration = if size == SECTOR_SIZE {
            self.config.timing.sector_erase_us
        } else {
            self.config.timing.block_erase_us
        };
        self.set_busy(duration);
        self.stats.erases += 1;
        log::trace!("sim: erased 0x{:06X}+0x{:X}", start, size);
    }

    fn program(&mut self, addr: Option<u32>, payload: &[u8]) {
        if !self.take_write_enable("program without WEL") {
            return;
        }
        let Some(addr) = addr else {
            self.ignore("program without address");
            return;
        };
        let addr = addr % FLASH_SIZE;
        let page_start = addr & !(PAGE_SIZE as u32 - 1);
        if self.protected_range().overlaps(page_start, PAGE_SIZE as u32) {
            self.ignore("program of protected page");
            return;
        }

        // Only the last page worth of data is kept, and it wraps in the page
        let skip = payload.len().saturating_sub(PAGE_SIZE);
        let offset = (addr - page_start) as usize;
        for (i, &byte) in payload.iter().enumerate().skip(skip) {
            let index = page_start as usize + (offset + i) % PAGE_SIZE;
            self.data[index] &= byte;
        }

        self.set_busy(self.config.timing.page_program_us);
        self.stats.programs += 1;
        log::trace!("sim: programmed {} bytes at 0x{:06X}", payload.len(), addr);
    }
}

impl Transport for SimFlash {
    fn set_cs(&mut self, active: bool) {
        match (self.cs, active) {
            (false, true) => self.select(),
            (true, false) => self.deselect(),
            _ => {}
        }
        self.cs = active;
    }

    fn set_sck(&mut self, high: bool) {
        let rising = high && !self.sck;
        self.sck = high;
        if rising && self.cs {
            self.clock();
        }
    }

    fn set_mosi(&mut self, high: bool) {
        self.mosi = high;
    }

    fn get_miso(&self) -> bool {
        match self.drive {
            Drive::Single(bit) => bit,
            _ => true,
        }
    }

    fn set_lane_mode(&mut self, mode: LaneMode) {
        self.host_mode = mode;
    }

    fn set_quad_io(&mut self, nibble: u8) {
        self.host_io = nibble & 0xF;
    }

    fn get_quad_io(&self) -> u8 {
        match self.drive {
            Drive::Quad(nibble) => nibble,
            _ => 0xF,
        }
    }

    fn delay_us(&mut self, us: u32) {
        self.now_us += us as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use c3flash_core::transport::bitbang;

    fn command(flash: &mut SimFlash, bytes: &[u8]) {
        flash.set_cs(true);
        bitbang::single::write_bytes(flash, bytes);
        flash.set_cs(false);
    }

    fn read_reg(flash: &mut SimFlash, opcode: u8) -> u8 {
        flash.set_cs(true);
        bitbang::single::write_byte(flash, opcode);
        let value = bitbang::single::read_byte(flash);
        flash.set_cs(false);
        value
    }

    fn read(flash: &mut SimFlash, addr: u32, buf: &mut [u8]) {
        flash.set_cs(true);
        bitbang::single::write_bytes(
            flash,
            &[opcodes::READ, (addr >> 16) as u8, (addr >> 8) as u8, addr as u8],
        );
        bitbang::single::read_bytes(flash, buf);
        flash.set_cs(false);
    }

    fn instant() -> SimFlash {
        SimFlash::new(SimConfig {
            timing: SimTiming::instant(),
            ..SimConfig::default()
        })
    }

    #[test]
    fn test_read_jedec_id() {
        let mut flash = instant();
        flash.set_cs(true);
        bitbang::single::write_byte(&mut flash, opcodes::RDID);
        let mut id = [0u8; 3];
        bitbang::single::read_bytes(&mut flash, &mut id);
        flash.set_cs(false);
        assert_eq!(id, [0xEF, 0x40, 0x14]);
    }

    #[test]
    fn test_program_needs_wel_and_only_clears_bits() {
        let mut flash = instant();
        command(&mut flash, &[opcodes::PP, 0x00, 0x10, 0x00, 0x12]);
        assert_eq!(flash.data()[0x1000], 0xFF);

        command(&mut flash, &[opcodes::WREN]);
        command(&mut flash, &[opcodes::PP, 0x00, 0x10, 0x00, 0xF0, 0x0F]);
        command(&mut flash, &[opcodes::WREN]);
        command(&mut flash, &[opcodes::PP, 0x00, 0x10, 0x00, 0x3C, 0xFF]);

        let mut buf = [0u8; 3];
        read(&mut flash, 0x1000, &mut buf);
        assert_eq!(buf, [0x30, 0x0F, 0xFF]);
    }

    #[test]
    fn test_program_wraps_within_page() {
        let mut flash = instant();
        command(&mut flash, &[opcodes::WREN]);
        command(&mut flash, &[opcodes::PP, 0x00, 0x00, 0xFF, 0x11, 0x22]);
        assert_eq!(flash.data()[0xFF], 0x11);
        assert_eq!(flash.data()[0x00], 0x22);
        assert_eq!(flash.data()[0x100], 0xFF);
    }

    #[test]
    fn test_erase_sector() {
        let mut flash = instant();
        flash.data_mut()[0x2000..0x3001].fill(0);
        command(&mut flash, &[opcodes::WREN]);
        command(&mut flash, &[opcodes::SE_20, 0x00, 0x20, 0x10]);
        assert!(flash.data()[0x2000..0x3000].iter().all(|&b| b == 0xFF));
        assert_eq!(flash.data()[0x3000], 0);
        assert_eq!(flash.stats().erases, 1);
    }

    #[test]
    fn test_volatile_status_write_is_lost_on_power_cycle() {
        let mut flash = instant();
        command(&mut flash, &[opcodes::VWREN]);
        command(&mut flash, &[opcodes::WRSR, 0x1C, 0x02]);
        assert_eq!(read_reg(&mut flash, opcodes::RDSR), 0x1C);
        assert_eq!(read_reg(&mut flash, opcodes::RDSR2), 0x02);
        assert_eq!(flash.nv_status(), StatusRegisters::default());

        flash.power_cycle();
        assert_eq!(read_reg(&mut flash, opcodes::RDSR), 0x00);
    }

    #[test]
    fn test_protected_erase_is_ignored() {
        let mut flash = instant();
        command(&mut flash, &[opcodes::VWREN]);
        command(&mut flash, &[opcodes::WRSR, 0x1C, 0x02]);
        flash.data_mut()[0] = 0;
        command(&mut flash, &[opcodes::WREN]);
        command(&mut flash, &[opcodes::SE_20, 0, 0, 0]);
        assert_eq!(flash.data()[0], 0);
        // WEL is consumed either way
        assert_eq!(read_reg(&mut flash, opcodes::RDSR) & opcodes::SR1_WEL, 0);
    }

    #[test]
    fn test_busy_refuses_everything_but_status() {
        let mut flash = SimFlash::new_default();
        command(&mut flash, &[opcodes::WREN]);
        command(&mut flash, &[opcodes::SE_20, 0, 0, 0]);
        assert!(flash.is_busy());
        assert_eq!(read_reg(&mut flash, opcodes::RDSR) & opcodes::SR1_BUSY, 1);

        command(&mut flash, &[opcodes::WREN]);
        assert_eq!(read_reg(&mut flash, opcodes::RDSR) & opcodes::SR1_WEL, 0);

        flash.delay_us(flash.config().timing.sector_erase_us);
        assert!(!flash.is_busy());
        assert_eq!(read_reg(&mut flash, opcodes::RDSR), 0);
    }

    #[test]
    fn test_quad_commands_need_qe() {
        let mut flash = instant();
        flash.set_cs(true);
        bitbang::single::write_byte(&mut flash, opcodes::OWRQ);
        flash.set_lane_mode(LaneMode::QuadWrite);
        for _ in 0..8 {
            bitbang::quad::write_nibble(&mut flash, 0);
        }
        flash.set_lane_mode(LaneMode::QuadRead);
        flash.data_mut()[0] = 0x12;
        assert_eq!(bitbang::quad::read_byte(&mut flash), 0xFF);
        flash.set_cs(false);
        flash.set_lane_mode(LaneMode::Single);
        assert_eq!(flash.stats().ignored, 1);
    }

    #[test]
    fn test_contention_is_counted() {
        let mut flash = instant();
        command(&mut flash, &[opcodes::VWREN]);
        command(&mut flash, &[opcodes::WRSR, 0x00, 0x02]);
        flash.set_cs(true);
        bitbang::single::write_byte(&mut flash, opcodes::OWRQ);
        flash.set_lane_mode(LaneMode::QuadWrite);
        for _ in 0..8 {
            bitbang::quad::write_nibble(&mut flash, 0);
        }
        // Forgot to turn the lines around
        bitbang::quad::write_nibble(&mut flash, 0);
        flash.set_cs(false);
        flash.set_lane_mode(LaneMode::Single);
        assert_eq!(flash.stats().contentions, 1);
    }
}
