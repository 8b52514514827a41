//! Bitmap address table
//!
//! UI bitmaps are written once at the factory, back to back from page 528.
//! Where each one starts is recorded in a 16-page table at page 512: 42
//! six-byte entries per page, 672 in total. Entry 0 always starts at
//! [`FIRST_BITMAP_PAGE`]; every later entry starts right after the pages
//! the previous bitmap used.
//!
//! The table is append-only. Entries must be allocated in index order,
//! each exactly once, on a freshly erased chip with protection `None`.
//! Allocating past an unwritten entry, or placing a bitmap that would not
//! fit on the chip, is refused before anything is programmed. Nothing else
//! is checked.

use zerocopy::byteorder::little_endian::U16;
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::error::{Error, Result};
use crate::flash::SerialFlash;
use crate::layout::{
    pages_for_bytes, BITMAP_TABLE_PAGE, ENTRIES_PER_TABLE_PAGE, FIRST_BITMAP_PAGE, INVALID_PAGE,
    MAX_BITMAPS, PAGE_COUNT,
};
use crate::transport::Transport;

/// One row of the bitmap address table
///
/// Stored as three little-endian `u16`s: start page, width, height.
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct BitmapEntry {
    start_page: U16,
    width: U16,
    height: U16,
}

impl BitmapEntry {
    /// Build an entry
    pub fn new(start_page: u16, width: u16, height: u16) -> Self {
        Self {
            start_page: U16::new(start_page),
            width: U16::new(width),
            height: U16::new(height),
        }
    }

    /// First page of the pixel data
    pub fn start_page(&self) -> u16 {
        self.start_page.get()
    }

    /// Width in pixels
    pub fn width(&self) -> u16 {
        self.width.get()
    }

    /// Height in pixels
    pub fn height(&self) -> u16 {
        self.height.get()
    }

    /// Size of the RGB565 pixel data
    ///
    /// An erased row reads as 65535 x 65535, which needs more than 32 bits.
    pub fn byte_len(&self) -> u64 {
        self.width() as u64 * self.height() as u64 * 2
    }

    /// Pages the pixel data occupies
    pub fn pages(&self) -> u64 {
        pages_for_bytes(self.byte_len())
    }

    /// Whether this row has never been written
    pub fn is_erased(&self) -> bool {
        self.start_page() == INVALID_PAGE
    }
}

/// One 256-byte page of the table
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct TablePage {
    entries: [BitmapEntry; ENTRIES_PER_TABLE_PAGE as usize],
    spare: [u8; 4],
}

/// Table page and row holding entry `index`
fn table_position(index: u16) -> (u16, usize) {
    (
        BITMAP_TABLE_PAGE + index / ENTRIES_PER_TABLE_PAGE,
        (index % ENTRIES_PER_TABLE_PAGE) as usize,
    )
}

/// Check a bitmap starting at `start` lies on the chip
fn fitting_start(index: u16, start: u64, width: u16, height: u16) -> Result<u16> {
    let end = start + BitmapEntry::new(0, width, height).pages();
    if start >= PAGE_COUNT as u64 || end > PAGE_COUNT as u64 {
        log::warn!(
            "bitmap: {} ({}x{}) at page {} runs past the end of the chip",
            index,
            width,
            height,
            start
        );
        return Err(Error::AddressOutOfBounds);
    }
    Ok(start as u16)
}

impl<T: Transport> SerialFlash<T> {
    fn read_table_page(&mut self, page: u16) -> Result<TablePage> {
        let mut table = TablePage::new_zeroed();
        self.read(page, table.as_mut_bytes())?;
        Ok(table)
    }

    /// Record bitmap `index` and return the page its pixels start at
    ///
    /// Index 0 writes just its own six bytes at the start of the table.
    /// Any later index reads entry `index - 1` to work out where the
    /// previous bitmap ends, then rewrites the whole table page holding
    /// `index` with the new row patched in.
    ///
    /// Returns [`Error::InvalidIndex`] when `index` is past the table or
    /// entry `index - 1` was never written, and [`Error::AddressOutOfBounds`]
    /// when the pixels would not fit on the chip. Nothing is programmed in
    /// either case.
    pub fn allocate_bitmap(&mut self, index: u16, width: u16, height: u16) -> Result<u16> {
        if index >= MAX_BITMAPS {
            return Err(Error::InvalidIndex);
        }

        if index == 0 {
            let start = fitting_start(0, FIRST_BITMAP_PAGE as u64, width, height)?;
            let entry = BitmapEntry::new(start, width, height);
            self.program_page(BITMAP_TABLE_PAGE, entry.as_bytes())?;
            log::debug!("bitmap: 0 ({}x{}) at page {}", width, height, start);
            return Ok(start);
        }

        let previous = self.get_bitmap_info(index - 1)?;
        if previous.is_erased() {
            log::warn!("bitmap: {} allocated before {}", index, index - 1);
            return Err(Error::InvalidIndex);
        }
        let start = fitting_start(
            index,
            previous.start_page() as u64 + previous.pages(),
            width,
            height,
        )?;

        let (table_page, row) = table_position(index);
        let mut table = self.read_table_page(table_page)?;
        table.entries[row] = BitmapEntry::new(start, width, height);
        self.program_page(table_page, table.as_bytes())?;

        log::debug!("bitmap: {} ({}x{}) at page {}", index, width, height, start);
        Ok(start)
    }

    /// [`allocate_bitmap`](Self::allocate_bitmap) with an unusable index
    /// mapped to [`INVALID_PAGE`] instead of an error
    pub fn get_bitmap_page(&mut self, index: u16, width: u16, height: u16) -> Result<u16> {
        match self.allocate_bitmap(index, width, height) {
            Err(Error::InvalidIndex) => Ok(INVALID_PAGE),
            other => other,
        }
    }

    /// Look up entry `index` without changing anything
    pub fn get_bitmap_info(&mut self, index: u16) -> Result<BitmapEntry> {
        if index >= MAX_BITMAPS {
            return Err(Error::InvalidIndex);
        }
        let (table_page, row) = table_position(index);
        let table = self.read_table_page(table_page)?;
        Ok(table.entries[row])
    }

    /// Number of entries written so far
    pub fn bitmap_count(&mut self) -> Result<u16> {
        let mut count = 0;
        while count < MAX_BITMAPS {
            let (table_page, first_row) = table_position(count);
            let table = self.read_table_page(table_page)?;
            for entry in &table.entries[first_row..] {
                if entry.is_erased() {
                    return Ok(count);
                }
                count += 1;
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{BITMAP_ENTRY_SIZE, PAGE_SIZE};

    #[test]
    fn test_layout_sizes() {
        assert_eq!(core::mem::size_of::<BitmapEntry>(), BITMAP_ENTRY_SIZE);
        assert_eq!(core::mem::size_of::<TablePage>(), PAGE_SIZE);
    }

    #[test]
    fn test_entry_is_little_endian() {
        let entry = BitmapEntry::new(0x0210, 100, 50);
        assert_eq!(entry.as_bytes(), &[0x10, 0x02, 100, 0, 50, 0]);
    }

    #[test]
    fn test_erased_entry() {
        let mut entry = BitmapEntry::new_zeroed();
        entry.as_mut_bytes().fill(0xFF);
        assert!(entry.is_erased());
        assert_eq!(entry.width(), 0xFFFF);
    }

    #[test]
    fn test_entry_pages_round_up() {
        assert_eq!(BitmapEntry::new(0, 100, 50).pages(), 40);
        assert_eq!(BitmapEntry::new(0, 10, 10).pages(), 1);
        assert_eq!(BitmapEntry::new(0, 0, 10).pages(), 0);
        assert_eq!(BitmapEntry::new(0, 480, 320).pages(), 1200);
    }

    #[test]
    fn test_erased_entry_size_does_not_overflow() {
        let entry = BitmapEntry::new(INVALID_PAGE, 0xFFFF, 0xFFFF);
        assert_eq!(entry.byte_len(), 8_589_672_450);
        assert_eq!(entry.pages(), 33_553_409);
    }

    #[test]
    fn test_fitting_start() {
        assert_eq!(fitting_start(0, 528, 100, 50), Ok(528));
        // Exactly fills the last page
        assert_eq!(fitting_start(5, 4095, 128, 1), Ok(4095));
        assert_eq!(fitting_start(5, 4095, 128, 2), Err(Error::AddressOutOfBounds));
        assert_eq!(fitting_start(5, 4096, 0, 0), Err(Error::AddressOutOfBounds));
        assert_eq!(fitting_start(5, 70_000, 0, 0), Err(Error::AddressOutOfBounds));
        assert_eq!(fitting_start(0, 528, 0xFFFF, 0xFFFF), Err(Error::AddressOutOfBounds));
    }

    #[test]
    fn test_table_position() {
        assert_eq!(table_position(0), (512, 0));
        assert_eq!(table_position(41), (512, 41));
        assert_eq!(table_position(42), (513, 0));
        assert_eq!(table_position(671), (527, 41));
    }
}
