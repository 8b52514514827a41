//! Flash memory map
//!
//! The chip is addressed by 256-byte page. Layout, lowest page first:
//!
//! | Pages      | Size  | Contents                                         |
//! |------------|-------|--------------------------------------------------|
//! | 0 - 63     | 16K   | Preferences, four rotating 4K slots              |
//! | 64 - 511   | 112K  | Profiles, 28 x 4K                                |
//! | 512 - 527  | 4K    | Bitmap address table (42 entries per page)       |
//! | 528 - 4095 | 892K  | Bitmap pixel data, RGB565, page aligned          |
//!
//! Pages 0 - 511 are exactly 64K blocks 0 and 1, which is what a factory
//! reset wipes and what the `NotPrefs` protection profile leaves writable.

/// Bytes per page; the program and read granularity
pub const PAGE_SIZE: usize = 256;
/// Pages per 4K sector; the smallest erasable unit
pub const PAGES_PER_SECTOR: u16 = 16;
/// Pages per 64K block
pub const PAGES_PER_BLOCK: u16 = 256;
/// Total pages on the W25Q80BV (1 MiB)
pub const PAGE_COUNT: usize = 4096;
/// Total chip size in bytes
pub const FLASH_SIZE: u32 = (PAGE_COUNT * PAGE_SIZE) as u32;

/// First page of the preferences area
pub const PREFS_FIRST_PAGE: u16 = 0;
/// Number of 4K preference slots the rotation policy may use
pub const PREFS_SLOTS: u8 = 4;
/// First page of profile storage
pub const PROFILE_FIRST_PAGE: u16 = 64;
/// One past the last page of profile storage
pub const PROFILE_END_PAGE: u16 = 512;
/// 64K blocks covering preferences and profiles
pub const USER_BLOCKS: u8 = 2;

/// First page of the bitmap address table
pub const BITMAP_TABLE_PAGE: u16 = 512;
/// Pages reserved for the bitmap address table
pub const BITMAP_TABLE_PAGES: u16 = 16;
/// Page where bitmap 0 is stored
pub const FIRST_BITMAP_PAGE: u16 = 528;
/// Size of one table entry in bytes
pub const BITMAP_ENTRY_SIZE: usize = 6;
/// Entries packed into each table page
pub const ENTRIES_PER_TABLE_PAGE: u16 = 42;
/// Table capacity
pub const MAX_BITMAPS: u16 = 672;

/// Returned by the saturating bitmap lookup for an out-of-range index
pub const INVALID_PAGE: u16 = 0xFFFF;

/// Named areas of the memory map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub enum Region {
    /// Rotating preference slots
    Prefs,
    /// Reflow and bake profiles
    Profiles,
    /// Bitmap address table
    BitmapTable,
    /// Bitmap pixel data
    BitmapData,
}

impl Region {
    /// Region containing `page`, or `None` past the end of the chip
    pub fn of_page(page: u16) -> Option<Self> {
        match page {
            p if p < PROFILE_FIRST_PAGE => Some(Self::Prefs),
            p if p < PROFILE_END_PAGE => Some(Self::Profiles),
            p if p < FIRST_BITMAP_PAGE => Some(Self::BitmapTable),
            p if (p as usize) < PAGE_COUNT => Some(Self::BitmapData),
            _ => None,
        }
    }

    /// Half-open page range of this region
    pub fn pages(&self) -> core::ops::Range<u16> {
        match self {
            Self::Prefs => PREFS_FIRST_PAGE..PROFILE_FIRST_PAGE,
            Self::Profiles => PROFILE_FIRST_PAGE..PROFILE_END_PAGE,
            Self::BitmapTable => BITMAP_TABLE_PAGE..FIRST_BITMAP_PAGE,
            Self::BitmapData => FIRST_BITMAP_PAGE..PAGE_COUNT as u16,
        }
    }
}

impl core::fmt::Display for Region {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Prefs => write!(f, "prefs"),
            Self::Profiles => write!(f, "profiles"),
            Self::BitmapTable => write!(f, "bitmap-table"),
            Self::BitmapData => write!(f, "bitmap-data"),
        }
    }
}

/// First page of preference slot `slot`
pub const fn prefs_slot_page(slot: u8) -> u16 {
    PREFS_FIRST_PAGE + slot as u16 * PAGES_PER_SECTOR
}

/// Pages needed to hold `bytes` bytes
pub const fn pages_for_bytes(bytes: u64) -> u64 {
    bytes.div_ceil(PAGE_SIZE as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regions_tile_the_chip() {
        assert_eq!(Region::of_page(0), Some(Region::Prefs));
        assert_eq!(Region::of_page(63), Some(Region::Prefs));
        assert_eq!(Region::of_page(64), Some(Region::Profiles));
        assert_eq!(Region::of_page(511), Some(Region::Profiles));
        assert_eq!(Region::of_page(512), Some(Region::BitmapTable));
        assert_eq!(Region::of_page(527), Some(Region::BitmapTable));
        assert_eq!(Region::of_page(528), Some(Region::BitmapData));
        assert_eq!(Region::of_page(4095), Some(Region::BitmapData));
        assert_eq!(Region::of_page(4096), None);
    }

    #[test]
    fn test_table_capacity() {
        assert_eq!(ENTRIES_PER_TABLE_PAGE as usize, PAGE_SIZE / BITMAP_ENTRY_SIZE);
        assert_eq!(MAX_BITMAPS, ENTRIES_PER_TABLE_PAGE * BITMAP_TABLE_PAGES);
        assert_eq!(FIRST_BITMAP_PAGE, BITMAP_TABLE_PAGE + BITMAP_TABLE_PAGES);
    }

    #[test]
    fn test_user_blocks_cover_prefs_and_profiles() {
        assert_eq!(USER_BLOCKS as u16 * PAGES_PER_BLOCK, PROFILE_END_PAGE);
        assert_eq!(prefs_slot_page(PREFS_SLOTS), PROFILE_FIRST_PAGE);
    }

    #[test]
    fn test_pages_for_bytes_rounds_up() {
        assert_eq!(pages_for_bytes(0), 0);
        assert_eq!(pages_for_bytes(1), 1);
        assert_eq!(pages_for_bytes(256), 1);
        assert_eq!(pages_for_bytes(10_000), 40);
    }
}
