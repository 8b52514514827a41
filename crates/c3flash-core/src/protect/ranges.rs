//! Block protection range decoding
//!
//! Maps the BP/TB/SEC/CMP bits of the status registers onto the address
//! range the chip refuses to program or erase. The simulator uses the same
//! decoder, so what the engine reports is what the model enforces.

use super::types::{ProtectBits, ProtectedRange};

const BLOCK_64K: u32 = 64 * 1024;
const SECTOR_4K: u32 = 4 * 1024;
const SECTOR_CAP: u32 = 32 * 1024;

/// Decode the protected range for a part of `total_size` bytes
///
/// # Algorithm
/// 1. BP=0 means no protection, BP=7 means the whole chip
/// 2. Otherwise the protected size is `unit * 2^(bp - 1)`, where the unit
///    is a 4K sector when SEC is set and a 64K block when it is clear.
///    Sector protection tops out at 32K.
/// 3. TB selects the bottom (low addresses) instead of the top
/// 4. CMP complements the result
pub fn decode_range(bits: &ProtectBits, total_size: u32) -> ProtectedRange {
    let max_bp = (1u8 << ProtectBits::BP_COUNT) - 1;

    let range = match bits.bp {
        0 => ProtectedRange::none(),
        bp if bp >= max_bp => ProtectedRange::full(total_size),
        bp => {
            let unit = if bits.sec { SECTOR_4K } else { BLOCK_64K };
            let mut size = unit.saturating_mul(1 << (bp - 1));
            if bits.sec {
                size = size.min(SECTOR_CAP);
            }
            size = size.min(total_size);

            if bits.tb {
                ProtectedRange::new(0, size)
            } else {
                ProtectedRange::new(total_size - size, size)
            }
        }
    };

    if bits.cmp {
        complement(range, total_size)
    } else {
        range
    }
}

/// Invert a range that is anchored at either end of the chip
fn complement(range: ProtectedRange, total_size: u32) -> ProtectedRange {
    if range.len == 0 {
        ProtectedRange::full(total_size)
    } else if range.start == 0 {
        ProtectedRange::new(range.end(), total_size.saturating_sub(range.end()))
    } else {
        ProtectedRange::new(0, range.start)
    }
}
