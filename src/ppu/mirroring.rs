//! Nametable and palette address resolution.
//!
//! Both functions here are pure and stateless: given a cartridge's mirroring
//! mode and a raw PPU-bus address, they answer which physical nametable page
//! backs it, or which palette RAM slot a $3F00-$3FFF address aliases to.

use crate::cartridge::Mirroring;

/// Map a logical nametable index (0-3, derived from bits 10-11 of a
/// $2000-$2FFF address) to a physical page (0 or 1) given the cartridge's
/// mirroring mode.
pub fn nametable_page(table_select: usize, mode: Mirroring) -> usize {
    match mode {
        Mirroring::Horizontal => {
            if table_select < 2 {
                0
            } else {
                1
            }
        }
        Mirroring::Vertical => table_select & 1,
        Mirroring::Single0 => 0,
        Mirroring::Single1 => 1,
        Mirroring::FourScreen => table_select,
    }
}

/// Resolve a $3F00-$3FFF address to its palette RAM slot (0-31), applying the
/// hardware alias that makes $3F10/$3F14/$3F18/$3F1C read/write the same
/// cell as $3F00/$3F04/$3F08/$3F0C.
pub fn palette_index(addr: u16) -> usize {
    let mut index = (addr & 0x1F) as usize;
    if matches!(index, 0x10 | 0x14 | 0x18 | 0x1C) {
        index -= 0x10;
    }
    index
}
