//! Shared test harness: a minimal in-memory cartridge for PPU integration
//! tests, backed by plain CHR RAM with no mapper logic.

use nes_ppu_core::{Cartridge, Mirroring, MirroringMode};

pub struct MockCartridge {
    chr: [u8; 8192],
    mirroring: Mirroring,
    pub scanline_clocks: u32,
}

impl MockCartridge {
    pub fn new(mirroring: Mirroring) -> Self {
        MockCartridge {
            chr: [0; 8192],
            mirroring,
            scanline_clocks: 0,
        }
    }

    pub fn with_chr_pattern(mirroring: Mirroring, tile_index: u8, plane0: u8, plane1: u8) -> Self {
        let mut cart = MockCartridge::new(mirroring);
        let base = tile_index as usize * 16;
        for row in 0..8 {
            cart.chr[base + row] = plane0;
            cart.chr[base + 8 + row] = plane1;
        }
        cart
    }
}

impl Cartridge for MockCartridge {
    fn ppu_read(&mut self, addr: u16) -> u8 {
        self.chr[(addr & 0x1FFF) as usize]
    }

    fn ppu_write(&mut self, addr: u16, value: u8) {
        self.chr[(addr & 0x1FFF) as usize] = value;
    }

    fn mirroring(&self) -> MirroringMode {
        MirroringMode::Static(self.mirroring)
    }

    fn clock_scanline(&mut self) {
        self.scanline_clocks += 1;
    }
}
