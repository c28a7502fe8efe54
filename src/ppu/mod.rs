//! The 2C02 picture processing unit: register file, NMI edge timing, VRAM
//! bus, and the per-dot frame driver. The background fetch pipeline and the
//! sprite subsystem are large enough to earn their own modules
//! ([`background`] and [`sprites`]) but operate as `impl Ppu` blocks against
//! the same struct defined here, the way `rusty_nes` splits `Background` and
//! `Sprites` out of its PPU file while keeping them all part of one type.

mod background;
mod mirroring;
mod palette;
mod sprites;

pub use palette::{NES_RGB_PALETTE, POWER_UP_PALETTE};

use log::info;

use crate::cartridge::{Cartridge, Mirroring, MirroringMode};

pub const SCREEN_WIDTH: usize = 256;
pub const SCREEN_HEIGHT: usize = 240;
const FRAME_BYTES: usize = SCREEN_WIDTH * SCREEN_HEIGHT * 3;

const STATUS_SPRITE_OVERFLOW: u8 = 0x20;
const STATUS_SPRITE_ZERO_HIT: u8 = 0x40;
const STATUS_VBLANK: u8 = 0x80;

/// A single secondary-OAM slot: Y, tile index, attribute byte, and an X
/// value that is reused as a per-dot countdown once copied into the active
/// sprite line (see design note in `sprites.rs`).
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SpriteSlot {
    pub y: u8,
    pub tile: u8,
    pub attr: u8,
    pub x: u8,
}

/// A cycle-accurate NES picture processing unit.
pub struct Ppu {
    // --- memory ---
    pub(crate) nametable: [[u8; 1024]; 4],
    pub(crate) palette_ram: [u8; 32],
    pub(crate) oam: [u8; 256],
    dynamic_mirroring: bool,
    cached_mirroring: Mirroring,

    // --- registers ---
    pub(crate) ctrl: u8,
    pub(crate) mask: u8,
    status: u8,
    oam_addr: u8,
    pub(crate) v: u16,
    pub(crate) t: u16,
    pub(crate) fine_x: u8,
    address_latch: bool,
    ppu_data_buffer: u8,

    // --- background pipeline latches/shifters ---
    pub(crate) bg_next_tile_id: u8,
    pub(crate) bg_next_tile_attr: u8,
    pub(crate) bg_next_tile_lsb: u8,
    pub(crate) bg_next_tile_msb: u8,
    pub(crate) bg_shifter_pattern_lo: u16,
    pub(crate) bg_shifter_pattern_hi: u16,
    pub(crate) bg_shifter_attr_lo: u16,
    pub(crate) bg_shifter_attr_hi: u16,

    // --- sprite state ---
    pub(crate) sprite_scanline: [SpriteSlot; 8],
    pub(crate) sprite_shifter_pattern_lo: [u8; 8],
    pub(crate) sprite_shifter_pattern_hi: [u8; 8],
    pub(crate) sprite_count: u8,
    pub(crate) sprite_zero_hit_possible: bool,
    pub(crate) sprite_zero_being_rendered: bool,

    pub(crate) eval_sprite_scanline: [SpriteSlot; 8],
    pub(crate) eval_sprite_count: u8,
    pub(crate) eval_sprite_zero_possible: bool,
    pub(crate) eval_oam_n: u8,
    pub(crate) eval_oam_m: u8,
    pub(crate) eval_read_latch: u8,
    pub(crate) eval_overflow_mode: bool,
    pub(crate) eval_done: bool,

    // --- timing ---
    pub(crate) scanline: i32,
    pub(crate) cycle: i32,
    odd_frame: bool,
    frame_complete: bool,
    pub(crate) rendering_enabled: bool,
    odd_skip_latch: bool,

    // --- NMI edge logic ---
    nmi_occurred: bool,
    nmi_output: bool,
    nmi_previous: bool,
    nmi_delay: u32,
    nmi_hold: u32,
    nmi: bool,
    suppress_vblank: bool,
    suppress_nmi: bool,

    // --- host-facing output ---
    frame_rgb: Vec<u8>,
}

impl Default for Ppu {
    fn default() -> Self {
        Ppu::new()
    }
}

impl Ppu {
    pub fn new() -> Self {
        Ppu {
            nametable: [[0; 1024]; 4],
            palette_ram: [0; 32],
            oam: [0; 256],
            dynamic_mirroring: false,
            cached_mirroring: Mirroring::Horizontal,

            ctrl: 0,
            mask: 0,
            status: 0,
            oam_addr: 0,
            v: 0,
            t: 0,
            fine_x: 0,
            address_latch: false,
            ppu_data_buffer: 0,

            bg_next_tile_id: 0,
            bg_next_tile_attr: 0,
            bg_next_tile_lsb: 0,
            bg_next_tile_msb: 0,
            bg_shifter_pattern_lo: 0,
            bg_shifter_pattern_hi: 0,
            bg_shifter_attr_lo: 0,
            bg_shifter_attr_hi: 0,

            sprite_scanline: [SpriteSlot::default(); 8],
            sprite_shifter_pattern_lo: [0; 8],
            sprite_shifter_pattern_hi: [0; 8],
            sprite_count: 0,
            sprite_zero_hit_possible: false,
            sprite_zero_being_rendered: false,

            eval_sprite_scanline: [SpriteSlot::default(); 8],
            eval_sprite_count: 0,
            eval_sprite_zero_possible: false,
            eval_oam_n: 0,
            eval_oam_m: 0,
            eval_read_latch: 0,
            eval_overflow_mode: false,
            eval_done: false,

            scanline: -1,
            cycle: 0,
            odd_frame: false,
            frame_complete: false,
            rendering_enabled: false,
            odd_skip_latch: false,

            nmi_occurred: false,
            nmi_output: false,
            nmi_previous: false,
            nmi_delay: 0,
            nmi_hold: 0,
            nmi: false,
            suppress_vblank: false,
            suppress_nmi: false,

            frame_rgb: vec![0; FRAME_BYTES],
        }
    }

    /// Reinitialise all registers and pipeline state, reseed palette RAM
    /// from [`POWER_UP_PALETTE`], and query the cartridge for its initial
    /// mirroring.
    pub fn reset(&mut self, cart: &mut dyn Cartridge) {
        *self = Ppu::new();
        self.palette_ram.copy_from_slice(&POWER_UP_PALETTE);

        let mode = cart.mirroring();
        self.dynamic_mirroring = mode.is_dynamic();
        self.cached_mirroring = mode.current();

        info!("ppu reset, mirroring = {:?}", self.cached_mirroring);
    }

    pub fn frame_buffer(&self) -> &[u8] {
        &self.frame_rgb
    }

    pub fn frame_complete(&self) -> bool {
        self.frame_complete
    }

    pub fn clear_frame_complete(&mut self) {
        self.frame_complete = false;
    }

    // ---------------------------------------------------------------
    // Register file & host interface (§4.2)
    // ---------------------------------------------------------------

    pub fn cpu_read(&mut self, reg: u8, cart: &mut dyn Cartridge) -> u8 {
        match reg & 0x07 {
            2 => {
                let result = (self.status & 0xE0) | (self.ppu_data_buffer & 0x1F);

                if self.scanline == 241 && self.cycle == 1 {
                    self.suppress_vblank = true;
                    self.suppress_nmi = true;
                } else if self.scanline == 241 && (self.cycle == 2 || self.cycle == 3) {
                    self.suppress_nmi = true;
                    self.nmi = false;
                    self.nmi_delay = 0;
                    self.nmi_hold = 0;
                }

                self.set_vblank(false);
                self.address_latch = false;
                result
            }
            4 => self.oam[self.oam_addr as usize],
            7 => {
                let addr = self.v & 0x3FFF;
                let result = if addr >= 0x3F00 {
                    let value = self.vram_read(addr, cart);
                    self.ppu_data_buffer =
                        self.vram_read((addr.wrapping_sub(0x1000)) & 0x3FFF, cart);
                    value
                } else {
                    let buffered = self.ppu_data_buffer;
                    self.ppu_data_buffer = self.vram_read(addr, cart);
                    buffered
                };
                let step = if self.ctrl & 0x04 != 0 { 32 } else { 1 };
                self.v = (self.v + step) & 0x7FFF;
                result
            }
            _ => 0,
        }
    }

    pub fn cpu_write(&mut self, reg: u8, value: u8, cart: &mut dyn Cartridge) {
        match reg & 0x07 {
            0 => {
                self.ctrl = value;
                self.nmi_output = value & 0x80 != 0;
                self.nmi_change();
                self.t = (self.t & 0xF3FF) | (((value & 0x03) as u16) << 10);
            }
            1 => {
                self.mask = value;
                self.rendering_enabled = value & 0x18 != 0;
            }
            3 => self.oam_addr = value,
            4 => {
                self.oam[self.oam_addr as usize] = value;
                self.oam_addr = self.oam_addr.wrapping_add(1);
            }
            5 => {
                if !self.address_latch {
                    self.fine_x = value & 0x07;
                    self.t = (self.t & 0xFFE0) | ((value >> 3) as u16);
                    self.address_latch = true;
                } else {
                    self.t = (self.t & 0x8FFF) | (((value & 0x07) as u16) << 12);
                    self.t = (self.t & 0xFC1F) | (((value & 0xF8) as u16) << 2);
                    self.address_latch = false;
                }
            }
            6 => {
                if !self.address_latch {
                    self.t = (self.t & 0x00FF) | (((value & 0x3F) as u16) << 8);
                    self.address_latch = true;
                } else {
                    self.t = (self.t & 0xFF00) | value as u16;
                    self.v = self.t;
                    self.address_latch = false;
                }
            }
            7 => {
                let addr = self.v & 0x3FFF;
                self.vram_write(addr, value, cart);
                let step = if self.ctrl & 0x04 != 0 { 32 } else { 1 };
                self.v = (self.v + step) & 0x7FFF;
            }
            _ => {}
        }
    }

    /// CPU $4014 OAMDMA: 256 bytes written starting at the current
    /// `oam_addr`, wrapping modulo 256. `oam_addr`'s own value is left
    /// unchanged by the DMA.
    pub fn dma_write(&mut self, bytes: &[u8; 256]) {
        for (k, byte) in bytes.iter().enumerate() {
            let addr = self.oam_addr.wrapping_add(k as u8);
            self.oam[addr as usize] = *byte;
        }
    }

    /// Edge-triggered: returns true (and clears the internal flag) exactly
    /// once per NMI raised.
    pub fn consume_nmi(&mut self) -> bool {
        if self.nmi {
            self.nmi = false;
            true
        } else {
            false
        }
    }

    // ---------------------------------------------------------------
    // NMI edge timing (§4.3)
    // ---------------------------------------------------------------

    fn nmi_change(&mut self) {
        let nmi_line = self.nmi_output && self.nmi_occurred;
        if nmi_line && !self.nmi_previous {
            self.nmi_delay = 14;
            self.nmi_hold = 2;
        }
        self.nmi_previous = nmi_line;
    }

    fn set_vblank(&mut self, value: bool) {
        if value {
            self.status |= STATUS_VBLANK;
        } else {
            self.status &= !STATUS_VBLANK;
        }
        self.nmi_occurred = value;
        self.nmi_change();
    }

    fn tick_nmi(&mut self) {
        if self.nmi_delay > 0 {
            let nmi_line = self.nmi_output && self.nmi_occurred;
            if self.nmi_hold > 0 {
                if nmi_line {
                    self.nmi_hold -= 1;
                } else {
                    self.nmi_delay = 0;
                    self.nmi_hold = 0;
                }
            } else {
                self.nmi_delay -= 1;
                if self.nmi_delay == 0 {
                    self.nmi = true;
                }
            }
        }
    }

    // ---------------------------------------------------------------
    // Memory map & mirroring resolver (§4.1)
    // ---------------------------------------------------------------

    fn resolve_nametable_page(&mut self, addr: u16, cart: &mut dyn Cartridge) -> (usize, usize) {
        if self.dynamic_mirroring {
            if let MirroringMode::Dynamic(mode) = cart.mirroring() {
                self.cached_mirroring = mode;
            }
        }
        let local = addr % 0x1000;
        let table_select = ((local >> 10) & 0x03) as usize;
        let offset = (local & 0x3FF) as usize;
        (
            mirroring::nametable_page(table_select, self.cached_mirroring),
            offset,
        )
    }

    pub(crate) fn vram_read(&mut self, addr: u16, cart: &mut dyn Cartridge) -> u8 {
        let addr = addr & 0x3FFF;
        match addr {
            0x0000..=0x1FFF => cart.ppu_read(addr),
            0x2000..=0x3EFF => {
                let (page, offset) = self.resolve_nametable_page(addr, cart);
                self.nametable[page][offset]
            }
            _ => {
                let index = mirroring::palette_index(addr);
                self.palette_ram[index] & 0x3F
            }
        }
    }

    pub(crate) fn vram_write(&mut self, addr: u16, value: u8, cart: &mut dyn Cartridge) {
        let addr = addr & 0x3FFF;
        match addr {
            0x0000..=0x1FFF => cart.ppu_write(addr, value),
            0x2000..=0x3EFF => {
                let (page, offset) = self.resolve_nametable_page(addr, cart);
                self.nametable[page][offset] = value;
            }
            _ => {
                let index = mirroring::palette_index(addr);
                self.palette_ram[index] = value & 0x3F;
            }
        }
    }

    // ---------------------------------------------------------------
    // Per-dot compositor (§4.6)
    // ---------------------------------------------------------------

    fn bg_pixel(&self) -> (u8, u8) {
        if self.mask & 0x08 != 0 && (self.mask & 0x02 != 0 || self.cycle > 8) {
            let bit_mux: u16 = 0x8000 >> self.fine_x;
            let lo = (self.bg_shifter_pattern_lo & bit_mux) != 0;
            let hi = (self.bg_shifter_pattern_hi & bit_mux) != 0;
            let pixel = ((hi as u8) << 1) | (lo as u8);

            let attr_lo = (self.bg_shifter_attr_lo & bit_mux) != 0;
            let attr_hi = (self.bg_shifter_attr_hi & bit_mux) != 0;
            let palette = ((attr_hi as u8) << 1) | (attr_lo as u8);
            (pixel, palette)
        } else {
            (0, 0)
        }
    }

    fn composite_pixel(&mut self, cart: &mut dyn Cartridge) {
        if !(0..=239).contains(&self.scanline) || !(1..=256).contains(&self.cycle) {
            return;
        }

        let (bg_pixel, bg_palette) = self.bg_pixel();
        let (mut fg_pixel, mut fg_palette, fg_priority) = self.advance_and_composite_sprites();

        let fg_visible = self.mask & 0x10 != 0 && (self.mask & 0x04 != 0 || self.cycle > 8);
        if !fg_visible {
            fg_pixel = 0;
            fg_palette = 0;
            self.sprite_zero_being_rendered = false;
        }

        let (pixel, palette) = match (bg_pixel, fg_pixel) {
            (0, 0) => (0, 0),
            (0, _) => (fg_pixel, fg_palette),
            (_, 0) => (bg_pixel, bg_palette),
            (_, _) => {
                if fg_priority {
                    (fg_pixel, fg_palette)
                } else {
                    (bg_pixel, bg_palette)
                }
            }
        };

        // Both enable bits and the left-8 clip are already folded into
        // bg_pixel/fg_pixel being nonzero, so this is the whole §4.6.4 test.
        if bg_pixel != 0
            && fg_pixel != 0
            && self.sprite_zero_hit_possible
            && self.sprite_zero_being_rendered
        {
            self.status |= STATUS_SPRITE_ZERO_HIT;
        }

        let mut palette_addr = ((palette & 0x07) << 2) | (pixel & 0x03);
        if palette_addr & 0x13 == 0x10 {
            palette_addr &= 0x0F;
        }
        let color_index = self.vram_read(0x3F00 | palette_addr as u16, cart) & 0x3F;
        let (r, g, b) = NES_RGB_PALETTE[color_index as usize];

        let x = (self.cycle - 1) as usize;
        let y = self.scanline as usize;
        let idx = (y * SCREEN_WIDTH + x) * 3;
        self.frame_rgb[idx] = r;
        self.frame_rgb[idx + 1] = g;
        self.frame_rgb[idx + 2] = b;
    }

    // ---------------------------------------------------------------
    // Frame driver (§4.7)
    // ---------------------------------------------------------------

    /// Advance the PPU by exactly one dot.
    pub fn clock(&mut self, cart: &mut dyn Cartridge) {
        self.tick_nmi();

        if self.scanline == -1 && self.cycle == 1 {
            self.set_vblank(false);
            self.status &= !STATUS_SPRITE_ZERO_HIT;
            self.status &= !STATUS_SPRITE_OVERFLOW;
            self.suppress_nmi = false;
        }

        self.step_background(cart);
        self.step_sprite_evaluation();
        if self.cycle == 257 {
            self.copy_secondary_oam();
        }
        if self.cycle == 340 {
            self.fetch_sprite_patterns(cart);
        }

        if self.scanline == 241 && self.cycle == 1 {
            if !self.suppress_vblank {
                self.set_vblank(true);
            }
            self.suppress_vblank = false;
        }

        self.composite_pixel(cart);

        if self.rendering_enabled && self.cycle == 260 && (0..=239).contains(&self.scanline) {
            cart.clock_scanline();
        }

        if self.scanline == -1 && self.cycle == 338 {
            self.odd_skip_latch = self.rendering_enabled;
        }

        if self.scanline == -1 && self.cycle == 339 && self.odd_frame && self.odd_skip_latch {
            self.cycle = 0;
            self.scanline = 0;
            return;
        }

        self.cycle += 1;
        if self.cycle > 340 {
            self.cycle = 0;
            self.scanline += 1;
            if self.scanline > 260 {
                self.scanline = -1;
                self.frame_complete = true;
                self.odd_frame = !self.odd_frame;
            }
        }
    }
}
