//! Compositor and sprite-zero-hit behaviour (§4.6), driven only through the
//! public register/clock interface plus the framebuffer it produces.

mod common;

use common::MockCartridge;
use nes_ppu_core::{Mirroring, Ppu};

fn set_ppuaddr(ppu: &mut Ppu, cart: &mut MockCartridge, addr: u16) {
    ppu.cpu_write(6, (addr >> 8) as u8, cart);
    ppu.cpu_write(6, (addr & 0xFF) as u8, cart);
}

fn clock_n(ppu: &mut Ppu, cart: &mut MockCartridge, n: u64) {
    for _ in 0..n {
        ppu.clock(cart);
    }
}

/// S6: sprite 0 at (x=8, y=0) over a matching opaque background tile raises
/// the sprite-zero-hit bit once rendering reaches its pixels, not before,
/// and the bit is cleared again at the next pre-render line.
#[test]
fn s6_sprite_zero_hit_fires_at_the_overlap_dot() {
    // Tile 1 is fully opaque (every pixel = color 1) in both pattern planes'
    // low bitplane set, matching both the background tile and sprite tile.
    let mut cart = MockCartridge::with_chr_pattern(Mirroring::Horizontal, 1, 0xFF, 0x00);
    let mut ppu = Ppu::new();
    ppu.reset(&mut cart);

    // Background: nametable tiles (0,0) and (1,0) = tile index 1, so the
    // opaque tile spans screen columns 0-15 and actually underlies the
    // sprite's column (x=8, the second tile).
    set_ppuaddr(&mut ppu, &mut cart, 0x2000);
    ppu.cpu_write(7, 1, &mut cart);
    ppu.cpu_write(7, 1, &mut cart);

    // Sprite 0: y=0, tile=1, attr=0 (no flip, in front), x=8.
    ppu.cpu_write(3, 0, &mut cart);
    ppu.cpu_write(4, 0x00, &mut cart); // y
    ppu.cpu_write(4, 0x01, &mut cart); // tile
    ppu.cpu_write(4, 0x00, &mut cart); // attr
    ppu.cpu_write(4, 0x08, &mut cart); // x

    // Enable background + sprite rendering, no left-edge clipping.
    ppu.cpu_write(1, 0x1E, &mut cart);

    // Before dot 9 of scanline 0, the hit has not yet been evaluated.
    clock_n(&mut ppu, &mut cart, dots_to(0, 8));
    assert_eq!(ppu.cpu_read(2, &mut cart) & 0x40, 0);

    // Dot 9 is the first cycle whose sprite-0 X-countdown reaches zero and
    // extracts a pixel (sprites.rs advances the countdown during cycles
    // 1-8, reaching zero only once cycle 9 has itself been *processed*).
    // `clock()` runs the compositor for the dot equal to the *entry* value
    // of `self.cycle`, so dot 9's composite only happens on the call that
    // advances the PPU from cycle 9 to cycle 10 — i.e. once total calls
    // reach `dots_to(0, 10)`.
    clock_n(&mut ppu, &mut cart, dots_to(0, 10) - dots_to(0, 8));
    assert_eq!(
        ppu.cpu_read(2, &mut cart) & 0x40,
        0x40,
        "sprite zero hit should be set once dot 9 has been composited"
    );

    // Drain to the next pre-render line's clear at (-1, 1): one full
    // (even) frame length past the dot-10 check point, plus two dots into
    // the following frame to land just after the clear has been applied.
    const FRAME_DOTS_EVEN: u64 = 89_342;
    clock_n(&mut ppu, &mut cart, FRAME_DOTS_EVEN - dots_to(0, 10) + 2);
    assert_eq!(
        ppu.cpu_read(2, &mut cart) & 0x40,
        0,
        "hit flag must clear again at pre-render"
    );
}

fn dots_to(scanline: i32, cycle: i32) -> u64 {
    ((scanline + 1) as u64) * 341 + cycle as u64
}

/// With rendering disabled entirely, the compositor never touches the
/// framebuffer or sets sprite-zero hit, regardless of OAM/nametable content.
#[test]
fn rendering_disabled_leaves_status_sprite_zero_clear() {
    let mut cart = MockCartridge::with_chr_pattern(Mirroring::Horizontal, 1, 0xFF, 0x00);
    let mut ppu = Ppu::new();
    ppu.reset(&mut cart);

    set_ppuaddr(&mut ppu, &mut cart, 0x2000);
    ppu.cpu_write(7, 1, &mut cart);
    ppu.cpu_write(3, 0, &mut cart);
    ppu.cpu_write(4, 0x00, &mut cart);
    ppu.cpu_write(4, 0x01, &mut cart);
    ppu.cpu_write(4, 0x00, &mut cart);
    ppu.cpu_write(4, 0x08, &mut cart);

    clock_n(&mut ppu, &mut cart, dots_to(10, 0));
    assert_eq!(ppu.cpu_read(2, &mut cart) & 0x40, 0);
}
