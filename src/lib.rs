//! nes-ppu-core
//!
//! A cycle-accurate picture processing unit (PPU) core for a Nintendo
//! Entertainment System emulator. This crate implements the register file,
//! background fetch pipeline, sprite evaluation, per-dot compositor, and NMI
//! timing of the 2C02 PPU. It does not implement the 6502 CPU, the APU, or
//! any particular cartridge mapper — those are external collaborators whose
//! interfaces this crate consumes through the [`Cartridge`] trait.

pub mod cartridge;
pub mod ppu;

pub use cartridge::{Cartridge, Mirroring, MirroringMode, RomError};
pub use ppu::Ppu;
