//! Cartridge interface and a minimal NROM loader.
//!
//! The PPU core never owns a cartridge: it is handed a `&mut dyn Cartridge`
//! on every call that touches the PPU bus ($0000-$1FFF pattern tables, plus
//! the mapper's mirroring and scanline-clock hooks). This mirrors the way
//! `rusty_nes` keeps mapper state behind a `Mapper` trait object and threads
//! it through explicit calls rather than storing a borrowed reference on the
//! PPU itself, which would require a self-referential struct.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const INES_HEADER_SIZE: usize = 16;
const PRG_ROM_BANK_SIZE: usize = 16 * 1024;
const CHR_BANK_SIZE: usize = 8 * 1024;

/// Errors that can occur when parsing an iNES ROM image.
#[derive(Error, Debug)]
pub enum RomError {
    #[error("invalid iNES header")]
    InvalidHeader,

    #[error("unsupported mapper: {0}")]
    UnsupportedMapper(u8),

    #[error("invalid ROM size")]
    InvalidRomSize,

    #[error("trainer present but not supported")]
    TrainerNotSupported,
}

/// The physical nametable arrangements a cartridge can wire to the PPU, plus
/// four-screen (no mirroring, cartridge supplies extra nametable RAM).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    Single0,
    Single1,
    FourScreen,
}

/// Whether a cartridge's mirroring is fixed for its lifetime or can change at
/// runtime (mapper-controlled single-screen switching, as used by MMC1 and
/// similar bank-switching mappers).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirroringMode {
    Static(Mirroring),
    Dynamic(Mirroring),
}

impl MirroringMode {
    pub fn current(self) -> Mirroring {
        match self {
            MirroringMode::Static(m) => m,
            MirroringMode::Dynamic(m) => m,
        }
    }

    pub fn is_dynamic(self) -> bool {
        matches!(self, MirroringMode::Dynamic(_))
    }
}

/// The PPU-facing half of a cartridge: pattern table access, mirroring, and
/// the per-scanline clock hook mappers with scanline-counting IRQs (MMC3 and
/// relatives) need. CPU-facing PRG access is out of scope for this crate.
pub trait Cartridge {
    fn ppu_read(&mut self, addr: u16) -> u8;
    fn ppu_write(&mut self, addr: u16, value: u8);
    fn mirroring(&self) -> MirroringMode;
    fn clock_scanline(&mut self) {}
}

/// The simplest possible cartridge: fixed 16/32KB PRG, fixed 8KB CHR ROM or
/// RAM, no bank switching, static mirroring. Mapper 0 on real hardware.
pub struct NromCartridge {
    chr: Vec<u8>,
    chr_is_ram: bool,
    mirroring: Mirroring,
}

impl NromCartridge {
    pub fn new(chr: Vec<u8>, chr_is_ram: bool, mirroring: Mirroring) -> Self {
        NromCartridge {
            chr,
            chr_is_ram,
            mirroring,
        }
    }

    /// Parse an iNES-format ROM image and build an `NromCartridge` from its
    /// CHR data and header-declared mirroring. PRG ROM is parsed (for size
    /// validation) but not retained, since this crate has no CPU to serve it
    /// to.
    pub fn from_ines_bytes(data: &[u8]) -> Result<Self, RomError> {
        if data.len() < INES_HEADER_SIZE || data[0..4] != [0x4E, 0x45, 0x53, 0x1A] {
            return Err(RomError::InvalidHeader);
        }

        let prg_rom_size = data[4] as usize * PRG_ROM_BANK_SIZE;
        let chr_rom_size = data[5] as usize * CHR_BANK_SIZE;

        let flags6 = data[6];
        let flags7 = data[7];

        let mirroring = if (flags6 & 0x08) != 0 {
            Mirroring::FourScreen
        } else if (flags6 & 0x01) != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };

        let has_trainer = (flags6 & 0x04) != 0;
        let mapper_low = (flags6 >> 4) & 0x0F;
        let mapper_high = flags7 & 0xF0;
        let mapper = mapper_high | mapper_low;

        if has_trainer {
            return Err(RomError::TrainerNotSupported);
        }
        if mapper != 0 {
            warn!("mapper {mapper} is not implemented, only NROM (mapper 0) is supported");
            return Err(RomError::UnsupportedMapper(mapper));
        }

        let trainer_size = 0;
        let expected_size = INES_HEADER_SIZE + trainer_size + prg_rom_size + chr_rom_size;
        if data.len() < expected_size {
            return Err(RomError::InvalidRomSize);
        }

        let prg_rom_start = INES_HEADER_SIZE + trainer_size;
        let prg_rom_end = prg_rom_start + prg_rom_size;
        let chr_rom_start = prg_rom_end;
        let chr_rom_end = chr_rom_start + chr_rom_size;

        let (chr, chr_is_ram) = if chr_rom_size == 0 {
            (vec![0u8; CHR_BANK_SIZE], true)
        } else {
            (data[chr_rom_start..chr_rom_end].to_vec(), false)
        };

        info!(
            "loaded NROM cartridge - PRG: {}KB, CHR {}: {}KB, mirroring: {:?}",
            prg_rom_size / 1024,
            if chr_is_ram { "RAM" } else { "ROM" },
            chr.len() / 1024,
            mirroring
        );

        Ok(NromCartridge::new(chr, chr_is_ram, mirroring))
    }
}

impl Cartridge for NromCartridge {
    fn ppu_read(&mut self, addr: u16) -> u8 {
        self.chr[addr as usize & 0x1FFF]
    }

    fn ppu_write(&mut self, addr: u16, value: u8) {
        if self.chr_is_ram {
            self.chr[addr as usize & 0x1FFF] = value;
        }
    }

    fn mirroring(&self) -> MirroringMode {
        MirroringMode::Static(self.mirroring)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_ines(prg_banks: u8, chr_banks: u8, flags6: u8) -> Vec<u8> {
        let mut data = vec![0u8; INES_HEADER_SIZE];
        data[0..4].copy_from_slice(&[0x4E, 0x45, 0x53, 0x1A]);
        data[4] = prg_banks;
        data[5] = chr_banks;
        data[6] = flags6;
        data.resize(
            INES_HEADER_SIZE
                + prg_banks as usize * PRG_ROM_BANK_SIZE
                + chr_banks as usize * CHR_BANK_SIZE,
            0,
        );
        data
    }

    #[test]
    fn rejects_bad_magic() {
        let data = vec![0u8; 32];
        assert!(matches!(
            NromCartridge::from_ines_bytes(&data),
            Err(RomError::InvalidHeader)
        ));
    }

    #[test]
    fn parses_vertical_mirroring() {
        let data = minimal_ines(1, 1, 0x01);
        let cart = NromCartridge::from_ines_bytes(&data).unwrap();
        assert_eq!(cart.mirroring(), MirroringMode::Static(Mirroring::Vertical));
    }

    #[test]
    fn chr_ram_allocated_when_no_chr_rom() {
        let data = minimal_ines(1, 0, 0x00);
        let mut cart = NromCartridge::from_ines_bytes(&data).unwrap();
        cart.ppu_write(0x0000, 0x42);
        assert_eq!(cart.ppu_read(0x0000), 0x42);
    }

    #[test]
    fn rejects_trainer() {
        let data = minimal_ines(1, 1, 0x04);
        assert!(matches!(
            NromCartridge::from_ines_bytes(&data),
            Err(RomError::TrainerNotSupported)
        ));
    }
}
