//! nes-ppu-core
//!
//! Headless demonstration binary: loads an iNES ROM, clocks the PPU alone
//! (no CPU) for a fixed number of frames, logs per-frame NMI activity, and
//! optionally dumps the resulting framebuffer as a PPM image so a loaded
//! ROM's first frames can be sanity-checked without a presentation layer.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::debug;

use nes_ppu_core::cartridge::NromCartridge;
use nes_ppu_core::ppu::{SCREEN_HEIGHT, SCREEN_WIDTH};
use nes_ppu_core::Ppu;

/// Run the PPU core's background/sprite pipeline against a ROM and report
/// per-frame NMI activity.
#[derive(Parser, Debug)]
#[command(name = "nes-ppu-core", version, about)]
struct Args {
    /// Path to an iNES (.nes) ROM image.
    rom_path: PathBuf,

    /// Number of frames to clock before exiting.
    #[arg(short, long, default_value_t = 1)]
    frames: u32,

    /// Write the final frame to this path as a PPM image.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Raise logging verbosity (can be repeated).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let rom_bytes = fs::read(&args.rom_path)
        .with_context(|| format!("reading ROM file {}", args.rom_path.display()))?;
    let mut cart = NromCartridge::from_ines_bytes(&rom_bytes)
        .with_context(|| format!("parsing iNES ROM {}", args.rom_path.display()))?;

    let mut ppu = Ppu::new();
    ppu.reset(&mut cart);
    ppu.cpu_write(0, 0x80, &mut cart); // enable NMI generation
    ppu.cpu_write(1, 0x18, &mut cart); // enable background + sprite rendering

    let mut nmi_count = 0u32;
    for frame in 0..args.frames {
        while !ppu.frame_complete() {
            ppu.clock(&mut cart);
            if ppu.consume_nmi() {
                nmi_count += 1;
            }
        }
        ppu.clear_frame_complete();
        debug!("frame {frame} complete, cumulative NMIs: {nmi_count}");
    }

    println!(
        "ran {} frame(s) from {}, {} NMI(s) observed",
        args.frames,
        args.rom_path.display(),
        nmi_count
    );

    if let Some(output) = args.output {
        write_ppm(&output, ppu.frame_buffer())
            .with_context(|| format!("writing framebuffer to {}", output.display()))?;
        println!("wrote framebuffer to {}", output.display());
    }

    Ok(())
}

fn write_ppm(path: &PathBuf, frame_rgb: &[u8]) -> Result<()> {
    use std::io::Write;

    let mut file = fs::File::create(path)?;
    write!(file, "P6\n{SCREEN_WIDTH} {SCREEN_HEIGHT}\n255\n")?;
    file.write_all(frame_rgb)?;
    Ok(())
}
