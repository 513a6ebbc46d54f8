#![allow(dead_code)]
use log::LevelFilter;
use simplelog::{Config, TestLogger};

/// Where `nes_with_program!` places the NMI handler.
pub const NMI_HANDLER: u16 = 0x9000;
/// Where `nes_with_program!` places the IRQ/BRK handler.
pub const IRQ_HANDLER: u16 = 0xA000;

// Logs go through the test harness so they only show up for failing tests
pub fn init_logger() {
    let _ = TestLogger::init(LevelFilter::Debug, Config::default());
}

/// Build an iNES image from raw PRG and CHR data.
pub fn ines(prg: &[u8], chr: &[u8], mapper: u8) -> Vec<u8> {
    let mut rom = vec![
        b'N',
        b'E',
        b'S',
        0x1A,
        (prg.len() / 0x4000) as u8,
        (chr.len() / 0x2000) as u8,
        (mapper & 0x0F) << 4,
        mapper & 0xF0,
    ];
    rom.resize(16, 0);
    rom.extend_from_slice(prg);
    rom.extend_from_slice(chr);
    rom
}

/// A 16 KiB NROM image with `program` at `0x8000` and NOPs everywhere else.
///
/// Reset points at the program, NMI at [NMI_HANDLER] and IRQ at [IRQ_HANDLER].
/// The cartridge has 8 KiB of CHR RAM.
pub fn program_rom(program: &[u8]) -> Vec<u8> {
    let mut prg = vec![0xEA; 0x4000];
    prg[..program.len()].copy_from_slice(program);
    prg[0x3FFA..].copy_from_slice(&[
        NMI_HANDLER as u8,
        (NMI_HANDLER >> 8) as u8,
        0x00,
        0x80,
        IRQ_HANDLER as u8,
        (IRQ_HANDLER >> 8) as u8,
    ]);
    ines(&prg, &[], 0)
}

// Create an NES running a program from 0x8000
#[macro_export]
macro_rules! nes_with_program {
    ($program: expr) => {{
        common::init_logger();
        match nescore::Nes::from_ines(&common::program_rom($program), nescore::Settings::default())
        {
            Ok(nes) => nes,
            Err(e) => panic!("Unable to load program: {}", e),
        }
    }};
}

// Step the NES a certain number of times, returning the total cycles elapsed
#[macro_export]
macro_rules! run_instructions {
    ($nes: ident, $count: expr) => {{
        let mut cycles: u64 = 0;
        (0..($count)).for_each(|_| cycles += $nes.step() as u64);
        cycles
    }};
}
