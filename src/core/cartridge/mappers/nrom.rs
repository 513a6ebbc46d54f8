use std::fmt::{Debug, Display};

use crate::core::{cartridge::CartridgeMemory, Mapper};
use log::*;

#[derive(Default)]
/// NROM cartridge mapper (mapper 0).
///
/// Has no registers. A cartridge with a single 16 KiB bank of PRG ROM has it mirrored at `0xC000`.
pub struct NRom {}

impl Mapper for NRom {
    fn mapper_num(&self) -> u8 {
        0
    }
    fn read_cpu(&self, addr: usize, mem: &CartridgeMemory) -> Option<u8> {
        match addr {
            0x6000..0x8000 => Some(mem.read_prg_ram(addr - 0x6000)),
            0x8000..=0xFFFF => Some(mem.read_prg_rom(addr - 0x8000)),
            _ => None,
        }
    }
    fn write_cpu(&mut self, addr: usize, mem: &mut CartridgeMemory, value: u8) {
        match addr {
            0x6000..0x8000 => mem.write_prg_ram(addr - 0x6000, value),
            0x8000..=0xFFFF => warn!("Write of {:02X} to ROM at {:04X}", value, addr),
            _ => {}
        }
    }
    fn read_ppu(&self, ppu_addr: usize, mem: &CartridgeMemory) -> u8 {
        mem.read_chr(ppu_addr)
    }
    fn write_ppu(&mut self, ppu_addr: usize, mem: &mut CartridgeMemory, value: u8) {
        mem.write_chr(ppu_addr, value)
    }
}

impl Display for NRom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NROM")
    }
}
impl Debug for NRom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self, f)
    }
}
