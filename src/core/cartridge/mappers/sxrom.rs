use std::fmt::{Debug, Display};

use crate::core::{
    cartridge::{mapper::bank_addr, CartridgeMemory, Mirroring},
    Mapper,
};
use log::*;

/// SxROM/MMC1 cartridge mapper (mapper 1).
///
/// Registers are written one bit at a time through a 5 bit serial shift register.
/// The fifth write copies the shift register into the register selected by bits 13 and 14 of
/// the address.
pub struct SxRom {
    shift: u8,
    shift_count: u8,
    control: u8,
    chr_bank_0: usize,
    chr_bank_1: usize,
    prg_bank: usize,
}

impl Default for SxRom {
    fn default() -> SxRom {
        SxRom {
            shift: 0,
            shift_count: 0,
            // Power on with the last bank fixed at 0xC000 so the vectors are always visible
            control: 0x0C,
            chr_bank_0: 0,
            chr_bank_1: 0,
            prg_bank: 0,
        }
    }
}

impl SxRom {
    fn prg_addr(&self, cpu_addr: usize, mem: &CartridgeMemory) -> usize {
        let bank_num = self.prg_bank & 0x0F;
        match (self.control & 0x0C) >> 2 {
            // Switch 32 KiB, ignoring the low bit of the bank number
            0 | 1 => bank_addr(0x8000, bank_num >> 1, cpu_addr),
            // First bank fixed at 0x8000, switch 0xC000
            2 => {
                if cpu_addr < 0xC000 {
                    bank_addr(0x4000, 0, cpu_addr)
                } else {
                    bank_addr(0x4000, bank_num, cpu_addr)
                }
            }
            // Switch 0x8000, last bank fixed at 0xC000
            _ => {
                if cpu_addr < 0xC000 {
                    bank_addr(0x4000, bank_num, cpu_addr)
                } else {
                    bank_addr(0x4000, mem.prg_banks() - 1, cpu_addr)
                }
            }
        }
    }
    fn chr_addr(&self, ppu_addr: usize) -> usize {
        if self.control & 0x10 == 0 {
            bank_addr(0x2000, self.chr_bank_0 >> 1, ppu_addr)
        } else if ppu_addr < 0x1000 {
            bank_addr(0x1000, self.chr_bank_0, ppu_addr)
        } else {
            bank_addr(0x1000, self.chr_bank_1, ppu_addr)
        }
    }
    fn load_register(&mut self, cpu_addr: usize, value: u8) {
        match (cpu_addr >> 13) & 0x03 {
            0 => self.control = value,
            1 => self.chr_bank_0 = value as usize,
            2 => self.chr_bank_1 = value as usize,
            _ => self.prg_bank = value as usize,
        }
        trace!("{:?}", self);
    }
}

impl Mapper for SxRom {
    fn mapper_num(&self) -> u8 {
        1
    }
    fn read_cpu(&self, cpu_addr: usize, mem: &CartridgeMemory) -> Option<u8> {
        match cpu_addr {
            0x6000..0x8000 => Some(mem.read_prg_ram(cpu_addr - 0x6000)),
            0x8000..=0xFFFF => Some(mem.read_prg_rom(self.prg_addr(cpu_addr, mem))),
            _ => None,
        }
    }
    fn write_cpu(&mut self, cpu_addr: usize, mem: &mut CartridgeMemory, value: u8) {
        match cpu_addr {
            0x6000..0x8000 => mem.write_prg_ram(cpu_addr - 0x6000, value),
            0x8000..=0xFFFF => {
                if value & 0x80 != 0 {
                    // Reset shift and lock PRG ROM into mode 3
                    self.shift = 0;
                    self.shift_count = 0;
                    self.control |= 0x0C;
                    return;
                }
                self.shift |= (value & 0x01) << self.shift_count;
                self.shift_count += 1;
                if self.shift_count == 5 {
                    let value = self.shift;
                    self.shift = 0;
                    self.shift_count = 0;
                    self.load_register(cpu_addr, value);
                }
            }
            _ => {}
        }
    }
    fn read_ppu(&self, ppu_addr: usize, mem: &CartridgeMemory) -> u8 {
        mem.read_chr(self.chr_addr(ppu_addr))
    }
    fn write_ppu(&mut self, ppu_addr: usize, mem: &mut CartridgeMemory, value: u8) {
        let addr = self.chr_addr(ppu_addr);
        mem.write_chr(addr, value);
    }
    fn mirroring(&self, _mem: &CartridgeMemory) -> Mirroring {
        match self.control & 0x03 {
            0 => Mirroring::OneScreenLow,
            1 => Mirroring::OneScreenHigh,
            2 => Mirroring::Vertical,
            _ => Mirroring::Horizontal,
        }
    }
}

impl Display for SxRom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SxROM (MMC1)")
    }
}
impl Debug for SxRom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SxROM control={:02X} chr0={:02X} chr1={:02X} prg={:02X} shift={:05b}/{}",
            self.control,
            self.chr_bank_0,
            self.chr_bank_1,
            self.prg_bank,
            self.shift,
            self.shift_count
        )
    }
}
