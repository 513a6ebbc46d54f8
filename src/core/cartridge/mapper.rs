use super::{
    mappers::{NRom, SxRom},
    CartridgeError, CartridgeMemory, Mirroring,
};
use std::fmt::{Debug, Display};

/// Maps addresses in CPU and PPU memory space onto the cartridge's memory.
///
/// Mappers own only their registers (banks, latches, shift registers), the memory itself is
/// passed in as a [CartridgeMemory].
pub trait Mapper: Debug + Display {
    /// The iNES number of the mapper
    fn mapper_num(&self) -> u8;
    /// Read a byte given an address in CPU memory space.
    /// Returns [None] when nothing on the cartridge drives the data bus.
    fn read_cpu(&self, cpu_addr: usize, mem: &CartridgeMemory) -> Option<u8>;
    fn write_cpu(&mut self, cpu_addr: usize, mem: &mut CartridgeMemory, value: u8);
    fn read_ppu(&self, ppu_addr: usize, mem: &CartridgeMemory) -> u8;
    fn write_ppu(&mut self, ppu_addr: usize, mem: &mut CartridgeMemory, value: u8);
    /// The nametable mirroring currently in use, defaults to the one in the iNES header.
    fn mirroring(&self, mem: &CartridgeMemory) -> Mirroring {
        mem.mirroring
    }
}

pub fn get_mapper(mapper_id: u8) -> Result<Box<dyn Mapper>, CartridgeError> {
    match mapper_id {
        0 => Ok(Box::new(NRom::default())),
        1 => Ok(Box::new(SxRom::default())),
        _ => Err(CartridgeError::UnsupportedMapper(mapper_id)),
    }
}

/// Get the address of `offset` inside bank number `bank_num` of size `bank_size`.
pub fn bank_addr(bank_size: usize, bank_num: usize, offset: usize) -> usize {
    bank_size * bank_num + (offset % bank_size)
}
