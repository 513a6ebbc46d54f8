mod mapper;
pub use mapper::Mapper;
pub mod mappers;

use crate::core::cartridge::mapper::get_mapper;
use log::*;
use std::fmt::{Debug, Display};
use thiserror::Error;

/// Size of the iNES header.
pub const INES_HEADER_SIZE: usize = 16;
/// Size of a single bank of PRG ROM declared by the iNES header.
pub const PRG_BANK_SIZE: usize = 0x4000;
/// Size of a single bank of CHR ROM declared by the iNES header.
pub const CHR_BANK_SIZE: usize = 0x2000;
/// Size of the cartridge's save (PRG) RAM, mapped at `0x6000..0x8000`.
pub const PRG_RAM_SIZE: usize = 0x2000;
const TRAINER_SIZE: usize = 512;

/// An error encountered while loading a cartridge image.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartridgeError {
    /// The image does not start with `NES\x1A`
    #[error("invalid iNES signature {0:02X?}")]
    InvalidSignature([u8; 4]),
    /// The header declares zero banks of PRG ROM
    #[error("the header declares no PRG ROM")]
    MissingPrgRom,
    /// The image is shorter than the header says it is
    #[error("image is truncated, expected {expected:#X} bytes but found {actual:#X}")]
    Truncated { expected: usize, actual: usize },
    /// The cartridge uses a mapper that is not emulated
    #[error("unsupported mapper {0}")]
    UnsupportedMapper(u8),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
/// How the 2 KiB of nametable RAM is mirrored to fill the 4 nametables the PPU can address.
///
/// See [the NESDEV wiki](https://www.nesdev.org/wiki/Mirroring#Nametable_Mirroring).
pub enum Mirroring {
    /// `0x2000 = 0x2400` and `0x2800 = 0x2C00`
    Horizontal,
    /// `0x2000 = 0x2800` and `0x2400 = 0x2C00`
    Vertical,
    /// Every nametable uses the first KiB of RAM
    OneScreenLow,
    /// Every nametable uses the second KiB of RAM
    OneScreenHigh,
}

/// Contains all memory in the cartridge that isn't mapper-specific.
///
/// Contains PRG ROM, CHR ROM/RAM and the save RAM.
/// Does not contain any latches, banks, or shift registers used by mappers.
#[derive(Clone)]
pub struct CartridgeMemory {
    /// Program RAM (PRG RAM, also known as save RAM) of the cartridge
    pub prg_ram: Vec<u8>,
    /// Program ROM (PRG ROM) of the cartridge
    pub prg_rom: Vec<u8>,
    /// Character RAM (CHR RAM) of the cartridge, empty if the cartridge has CHR ROM
    pub chr_ram: Vec<u8>,
    /// Character ROM (CHR ROM) of the cartridge
    pub chr_rom: Vec<u8>,
    /// Mirroring declared by the header.
    /// May be overridden by the mapper, use [Cartridge::mirroring] to get the mirroring currently in use
    pub mirroring: Mirroring,
}

impl CartridgeMemory {
    /// Read a byte from CHR ROM or (if CHR ROM is empty) CHR RAM.
    pub fn read_chr(&self, addr: usize) -> u8 {
        let chr = if self.chr_rom.is_empty() {
            &self.chr_ram
        } else {
            &self.chr_rom
        };
        if chr.is_empty() {
            return 0;
        }
        chr[addr % chr.len()]
    }
    /// Write a byte to CHR RAM, if present.
    pub fn write_chr(&mut self, addr: usize, value: u8) {
        if !self.chr_ram.is_empty() {
            let i = addr % self.chr_ram.len();
            self.chr_ram[i] = value;
        }
    }
    /// Read a byte of PRG ROM, mirroring the address if it is outside of ROM.
    pub fn read_prg_rom(&self, addr: usize) -> u8 {
        self.prg_rom[addr % self.prg_rom.len()]
    }
    /// Read a byte of PRG RAM given an offset from `0x6000`.
    pub fn read_prg_ram(&self, addr: usize) -> u8 {
        self.prg_ram[addr % self.prg_ram.len()]
    }
    /// Write a byte of PRG RAM given an offset from `0x6000`.
    pub fn write_prg_ram(&mut self, addr: usize, value: u8) {
        let i = addr % self.prg_ram.len();
        self.prg_ram[i] = value;
    }
    /// The number of 16 KiB banks of PRG ROM.
    pub fn prg_banks(&self) -> usize {
        self.prg_rom.len().div_ceil(PRG_BANK_SIZE)
    }
}

/// An NES cartridge.
///
/// Contains the cartridge's RAM and ROM in [CartridgeMemory] and a [Mapper] responsible for mapping addresses to data.
pub struct Cartridge {
    /// The memory in the cartridge
    pub memory: CartridgeMemory,
    /// The mapper the cartridge is using
    pub mapper: Box<dyn Mapper>,
    // Whether the cartridge has battery backed RAM and should be saved
    has_battery_ram: bool,
}

impl Cartridge {
    /// Create a new cartridge from the contents of an iNES (.nes) file.
    ///
    /// Fails if the signature is wrong, if the header declares no PRG ROM, if the file is shorter
    /// than the header declares, or if the mapper is not supported.
    /// ```
    /// use nescore::core::{Cartridge, CartridgeError};
    /// let bad = [b'N', b'E', b'S', 0x1A, 0x00, 0x01, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
    /// assert_eq!(Cartridge::from_ines(&bad).err(), Some(CartridgeError::MissingPrgRom));
    /// ```
    pub fn from_ines(bytes: &[u8]) -> Result<Cartridge, CartridgeError> {
        if bytes.len() < INES_HEADER_SIZE {
            return Err(CartridgeError::Truncated {
                expected: INES_HEADER_SIZE,
                actual: bytes.len(),
            });
        }
        let signature = [bytes[0], bytes[1], bytes[2], bytes[3]];
        if signature != [b'N', b'E', b'S', 0x1A] {
            return Err(CartridgeError::InvalidSignature(signature));
        }
        debug!("Cartridge header: {:X?}", &bytes[0..INES_HEADER_SIZE]);
        let prg_rom_size = PRG_BANK_SIZE * bytes[4] as usize;
        let chr_rom_size = CHR_BANK_SIZE * bytes[5] as usize;
        if prg_rom_size == 0 {
            return Err(CartridgeError::MissingPrgRom);
        }
        let has_battery_ram = (bytes[6] & 0x02) != 0;
        let has_trainer = (bytes[6] & 0x04) != 0;
        let four_screen = (bytes[6] & 0x08) != 0;
        debug!(
            "Trainer: {}, four screen nametables: {}, battery backed ram: {}",
            has_trainer, four_screen, has_battery_ram
        );
        let start = INES_HEADER_SIZE + if has_trainer { TRAINER_SIZE } else { 0 };
        let total_file_size = start + prg_rom_size + chr_rom_size;
        debug!(
            "Total data size: {:X} bytes. File size: {:X}",
            total_file_size,
            bytes.len()
        );
        if bytes.len() < total_file_size {
            return Err(CartridgeError::Truncated {
                expected: total_file_size,
                actual: bytes.len(),
            });
        }
        let mapper_id = (bytes[6] >> 4) | (bytes[7] & 0xF0);
        let mirroring = if four_screen {
            warn!("Four screen nametables are not supported, using vertical mirroring");
            Mirroring::Vertical
        } else if (bytes[6] & 0x01) == 0 {
            Mirroring::Horizontal
        } else {
            Mirroring::Vertical
        };
        debug!("Cartridge is using {:?} mirroring", mirroring);
        debug!(
            "Cartridge is using {} mapper (0x{:X})",
            mapper_id, mapper_id
        );
        let mapper = get_mapper(mapper_id)?;
        let prg_rom = bytes[start..(start + prg_rom_size)].to_vec();
        let chr_rom = bytes[(start + prg_rom_size)..total_file_size].to_vec();
        let chr_ram_size = if chr_rom_size == 0 { CHR_BANK_SIZE } else { 0 };
        debug!(
            "{:X} bytes PRG ROM, {:X} bytes CHR ROM, {:X} bytes PRG RAM, {:X} bytes CHR RAM",
            prg_rom_size, chr_rom_size, PRG_RAM_SIZE, chr_ram_size
        );
        Ok(Cartridge {
            memory: CartridgeMemory {
                prg_rom,
                chr_rom,
                prg_ram: vec![0; PRG_RAM_SIZE],
                chr_ram: vec![0; chr_ram_size],
                mirroring,
            },
            mapper,
            has_battery_ram,
        })
    }
    /// Read a byte from the cartridge given an address in CPU memory space.
    ///
    /// Returns [None] if nothing on the cartridge responds to the address.
    pub fn read_cpu(&self, addr: usize) -> Option<u8> {
        self.mapper.read_cpu(addr, &self.memory)
    }
    /// Write a byte to the cartridge given an address in CPU memory space.
    pub fn write_cpu(&mut self, addr: usize, value: u8) {
        self.mapper.write_cpu(addr, &mut self.memory, value);
    }
    /// Read a byte of pattern data given an address in PPU memory space.
    pub fn read_ppu(&self, addr: usize) -> u8 {
        self.mapper.read_ppu(addr, &self.memory)
    }
    /// Write a byte of pattern data (only has an effect on CHR RAM).
    pub fn write_ppu(&mut self, addr: usize, value: u8) {
        self.mapper.write_ppu(addr, &mut self.memory, value);
    }
    /// Transform a nametable address (`0x2000..0x3F00`) into an index in the PPU's 2 KiB of nametable RAM.
    ///
    /// The PPU can address four full screens of nametable data but only has enough memory for two,
    /// so two of them are always mirrors of the others.
    /// ```
    /// # let mut rom = vec![b'N', b'E', b'S', 0x1A, 0x01, 0x01, 0x01, 0x00];
    /// # rom.resize(16 + 0x6000, 0);
    /// let cartridge = nescore::Cartridge::from_ines(&rom).unwrap();
    /// // Vertical mirroring
    /// assert_eq!(cartridge.nametable_index(0x2000), cartridge.nametable_index(0x2800));
    /// assert_eq!(cartridge.nametable_index(0x2C05), 0x405);
    /// ```
    pub fn nametable_index(&self, addr: usize) -> usize {
        let offset = addr & 0x03FF;
        let table = (addr >> 10) & 0x03;
        match self.mirroring() {
            Mirroring::Horizontal => ((table >> 1) << 10) | offset,
            Mirroring::Vertical => ((table & 0x01) << 10) | offset,
            Mirroring::OneScreenLow => offset,
            Mirroring::OneScreenHigh => 0x400 | offset,
        }
    }
    /// [true] if the cartridge has battery backed RAM (i.e. save data), [false] otherwise
    pub fn has_battery_backed_ram(&self) -> bool {
        self.has_battery_ram
    }
    /// Get the mirroring the cartridge is currently using
    pub fn mirroring(&self) -> Mirroring {
        self.mapper.mirroring(&self.memory)
    }
}

impl Display for Cartridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.mapper, f)
    }
}
impl Debug for Cartridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.mapper, f)
    }
}
