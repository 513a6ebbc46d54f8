use log::*;

use super::{
    hooks::HookList, Apu, Cartridge, Controller, Display, MemoryAccess, Ppu, Settings,
};

/// Everything connected to the CPU's address and data buses.
///
/// Routes reads and writes to work RAM, the PPU and APU registers, the controller ports and the
/// cartridge, and keeps the last value driven on the data bus so unmapped reads return it.
pub struct Bus {
    /// The 2 KiB of work RAM, mirrored up to `0x2000`
    pub ram: [u8; 0x800],
    pub cartridge: Cartridge,
    pub ppu: Ppu,
    pub apu: Apu,
    pub controllers: [Controller; 2],
    // Last value read or written
    open_bus: u8,
    // CPU cycle count at the start of the current instruction's bus accesses
    pub(crate) cpu_cycles: u64,
    // Page written to 0x4014, waiting for the CPU to start the transfer
    dma_request: Option<u8>,
    memory_hooks: HookList<dyn FnMut(MemoryAccess, u16, u8)>,
}

impl Bus {
    pub fn new(cartridge: Cartridge, settings: &Settings) -> Bus {
        Bus {
            ram: [0; 0x800],
            cartridge,
            ppu: Ppu::new(),
            apu: Apu::new(settings),
            controllers: [Controller::default(); 2],
            open_bus: 0,
            cpu_cycles: 0,
            dma_request: None,
            memory_hooks: HookList::default(),
        }
    }
    /// Read a byte given an address in CPU memory space.
    ///
    /// May have side effects, e.g. reading `0x2002` clears the vblank flag.
    pub fn read(&mut self, addr: u16) -> u8 {
        let value = match addr {
            0x0000..0x2000 => self.ram[addr as usize % 0x800],
            0x2000..0x4000 => self
                .ppu
                .read_register(addr, self.open_bus, &self.cartridge),
            0x4015 => self.apu.read_status(self.open_bus),
            0x4016 => self.controllers[0].read() | (self.open_bus & 0xE0),
            0x4017 => self.controllers[1].read() | (self.open_bus & 0xE0),
            // Write only APU registers, test registers and the expansion area
            0x4000..0x6000 => self.open_bus,
            _ => self
                .cartridge
                .read_cpu(addr as usize)
                .unwrap_or(self.open_bus),
        };
        self.open_bus = value;
        self.call_hooks(MemoryAccess::Read, addr, value);
        value
    }
    /// Write a byte given an address in CPU memory space.
    pub fn write(&mut self, addr: u16, value: u8) {
        self.open_bus = value;
        match addr {
            0x0000..0x2000 => self.ram[addr as usize % 0x800] = value,
            0x2000..0x4000 => self.ppu.write_register(addr, value, &mut self.cartridge),
            0x4014 => self.dma_request = Some(value),
            0x4016 => self.controllers.iter_mut().for_each(|c| c.write(value)),
            0x4000..0x4018 => self
                .apu
                .write_register(addr, value, self.cpu_cycles % 2 == 1),
            0x4018..0x6000 => trace!("Ignoring write of {:02X} to {:04X}", value, addr),
            _ => self.cartridge.write_cpu(addr as usize, value),
        }
        self.call_hooks(MemoryAccess::Write, addr, value);
    }
    /// Read a byte without any side effects.
    ///
    /// Register windows (`0x2000..0x4020`) return `0xFF` since reading them would change their state.
    pub fn peek(&self, addr: u16) -> u8 {
        match addr {
            0x0000..0x2000 => self.ram[addr as usize % 0x800],
            0x2000..0x4020 => 0xFF,
            0x4020..0x6000 => self.open_bus,
            _ => self
                .cartridge
                .read_cpu(addr as usize)
                .unwrap_or(self.open_bus),
        }
    }
    /// The last value driven on the data bus.
    pub fn open_bus(&self) -> u8 {
        self.open_bus
    }
    /// Take the page written to `0x4014`, if any.
    pub fn take_dma_request(&mut self) -> Option<u8> {
        self.dma_request.take()
    }
    /// Advance the PPU by one dot.
    pub fn tick_ppu(&mut self, display: &mut dyn Display, settings: &Settings) {
        self.ppu.tick(&self.cartridge, display, settings);
    }
    /// Advance the APU by one CPU cycle.
    pub fn tick_apu(&mut self) {
        self.apu.tick(&self.cartridge);
    }
    pub(crate) fn memory_hooks(&mut self) -> &mut HookList<dyn FnMut(MemoryAccess, u16, u8)> {
        &mut self.memory_hooks
    }
    fn call_hooks(&mut self, access: MemoryAccess, addr: u16, value: u8) {
        if !self.memory_hooks.is_empty() {
            self.memory_hooks
                .iter_mut()
                .for_each(|hook| hook(access, addr, value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_hex::assert_eq_hex;
    use std::{cell::RefCell, rc::Rc};

    fn bus() -> Bus {
        let mut rom = vec![b'N', b'E', b'S', 0x1A, 0x01, 0x01, 0x00, 0x00];
        rom.resize(16, 0);
        let mut prg = vec![0u8; 0x4000];
        prg[0] = 0x42;
        rom.extend(prg);
        rom.extend(vec![0; 0x2000]);
        match Cartridge::from_ines(&rom) {
            Ok(c) => Bus::new(c, &Settings::default()),
            Err(e) => panic!("{}", e),
        }
    }

    #[test]
    fn test_ram_mirroring() {
        let mut b = bus();
        b.write(0x0801, 0x12);
        assert_eq_hex!(b.read(0x0001), 0x12);
        assert_eq_hex!(b.read(0x1801), 0x12);
    }
    #[test]
    fn test_open_bus() {
        let mut b = bus();
        b.write(0x0000, 0x5A);
        assert_eq_hex!(b.read(0x0000), 0x5A);
        assert_eq_hex!(b.read(0x5000), 0x5A);
        assert_eq_hex!(b.read(0x4000), 0x5A);
        // Write only PPU register
        assert_eq_hex!(b.read(0x2000), 0x5A);
        assert_eq_hex!(b.read(0x8000), 0x42);
        assert_eq_hex!(b.read(0x4018), 0x42);
    }
    #[test]
    fn test_controller_port_upper_bits() {
        let mut b = bus();
        b.controllers[0].buttons.a = true;
        b.write(0x4016, 0x01);
        b.write(0x4016, 0x00);
        b.write(0x0000, 0xE0);
        b.read(0x0000);
        assert_eq_hex!(b.read(0x4016), 0xE1);
        assert_eq_hex!(b.read(0x4016), 0xE0);
        assert_eq_hex!(b.read(0x4017), 0xE0);
    }
    #[test]
    fn test_apu_status_bit_5_is_open_bus() {
        let mut b = bus();
        b.write(0x0000, 0x20);
        b.read(0x0000);
        assert_eq_hex!(b.read(0x4015), 0x20);
    }
    #[test]
    fn test_dma_request() {
        let mut b = bus();
        b.write(0x4014, 0x02);
        assert_eq!(b.take_dma_request(), Some(0x02));
        assert_eq!(b.take_dma_request(), None);
    }
    #[test]
    fn test_save_ram() {
        let mut b = bus();
        b.write(0x6123, 0x77);
        assert_eq_hex!(b.read(0x6123), 0x77);
        assert_eq_hex!(b.peek(0x6123), 0x77);
    }
    #[test]
    fn test_peek_has_no_side_effects() {
        let mut b = bus();
        b.ppu.status = 0x80;
        assert_eq_hex!(b.peek(0x2002), 0xFF);
        assert!(b.ppu.in_vblank());
        assert_eq_hex!(b.read(0x2002) & 0x80, 0x80);
        assert!(!b.ppu.in_vblank());
    }
    #[test]
    fn test_memory_hooks() {
        let mut b = bus();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let id = b
            .memory_hooks()
            .add(Box::new(move |access, addr, value| s.borrow_mut().push((access, addr, value))));
        b.write(0x0010, 0x99);
        b.read(0x0010);
        b.memory_hooks().remove(id);
        b.read(0x0010);
        assert_eq!(
            *seen.borrow(),
            vec![
                (MemoryAccess::Write, 0x0010, 0x99),
                (MemoryAccess::Read, 0x0010, 0x99)
            ]
        );
    }
}
