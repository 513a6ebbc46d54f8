use log::*;

use crate::core::{
    opcodes, AudioSink, Bus, Buttons, Cartridge, CartridgeError, Cpu, Display, ExecutionHook,
    FrameBuffer, HookId, InputSource, MemoryHook, Settings, Silence, RESET_VECTOR,
};

/// The NES.
///
/// The entire NES console.
/// Contains a [Cpu] and a [Bus] (which in turn holds the [Ppu](crate::core::Ppu),
/// [Apu](crate::core::Apu), controllers and the [Cartridge]), and keeps them all synchronized:
/// for every cycle the CPU spends the PPU advances 3 dots and the APU 1 cycle.
pub struct Nes {
    /// CPU of the NES
    pub cpu: Cpu,
    /// Everything the CPU can address
    pub bus: Bus,
    display: Box<dyn Display>,
    settings: Settings,
}

impl Nes {
    /// Create a NES from the contents of an iNES (.nes) file.
    ///
    /// The PC will be initialised from the reset vector.
    /// ```rust,ignore
    /// use nescore::{Nes, Settings};
    /// let game = include_bytes!("my_game.nes");
    /// let nes = Nes::from_ines(game, Settings::default())?;
    /// ```
    pub fn from_ines(bytes: &[u8], settings: Settings) -> Result<Nes, CartridgeError> {
        Ok(Nes::with_cartridge(Cartridge::from_ines(bytes)?, settings))
    }
    /// Initialize the NES with a given cartridge inserted.
    pub fn with_cartridge(cartridge: Cartridge, settings: Settings) -> Nes {
        let bus = Bus::new(cartridge, &settings);
        let mut cpu = Cpu::new();
        cpu.p_c = u16::from_le_bytes([bus.peek(RESET_VECTOR), bus.peek(RESET_VECTOR + 1)]);
        info!("Initialized PC to {:04X}", cpu.p_c);
        Nes {
            cpu,
            bus,
            display: Box::new(FrameBuffer::default()),
            settings,
        }
    }
    /// Start executing at `addr` instead of the reset vector.
    ///
    /// Used to run test ROMs such as `nestest` in their automated mode.
    pub fn with_start_address(mut self, addr: u16) -> Nes {
        self.cpu.p_c = addr;
        self
    }
    /// Draw to `display` instead of the built in [FrameBuffer].
    pub fn with_display(mut self, display: Box<dyn Display>) -> Nes {
        self.set_display(display);
        self
    }
    pub fn set_display(&mut self, display: Box<dyn Display>) {
        self.display = display;
    }
    /// The most recent picture, if the display keeps one in memory.
    pub fn frame_buffer(&self) -> Option<&FrameBuffer> {
        self.display.frame_buffer()
    }
    /// Send audio to `sink`.
    ///
    /// Passing [None] (for example when no audio device could be opened) keeps emulating without sound.
    pub fn set_audio_sink(&mut self, sink: Option<Box<dyn AudioSink>>) {
        match sink {
            Some(sink) => self.bus.apu.set_sink(sink),
            None => {
                warn!("No audio sink available, continuing without sound");
                self.bus.apu.set_sink(Box::new(Silence));
            }
        }
    }
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Advance the NES by 1 instruction, or by one step of an OAM DMA transfer.
    ///
    /// Delivers any NMI or IRQ raised, then catches the PPU and APU up with the CPU.
    /// Returns the number of CPU cycles elapsed, including any interrupt.
    pub fn step(&mut self) -> u32 {
        let start = self.cpu.cycles;
        self.cpu.execute_next_instruction(&mut self.bus);
        if !self.cpu.is_dma_active() {
            let nmi = self.bus.ppu.nmi_line();
            self.cpu.set_nmi(nmi, &mut self.bus);
            if self.bus.apu.irq_active() {
                self.cpu.irq(&mut self.bus);
            }
        }
        let elapsed = self.cpu.cycles - start;
        for _ in 0..(elapsed * 3) {
            self.bus.tick_ppu(self.display.as_mut(), &self.settings);
        }
        for _ in 0..elapsed {
            self.bus.tick_apu();
        }
        elapsed as u32
    }
    /// Advance the NES by 1 frame, approx 29780 cycles.
    ///
    /// Steps until the PPU finishes the frame it is currently drawing.
    /// Returns the total number of CPU cycles elapsed.
    pub fn advance_frame(&mut self) -> u64 {
        let mut cycles = 0;
        // Forget a frame that finished during an earlier call to step
        self.bus.ppu.take_frame_complete();
        while !self.bus.ppu.take_frame_complete() {
            cycles += self.step() as u64;
        }
        cycles
    }
    /// Press the reset button.
    pub fn reset(&mut self) {
        self.cpu.reset(&mut self.bus);
    }
    /// Whether the CPU is stuck on a halting opcode.
    pub fn is_halted(&self) -> bool {
        self.cpu.is_halted()
    }
    /// The CPU's state and next instruction in the format of `nestest.log`.
    ///
    /// Has no side effects.
    pub fn trace_line(&self) -> String {
        opcodes::trace_line(&self.cpu, &self.bus)
    }

    /// Set the buttons pressed on a controller.
    ///
    /// The ROM will still have to poll for the controller state.
    /// * `player` The controller being updated. Should be either `0` or `1`
    pub fn set_buttons(&mut self, player: usize, buttons: Buttons) {
        match self.bus.controllers.get_mut(player) {
            Some(c) => c.buttons = buttons,
            None => warn!("Ignoring buttons for controller {}", player),
        }
    }
    /// Set the buttons pressed on a controller by polling an [InputSource].
    pub fn poll_input(&mut self, player: usize, input: &mut dyn InputSource) {
        match self.bus.controllers.get_mut(player) {
            Some(c) => c.poll(input),
            None => warn!("Ignoring input for controller {}", player),
        }
    }

    /// Call `hook` before every instruction is executed.
    pub fn add_execution_hook(&mut self, hook: ExecutionHook) -> HookId {
        self.cpu.execution_hooks().add(hook)
    }
    pub fn remove_execution_hook(&mut self, id: HookId) -> bool {
        self.cpu.execution_hooks().remove(id)
    }
    /// Call `hook` on every read and write the CPU (or OAM DMA) makes.
    pub fn add_memory_hook(&mut self, hook: MemoryHook) -> HookId {
        self.bus.memory_hooks().add(hook)
    }
    pub fn remove_memory_hook(&mut self, id: HookId) -> bool {
        self.bus.memory_hooks().remove(id)
    }

    /// Get the savedata of the game in the NES, if there is any
    ///
    /// Really just an alias for [`self.bus.cartridge.memory.prg_ram`][crate::core::CartridgeMemory#structfield.prg_ram]
    /// if the cartridge has battery backed ram,
    /// since "savedata" on the NES is just the cartridge RAM.
    pub fn savedata(&self) -> Option<&[u8]> {
        if self.bus.cartridge.has_battery_backed_ram() {
            Some(&self.bus.cartridge.memory.prg_ram)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_hex::assert_eq_hex;

    // A NROM image whose reset vector points at 0x8000, with `program` placed there
    // NMI goes to 0x9000 and IRQ to 0xA000, both NOP sleds
    fn nes(program: &[u8]) -> Nes {
        let mut rom = vec![b'N', b'E', b'S', 0x1A, 0x01, 0x01, 0x00, 0x00];
        rom.resize(16, 0);
        let mut prg = vec![0xEA; 0x4000];
        prg[..program.len()].copy_from_slice(program);
        prg[0x3FFC] = 0x00;
        prg[0x3FFD] = 0x80;
        prg[0x3FFA] = 0x00;
        prg[0x3FFB] = 0x90;
        prg[0x3FFE] = 0x00;
        prg[0x3FFF] = 0xA0;
        rom.extend(prg);
        rom.extend(vec![0; 0x2000]);
        match Nes::from_ines(&rom, Settings::default()) {
            Ok(n) => n,
            Err(e) => panic!("{}", e),
        }
    }

    #[test]
    fn test_starts_at_reset_vector() {
        let nes = nes(&[]);
        assert_eq_hex!(nes.cpu.p_c, 0x8000);
        assert_eq_hex!(nes.cpu.s_p, 0xFD);
        assert_eq!(nes.cpu.cycles, 7);
    }
    #[test]
    fn test_step_keeps_ppu_in_lockstep() {
        let mut nes = nes(&[]);
        let mut cycles = 0;
        for _ in 0..100 {
            cycles += nes.step();
        }
        assert_eq!(cycles, 200);
        assert_eq!(nes.bus.ppu.dot(), (cycles * 3) % 341);
    }
    #[test]
    fn test_reset() {
        let mut nes = nes(&[0x58]);
        nes.step();
        assert!(!nes.cpu.s_r.i);
        nes.cpu.p_c = 0x8100;
        nes.reset();
        assert_eq_hex!(nes.cpu.p_c, 0x8000);
        assert_eq_hex!(nes.cpu.s_p, 0xFA);
        assert!(nes.cpu.s_r.i);
    }
    #[test]
    fn test_vblank_nmi() {
        // Enable NMI then loop
        let mut nes = nes(&[0xA9, 0x80, 0x8D, 0x00, 0x20, 0x4C, 0x05, 0x80]);
        nes.advance_frame();
        nes.advance_frame();
        // The handler at 0x9000 is a sled of NOPs
        assert!(nes.cpu.p_c >= 0x9000);
        assert_eq_hex!(nes.bus.ram[0x1FD], 0x80);
        assert_eq_hex!(nes.bus.ram[0x1FB] & 0x30, 0x20);
    }
    #[test]
    fn test_frame_irq() {
        // CLI; LDA #$00; STA $4017; JMP $8006
        let mut nes = nes(&[0x58, 0xA9, 0x00, 0x8D, 0x17, 0x40, 0x4C, 0x06, 0x80]);
        let mut cycles = 0;
        while nes.cpu.p_c < 0xA000 {
            cycles += nes.step();
            assert!(cycles < 40_000, "No IRQ after {} cycles", cycles);
        }
        // One four step sequence after the write, plus the interrupt itself
        assert!((29_835..29_860).contains(&cycles), "Took {} cycles", cycles);
        assert_eq_hex!(nes.bus.ram[0x1FD], 0x80);
        assert_eq_hex!(nes.bus.ram[0x1FC], 0x06);
        assert_eq_hex!(nes.bus.ram[0x1FB] & 0x30, 0x20);
        assert!(nes.cpu.s_r.i);
        // Reading the status acknowledges it
        assert_eq_hex!(nes.bus.read(0x4015) & 0x40, 0x40);
        assert!(!nes.bus.apu.irq_active());
    }
    #[test]
    fn test_dmc_irq() {
        // $4010 = IRQ on at the fastest rate, $4013 = 1 byte sample, $4015 = start DMC; CLI; JMP $8010
        let mut nes = nes(&[
            0xA9, 0x8F, 0x8D, 0x10, 0x40, 0xA9, 0x00, 0x8D, 0x13, 0x40, 0xA9, 0x10, 0x8D, 0x15,
            0x40, 0x58, 0x4C, 0x10, 0x80,
        ]);
        // The flag rises during the write to $4015, CLI holds it off for one more instruction
        for _ in 0..8 {
            nes.step();
        }
        assert_eq_hex!(nes.cpu.p_c, 0xA000);
        assert_eq_hex!(nes.bus.ram[0x1FC], 0x10);
        assert!(nes.bus.apu.irq_active());
        // A status write acknowledges it
        nes.bus.write(0x4015, 0x00);
        assert!(!nes.bus.apu.irq_active());
    }
    #[test]
    fn test_masked_irq_is_not_taken() {
        // LDA #$00; STA $4017; JMP $8005
        let mut nes = nes(&[0xA9, 0x00, 0x8D, 0x17, 0x40, 0x4C, 0x05, 0x80]);
        while !nes.bus.apu.irq_active() {
            nes.step();
        }
        nes.step();
        assert_eq_hex!(nes.cpu.p_c, 0x8005);
        assert_eq_hex!(nes.cpu.s_p, 0xFD);
    }
    #[test]
    fn test_missing_audio_sink_is_silent() {
        let mut nes = nes(&[]);
        nes.set_audio_sink(None);
        nes.advance_frame();
        assert!(nes.frame_buffer().is_some());
    }
}
