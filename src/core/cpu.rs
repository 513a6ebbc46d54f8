use std::fmt::Debug;

use log::*;

use crate::core::{
    hooks::HookList,
    opcodes::{Access, AddressingMode, Instruction, Mnemonic, INSTRUCTIONS},
    Bus, StatusRegister, IRQ_VECTOR, NMI_VECTOR, RESET_VECTOR,
};

/// Dots before the end of an interrupt's vector fetch in which a rising NMI still takes over the vector.
const NMI_HIJACK_WINDOW: u32 = 15;
/// Cycles taken to push the program counter and status and fetch a vector.
const INTERRUPT_CYCLES: u64 = 7;

// State of an OAM DMA transfer in progress
#[derive(Debug, Clone, Copy)]
struct OamDma {
    page: u8,
    offset: u16,
    aligned: bool,
}

/// The CPU of the NES.
///
/// Contains all registers and is responsible for changing the flags when the values are set/unset.
/// Executes one instruction (or one step of a DMA transfer) at a time through
/// [Cpu::execute_next_instruction], counting the cycles it takes.
pub struct Cpu {
    /// Accumulator
    pub a: u8,
    /// X index register
    pub x: u8,
    /// Y index register
    pub y: u8,
    /// Program counter
    pub p_c: u16,
    /// Stack pointer
    pub s_p: u8,
    /// Status register
    pub s_r: StatusRegister,
    /// Total number of cycles executed since power on
    pub cycles: u64,
    // Instructions left before a change to the interrupt disable flag is seen by IRQ sampling
    interrupt_delay: u32,
    // Interrupt disable flag as it was before the current instruction
    prev_i: bool,
    dma: Option<OamDma>,
    // Last state of the NMI line, used to detect the rising edge
    nmi_previous: bool,
    // Set when an IRQ or BRK already used the vector of an NMI that hasn't risen yet
    nmi_suppressed: bool,
    halted: bool,
    execution_hooks: HookList<dyn FnMut(u16, u8, u8, u8)>,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    /// Create a new CPU in its power on state.
    ///
    /// The program counter is left at `0`, see [crate::core::Nes::from_ines] for loading it from the
    /// reset vector.
    pub fn new() -> Cpu {
        Cpu {
            a: 0,
            x: 0,
            y: 0,
            p_c: 0,
            s_p: 0xFD,
            s_r: StatusRegister::new(),
            cycles: 7,
            interrupt_delay: 0,
            prev_i: true,
            dma: None,
            nmi_previous: false,
            nmi_suppressed: false,
            halted: false,
            execution_hooks: HookList::default(),
        }
    }
    /// Reset the CPU as if the reset button was pressed.
    ///
    /// Registers other than the stack pointer and interrupt flag keep their values.
    pub fn reset(&mut self, bus: &mut Bus) {
        self.s_p = self.s_p.wrapping_sub(3);
        self.s_r.i = true;
        self.prev_i = true;
        self.interrupt_delay = 0;
        self.dma = None;
        self.halted = false;
        self.nmi_suppressed = false;
        self.p_c = self.read_u16(bus, RESET_VECTOR);
        self.cycles += INTERRUPT_CYCLES;
        info!("Reset, PC is now {:04X}", self.p_c);
    }
    /// Execute the next instruction, or the next step of an OAM DMA transfer if one is running.
    ///
    /// Returns the number of cycles taken.
    pub fn execute_next_instruction(&mut self, bus: &mut Bus) -> u32 {
        let start = self.cycles;
        self.prev_i = self.s_r.i;
        self.interrupt_delay = self.interrupt_delay.saturating_sub(1);
        match self.dma {
            Some(dma) => self.dma_step(bus, dma),
            None => {
                self.execute_instruction(bus);
                if let Some(page) = bus.take_dma_request() {
                    trace!("Starting OAM DMA from page {:02X}", page);
                    self.dma = Some(OamDma {
                        page,
                        offset: 0,
                        aligned: false,
                    });
                }
            }
        }
        (self.cycles - start) as u32
    }
    /// Update the NMI line, running the interrupt on its rising edge.
    pub fn set_nmi(&mut self, active: bool, bus: &mut Bus) {
        if active && !self.nmi_previous {
            if self.nmi_suppressed {
                self.nmi_suppressed = false;
            } else {
                self.nmi(bus);
            }
        }
        self.nmi_previous = active;
    }
    /// Run the non maskable interrupt.
    pub fn nmi(&mut self, bus: &mut Bus) {
        if self.halted {
            return;
        }
        bus.read(self.p_c);
        bus.read(self.p_c);
        self.push_u16(bus, self.p_c);
        self.push(bus, self.s_r.to_byte() & !0x10);
        self.s_r.i = true;
        self.p_c = self.read_u16(bus, NMI_VECTOR);
        self.cycles += INTERRUPT_CYCLES;
    }
    /// Request a maskable interrupt.
    ///
    /// Ignored while the interrupt disable flag is set (as seen before the last `CLI`, `SEI` or `PLP`)
    /// or while a DMA transfer is running.
    pub fn irq(&mut self, bus: &mut Bus) {
        let i = if self.interrupt_delay > 0 {
            self.prev_i
        } else {
            self.s_r.i
        };
        if i || self.dma.is_some() || self.halted {
            return;
        }
        bus.read(self.p_c);
        bus.read(self.p_c);
        self.push_u16(bus, self.p_c);
        self.push(bus, self.s_r.to_byte() & !0x10);
        self.s_r.i = true;
        let vector = self.interrupt_vector(bus);
        self.p_c = self.read_u16(bus, vector);
        self.cycles += INTERRUPT_CYCLES;
    }
    /// Whether the CPU has hit a halting opcode and is stuck re-fetching it.
    pub fn is_halted(&self) -> bool {
        self.halted
    }
    /// Whether an OAM DMA transfer is in progress.
    pub fn is_dma_active(&self) -> bool {
        self.dma.is_some()
    }
    pub(crate) fn execution_hooks(&mut self) -> &mut HookList<dyn FnMut(u16, u8, u8, u8)> {
        &mut self.execution_hooks
    }

    /// Load some value into A.
    /// Sets the status register accordingly.
    ///
    /// ```
    /// let mut cpu = nescore::core::Cpu::new();
    /// cpu.lda(0x18);
    /// assert_eq!(cpu.a, 0x18);
    /// ```
    pub fn lda(&mut self, value: u8) {
        self.a = value;
        self.s_r.set_zn(self.a);
    }
    /// Load some value into X.
    /// Sets the status register accordingly.
    ///
    /// ```
    /// let mut cpu = nescore::core::Cpu::new();
    /// cpu.ldx(0x18);
    /// assert_eq!(cpu.x, 0x18);
    /// ```
    pub fn ldx(&mut self, value: u8) {
        self.x = value;
        self.s_r.set_zn(self.x);
    }
    /// Load some value into Y.
    /// Sets the status register accordingly.
    pub fn ldy(&mut self, value: u8) {
        self.y = value;
        self.s_r.set_zn(self.y);
    }
    /// Add some value with A and the carry bit in the status register.
    /// * Zero is set if A = 0 after the operation
    /// * Carry is set on unsigned overflow
    /// * Overflow is set on signed overflow
    /// * Negative flag is set if the seventh bit is set
    pub fn adc(&mut self, value: u8) {
        let sum = self.a as u16 + value as u16 + self.s_r.c as u16;
        let result = sum as u8;
        self.s_r.c = sum > 0xFF;
        // Both inputs have the same sign but the result has a different one
        self.s_r.v = (self.a ^ result) & (value ^ result) & 0x80 != 0;
        self.a = result;
        self.s_r.set_zn(result);
    }
    /// Subtract some value and the inverted carry bit from A.
    ///
    /// Decimal mode is ignored, so this is an [Cpu::adc] of the complement.
    pub fn sbc(&mut self, value: u8) {
        self.adc(!value);
    }
    /// Perform an AND (`&``) operation between A and some value.
    /// * Z is set if A is 0
    /// * N is set if A is negative (i.e. the MSB is set)
    /// ```
    /// let mut cpu = nescore::core::Cpu::new();
    /// cpu.a = 0xAA;
    /// cpu.and(0x0F);
    /// assert_eq!(cpu.a, 0x0A);
    /// ```
    pub fn and(&mut self, value: u8) {
        self.a &= value;
        self.s_r.set_zn(self.a);
    }
    pub fn ora(&mut self, value: u8) {
        self.a |= value;
        self.s_r.set_zn(self.a);
    }
    pub fn eor(&mut self, value: u8) {
        self.a ^= value;
        self.s_r.set_zn(self.a);
    }
    /// Compare a register with a value, as `CMP`, `CPX` and `CPY` do.
    pub fn compare(&mut self, register: u8, value: u8) {
        self.s_r.c = register >= value;
        self.s_r.set_zn(register.wrapping_sub(value));
    }
    pub fn bit(&mut self, value: u8) {
        self.s_r.z = self.a & value == 0;
        self.s_r.v = value & 0x40 != 0;
        self.s_r.n = value & 0x80 != 0;
    }
    /// Shift left, moving bit 7 into carry.
    pub fn asl(&mut self, value: u8) -> u8 {
        self.s_r.c = value & 0x80 != 0;
        let result = value << 1;
        self.s_r.set_zn(result);
        result
    }
    /// Shift right, moving bit 0 into carry.
    pub fn lsr(&mut self, value: u8) -> u8 {
        self.s_r.c = value & 0x01 != 0;
        let result = value >> 1;
        self.s_r.set_zn(result);
        result
    }
    /// Rotate left through carry.
    pub fn rol(&mut self, value: u8) -> u8 {
        let result = (value << 1) | self.s_r.c as u8;
        self.s_r.c = value & 0x80 != 0;
        self.s_r.set_zn(result);
        result
    }
    /// Rotate right through carry.
    pub fn ror(&mut self, value: u8) -> u8 {
        let result = (value >> 1) | ((self.s_r.c as u8) << 7);
        self.s_r.c = value & 0x01 != 0;
        self.s_r.set_zn(result);
        result
    }
    pub fn inc(&mut self, value: u8) -> u8 {
        let result = value.wrapping_add(1);
        self.s_r.set_zn(result);
        result
    }
    pub fn dec(&mut self, value: u8) -> u8 {
        let result = value.wrapping_sub(1);
        self.s_r.set_zn(result);
        result
    }

    fn execute_instruction(&mut self, bus: &mut Bus) {
        let opcode = bus.read(self.p_c);
        if !self.execution_hooks.is_empty() {
            let pc = self.p_c;
            let op_1 = bus.peek(pc.wrapping_add(1));
            let op_2 = bus.peek(pc.wrapping_add(2));
            self.execution_hooks
                .iter_mut()
                .for_each(|hook| hook(pc, opcode, op_1, op_2));
        }
        let inst = INSTRUCTIONS[opcode as usize];
        self.cycles += inst.cycles as u64;
        bus.cpu_cycles = self.cycles;
        self.p_c = self.p_c.wrapping_add(1);
        self.execute(inst, bus);
    }

    fn execute(&mut self, inst: Instruction, bus: &mut Bus) {
        use Mnemonic::*;
        let mode = inst.mode;
        match inst.mnemonic {
            // Loads and stores
            Lda => {
                let v = self.read_operand(bus, mode);
                self.lda(v);
            }
            Ldx => {
                let v = self.read_operand(bus, mode);
                self.ldx(v);
            }
            Ldy => {
                let v = self.read_operand(bus, mode);
                self.ldy(v);
            }
            Sta => self.store(bus, mode, self.a),
            Stx => self.store(bus, mode, self.x),
            Sty => self.store(bus, mode, self.y),
            // Arithmetic and logic
            Adc => {
                let v = self.read_operand(bus, mode);
                self.adc(v);
            }
            Sbc => {
                let v = self.read_operand(bus, mode);
                self.sbc(v);
            }
            And => {
                let v = self.read_operand(bus, mode);
                self.and(v);
            }
            Ora => {
                let v = self.read_operand(bus, mode);
                self.ora(v);
            }
            Eor => {
                let v = self.read_operand(bus, mode);
                self.eor(v);
            }
            Cmp => {
                let v = self.read_operand(bus, mode);
                self.compare(self.a, v);
            }
            Cpx => {
                let v = self.read_operand(bus, mode);
                self.compare(self.x, v);
            }
            Cpy => {
                let v = self.read_operand(bus, mode);
                self.compare(self.y, v);
            }
            Bit => {
                let v = self.read_operand(bus, mode);
                self.bit(v);
            }
            Asl => {
                self.modify(bus, mode, Cpu::asl);
            }
            Lsr => {
                self.modify(bus, mode, Cpu::lsr);
            }
            Rol => {
                self.modify(bus, mode, Cpu::rol);
            }
            Ror => {
                self.modify(bus, mode, Cpu::ror);
            }
            Inc => {
                self.modify(bus, mode, Cpu::inc);
            }
            Dec => {
                self.modify(bus, mode, Cpu::dec);
            }
            Inx => self.x = self.inc(self.x),
            Iny => self.y = self.inc(self.y),
            Dex => self.x = self.dec(self.x),
            Dey => self.y = self.dec(self.y),
            // Transfers
            Tax => self.ldx(self.a),
            Tay => self.ldy(self.a),
            Txa => self.lda(self.x),
            Tya => self.lda(self.y),
            Tsx => self.ldx(self.s_p),
            Txs => self.s_p = self.x,
            // Stack
            Pha => self.push(bus, self.a),
            Php => self.push(bus, self.s_r.to_byte() | 0x30),
            Pla => {
                let v = self.pop(bus);
                self.lda(v);
            }
            Plp => {
                let v = self.pop(bus);
                self.s_r.from_byte(v);
                self.interrupt_delay = 1;
            }
            // Flags
            Clc => self.s_r.c = false,
            Sec => self.s_r.c = true,
            Cld => self.s_r.d = false,
            Sed => self.s_r.d = true,
            Clv => self.s_r.v = false,
            Cli => {
                self.s_r.i = false;
                self.interrupt_delay = 1;
            }
            Sei => {
                self.s_r.i = true;
                self.interrupt_delay = 1;
            }
            // Branches
            Bcc => self.branch(bus, !self.s_r.c),
            Bcs => self.branch(bus, self.s_r.c),
            Bne => self.branch(bus, !self.s_r.z),
            Beq => self.branch(bus, self.s_r.z),
            Bpl => self.branch(bus, !self.s_r.n),
            Bmi => self.branch(bus, self.s_r.n),
            Bvc => self.branch(bus, !self.s_r.v),
            Bvs => self.branch(bus, self.s_r.v),
            // Jumps and subroutines
            Jmp => self.p_c = self.operand_addr(bus, mode, Access::None),
            Jsr => {
                let addr = self.fetch_u16(bus);
                self.push_u16(bus, self.p_c.wrapping_sub(1));
                self.p_c = addr;
            }
            Rts => {
                self.p_c = self.pop_u16(bus).wrapping_add(1);
            }
            Rti => {
                let v = self.pop(bus);
                self.s_r.from_byte(v);
                self.p_c = self.pop_u16(bus);
            }
            Brk => self.brk(bus),
            Nop => {
                if mode != AddressingMode::Implied {
                    self.read_operand(bus, mode);
                }
            }
            // Unofficial opcodes
            Lax => {
                let mut v = self.read_operand(bus, mode);
                if mode == AddressingMode::Immediate {
                    v &= self.a | 0xEE;
                }
                self.lda(v);
                self.x = v;
            }
            Sax => self.store(bus, mode, self.a & self.x),
            Dcp => {
                let v = self.modify(bus, mode, Cpu::dec);
                self.compare(self.a, v);
            }
            Isb => {
                let v = self.modify(bus, mode, Cpu::inc);
                self.sbc(v);
            }
            Slo => {
                let v = self.modify(bus, mode, Cpu::asl);
                self.ora(v);
            }
            Rla => {
                let v = self.modify(bus, mode, Cpu::rol);
                self.and(v);
            }
            Sre => {
                let v = self.modify(bus, mode, Cpu::lsr);
                self.eor(v);
            }
            Rra => {
                let v = self.modify(bus, mode, Cpu::ror);
                self.adc(v);
            }
            Anc => {
                let v = self.read_operand(bus, mode);
                self.and(v);
                self.s_r.c = self.s_r.n;
            }
            Alr => {
                let v = self.read_operand(bus, mode);
                self.and(v);
                self.a = self.lsr(self.a);
            }
            Arr => {
                let v = self.read_operand(bus, mode);
                self.a = ((self.a & v) >> 1) | ((self.s_r.c as u8) << 7);
                self.s_r.set_zn(self.a);
                self.s_r.c = self.a & 0x40 != 0;
                self.s_r.v = ((self.a >> 6) ^ (self.a >> 5)) & 0x01 != 0;
            }
            Axs => {
                let v = self.read_operand(bus, mode);
                let ax = self.a & self.x;
                self.s_r.c = ax >= v;
                self.x = ax.wrapping_sub(v);
                self.s_r.set_zn(self.x);
            }
            Las => {
                let v = self.read_operand(bus, mode) & self.s_p;
                self.s_p = v;
                self.x = v;
                self.lda(v);
            }
            Xaa => {
                let v = self.read_operand(bus, mode);
                self.lda((self.a | 0xEE) & self.x & v);
            }
            Shy => self.store_and_high(bus, mode, self.x, self.y),
            Shx => self.store_and_high(bus, mode, self.y, self.x),
            Sha => self.store_and_high(bus, mode, self.y, self.a & self.x),
            Shs => {
                self.s_p = self.a & self.x;
                self.store_and_high(bus, mode, self.y, self.s_p);
            }
            Kil => {
                // Park on the opcode so it is fetched again
                self.p_c = self.p_c.wrapping_sub(1);
                self.cycles += 1;
                if !self.halted {
                    warn!("CPU halted by opcode at {:04X}", self.p_c);
                    self.halted = true;
                }
            }
        }
    }

    fn dma_step(&mut self, bus: &mut Bus, mut dma: OamDma) {
        if !dma.aligned {
            bus.read(self.p_c);
            self.cycles += 1;
            // Reads have to land on get cycles
            if self.cycles % 2 == 0 {
                self.cycles += 1;
            }
            dma.aligned = true;
            self.dma = Some(dma);
        } else {
            let value = bus.read(((dma.page as u16) << 8) | dma.offset);
            bus.write(0x2004, value);
            self.cycles += 2;
            dma.offset += 1;
            self.dma = if dma.offset > 0xFF { None } else { Some(dma) };
        }
    }

    fn brk(&mut self, bus: &mut Bus) {
        // Signature byte
        bus.read(self.p_c);
        self.p_c = self.p_c.wrapping_add(1);
        self.push_u16(bus, self.p_c);
        self.push(bus, self.s_r.to_byte() | 0x30);
        self.s_r.i = true;
        let vector = self.interrupt_vector(bus);
        self.p_c = self.read_u16(bus, vector);
    }

    // Vector for an IRQ or BRK, which an NMI arriving during the push takes over
    fn interrupt_vector(&mut self, bus: &Bus) -> u16 {
        if bus.ppu.nmi_line() && !self.nmi_previous {
            debug!("NMI hijacked interrupt at {:04X}", self.p_c);
            self.nmi_previous = true;
            NMI_VECTOR
        } else if bus.ppu.nmi_within(NMI_HIJACK_WINDOW) {
            debug!("Upcoming NMI hijacked interrupt at {:04X}", self.p_c);
            self.nmi_suppressed = true;
            NMI_VECTOR
        } else {
            IRQ_VECTOR
        }
    }

    fn branch(&mut self, bus: &mut Bus, condition: bool) {
        let offset = bus.read(self.p_c) as i8;
        self.p_c = self.p_c.wrapping_add(1);
        if condition {
            self.cycles += 1;
            let target = self.p_c.wrapping_add(offset as u16);
            if (target ^ self.p_c) & 0xFF00 != 0 {
                self.cycles += 1;
            }
            self.p_c = target;
        }
    }

    // Resolve the address an addressing mode points to, issuing its dummy reads
    fn operand_addr(&mut self, bus: &mut Bus, mode: AddressingMode, access: Access) -> u16 {
        use AddressingMode::*;
        match mode {
            Immediate | Relative => {
                let addr = self.p_c;
                self.p_c = self.p_c.wrapping_add(1);
                addr
            }
            ZeroPage => self.fetch(bus) as u16,
            ZeroPageX => self.fetch(bus).wrapping_add(self.x) as u16,
            ZeroPageY => self.fetch(bus).wrapping_add(self.y) as u16,
            Absolute => self.fetch_u16(bus),
            AbsoluteX => {
                let base = self.fetch_u16(bus);
                self.indexed(bus, base, self.x, access)
            }
            AbsoluteY => {
                let base = self.fetch_u16(bus);
                self.indexed(bus, base, self.y, access)
            }
            Indirect => {
                let ptr = self.fetch_u16(bus);
                // The high byte is read without carrying into the next page
                let lo = bus.read(ptr);
                let hi = bus.read((ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF));
                u16::from_le_bytes([lo, hi])
            }
            IndirectX => {
                let ptr = self.fetch(bus).wrapping_add(self.x);
                self.zero_page_pointer(bus, ptr)
            }
            IndirectY => {
                let ptr = self.fetch(bus);
                let base = self.zero_page_pointer(bus, ptr);
                self.indexed(bus, base, self.y, access)
            }
            // No memory operand
            Implied | Accumulator => self.p_c,
        }
    }

    fn indexed(&mut self, bus: &mut Bus, base: u16, index: u8, access: Access) -> u16 {
        let addr = base.wrapping_add(index as u16);
        // Address before the carry into the high byte is fixed up
        let partial = (base & 0xFF00) | (addr & 0x00FF);
        let crossed = partial != addr;
        match access {
            Access::Read if crossed => {
                bus.read(partial);
                self.cycles += 1;
            }
            Access::Write | Access::ReadModifyWrite => {
                bus.read(partial);
            }
            _ => {}
        }
        addr
    }

    fn read_operand(&mut self, bus: &mut Bus, mode: AddressingMode) -> u8 {
        match mode {
            AddressingMode::Accumulator => self.a,
            _ => {
                let addr = self.operand_addr(bus, mode, Access::Read);
                bus.read(addr)
            }
        }
    }

    fn store(&mut self, bus: &mut Bus, mode: AddressingMode, value: u8) {
        let addr = self.operand_addr(bus, mode, Access::Write);
        bus.write(addr, value);
    }

    // Stores `value & (high byte of the base address + 1)`, and on a page crossing the stored value
    // also replaces the high byte of the address
    fn store_and_high(&mut self, bus: &mut Bus, mode: AddressingMode, index: u8, value: u8) {
        let addr = self.operand_addr(bus, mode, Access::Write);
        let base = addr.wrapping_sub(index as u16);
        let value = value & ((base >> 8) as u8).wrapping_add(1);
        let addr = if (base ^ addr) & 0xFF00 != 0 {
            ((value as u16) << 8) | (addr & 0x00FF)
        } else {
            addr
        };
        bus.write(addr, value);
    }

    // Read, modify and write back the operand, returning the new value
    fn modify(&mut self, bus: &mut Bus, mode: AddressingMode, op: fn(&mut Cpu, u8) -> u8) -> u8 {
        match mode {
            AddressingMode::Accumulator => {
                let a = self.a;
                self.a = op(self, a);
                self.a
            }
            _ => {
                let addr = self.operand_addr(bus, mode, Access::ReadModifyWrite);
                let value = bus.read(addr);
                let result = op(self, value);
                bus.write(addr, result);
                result
            }
        }
    }

    fn fetch(&mut self, bus: &mut Bus) -> u8 {
        let value = bus.read(self.p_c);
        self.p_c = self.p_c.wrapping_add(1);
        value
    }
    fn fetch_u16(&mut self, bus: &mut Bus) -> u16 {
        let lo = self.fetch(bus);
        let hi = self.fetch(bus);
        u16::from_le_bytes([lo, hi])
    }
    fn read_u16(&self, bus: &mut Bus, addr: u16) -> u16 {
        u16::from_le_bytes([bus.read(addr), bus.read(addr.wrapping_add(1))])
    }
    // The pointer's high byte wraps around inside the zero page
    fn zero_page_pointer(&self, bus: &mut Bus, ptr: u8) -> u16 {
        u16::from_le_bytes([bus.read(ptr as u16), bus.read(ptr.wrapping_add(1) as u16)])
    }
    fn push(&mut self, bus: &mut Bus, value: u8) {
        bus.write(0x100 | self.s_p as u16, value);
        self.s_p = self.s_p.wrapping_sub(1);
    }
    fn push_u16(&mut self, bus: &mut Bus, value: u16) {
        self.push(bus, (value >> 8) as u8);
        self.push(bus, value as u8);
    }
    fn pop(&mut self, bus: &mut Bus) -> u8 {
        self.s_p = self.s_p.wrapping_add(1);
        bus.read(0x100 | self.s_p as u16)
    }
    fn pop_u16(&mut self, bus: &mut Bus) -> u16 {
        let lo = self.pop(bus);
        let hi = self.pop(bus);
        u16::from_le_bytes([lo, hi])
    }
}

impl Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "A={:02X} X={:02X} Y={:02X} PC={:04X} SP={:02X} S={:?} CYC={}",
            self.a, self.x, self.y, self.p_c, self.s_p, self.s_r, self.cycles
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Cpu;
    use crate::core::{Bus, Cartridge, Settings};
    use assert_hex::assert_eq_hex;
    #[derive(PartialEq)]
    enum Flag {
        Carry,
        Zero,
        Interrupt,
        Decimal,
        Break,
        Overflow,
        Negative,
    }

    fn check_flags(cpu: &Cpu, flags: Vec<Flag>) {
        macro_rules! check_flag {
            ($flag:ident, $flag_enum:ident, $flag_str:literal) => {
                assert_eq!(
                    cpu.s_r.$flag,
                    flags.contains(&Flag::$flag_enum),
                    "Expected {} flag to be {}",
                    $flag_str,
                    flags.contains(&Flag::$flag_enum)
                );
            };
        }
        check_flag!(c, Carry, "carry");
        check_flag!(z, Zero, "zero");
        check_flag!(i, Interrupt, "interrupt");
        check_flag!(d, Decimal, "decimal");
        check_flag!(b, Break, "break");
        check_flag!(v, Overflow, "overflow");
        check_flag!(n, Negative, "negative");
    }

    // Power on leaves interrupts disabled, clear it so only the flags under test are set
    fn cpu() -> Cpu {
        let mut cpu = Cpu::new();
        cpu.s_r.i = false;
        cpu
    }

    macro_rules! ld_test {
        ($ld:ident) => {
            let mut cpu = cpu();
            // Test loading a number doesn't change flags
            cpu.$ld(0x18);
            check_flags(&cpu, Vec::new());
            // Test loading zero sets zero flag
            cpu.$ld(0x00);
            check_flags(&cpu, vec![Flag::Zero]);
            // Test loading a negative number sets negative flag and clears zero flag
            cpu.$ld(0x80);
            check_flags(&cpu, vec![Flag::Negative]);
        };
    }

    #[test]
    fn test_power_on_state() {
        let cpu = Cpu::new();
        assert_eq_hex!(cpu.s_r.to_byte(), 0x24);
        assert_eq_hex!(cpu.s_p, 0xFD);
        assert_eq!(cpu.cycles, 7);
        check_flags(&cpu, vec![Flag::Interrupt]);
    }
    #[test]
    fn test_lda() {
        ld_test!(lda);
    }
    #[test]
    fn test_ldx() {
        ld_test!(ldx);
    }
    #[test]
    fn test_ldy() {
        ld_test!(ldy);
    }
    #[test]
    fn test_adc() {
        let mut cpu = cpu();
        cpu.adc(0x14);
        check_flags(&cpu, Vec::new());
        cpu.adc(0x45);
        assert_eq_hex!(cpu.a, 0x14 + 0x45);
        check_flags(&cpu, Vec::new());
    }
    #[test]
    fn test_adc_zero() {
        let mut cpu = cpu();
        cpu.adc(0x0);
        assert_eq_hex!(cpu.a, 0x00);
        check_flags(&cpu, vec![Flag::Zero]);
    }
    #[test]
    fn test_adc_negative() {
        let mut cpu = cpu();
        cpu.adc(0x80);
        check_flags(&cpu, vec![Flag::Negative]);
    }
    #[test]
    fn test_adc_unsigned_overflow() {
        let mut cpu = cpu();
        cpu.adc(0x35);
        cpu.adc(0xFF);
        assert_eq_hex!(cpu.a, 0x34);
        check_flags(&cpu, vec![Flag::Carry]);
    }
    #[test]
    fn test_adc_signed_overflow() {
        let mut cpu = cpu();
        cpu.adc(0x40);
        cpu.adc(0x41);
        check_flags(&cpu, vec![Flag::Overflow, Flag::Negative]);
        cpu.adc(0x81);
        check_flags(&cpu, vec![Flag::Overflow, Flag::Carry]);
    }
    #[test]
    fn test_adc_with_carry() {
        let mut cpu = cpu();
        cpu.a = 0x18;
        cpu.s_r.c = true;
        cpu.adc(0x45);
        assert_eq_hex!(cpu.a, 0x18 + 0x45 + 0x01);
        check_flags(&cpu, vec![]);
        cpu.adc(0x02);
        assert_eq_hex!(cpu.a, 0x18 + 0x45 + 0x01 + 0x02);
        check_flags(&cpu, vec![]);
    }
    #[test]
    fn test_adc_carry_unsigned_overflow() {
        let mut cpu = cpu();
        cpu.a = 0x65;
        cpu.s_r.c = true;
        cpu.adc(0xFF - 0x65);
        assert_eq_hex!(cpu.a, 0x0);
        check_flags(&cpu, vec![Flag::Carry, Flag::Zero]);
    }
    #[test]
    fn test_sbc() {
        let mut cpu = cpu();
        cpu.a = 0x50;
        cpu.s_r.c = true;
        cpu.sbc(0x10);
        assert_eq_hex!(cpu.a, 0x40);
        check_flags(&cpu, vec![Flag::Carry]);
        // Borrow
        cpu.sbc(0x41);
        assert_eq_hex!(cpu.a, 0xFF);
        check_flags(&cpu, vec![Flag::Negative]);
    }
    #[test]
    fn test_sbc_signed_overflow() {
        let mut cpu = cpu();
        cpu.a = 0x80;
        cpu.s_r.c = true;
        cpu.sbc(0x01);
        assert_eq_hex!(cpu.a, 0x7F);
        check_flags(&cpu, vec![Flag::Carry, Flag::Overflow]);
    }
    #[test]
    fn test_and() {
        let mut cpu = cpu();
        cpu.a = 0x67;
        cpu.and(0x60);
        assert_eq_hex!(cpu.a, 0x60);
        check_flags(&cpu, vec![]);
    }
    #[test]
    fn test_and_zero_twice() {
        let mut cpu = cpu();
        cpu.a = 0xFF;
        cpu.and(0x00);
        check_flags(&cpu, vec![Flag::Zero]);
        cpu.and(0x00);
        assert_eq_hex!(cpu.a, 0x00);
        check_flags(&cpu, vec![Flag::Zero]);
    }
    #[test]
    fn test_and_negative() {
        let mut cpu = cpu();
        cpu.a = 0xFF;
        cpu.and(0x85);
        assert_eq_hex!(cpu.a, 0x85);
        check_flags(&cpu, vec![Flag::Negative]);
    }
    #[test]
    fn test_ora_eor() {
        let mut cpu = cpu();
        cpu.a = 0x0F;
        cpu.ora(0xF0);
        assert_eq_hex!(cpu.a, 0xFF);
        check_flags(&cpu, vec![Flag::Negative]);
        cpu.eor(0xFF);
        assert_eq_hex!(cpu.a, 0x00);
        check_flags(&cpu, vec![Flag::Zero]);
    }
    #[test]
    fn test_compare() {
        let mut cpu = cpu();
        cpu.compare(0x40, 0x40);
        check_flags(&cpu, vec![Flag::Carry, Flag::Zero]);
        cpu.compare(0x40, 0x41);
        check_flags(&cpu, vec![Flag::Negative]);
        cpu.compare(0x41, 0x40);
        check_flags(&cpu, vec![Flag::Carry]);
    }
    #[test]
    fn test_bit() {
        let mut cpu = cpu();
        cpu.a = 0x01;
        cpu.bit(0xC0);
        check_flags(&cpu, vec![Flag::Zero, Flag::Overflow, Flag::Negative]);
        cpu.bit(0x01);
        check_flags(&cpu, vec![]);
    }
    #[test]
    fn test_shifts() {
        let mut cpu = cpu();
        assert_eq_hex!(cpu.asl(0x81), 0x02);
        check_flags(&cpu, vec![Flag::Carry]);
        assert_eq_hex!(cpu.rol(0x40), 0x81);
        check_flags(&cpu, vec![Flag::Negative]);
        assert_eq_hex!(cpu.lsr(0x01), 0x00);
        check_flags(&cpu, vec![Flag::Carry, Flag::Zero]);
        assert_eq_hex!(cpu.ror(0x02), 0x81);
        check_flags(&cpu, vec![Flag::Negative]);
    }
    #[test]
    fn test_inc_dec_wrap() {
        let mut cpu = cpu();
        assert_eq_hex!(cpu.inc(0xFF), 0x00);
        check_flags(&cpu, vec![Flag::Zero]);
        assert_eq_hex!(cpu.dec(0x00), 0xFF);
        check_flags(&cpu, vec![Flag::Negative]);
    }
    #[test]
    fn test_reset_forgets_hijacked_nmi() {
        let mut rom = vec![b'N', b'E', b'S', 0x1A, 0x01, 0x01, 0x00, 0x00];
        rom.resize(16, 0);
        let mut prg = vec![0xEA; 0x4000];
        prg[0x3FFA..0x3FFE].copy_from_slice(&[0x00, 0x90, 0x00, 0x80]);
        rom.extend(prg);
        rom.extend(vec![0; 0x2000]);
        let mut bus = match Cartridge::from_ines(&rom) {
            Ok(c) => Bus::new(c, &Settings::default()),
            Err(e) => panic!("{}", e),
        };
        let mut cpu = cpu();
        // An interrupt took the vector of an NMI that never rose before the reset
        cpu.nmi_suppressed = true;
        cpu.reset(&mut bus);
        assert_eq_hex!(cpu.p_c, 0x8000);
        cpu.set_nmi(true, &mut bus);
        assert_eq_hex!(cpu.p_c, 0x9000);
    }
}
