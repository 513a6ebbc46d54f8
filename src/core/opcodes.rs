//! The 6502 instruction set.
//!
//! [INSTRUCTIONS] maps every opcode, documented or not, to its mnemonic, addressing mode and base
//! cycle cost. Also formats instructions as they appear in `nestest.log`.
use std::fmt::Display;

use crate::core::{Bus, Cpu};

/// How an instruction finds its operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndirectX,
    IndirectY,
    Relative,
}

impl AddressingMode {
    /// The number of operand bytes following the opcode.
    pub fn operand_bytes(&self) -> u16 {
        use AddressingMode::*;
        match self {
            Implied | Accumulator => 0,
            Immediate | ZeroPage | ZeroPageX | ZeroPageY | IndirectX | IndirectY | Relative => 1,
            Absolute | AbsoluteX | AbsoluteY | Indirect => 2,
        }
    }
}

/// What an instruction does with the memory its addressing mode points to.
///
/// Decides the dummy reads and page crossing penalties of the indexed addressing modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Only reads, takes an extra cycle when indexing crosses a page
    Read,
    /// Only writes
    Write,
    /// Reads, modifies and writes back the value
    ReadModifyWrite,
    /// Doesn't touch memory through the addressing mode at all
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mnemonic {
    Adc, Alr, Anc, And, Arr, Asl, Axs, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc, Cld,
    Cli, Clv, Cmp, Cpx, Cpy, Dcp, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Isb, Jmp, Jsr, Kil, Las, Lax,
    Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp, Rla, Rol, Ror, Rra, Rti, Rts, Sax, Sbc, Sec,
    Sed, Sei, Sha, Shs, Shx, Shy, Slo, Sre, Sta, Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya, Xaa,
}

impl Mnemonic {
    pub fn access(&self) -> Access {
        use Mnemonic::*;
        match self {
            Adc | And | Bit | Cmp | Cpx | Cpy | Eor | Las | Lax | Lda | Ldx | Ldy | Nop | Ora
            | Sbc | Anc | Alr | Arr | Axs | Xaa => Access::Read,
            Sta | Stx | Sty | Sax | Sha | Shs | Shx | Shy => Access::Write,
            Asl | Lsr | Rol | Ror | Inc | Dec | Slo | Rla | Sre | Rra | Dcp | Isb => {
                Access::ReadModifyWrite
            }
            _ => Access::None,
        }
    }
}

impl Display for Mnemonic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", format!("{:?}", self).to_uppercase())
    }
}

/// A single entry in the decode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub mnemonic: Mnemonic,
    pub mode: AddressingMode,
    /// Cycles taken before any page crossing or branch penalties.
    /// `0` marks an opcode that halts the processor.
    pub cycles: u32,
    /// `false` for undocumented opcodes
    pub official: bool,
}

macro_rules! op {
    ($mnemonic: ident, $mode: ident, $cycles: literal) => {
        Instruction {
            mnemonic: Mnemonic::$mnemonic,
            mode: mode!($mode),
            cycles: $cycles,
            official: true,
        }
    };
}
macro_rules! un {
    ($mnemonic: ident, $mode: ident, $cycles: literal) => {
        Instruction {
            mnemonic: Mnemonic::$mnemonic,
            mode: mode!($mode),
            cycles: $cycles,
            official: false,
        }
    };
}
macro_rules! mode {
    (Imp) => {
        AddressingMode::Implied
    };
    (Acc) => {
        AddressingMode::Accumulator
    };
    (Imm) => {
        AddressingMode::Immediate
    };
    (Zp) => {
        AddressingMode::ZeroPage
    };
    (ZpX) => {
        AddressingMode::ZeroPageX
    };
    (ZpY) => {
        AddressingMode::ZeroPageY
    };
    (Abs) => {
        AddressingMode::Absolute
    };
    (AbsX) => {
        AddressingMode::AbsoluteX
    };
    (AbsY) => {
        AddressingMode::AbsoluteY
    };
    (Ind) => {
        AddressingMode::Indirect
    };
    (IndX) => {
        AddressingMode::IndirectX
    };
    (IndY) => {
        AddressingMode::IndirectY
    };
    (Rel) => {
        AddressingMode::Relative
    };
}

/// Every opcode, indexed by its byte value.
#[rustfmt::skip]
pub const INSTRUCTIONS: [Instruction; 256] = [
    /* 00 */ op!(Brk, Imp, 7),
    /* 01 */ op!(Ora, IndX, 6),
    /* 02 */ un!(Kil, Imp, 0),
    /* 03 */ un!(Slo, IndX, 8),
    /* 04 */ un!(Nop, Zp, 3),
    /* 05 */ op!(Ora, Zp, 3),
    /* 06 */ op!(Asl, Zp, 5),
    /* 07 */ un!(Slo, Zp, 5),
    /* 08 */ op!(Php, Imp, 3),
    /* 09 */ op!(Ora, Imm, 2),
    /* 0A */ op!(Asl, Acc, 2),
    /* 0B */ un!(Anc, Imm, 2),
    /* 0C */ un!(Nop, Abs, 4),
    /* 0D */ op!(Ora, Abs, 4),
    /* 0E */ op!(Asl, Abs, 6),
    /* 0F */ un!(Slo, Abs, 6),
    /* 10 */ op!(Bpl, Rel, 2),
    /* 11 */ op!(Ora, IndY, 5),
    /* 12 */ un!(Kil, Imp, 0),
    /* 13 */ un!(Slo, IndY, 8),
    /* 14 */ un!(Nop, ZpX, 4),
    /* 15 */ op!(Ora, ZpX, 4),
    /* 16 */ op!(Asl, ZpX, 6),
    /* 17 */ un!(Slo, ZpX, 6),
    /* 18 */ op!(Clc, Imp, 2),
    /* 19 */ op!(Ora, AbsY, 4),
    /* 1A */ un!(Nop, Imp, 2),
    /* 1B */ un!(Slo, AbsY, 7),
    /* 1C */ un!(Nop, AbsX, 4),
    /* 1D */ op!(Ora, AbsX, 4),
    /* 1E */ op!(Asl, AbsX, 7),
    /* 1F */ un!(Slo, AbsX, 7),
    /* 20 */ op!(Jsr, Abs, 6),
    /* 21 */ op!(And, IndX, 6),
    /* 22 */ un!(Kil, Imp, 0),
    /* 23 */ un!(Rla, IndX, 8),
    /* 24 */ op!(Bit, Zp, 3),
    /* 25 */ op!(And, Zp, 3),
    /* 26 */ op!(Rol, Zp, 5),
    /* 27 */ un!(Rla, Zp, 5),
    /* 28 */ op!(Plp, Imp, 4),
    /* 29 */ op!(And, Imm, 2),
    /* 2A */ op!(Rol, Acc, 2),
    /* 2B */ un!(Anc, Imm, 2),
    /* 2C */ op!(Bit, Abs, 4),
    /* 2D */ op!(And, Abs, 4),
    /* 2E */ op!(Rol, Abs, 6),
    /* 2F */ un!(Rla, Abs, 6),
    /* 30 */ op!(Bmi, Rel, 2),
    /* 31 */ op!(And, IndY, 5),
    /* 32 */ un!(Kil, Imp, 0),
    /* 33 */ un!(Rla, IndY, 8),
    /* 34 */ un!(Nop, ZpX, 4),
    /* 35 */ op!(And, ZpX, 4),
    /* 36 */ op!(Rol, ZpX, 6),
    /* 37 */ un!(Rla, ZpX, 6),
    /* 38 */ op!(Sec, Imp, 2),
    /* 39 */ op!(And, AbsY, 4),
    /* 3A */ un!(Nop, Imp, 2),
    /* 3B */ un!(Rla, AbsY, 7),
    /* 3C */ un!(Nop, AbsX, 4),
    /* 3D */ op!(And, AbsX, 4),
    /* 3E */ op!(Rol, AbsX, 7),
    /* 3F */ un!(Rla, AbsX, 7),
    /* 40 */ op!(Rti, Imp, 6),
    /* 41 */ op!(Eor, IndX, 6),
    /* 42 */ un!(Kil, Imp, 0),
    /* 43 */ un!(Sre, IndX, 8),
    /* 44 */ un!(Nop, Zp, 3),
    /* 45 */ op!(Eor, Zp, 3),
    /* 46 */ op!(Lsr, Zp, 5),
    /* 47 */ un!(Sre, Zp, 5),
    /* 48 */ op!(Pha, Imp, 3),
    /* 49 */ op!(Eor, Imm, 2),
    /* 4A */ op!(Lsr, Acc, 2),
    /* 4B */ un!(Alr, Imm, 2),
    /* 4C */ op!(Jmp, Abs, 3),
    /* 4D */ op!(Eor, Abs, 4),
    /* 4E */ op!(Lsr, Abs, 6),
    /* 4F */ un!(Sre, Abs, 6),
    /* 50 */ op!(Bvc, Rel, 2),
    /* 51 */ op!(Eor, IndY, 5),
    /* 52 */ un!(Kil, Imp, 0),
    /* 53 */ un!(Sre, IndY, 8),
    /* 54 */ un!(Nop, ZpX, 4),
    /* 55 */ op!(Eor, ZpX, 4),
    /* 56 */ op!(Lsr, ZpX, 6),
    /* 57 */ un!(Sre, ZpX, 6),
    /* 58 */ op!(Cli, Imp, 2),
    /* 59 */ op!(Eor, AbsY, 4),
    /* 5A */ un!(Nop, Imp, 2),
    /* 5B */ un!(Sre, AbsY, 7),
    /* 5C */ un!(Nop, AbsX, 4),
    /* 5D */ op!(Eor, AbsX, 4),
    /* 5E */ op!(Lsr, AbsX, 7),
    /* 5F */ un!(Sre, AbsX, 7),
    /* 60 */ op!(Rts, Imp, 6),
    /* 61 */ op!(Adc, IndX, 6),
    /* 62 */ un!(Kil, Imp, 0),
    /* 63 */ un!(Rra, IndX, 8),
    /* 64 */ un!(Nop, Zp, 3),
    /* 65 */ op!(Adc, Zp, 3),
    /* 66 */ op!(Ror, Zp, 5),
    /* 67 */ un!(Rra, Zp, 5),
    /* 68 */ op!(Pla, Imp, 4),
    /* 69 */ op!(Adc, Imm, 2),
    /* 6A */ op!(Ror, Acc, 2),
    /* 6B */ un!(Arr, Imm, 2),
    /* 6C */ op!(Jmp, Ind, 5),
    /* 6D */ op!(Adc, Abs, 4),
    /* 6E */ op!(Ror, Abs, 6),
    /* 6F */ un!(Rra, Abs, 6),
    /* 70 */ op!(Bvs, Rel, 2),
    /* 71 */ op!(Adc, IndY, 5),
    /* 72 */ un!(Kil, Imp, 0),
    /* 73 */ un!(Rra, IndY, 8),
    /* 74 */ un!(Nop, ZpX, 4),
    /* 75 */ op!(Adc, ZpX, 4),
    /* 76 */ op!(Ror, ZpX, 6),
    /* 77 */ un!(Rra, ZpX, 6),
    /* 78 */ op!(Sei, Imp, 2),
    /* 79 */ op!(Adc, AbsY, 4),
    /* 7A */ un!(Nop, Imp, 2),
    /* 7B */ un!(Rra, AbsY, 7),
    /* 7C */ un!(Nop, AbsX, 4),
    /* 7D */ op!(Adc, AbsX, 4),
    /* 7E */ op!(Ror, AbsX, 7),
    /* 7F */ un!(Rra, AbsX, 7),
    /* 80 */ un!(Nop, Imm, 2),
    /* 81 */ op!(Sta, IndX, 6),
    /* 82 */ un!(Nop, Imm, 2),
    /* 83 */ un!(Sax, IndX, 6),
    /* 84 */ op!(Sty, Zp, 3),
    /* 85 */ op!(Sta, Zp, 3),
    /* 86 */ op!(Stx, Zp, 3),
    /* 87 */ un!(Sax, Zp, 3),
    /* 88 */ op!(Dey, Imp, 2),
    /* 89 */ un!(Nop, Imm, 2),
    /* 8A */ op!(Txa, Imp, 2),
    /* 8B */ un!(Xaa, Imm, 2),
    /* 8C */ op!(Sty, Abs, 4),
    /* 8D */ op!(Sta, Abs, 4),
    /* 8E */ op!(Stx, Abs, 4),
    /* 8F */ un!(Sax, Abs, 4),
    /* 90 */ op!(Bcc, Rel, 2),
    /* 91 */ op!(Sta, IndY, 6),
    /* 92 */ un!(Kil, Imp, 0),
    /* 93 */ un!(Sha, IndY, 6),
    /* 94 */ op!(Sty, ZpX, 4),
    /* 95 */ op!(Sta, ZpX, 4),
    /* 96 */ op!(Stx, ZpY, 4),
    /* 97 */ un!(Sax, ZpY, 4),
    /* 98 */ op!(Tya, Imp, 2),
    /* 99 */ op!(Sta, AbsY, 5),
    /* 9A */ op!(Txs, Imp, 2),
    /* 9B */ un!(Shs, AbsY, 5),
    /* 9C */ un!(Shy, AbsX, 5),
    /* 9D */ op!(Sta, AbsX, 5),
    /* 9E */ un!(Shx, AbsY, 5),
    /* 9F */ un!(Sha, AbsY, 5),
    /* A0 */ op!(Ldy, Imm, 2),
    /* A1 */ op!(Lda, IndX, 6),
    /* A2 */ op!(Ldx, Imm, 2),
    /* A3 */ un!(Lax, IndX, 6),
    /* A4 */ op!(Ldy, Zp, 3),
    /* A5 */ op!(Lda, Zp, 3),
    /* A6 */ op!(Ldx, Zp, 3),
    /* A7 */ un!(Lax, Zp, 3),
    /* A8 */ op!(Tay, Imp, 2),
    /* A9 */ op!(Lda, Imm, 2),
    /* AA */ op!(Tax, Imp, 2),
    /* AB */ un!(Lax, Imm, 2),
    /* AC */ op!(Ldy, Abs, 4),
    /* AD */ op!(Lda, Abs, 4),
    /* AE */ op!(Ldx, Abs, 4),
    /* AF */ un!(Lax, Abs, 4),
    /* B0 */ op!(Bcs, Rel, 2),
    /* B1 */ op!(Lda, IndY, 5),
    /* B2 */ un!(Kil, Imp, 0),
    /* B3 */ un!(Lax, IndY, 5),
    /* B4 */ op!(Ldy, ZpX, 4),
    /* B5 */ op!(Lda, ZpX, 4),
    /* B6 */ op!(Ldx, ZpY, 4),
    /* B7 */ un!(Lax, ZpY, 4),
    /* B8 */ op!(Clv, Imp, 2),
    /* B9 */ op!(Lda, AbsY, 4),
    /* BA */ op!(Tsx, Imp, 2),
    /* BB */ un!(Las, AbsY, 4),
    /* BC */ op!(Ldy, AbsX, 4),
    /* BD */ op!(Lda, AbsX, 4),
    /* BE */ op!(Ldx, AbsY, 4),
    /* BF */ un!(Lax, AbsY, 4),
    /* C0 */ op!(Cpy, Imm, 2),
    /* C1 */ op!(Cmp, IndX, 6),
    /* C2 */ un!(Nop, Imm, 2),
    /* C3 */ un!(Dcp, IndX, 8),
    /* C4 */ op!(Cpy, Zp, 3),
    /* C5 */ op!(Cmp, Zp, 3),
    /* C6 */ op!(Dec, Zp, 5),
    /* C7 */ un!(Dcp, Zp, 5),
    /* C8 */ op!(Iny, Imp, 2),
    /* C9 */ op!(Cmp, Imm, 2),
    /* CA */ op!(Dex, Imp, 2),
    /* CB */ un!(Axs, Imm, 2),
    /* CC */ op!(Cpy, Abs, 4),
    /* CD */ op!(Cmp, Abs, 4),
    /* CE */ op!(Dec, Abs, 6),
    /* CF */ un!(Dcp, Abs, 6),
    /* D0 */ op!(Bne, Rel, 2),
    /* D1 */ op!(Cmp, IndY, 5),
    /* D2 */ un!(Kil, Imp, 0),
    /* D3 */ un!(Dcp, IndY, 8),
    /* D4 */ un!(Nop, ZpX, 4),
    /* D5 */ op!(Cmp, ZpX, 4),
    /* D6 */ op!(Dec, ZpX, 6),
    /* D7 */ un!(Dcp, ZpX, 6),
    /* D8 */ op!(Cld, Imp, 2),
    /* D9 */ op!(Cmp, AbsY, 4),
    /* DA */ un!(Nop, Imp, 2),
    /* DB */ un!(Dcp, AbsY, 7),
    /* DC */ un!(Nop, AbsX, 4),
    /* DD */ op!(Cmp, AbsX, 4),
    /* DE */ op!(Dec, AbsX, 7),
    /* DF */ un!(Dcp, AbsX, 7),
    /* E0 */ op!(Cpx, Imm, 2),
    /* E1 */ op!(Sbc, IndX, 6),
    /* E2 */ un!(Nop, Imm, 2),
    /* E3 */ un!(Isb, IndX, 8),
    /* E4 */ op!(Cpx, Zp, 3),
    /* E5 */ op!(Sbc, Zp, 3),
    /* E6 */ op!(Inc, Zp, 5),
    /* E7 */ un!(Isb, Zp, 5),
    /* E8 */ op!(Inx, Imp, 2),
    /* E9 */ op!(Sbc, Imm, 2),
    /* EA */ op!(Nop, Imp, 2),
    /* EB */ un!(Sbc, Imm, 2),
    /* EC */ op!(Cpx, Abs, 4),
    /* ED */ op!(Sbc, Abs, 4),
    /* EE */ op!(Inc, Abs, 6),
    /* EF */ un!(Isb, Abs, 6),
    /* F0 */ op!(Beq, Rel, 2),
    /* F1 */ op!(Sbc, IndY, 5),
    /* F2 */ un!(Kil, Imp, 0),
    /* F3 */ un!(Isb, IndY, 8),
    /* F4 */ un!(Nop, ZpX, 4),
    /* F5 */ op!(Sbc, ZpX, 4),
    /* F6 */ op!(Inc, ZpX, 6),
    /* F7 */ un!(Isb, ZpX, 6),
    /* F8 */ op!(Sed, Imp, 2),
    /* F9 */ op!(Sbc, AbsY, 4),
    /* FA */ un!(Nop, Imp, 2),
    /* FB */ un!(Isb, AbsY, 7),
    /* FC */ un!(Nop, AbsX, 4),
    /* FD */ op!(Sbc, AbsX, 4),
    /* FE */ op!(Inc, AbsX, 7),
    /* FF */ un!(Isb, AbsX, 7),
];

/// Format the instruction at `addr` in the disassembly style of `nestest.log`, e.g. `LDA $0200,X @ 0205 = 3F`.
///
/// Uses [Bus::peek] so reading the values shown has no side effects.
pub fn disassemble(addr: u16, bus: &Bus, cpu: &Cpu) -> String {
    let inst = &INSTRUCTIONS[bus.peek(addr) as usize];
    let lo = bus.peek(addr.wrapping_add(1));
    let hi = bus.peek(addr.wrapping_add(2));
    let abs = u16::from_le_bytes([lo, hi]);
    let operand = match inst.mode {
        AddressingMode::Implied => String::new(),
        AddressingMode::Accumulator => "A".to_string(),
        AddressingMode::Immediate => format!("#${:02X}", lo),
        AddressingMode::ZeroPage => format!("${:02X} = {:02X}", lo, bus.peek(lo as u16)),
        AddressingMode::ZeroPageX => {
            let ea = lo.wrapping_add(cpu.x);
            format!("${:02X},X @ {:02X} = {:02X}", lo, ea, bus.peek(ea as u16))
        }
        AddressingMode::ZeroPageY => {
            let ea = lo.wrapping_add(cpu.y);
            format!("${:02X},Y @ {:02X} = {:02X}", lo, ea, bus.peek(ea as u16))
        }
        AddressingMode::Absolute => match inst.mnemonic {
            Mnemonic::Jmp | Mnemonic::Jsr => format!("${:04X}", abs),
            _ => format!("${:04X} = {:02X}", abs, bus.peek(abs)),
        },
        AddressingMode::AbsoluteX => {
            let ea = abs.wrapping_add(cpu.x as u16);
            format!("${:04X},X @ {:04X} = {:02X}", abs, ea, bus.peek(ea))
        }
        AddressingMode::AbsoluteY => {
            let ea = abs.wrapping_add(cpu.y as u16);
            format!("${:04X},Y @ {:04X} = {:02X}", abs, ea, bus.peek(ea))
        }
        AddressingMode::Indirect => {
            // The high byte is fetched without carrying into the page
            let target = u16::from_le_bytes([
                bus.peek(abs),
                bus.peek((abs & 0xFF00) | (abs.wrapping_add(1) & 0x00FF)),
            ]);
            format!("(${:04X}) = {:04X}", abs, target)
        }
        AddressingMode::IndirectX => {
            let ptr = lo.wrapping_add(cpu.x);
            let ea = zero_page_pointer(bus, ptr);
            format!(
                "(${:02X},X) @ {:02X} = {:04X} = {:02X}",
                lo,
                ptr,
                ea,
                bus.peek(ea)
            )
        }
        AddressingMode::IndirectY => {
            let base = zero_page_pointer(bus, lo);
            let ea = base.wrapping_add(cpu.y as u16);
            format!(
                "(${:02X}),Y = {:04X} @ {:04X} = {:02X}",
                lo,
                base,
                ea,
                bus.peek(ea)
            )
        }
        AddressingMode::Relative => {
            let target = addr.wrapping_add(2).wrapping_add(lo as i8 as u16);
            format!("${:04X}", target)
        }
    };
    if operand.is_empty() {
        inst.mnemonic.to_string()
    } else {
        format!("{} {}", inst.mnemonic, operand)
    }
}

/// Format the CPU's state and next instruction as a line of `nestest.log`, without the `PPU:` column.
///
/// ```text
/// C000  4C F5 C5  JMP $C5F5                       A:00 X:00 Y:00 P:24 SP:FD CYC:7
/// ```
pub fn trace_line(cpu: &Cpu, bus: &Bus) -> String {
    let pc = cpu.p_c;
    let opcode = bus.peek(pc);
    let inst = &INSTRUCTIONS[opcode as usize];
    let bytes = (0..=inst.mode.operand_bytes())
        .map(|i| format!("{:02X}", bus.peek(pc.wrapping_add(i))))
        .collect::<Vec<String>>()
        .join(" ");
    format!(
        "{:04X}  {:<8} {}{:<31} A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
        pc,
        bytes,
        if inst.official { ' ' } else { '*' },
        disassemble(pc, bus, cpu),
        cpu.a,
        cpu.x,
        cpu.y,
        cpu.s_r.to_byte() & !0x10,
        cpu.s_p,
        cpu.cycles
    )
}

// Read a little endian pointer from the zero page, wrapping within it
fn zero_page_pointer(bus: &Bus, ptr: u8) -> u16 {
    u16::from_le_bytes([bus.peek(ptr as u16), bus.peek(ptr.wrapping_add(1) as u16)])
}
