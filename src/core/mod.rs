//! The actual emulation code.
//!
//! Contains the entire state of the machine, and updates it one CPU instruction at a time while
//! keeping the PPU and APU in lockstep with the processor's cycle count.
//! Video is written pixel by pixel to a [Display], audio is written in blocks of samples to an
//! [AudioSink].
//! ```
//! use nescore::core::{Buttons, FrameBuffer, Nes, Settings};
//! // A cartridge image with a single bank of PRG ROM that loops forever at 0x8000
//! let mut rom = vec![b'N', b'E', b'S', 0x1A, 0x01, 0x01, 0x00, 0x00];
//! rom.resize(16, 0);
//! let mut prg = vec![0xEA; 0x4000];
//! prg[0..3].copy_from_slice(&[0x4C, 0x00, 0x80]);
//! prg[0x3FFC] = 0x00;
//! prg[0x3FFD] = 0x80;
//! rom.extend(prg);
//! rom.extend(vec![0; 0x2000]);
//! let mut nes = Nes::from_ines(&rom, Settings::default()).unwrap();
//! // Advance the NES by 1 instruction
//! nes.step();
//! // Advance the NES by 1 frame
//! nes.advance_frame();
//! // Press start on player 1's controller
//! nes.set_buttons(0, Buttons { start: true, ..Buttons::default() });
//! // Read the top left pixel
//! let frame: &FrameBuffer = nes.frame_buffer().unwrap();
//! println!("Top left pixel is {:06X}", frame.pixel(0, 0));
//! ```
mod bus;
pub use bus::Bus;
mod cpu;
pub use cpu::Cpu;
mod status_register;
pub use status_register::StatusRegister;
pub mod opcodes;
mod ppu;
pub use ppu::Ppu;
pub mod apu;
pub use apu::Apu;
mod cartridge;
pub use cartridge::*;
mod controller;
pub use controller::{Buttons, Controller, InputSource};
mod hooks;
pub use hooks::{ExecutionHook, HookId, MemoryAccess, MemoryHook};
mod io;
pub use io::{AudioSink, Display, FrameBuffer, NullDisplay, SampleQueue, Silence};
mod nes;
pub use nes::Nes;
mod settings;
pub use settings::Settings;

/// The NTSC clock speed of the NES's CPU, in hertz.
pub const CPU_CLOCK_SPEED: u32 = 1_789_773;
/// The location of the maskable interrupt (and `BRK`) vector.
pub const IRQ_VECTOR: u16 = 0xFFFE;
/// The location of the reset vector.
pub const RESET_VECTOR: u16 = 0xFFFC;
/// The location of the non-maskable interrupt's vector.
pub const NMI_VECTOR: u16 = 0xFFFA;

/// Width of the visible picture, in pixels.
pub const SCREEN_WIDTH: usize = 256;
/// Height of the visible picture, in pixels.
pub const SCREEN_HEIGHT: usize = 240;

/// The debug palette, used instead of the palette RAM if [Settings::use_debug_palette] is `true`.
///
/// Assigns each palette a unique colour to quickly show which tiles are using which palettes.
pub const DEBUG_PALETTE: [u8; 32] = [
    0x1D, 0x01, 0x11, 0x21, 0x1D, 0x05, 0x15, 0x25, 0x1D, 0x09, 0x19, 0x29, 0x1D, 0x06, 0x16, 0x26,
    0x1D, 0x13, 0x23, 0x33, 0x1D, 0x17, 0x27, 0x37, 0x1D, 0x1B, 0x2B, 0x3B, 0x1D, 0x18, 0x28, 0x38,
];

/// Map of the console's 6 bit colour output to `0xRRGGBB` values.
pub const HV_TO_RGB: [u32; 64] = [
    0x545454, 0x001E74, 0x081090, 0x300088, 0x440064, 0x5C0030, 0x540400, 0x3C1800, 0x202A00,
    0x083A00, 0x004000, 0x003C00, 0x00323C, 0x000000, 0x000000, 0x000000, 0x989698, 0x084CC4,
    0x3032EC, 0x5C1EE4, 0x8814B0, 0xA01464, 0x982220, 0x783C00, 0x545A00, 0x287200, 0x087C00,
    0x007628, 0x006678, 0x000000, 0x000000, 0x000000, 0xECEEEC, 0x4C9AEC, 0x787CEC, 0xB062EC,
    0xE454EC, 0xEC58B4, 0xEC6A64, 0xD48820, 0xA0AA00, 0x74C400, 0x4CD020, 0x38CC6C, 0x38B4CC,
    0x3C3C3C, 0x000000, 0x000000, 0xECEEEC, 0xA8CCEC, 0xBCBCEC, 0xD4B2EC, 0xECAEEC, 0xECAED4,
    0xECB4B0, 0xE4C490, 0xCCD278, 0xB4DE78, 0xA8E290, 0x98E2B4, 0xA0D6E4, 0xA0A2A0, 0x000000,
    0x000000,
];

#[cfg(test)]
mod tests {
    use super::HV_TO_RGB;
    use assert_hex::assert_eq_hex;
    use test_case::test_case;

    #[test_case(0x12, 0x3032EC)]
    #[test_case(0x13, 0x5C1EE4)]
    #[test_case(0x14, 0x8814B0)]
    fn test_second_row_purples(colour: usize, rgb: u32) {
        assert_eq_hex!(HV_TO_RGB[colour], rgb);
    }
}
