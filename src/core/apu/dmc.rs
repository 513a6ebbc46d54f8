use std::fmt::Debug;

use crate::core::Cartridge;

pub const DMC_RATES: [u16; 16] = [
    428, 380, 340, 320, 286, 254, 226, 214, 190, 160, 142, 128, 106, 84, 72, 54,
];

#[derive(Clone)]
/// The delta modulation channel of the NES.
///
/// Takes 1-bit delta encoded samples from the cartridge and outputs a value
/// between 0 and 127 to the APU's mixer.
/// Can also trigger CPU interrupts when a sample ends.
pub struct DmcChannel {
    /// Whether the IRQ is enabled
    pub irq_enabled: bool,
    /// The IRQ flag
    pub irq_flag: bool,
    /// Whether to repeat the sample after playing it
    pub repeat: bool,
    /// The number of CPU cycles per output bit
    pub period: u16,
    timer: u16,
    /// Address of the sample, in CPU memory space
    pub sample_addr: u16,
    /// Length of the sample in bytes
    pub sample_len: u16,
    current_addr: u16,
    /// Number of bytes remaining in the sample
    pub bytes_remaining: u16,
    buffer: Option<u8>,
    shift: u8,
    bits_remaining: u8,
    silent: bool,
    /// The current output of the DMC
    pub output: u8,
}
impl Debug for DmcChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "bytes_remaining={:X} silent={} period={:3X} repeat={} sample_addr={:X} sample_len={:X} IRQ={}, output={}",
            self.bytes_remaining,
            self.silent,
            self.period,
            self.repeat,
            self.sample_addr,
            self.sample_len,
            self.irq_enabled,
            self.output
        )
    }
}
impl Default for DmcChannel {
    fn default() -> Self {
        DmcChannel {
            irq_enabled: false,
            irq_flag: false,
            repeat: false,
            period: DMC_RATES[0],
            timer: 0,
            sample_addr: 0xC000,
            sample_len: 1,
            current_addr: 0xC000,
            bytes_remaining: 0,
            buffer: None,
            shift: 0,
            bits_remaining: 8,
            silent: true,
            output: 0,
        }
    }
}
impl DmcChannel {
    pub fn write(&mut self, register: u16, value: u8) {
        match register % 4 {
            0 => {
                self.irq_enabled = (value & 0x80) != 0;
                if !self.irq_enabled {
                    self.irq_flag = false;
                }
                self.repeat = (value & 0x40) != 0;
                self.period = DMC_RATES[(value & 0x0F) as usize];
            }
            1 => self.output = value & 0x7F,
            2 => self.sample_addr = 0xC000 + value as u16 * 64,
            _ => self.sample_len = value as u16 * 16 + 1,
        }
    }
    /// Enable or disable the DMC through `0x4015`
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled {
            if self.bytes_remaining == 0 {
                self.current_addr = self.sample_addr;
                self.bytes_remaining = self.sample_len;
            }
        } else {
            self.bytes_remaining = 0;
        }
    }
    /// Advance the timer by one CPU cycle.
    ///
    /// Sample bytes are read from the cartridge when the buffer empties.
    pub fn step(&mut self, cartridge: &Cartridge) {
        if self.timer > 0 {
            self.timer -= 1;
            return;
        }
        self.timer = self.period;
        if !self.silent {
            if self.shift & 0x01 != 0 {
                if self.output <= 125 {
                    self.output += 2;
                }
            } else if self.output >= 2 {
                self.output -= 2;
            }
            self.shift >>= 1;
        }
        self.bits_remaining = self.bits_remaining.saturating_sub(1);
        if self.bits_remaining == 0 {
            self.bits_remaining = 8;
            match self.buffer.take() {
                Some(sample) => {
                    self.silent = false;
                    self.shift = sample;
                }
                None => self.silent = true,
            }
        }
        if self.buffer.is_none() && self.bytes_remaining > 0 {
            self.buffer = Some(cartridge.read_cpu(self.current_addr as usize).unwrap_or(0));
            // The address wraps around to 0x8000
            self.current_addr = if self.current_addr == 0xFFFF {
                0x8000
            } else {
                self.current_addr + 1
            };
            self.bytes_remaining -= 1;
            if self.bytes_remaining == 0 {
                if self.repeat {
                    self.current_addr = self.sample_addr;
                    self.bytes_remaining = self.sample_len;
                } else if self.irq_enabled {
                    self.irq_flag = true;
                }
            }
        }
    }
}
