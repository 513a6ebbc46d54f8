use super::{envelope::Envelope, length_counter::LengthCounter};
use std::fmt::Debug;

const NOISE_TIMER_PERIODS: [u16; 16] = [
    4, 8, 16, 32, 64, 96, 128, 160, 202, 254, 380, 508, 762, 1016, 2034, 4068,
];

#[derive(Clone, Copy)]
/// The APU's noise channel, a 15 bit linear feedback shift register.
pub struct NoiseChannel {
    pub length_counter: LengthCounter,
    pub envelope: Envelope,
    pub period: u16,
    timer: u16,
    // false = long mode (tap bit 1), true = short mode (tap bit 6)
    pub mode: bool,
    // This is actually 15 bits wide
    shift: u16,
}
impl Debug for NoiseChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "period={:3X} mode={} length=[{:?}]",
            self.period, self.mode, self.length_counter
        )
    }
}

impl Default for NoiseChannel {
    fn default() -> Self {
        NoiseChannel {
            length_counter: LengthCounter::default(),
            envelope: Envelope::default(),
            period: 0,
            timer: 0,
            mode: false,
            shift: 1,
        }
    }
}

impl NoiseChannel {
    pub fn write(&mut self, register: u16, value: u8) {
        match register % 4 {
            0 => {
                self.length_counter.halt = (value & 0x20) != 0;
                self.envelope.write(value);
            }
            1 => {}
            2 => {
                self.mode = (value & 0x80) != 0;
                self.period = NOISE_TIMER_PERIODS[(value & 0x0F) as usize];
            }
            _ => {
                self.length_counter.load(value);
                self.envelope.start = true;
            }
        }
    }
    /// Advance the timer by one CPU cycle
    pub fn step(&mut self) {
        if self.timer > 0 {
            self.timer -= 1;
        } else {
            self.timer = self.period;
            // XOR bit 0 with bit 6 in short mode and with bit 1 in long mode
            let feedback = (self.shift ^ (self.shift >> if self.mode { 6 } else { 1 })) & 0x01;
            self.shift = (self.shift >> 1) | (feedback << 14);
        }
    }
    pub fn output(&self) -> u8 {
        if self.length_counter.muted() || self.shift & 0x01 == 1 {
            0
        } else {
            self.envelope.output()
        }
    }
}
