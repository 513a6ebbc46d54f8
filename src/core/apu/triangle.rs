use super::length_counter::LengthCounter;
use std::fmt::Debug;

const TRIANGLE_SEQUENCE: [u8; 32] = [
    15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1, 0, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12,
    13, 14, 15,
];

#[derive(Clone, Copy, Default)]
/// The APU's triangle channel.
pub struct TriangleChannel {
    pub length_counter: LengthCounter,
    pub linear_counter: u8,
    // Linear counter reload value
    pub linear_counter_reload: u8,
    pub reload_flag: bool,
    pub period: u16,
    timer: u16,
    sequencer: usize,
}
impl Debug for TriangleChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "period={:3X} length=[{:?}] linear={:X}",
            self.period, self.length_counter, self.linear_counter
        )
    }
}
impl TriangleChannel {
    pub fn write(&mut self, register: u16, value: u8) {
        match register % 4 {
            0 => {
                // The control flag doubles as the length counter halt
                self.length_counter.halt = (value & 0x80) != 0;
                self.linear_counter_reload = value & 0x7F;
            }
            1 => {}
            2 => self.period = (self.period & 0x0700) | value as u16,
            _ => {
                self.period = (self.period & 0x00FF) | ((value as u16 & 0x07) << 8);
                self.length_counter.load(value);
                self.reload_flag = true;
            }
        }
    }
    fn gated(&self) -> bool {
        self.length_counter.muted() || self.linear_counter == 0
    }
    /// Advance the timer by one CPU cycle
    pub fn step(&mut self) {
        if self.timer > 0 {
            self.timer -= 1;
        } else {
            self.timer = self.period;
            if !self.gated() {
                self.sequencer = (self.sequencer + 1) % 32;
            }
        }
    }
    /// Clock the linear counter, called every quarter frame
    pub fn clock_linear_counter(&mut self) {
        if self.reload_flag {
            self.linear_counter = self.linear_counter_reload;
        } else if self.linear_counter > 0 {
            self.linear_counter -= 1;
        }
        if !self.length_counter.halt {
            self.reload_flag = false;
        }
    }
    pub fn output(&self) -> u8 {
        if self.gated() {
            0
        } else {
            TRIANGLE_SEQUENCE[self.sequencer]
        }
    }
}
