use super::{envelope::Envelope, length_counter::LengthCounter};
use std::fmt::Debug;

const DUTY_CYCLES: [[u8; 8]; 4] = [
    [0, 1, 0, 0, 0, 0, 0, 0],
    [0, 1, 1, 0, 0, 0, 0, 0],
    [0, 1, 1, 1, 1, 0, 0, 0],
    [1, 0, 0, 1, 1, 1, 1, 1],
];

#[derive(Clone, Copy, Default)]
/// The sweep unit of a pulse channel, periodically adjusts the channel's period.
pub struct Sweep {
    pub enabled: bool,
    pub period: u8,
    pub negate: bool,
    pub shift: u8,
    reload: bool,
    divider: u8,
    /// Set when the current period is below 8 or the target is above `0x7FF`
    pub mute: bool,
}

#[derive(Clone, Copy, Default)]
/// One of the APU's pulse channels.
/// Outputs a pulse (rectangle) wave.
pub struct PulseChannel {
    /// The index of the duty to use
    pub duty: usize,
    /// The 11 bit period of the pulse wave
    pub period: u16,
    timer: u16,
    // Index of the duty step currently being output
    sequencer: usize,
    pub envelope: Envelope,
    pub length_counter: LengthCounter,
    pub sweep: Sweep,
    // Pulse 1 negates with ones' complement, pulse 2 with two's complement
    ones_complement: bool,
}

impl PulseChannel {
    /// Create the first pulse channel
    pub fn pulse_1() -> PulseChannel {
        PulseChannel {
            ones_complement: true,
            ..PulseChannel::default()
        }
    }
    /// Create the second pulse channel
    pub fn pulse_2() -> PulseChannel {
        PulseChannel::default()
    }
    /// Write one of the channel's 4 registers
    pub fn write(&mut self, register: u16, value: u8) {
        match register % 4 {
            0 => {
                self.duty = ((value & 0xC0) >> 6) as usize;
                self.length_counter.halt = (value & 0x20) != 0;
                self.envelope.write(value);
            }
            1 => {
                self.sweep.enabled = (value & 0x80) != 0;
                self.sweep.period = (value & 0x70) >> 4;
                self.sweep.negate = (value & 0x08) != 0;
                self.sweep.shift = value & 0x07;
                self.sweep.reload = true;
            }
            2 => {
                self.period = (self.period & 0x0700) | value as u16;
                self.update_sweep_mute();
            }
            _ => {
                self.period = (self.period & 0x00FF) | ((value as u16 & 0x07) << 8);
                self.length_counter.load(value);
                self.sequencer = 0;
                self.envelope.start = true;
                self.update_sweep_mute();
            }
        }
    }
    /// Advance the timer by one CPU cycle, the sequencer steps at half the CPU rate
    pub fn step(&mut self) {
        if self.timer > 0 {
            self.timer -= 1;
        } else {
            self.timer = self.period * 2 + 1;
            self.sequencer = (self.sequencer + 1) % 8;
        }
    }
    /// Clock the sweep unit, called every half frame
    pub fn clock_sweep(&mut self) {
        let s = self.sweep;
        if self.sweep.divider == 0 && s.enabled && !s.mute && s.shift > 0 {
            let change = self.period >> s.shift;
            let target = if s.negate {
                self.period
                    .saturating_sub(change + if self.ones_complement { 1 } else { 0 })
            } else {
                self.period + change
            };
            if target <= 0x7FF {
                self.period = target;
            }
        }
        if self.sweep.divider == 0 || self.sweep.reload {
            self.sweep.divider = self.sweep.period;
            self.sweep.reload = false;
        } else {
            self.sweep.divider -= 1;
        }
        self.update_sweep_mute();
    }
    fn update_sweep_mute(&mut self) {
        let change = self.period >> self.sweep.shift;
        let target = if self.sweep.negate {
            self.period.saturating_sub(change)
        } else {
            self.period + change
        };
        self.sweep.mute = self.period < 8 || target > 0x7FF;
    }
    /// The current output of the channel, between 0 and 15
    pub fn output(&self) -> u8 {
        if self.length_counter.muted()
            || self.sweep.mute
            || DUTY_CYCLES[self.duty][self.sequencer] == 0
        {
            0
        } else {
            self.envelope.output()
        }
    }
}
impl Debug for PulseChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "period={:3X} duty={:X} length=[{:?}] sweep=[on={} shift={:X} mute={}]",
            self.period,
            self.duty,
            self.length_counter,
            self.sweep.enabled,
            self.sweep.shift,
            self.sweep.mute
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playing(p: &mut PulseChannel) {
        p.length_counter.set_enabled(true);
        // Duty 2 (50%), constant volume 9
        p.write(0, 0x99);
        p.write(2, 0x00);
        p.write(3, 0x01);
    }

    #[test]
    fn test_timer_runs_at_half_rate() {
        let mut p = PulseChannel::pulse_2();
        playing(&mut p);
        let mut outputs = Vec::new();
        // Period 0x100 takes 0x201 cycles per step
        for _ in 0..(8 * 0x202) {
            p.step();
            outputs.push(p.output());
        }
        assert_eq!(outputs.iter().filter(|o| **o == 9).count(), 4 * 0x202);
    }
    #[test]
    fn test_sweep_mutes_low_period() {
        let mut p = PulseChannel::pulse_1();
        p.length_counter.set_enabled(true);
        p.write(0, 0x9F);
        p.write(2, 0x07);
        p.write(3, 0x08);
        assert!(p.sweep.mute);
        assert_eq!(p.output(), 0);
    }
    #[test]
    fn test_sweep_negate_ones_complement() {
        let mut p1 = PulseChannel::pulse_1();
        let mut p2 = PulseChannel::pulse_2();
        for p in [&mut p1, &mut p2] {
            p.write(2, 0x00);
            p.write(3, 0x01);
            // Enabled, period 0, negate, shift 1
            p.write(1, 0x89);
            p.clock_sweep();
        }
        assert_eq!(p1.period, 0x100 - 0x80 - 1);
        assert_eq!(p2.period, 0x100 - 0x80);
    }
}
