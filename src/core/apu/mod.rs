//! The audio processing unit and its five channels.
mod dmc;
mod envelope;
mod length_counter;
mod noise;
mod pulse;
mod triangle;

pub use dmc::DmcChannel;
pub use envelope::Envelope;
pub use length_counter::LengthCounter;
pub use noise::NoiseChannel;
pub use pulse::{PulseChannel, Sweep};
pub use triangle::TriangleChannel;

use std::fmt::Debug;

use log::*;

use crate::core::{AudioSink, Cartridge, Settings, Silence};

// CPU cycles (since the frame counter was reset) of each step of the frame sequencer
const QUARTER_FRAME_1: u32 = 7457;
const HALF_FRAME_1: u32 = 14913;
const QUARTER_FRAME_3: u32 = 22371;
const FOUR_STEP_END: u32 = 29829;
const FIVE_STEP_END: u32 = 37281;

/// The audio processing unit.
///
/// Clocked once per CPU cycle, averages every channel's output over each sample period and writes
/// the mixed signal to an [AudioSink] in blocks.
pub struct Apu {
    pub pulse_channels: [PulseChannel; 2],
    pub triangle_channel: TriangleChannel,
    pub noise_channel: NoiseChannel,
    pub dmc_channel: DmcChannel,
    // Frame sequencer
    frame_cycle: u32,
    five_step_mode: bool,
    frame_irq_enabled: bool,
    frame_irq: bool,
    // Value written to 0x4017 waiting to take effect, and the cycles until it does
    pending_frame_counter: Option<u8>,
    frame_counter_delay: u32,
    // Sum of each channel's output since the last sample
    sums: [f64; 5],
    sum_cycles: u32,
    sample_counter: f64,
    cycles_per_sample: f64,
    // One pole high pass filter
    high_pass_coefficient: f64,
    prev_input: f64,
    prev_output: f64,
    block: Vec<u8>,
    block_size: usize,
    sink: Box<dyn AudioSink>,
}

impl Apu {
    pub fn new(settings: &Settings) -> Apu {
        let block_size = settings.audio_block_size.max(2);
        Apu {
            pulse_channels: [PulseChannel::pulse_1(), PulseChannel::pulse_2()],
            triangle_channel: TriangleChannel::default(),
            noise_channel: NoiseChannel::default(),
            dmc_channel: DmcChannel::default(),
            frame_cycle: 0,
            five_step_mode: false,
            frame_irq_enabled: false,
            frame_irq: false,
            pending_frame_counter: None,
            frame_counter_delay: 0,
            sums: [0.0; 5],
            sum_cycles: 0,
            sample_counter: 0.0,
            cycles_per_sample: settings.cycles_per_sample(),
            high_pass_coefficient: settings.high_pass_coefficient,
            prev_input: 0.0,
            prev_output: 0.0,
            block: Vec::with_capacity(block_size),
            block_size,
            sink: Box::new(Silence),
        }
    }
    /// Set where the audio blocks are written to.
    pub fn set_sink(&mut self, sink: Box<dyn AudioSink>) {
        self.sink = sink;
    }
    /// Write a byte to the APU given its address in CPU memory space.
    ///
    /// `odd_cycle` is the parity of the CPU cycle the write happens on, which decides how long a
    /// write to the frame counter takes to apply.
    pub fn write_register(&mut self, addr: u16, value: u8, odd_cycle: bool) {
        match addr {
            0x4000..0x4004 => self.pulse_channels[0].write(addr, value),
            0x4004..0x4008 => self.pulse_channels[1].write(addr, value),
            0x4008..0x400C => self.triangle_channel.write(addr, value),
            0x400C..0x4010 => self.noise_channel.write(addr, value),
            0x4010..0x4014 => self.dmc_channel.write(addr, value),
            0x4015 => {
                self.pulse_channels[0]
                    .length_counter
                    .set_enabled((value & 0x01) != 0);
                self.pulse_channels[1]
                    .length_counter
                    .set_enabled((value & 0x02) != 0);
                self.triangle_channel
                    .length_counter
                    .set_enabled((value & 0x04) != 0);
                self.noise_channel
                    .length_counter
                    .set_enabled((value & 0x08) != 0);
                self.dmc_channel.set_enabled((value & 0x10) != 0);
                // Any write acknowledges the DMC interrupt
                self.dmc_channel.irq_flag = false;
            }
            0x4017 => {
                // Inhibiting the IRQ clears the flag right away, everything else waits
                if value & 0x40 != 0 {
                    self.frame_irq = false;
                    self.frame_irq_enabled = false;
                }
                self.pending_frame_counter = Some(value);
                self.frame_counter_delay = if odd_cycle { 4 } else { 3 };
            }
            _ => warn!("Trying to write {:X} to APU address {:X}", value, addr),
        }
    }
    /// Read the status register (`0x4015`).
    ///
    /// Clears the frame interrupt flag. Bit 5 is not driven and comes from `open_bus`.
    pub fn read_status(&mut self, open_bus: u8) -> u8 {
        macro_rules! bit_flag {
            ($flag: expr, $bit: literal) => {
                if $flag {
                    0x01 << $bit
                } else {
                    0x00
                }
            };
        }
        let v = bit_flag!(self.dmc_channel.irq_flag, 7)
            | bit_flag!(self.frame_irq, 6)
            | (open_bus & 0x20)
            | bit_flag!(self.dmc_channel.bytes_remaining > 0, 4)
            | bit_flag!(!self.noise_channel.length_counter.muted(), 3)
            | bit_flag!(!self.triangle_channel.length_counter.muted(), 2)
            | bit_flag!(!self.pulse_channels[1].length_counter.muted(), 1)
            | bit_flag!(!self.pulse_channels[0].length_counter.muted(), 0);
        self.frame_irq = false;
        v
    }
    /// Whether the APU is pulling the IRQ line, either through the frame counter or the DMC.
    pub fn irq_active(&self) -> bool {
        self.frame_irq || self.dmc_channel.irq_flag
    }
    /// Advance the APU by a single CPU cycle.
    pub fn tick(&mut self, cartridge: &Cartridge) {
        self.pulse_channels.iter_mut().for_each(|p| p.step());
        self.triangle_channel.step();
        self.noise_channel.step();
        self.dmc_channel.step(cartridge);

        let outputs = [
            self.pulse_channels[0].output(),
            self.pulse_channels[1].output(),
            self.triangle_channel.output(),
            self.noise_channel.output(),
            self.dmc_channel.output,
        ];
        self.sums
            .iter_mut()
            .zip(outputs)
            .for_each(|(sum, o)| *sum += o as f64);
        self.sum_cycles += 1;
        self.sample_counter += 1.0;
        if self.sample_counter >= self.cycles_per_sample {
            self.sample_counter -= self.cycles_per_sample;
            self.emit_sample();
        }

        if self.frame_counter_delay > 0 {
            self.frame_counter_delay -= 1;
            if self.frame_counter_delay == 0 {
                if let Some(value) = self.pending_frame_counter.take() {
                    self.five_step_mode = (value & 0x80) != 0;
                    self.frame_irq_enabled = (value & 0x40) == 0;
                    if !self.frame_irq_enabled {
                        self.frame_irq = false;
                    }
                }
                self.frame_cycle = 0;
                if self.five_step_mode {
                    self.on_quarter_frame();
                    self.on_half_frame();
                }
            }
        }
        self.step_frame_counter();
    }
    fn step_frame_counter(&mut self) {
        self.frame_cycle += 1;
        match self.frame_cycle {
            QUARTER_FRAME_1 | QUARTER_FRAME_3 => self.on_quarter_frame(),
            HALF_FRAME_1 => {
                self.on_quarter_frame();
                self.on_half_frame();
            }
            FOUR_STEP_END if !self.five_step_mode => {
                self.on_quarter_frame();
                self.on_half_frame();
                if self.frame_irq_enabled {
                    self.frame_irq = true;
                }
            }
            FIVE_STEP_END if self.five_step_mode => {
                self.on_quarter_frame();
                self.on_half_frame();
                self.frame_cycle = 0;
            }
            _ => {}
        }
        if !self.five_step_mode && self.frame_cycle > FOUR_STEP_END {
            self.frame_cycle = 0;
        }
    }
    fn on_quarter_frame(&mut self) {
        self.pulse_channels
            .iter_mut()
            .for_each(|p| p.envelope.clock());
        self.noise_channel.envelope.clock();
        self.triangle_channel.clock_linear_counter();
    }
    fn on_half_frame(&mut self) {
        self.pulse_channels.iter_mut().for_each(|p| {
            p.length_counter.clock();
            p.clock_sweep();
        });
        self.triangle_channel.length_counter.clock();
        self.noise_channel.length_counter.clock();
    }
    fn emit_sample(&mut self) {
        if self.sum_cycles == 0 {
            return;
        }
        let [p1, p2, triangle, noise, dmc] = self.sums.map(|s| s / self.sum_cycles as f64);
        self.sums = [0.0; 5];
        self.sum_cycles = 0;

        let output = mixer_output(p1, p2, triangle, noise, dmc);
        let filtered =
            output - self.prev_input + self.high_pass_coefficient * self.prev_output;
        self.prev_input = output;
        self.prev_output = filtered;

        let sample = (filtered.clamp(-1.0, 1.0) * i16::MAX as f64) as i16;
        self.block.extend_from_slice(&sample.to_le_bytes());
        if self.block.len() >= self.block_size {
            self.sink.write_samples(&self.block);
            self.block.clear();
        }
    }
}

/// Mix the (averaged) output of each channel using the non-linear formulas of the hardware mixer.
///
/// Returns a value between `0.0` and `1.0`.
/// ```
/// use nescore::core::apu::mixer_output;
/// assert_eq!(mixer_output(0.0, 0.0, 0.0, 0.0, 0.0), 0.0);
/// assert!((mixer_output(15.0, 15.0, 15.0, 15.0, 127.0) - 1.0).abs() < 0.02);
/// ```
pub fn mixer_output(p1: f64, p2: f64, triangle: f64, noise: f64, dmc: f64) -> f64 {
    let pulse = if p1 + p2 > 0.0 {
        95.88 / (8128.0 / (p1 + p2) + 100.0)
    } else {
        0.0
    };
    let tnd_denom = triangle / 8227.0 + noise / 12241.0 + dmc / 22638.0;
    let tnd = if tnd_denom > 0.0 {
        159.79 / (1.0 / tnd_denom + 100.0)
    } else {
        0.0
    };
    pulse + tnd
}

impl Debug for Apu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Apu")
            .field("pulse_1", &self.pulse_channels[0])
            .field("pulse_2", &self.pulse_channels[1])
            .field("triangle", &self.triangle_channel)
            .field("noise", &self.noise_channel)
            .field("dmc", &self.dmc_channel)
            .field("frame_cycle", &self.frame_cycle)
            .field("five_step_mode", &self.five_step_mode)
            .finish()
    }
}
