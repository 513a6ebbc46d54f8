#[derive(Clone, Copy, Default, Debug)]
/// An envelope generator unit.
/// Controls the volume of the pulse and noise channels.
/// See [the NESDEV wiki](https://www.nesdev.org/wiki/APU_Envelope)
pub struct Envelope {
    /// Set by a write to the channel's length register, restarts the decay on the next clock
    pub start: bool,
    /// Loop flag, shared with the channel's length counter halt flag
    pub looping: bool,
    /// Constant volume flag
    pub constant: bool,
    /// Volume value (either the volume or the divider's reload value)
    pub volume: u8,
    divider: u8,
    decay: u8,
}
impl Envelope {
    /// Set from bits 0 to 5 of the channel's first register.
    pub fn write(&mut self, value: u8) {
        self.looping = (value & 0x20) != 0;
        self.constant = (value & 0x10) != 0;
        self.volume = value & 0x0F;
    }
    /// Clock the envelope unit, called every quarter frame
    pub fn clock(&mut self) {
        if self.start {
            self.start = false;
            self.decay = 0x0F;
            self.divider = self.volume;
        } else if self.divider == 0 {
            self.divider = self.volume;
            if self.decay > 0 {
                self.decay -= 1;
            } else if self.looping {
                self.decay = 0x0F;
            }
        } else {
            self.divider -= 1;
        }
    }
    /// Get the current output of the unit
    pub fn output(&self) -> u8 {
        if self.constant {
            self.volume
        } else {
            self.decay
        }
    }
}
