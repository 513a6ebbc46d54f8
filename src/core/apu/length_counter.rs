use std::fmt::Debug;

const LENGTH_TABLE: [u8; 0x20] = [
    0x0A, 0xFE, 0x14, 0x02, 0x28, 0x04, 0x50, 0x06, 0xA0, 0x08, 0x3C, 0x0A, 0x0E, 0x0C, 0x1A, 0x0E,
    0x0C, 0x10, 0x18, 0x12, 0x30, 0x14, 0x60, 0x16, 0xC0, 0x18, 0x48, 0x1A, 0x10, 0x1C, 0x20, 0x1E,
];

#[derive(Clone, Copy, Default)]
/// A length counter.
/// Simple divider that silences a channel when it hits 0.
pub struct LengthCounter {
    /// The halt flag, pauses the counter when true
    pub halt: bool,
    /// Whether the channel is enabled through `0x4015`
    enabled: bool,
    /// The current value
    value: u8,
}
impl LengthCounter {
    /// Load the counter from the top 5 bits of a register write, ignored while the channel is disabled
    pub fn load(&mut self, value: u8) {
        if self.enabled {
            self.value = LENGTH_TABLE[(value >> 3) as usize];
        }
    }
    /// Enable or disable the channel, disabling clears the counter
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.value = 0;
        }
    }
    /// Return `true` if the counter is silencing the channel
    pub fn muted(&self) -> bool {
        self.value == 0
    }
    /// Clock the length counter, called every half frame
    pub fn clock(&mut self) {
        if !self.halt && self.value > 0 {
            self.value -= 1;
        }
    }
}
impl Debug for LengthCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "halt={} load={:X}", self.halt, self.value)
    }
}
