use std::fmt::Debug;

/// The status register (P) of the 6502.
///
/// Bit 5 does not exist in hardware and always reads as set.
/// The break flag only exists on copies of the register pushed to the stack, so
/// [StatusRegister::b] is cleared whenever the register is loaded from a byte.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct StatusRegister {
    /// The carry flag, also known as the unsigned overflow flag
    pub c: bool,
    /// The zero flag
    pub z: bool,
    /// The interrupt disable flag
    pub i: bool,
    /// The decimal mode flag, stored but ignored by arithmetic
    pub d: bool,
    /// The break command flag
    pub b: bool,
    /// The (signed) overflow flag
    pub v: bool,
    /// The negative flag
    pub n: bool,
}

impl Default for StatusRegister {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusRegister {
    /// Create a new StatusRegister in its power on state, `0x24` (only the interrupt disable flag is set).
    pub fn new() -> StatusRegister {
        StatusRegister {
            c: false,
            z: false,
            i: true,
            d: false,
            b: false,
            v: false,
            n: false,
        }
    }
    /// Get the status register as a single byte to be written to memory.
    /// ```
    /// let mut s = nescore::core::StatusRegister::new();
    /// s.z = true;
    /// s.d = true;
    /// s.i = false;
    /// assert_eq!(s.to_byte(), 0b00101010);
    /// s.n = true;
    /// s.v = true;
    /// assert_eq!(s.to_byte(), 0b11101010);
    /// ```
    pub fn to_byte(&self) -> u8 {
        let flags: [(bool, u8); 7] = [
            (self.c, 0x01),
            (self.z, 0x02),
            (self.i, 0x04),
            (self.d, 0x08),
            (self.b, 0x10),
            (self.v, 0x40),
            (self.n, 0x80),
        ];
        flags
            .iter()
            .filter(|(set, _)| *set)
            .fold(0x20, |acc, (_, bit)| acc | bit)
    }
    /// Set the status register from a byte pulled from the stack.
    ///
    /// Bits 4 and 5 are ignored.
    /// ```
    /// let mut s = nescore::core::StatusRegister::new();
    /// s.from_byte(0b11011010);
    /// assert_eq!(s.n, true);
    /// assert_eq!(s.v, true);
    /// assert_eq!(s.b, false);
    /// assert_eq!(s.d, true);
    /// assert_eq!(s.z, true);
    /// ```
    pub fn from_byte(&mut self, byte: u8) {
        let bit = |mask: u8| byte & mask != 0;
        *self = StatusRegister {
            c: bit(0x01),
            z: bit(0x02),
            i: bit(0x04),
            d: bit(0x08),
            b: false,
            v: bit(0x40),
            n: bit(0x80),
        };
    }
    /// Set the zero and negative flags from a result.
    pub fn set_zn(&mut self, value: u8) {
        self.z = value == 0;
        self.n = (value & 0x80) != 0;
    }
}

// Flags from bit 7 to bit 0, upper case when set
impl Debug for StatusRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let byte = self.to_byte();
        let flags: String = "NV-BDIZC"
            .chars()
            .enumerate()
            .map(|(i, c)| {
                if byte & (0x80 >> i) != 0 {
                    c
                } else {
                    c.to_ascii_lowercase()
                }
            })
            .collect();
        write!(f, "{}", flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_format() {
        let mut s = StatusRegister::new();
        s.c = true;
        s.n = true;
        assert_eq!(format!("{:?}", s), "Nv-bdIzC");
    }
    #[test]
    fn test_break_flag_is_not_loaded() {
        let mut s = StatusRegister::new();
        s.from_byte(0xFF);
        assert_eq!(s.to_byte(), 0xEF);
    }
}
