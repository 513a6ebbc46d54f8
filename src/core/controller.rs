use serde::{Deserialize, Serialize};

/// The buttons on a standard NES controller.
///
/// Used to set which buttons are pressed on one of the [Controller]s plugged into the console.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buttons {
    pub a: bool,
    pub b: bool,
    pub select: bool,
    pub start: bool,
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl Buttons {
    /// The buttons as a byte, in the order they are shifted out of the controller.
    /// ```
    /// use nescore::Buttons;
    /// let buttons = Buttons { a: true, start: true, right: true, ..Buttons::default() };
    /// assert_eq!(buttons.to_bits(), 0b1000_1001);
    /// ```
    pub fn to_bits(&self) -> u8 {
        [
            self.a,
            self.b,
            self.select,
            self.start,
            self.up,
            self.down,
            self.left,
            self.right,
        ]
        .iter()
        .enumerate()
        .fold(0, |acc, (i, pressed)| acc | ((*pressed as u8) << i))
    }
    /// Build the button state from a byte in the same order as [Buttons::to_bits].
    pub fn from_bits(bits: u8) -> Buttons {
        let bit = |i: u8| (bits >> i) & 0x01 != 0;
        Buttons {
            a: bit(0),
            b: bit(1),
            select: bit(2),
            start: bit(3),
            up: bit(4),
            down: bit(5),
            left: bit(6),
            right: bit(7),
        }
    }
}

/// Something that can be polled for which buttons are currently held down.
///
/// Indices follow [Buttons::to_bits], `0` is A and `7` is right.
pub trait InputSource {
    fn poll_button(&mut self, index: usize) -> bool;
}

impl InputSource for Buttons {
    fn poll_button(&mut self, index: usize) -> bool {
        (self.to_bits() >> index) & 0x01 != 0
    }
}

/// The serial interface of a standard controller, read through `0x4016` and `0x4017`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Controller {
    /// The buttons currently pressed
    pub buttons: Buttons,
    shift: u8,
    strobe: bool,
}

impl Controller {
    /// Handle a write to `0x4016`, only bit 0 (the strobe) is used.
    ///
    /// While the strobe is high the shift register is continuously reloaded.
    pub fn write(&mut self, value: u8) {
        self.strobe = value & 0x01 != 0;
        if self.strobe {
            self.shift = self.buttons.to_bits();
        }
    }
    /// Read the next button, returned in bit 0.
    ///
    /// After all 8 buttons have been read, official controllers return 1.
    pub fn read(&mut self) -> u8 {
        if self.strobe {
            self.shift = self.buttons.to_bits();
        }
        let bit = self.shift & 0x01;
        self.shift = (self.shift >> 1) | 0x80;
        bit
    }
    /// Poll every button from an [InputSource].
    pub fn poll(&mut self, input: &mut dyn InputSource) {
        self.buttons = Buttons::from_bits(
            (0..8).fold(0, |acc, i| acc | ((input.poll_button(i) as u8) << i)),
        );
    }
}
