use serde::{Deserialize, Serialize};

/// Settings for how to run the emulator.
///
/// None of these change the CPU's behaviour, they only affect how video and audio are produced.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Debugging palette override, assigns each palette a unique colour to quickly show which tiles are using which palettes.
    pub use_debug_palette: bool,
    /// The rate audio samples are produced at, in hertz.
    pub sample_rate: u32,
    /// The number of bytes handed to the audio sink at a time.
    /// Each sample is 2 bytes (signed 16 bit, little endian).
    pub audio_block_size: usize,
    /// Coefficient of the one pole high pass filter applied to the mixer output
    pub high_pass_coefficient: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            use_debug_palette: false,
            sample_rate: 44_100,
            audio_block_size: 1470,
            high_pass_coefficient: 0.996,
        }
    }
}

impl Settings {
    /// The number of CPU cycles between two audio samples.
    /// ```
    /// let settings = nescore::Settings::default();
    /// assert!((settings.cycles_per_sample() - 40.584).abs() < 0.001);
    /// ```
    pub fn cycles_per_sample(&self) -> f64 {
        super::CPU_CLOCK_SPEED as f64 / self.sample_rate.max(1) as f64
    }
}
