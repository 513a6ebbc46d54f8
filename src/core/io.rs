//! The collaborators the core pushes video and audio out to.
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::{SCREEN_HEIGHT, SCREEN_WIDTH};

/// Receives the picture one pixel at a time.
pub trait Display {
    /// Set the pixel at `(x, y)` to the colour `0xRRGGBB`.
    fn set_pixel(&mut self, x: usize, y: usize, rgb: u32);
    /// Called once per frame at the start of vertical blank.
    fn present_frame(&mut self);
    /// The frame buffer behind this display, if it keeps one.
    fn frame_buffer(&self) -> Option<&FrameBuffer> {
        None
    }
}

/// A [Display] that keeps the picture in memory.
#[derive(Clone)]
pub struct FrameBuffer {
    pixels: Vec<u32>,
    frames: u64,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        FrameBuffer {
            pixels: vec![0; SCREEN_WIDTH * SCREEN_HEIGHT],
            frames: 0,
        }
    }
}

impl FrameBuffer {
    /// Get the colour of a pixel as `0xRRGGBB`.
    pub fn pixel(&self, x: usize, y: usize) -> u32 {
        self.pixels[(y % SCREEN_HEIGHT) * SCREEN_WIDTH + (x % SCREEN_WIDTH)]
    }
    /// Every pixel, row by row.
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }
    /// The number of frames presented so far.
    pub fn frames_presented(&self) -> u64 {
        self.frames
    }
}

impl Display for FrameBuffer {
    fn set_pixel(&mut self, x: usize, y: usize, rgb: u32) {
        if x < SCREEN_WIDTH && y < SCREEN_HEIGHT {
            self.pixels[y * SCREEN_WIDTH + x] = rgb;
        }
    }
    fn present_frame(&mut self) {
        self.frames += 1;
    }
    fn frame_buffer(&self) -> Option<&FrameBuffer> {
        Some(self)
    }
}

/// A [Display] that discards everything.
#[derive(Default, Clone, Copy)]
pub struct NullDisplay;

impl Display for NullDisplay {
    fn set_pixel(&mut self, _x: usize, _y: usize, _rgb: u32) {}
    fn present_frame(&mut self) {}
}

/// Receives blocks of audio.
///
/// Samples are mono, signed 16 bit little endian.
/// Implementations may block while their buffer is full.
pub trait AudioSink {
    fn write_samples(&mut self, bytes: &[u8]);
}

/// An [AudioSink] that discards everything.
#[derive(Default, Clone, Copy)]
pub struct Silence;

impl AudioSink for Silence {
    fn write_samples(&mut self, _bytes: &[u8]) {}
}

/// An [AudioSink] that queues samples so they can be drained from another thread.
///
/// Clones share the same queue.
/// ```
/// use nescore::core::{AudioSink, SampleQueue};
/// let queue = SampleQueue::default();
/// let mut sink = queue.clone();
/// sink.write_samples(&[0x34, 0x12, 0xFF, 0xFF]);
/// assert_eq!(queue.drain(), vec![0x1234, -1]);
/// assert!(queue.is_empty());
/// ```
#[derive(Default, Clone)]
pub struct SampleQueue {
    bytes: Arc<Mutex<VecDeque<u8>>>,
}

impl SampleQueue {
    /// Remove and return every complete sample in the queue.
    pub fn drain(&self) -> Vec<i16> {
        let Ok(mut bytes) = self.bytes.lock() else {
            return Vec::new();
        };
        let count = bytes.len() / 2;
        bytes
            .drain(0..(count * 2))
            .collect::<Vec<u8>>()
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect()
    }
    /// The number of bytes waiting in the queue.
    pub fn len(&self) -> usize {
        self.bytes.lock().map(|b| b.len()).unwrap_or(0)
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AudioSink for SampleQueue {
    fn write_samples(&mut self, bytes: &[u8]) {
        if let Ok(mut queue) = self.bytes.lock() {
            queue.extend(bytes.iter());
        }
    }
}
