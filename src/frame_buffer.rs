//! Pre-allocated pixel arena with a runtime active length.

use crate::color::{BLACK, Rgb};

/// Fixed capacity frame buffer
///
/// The backing array is sized to the hardware ceiling `MAX_LEDS` and never
/// resized. Only the first `active_len` pixels belong to the strip; the rest
/// is kept as-is and never committed.
#[derive(Debug, Clone)]
pub struct FrameBuffer<const MAX_LEDS: usize> {
    pixels: [Rgb; MAX_LEDS],
    active_len: usize,
}

impl<const MAX_LEDS: usize> Default for FrameBuffer<MAX_LEDS> {
    fn default() -> Self {
        Self::new(MAX_LEDS)
    }
}

impl<const MAX_LEDS: usize> FrameBuffer<MAX_LEDS> {
    /// Create a dark buffer with `active_len` clamped to `[1, MAX_LEDS]`
    pub const fn new(active_len: usize) -> Self {
        Self {
            pixels: [BLACK; MAX_LEDS],
            active_len: clamp_led_count::<MAX_LEDS>(active_len),
        }
    }

    /// Number of pixels belonging to the strip
    pub const fn active_len(&self) -> usize {
        self.active_len
    }

    /// Hardware ceiling
    pub const fn capacity(&self) -> usize {
        MAX_LEDS
    }

    /// Change the active length, returns the clamped value actually applied
    pub fn set_active_len(&mut self, len: usize) -> usize {
        self.active_len = clamp_led_count::<MAX_LEDS>(len);
        self.active_len
    }

    /// Pixels belonging to the strip
    pub fn active(&self) -> &[Rgb] {
        &self.pixels[..self.active_len]
    }

    /// Mutable view over the pixels belonging to the strip
    pub fn active_mut(&mut self) -> &mut [Rgb] {
        &mut self.pixels[..self.active_len]
    }

    /// Whole backing array, including pixels past the active length
    pub const fn physical(&self) -> &[Rgb; MAX_LEDS] {
        &self.pixels
    }

    /// Read an active pixel
    pub fn get(&self, index: usize) -> Option<Rgb> {
        self.active().get(index).copied()
    }

    /// Write an active pixel, returns `false` when out of bounds
    pub fn set(&mut self, index: usize, color: Rgb) -> bool {
        match self.active_mut().get_mut(index) {
            Some(pixel) => {
                *pixel = color;
                true
            }
            None => false,
        }
    }

    /// Fill every active pixel
    pub fn fill(&mut self, color: Rgb) {
        self.active_mut().fill(color);
    }
}

/// Clamp a LED count to `[1, MAX_LEDS]`
pub const fn clamp_led_count<const MAX_LEDS: usize>(count: usize) -> usize {
    if count == 0 {
        1
    } else if count > MAX_LEDS {
        MAX_LEDS
    } else {
        count
    }
}
