//! Scrolling rainbow
//!
//! The base hue advances by a fixed amount every frame and each pixel shifts
//! the hue further, so the gradient appears to travel along the strip.

use embassy_time::Instant;

use super::Effect;
use crate::color::{Rgb, fill_rainbow};

/// Hue added to the base every frame
pub const HUE_ADVANCE: u8 = 1;

/// Hue difference between neighbouring pixels
pub const DELTA_HUE: u8 = 10;

#[derive(Debug, Clone, Default)]
pub struct RainbowEffect {
    hue: u8,
}

impl RainbowEffect {
    pub const fn new() -> Self {
        Self { hue: 0 }
    }

    /// Base hue of the next frame
    pub const fn hue(&self) -> u8 {
        self.hue
    }
}

impl Effect for RainbowEffect {
    fn render(&mut self, _now: Instant, leds: &mut [Rgb]) {
        self.hue = self.hue.wrapping_add(HUE_ADVANCE);
        fill_rainbow(leds, self.hue, DELTA_HUE);
    }

    fn reset(&mut self) {
        self.hue = 0;
    }
}
