//! Beat pulse over the party palette

use embassy_time::Instant;

use super::Effect;
use crate::{
    color::{PARTY_COLORS, Rgb},
    math8::beatsin8,
};

/// Beats per minute of the pulse
pub const BEATS_PER_MINUTE: u8 = 62;

const BEAT_LOW: u8 = 64;
const BEAT_HIGH: u8 = 255;

#[derive(Debug, Clone, Default)]
pub struct BpmEffect {
    hue: u8,
}

impl BpmEffect {
    pub const fn new() -> Self {
        Self { hue: 0 }
    }
}

impl Effect for BpmEffect {
    #[allow(clippy::cast_possible_truncation)]
    fn render(&mut self, now: Instant, leds: &mut [Rgb]) {
        let beat = beatsin8(BEATS_PER_MINUTE, BEAT_LOW, BEAT_HIGH, now);
        for (i, led) in leds.iter_mut().enumerate() {
            let i = i as u8;
            let index = self.hue.wrapping_add(i.wrapping_mul(2));
            let brightness = beat
                .wrapping_sub(self.hue)
                .wrapping_add(i.wrapping_mul(10));
            *led = PARTY_COLORS.color_at(index, brightness);
        }
        self.hue = self.hue.wrapping_add(1);
    }

    fn reset(&mut self) {
        self.hue = 0;
    }
}
