//! Blended palette effects ("solid rainbow" and "mixed rainbow")
//!
//! The current palette walks toward a target palette a bounded number of
//! channel steps per frame, and a new random target is picked every few
//! seconds. Colors therefore drift smoothly without any visible jump.

use embassy_time::{Duration, Instant};

use super::Effect;
use crate::{
    color::{Hsv, OCEAN_COLORS, Palette16, Rgb, hsv2rgb},
    math8::beatsin8,
    random::Random8,
};

/// Maximum channel changes applied to the palette per frame
pub const MAX_PALETTE_CHANGES: usize = 48;

/// Spatial frequency of the palette sampling
pub const SCALE: u16 = 30;

/// How often a new target palette is picked
pub const TARGET_PERIOD: Duration = Duration::from_secs(5);

const NOISE_DRIFT_BPM: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteVariant {
    /// Slow gradient along the strip
    Solid,
    /// Value noise along the strip
    Mixed,
}

#[derive(Debug, Clone)]
pub struct PaletteEffect {
    variant: PaletteVariant,
    current: Palette16,
    target: Palette16,
    last_target: Option<Instant>,
    phase: u8,
    distance: u32,
    random: Random8,
}

impl PaletteEffect {
    pub fn new(variant: PaletteVariant, seed: u32) -> Self {
        Self {
            variant,
            current: Palette16::default(),
            target: OCEAN_COLORS,
            last_target: None,
            phase: 0,
            distance: 0,
            random: Random8::new(u64::from(seed)),
        }
    }

    pub const fn current(&self) -> &Palette16 {
        &self.current
    }

    pub const fn target(&self) -> &Palette16 {
        &self.target
    }

    /// Pick a new random target palette
    pub fn shuffle_target(&mut self) {
        let mut anchor = |sat: u8| {
            hsv2rgb(Hsv {
                hue: self.random.next_u8(),
                sat,
                val: self.random.range8(128, 255),
            })
        };
        self.target = Palette16::from_anchors([anchor(255), anchor(255), anchor(192), anchor(255)]);
    }

    fn update_target(&mut self, now: Instant) {
        match self.last_target {
            None => self.last_target = Some(now),
            Some(last) if now.saturating_duration_since(last) >= TARGET_PERIOD => {
                self.last_target = Some(now);
                self.shuffle_target();
            }
            Some(_) => {}
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn fill_gradient(&mut self, leds: &mut [Rgb]) {
        for (i, led) in leds.iter_mut().enumerate() {
            let offset = ((i as u32 * u32::from(SCALE)) / 16) as u8;
            *led = self.current.color_at(self.phase.wrapping_add(offset), 255);
        }
        self.phase = self.phase.wrapping_add(1);
    }

    #[allow(clippy::cast_possible_truncation)]
    fn fill_noise(&mut self, now: Instant, leds: &mut [Rgb]) {
        for (i, led) in leds.iter_mut().enumerate() {
            let position = (i as u32 * u32::from(SCALE)) << 4;
            let index = value_noise(position.wrapping_add(self.distance));
            *led = self.current.color_at(index, 255);
        }
        let drift = beatsin8(NOISE_DRIFT_BPM, 1, 4, now);
        self.distance = self.distance.wrapping_add(u32::from(drift) << 4);
    }
}

impl Effect for PaletteEffect {
    fn render(&mut self, now: Instant, leds: &mut [Rgb]) {
        self.update_target(now);
        self.current.blend_toward(&self.target, MAX_PALETTE_CHANGES);

        match self.variant {
            PaletteVariant::Solid => self.fill_gradient(leds),
            PaletteVariant::Mixed => self.fill_noise(now, leds),
        }
    }

    fn reset(&mut self) {
        self.current = Palette16::default();
        self.target = OCEAN_COLORS;
        self.last_target = None;
        self.phase = 0;
        self.distance = 0;
    }
}

/// Integer hash used as the noise lattice
#[inline]
const fn hash(x: u32) -> u8 {
    let mut z = x.wrapping_add(0x9e37_79b9);
    z = (z ^ (z >> 16)).wrapping_mul(0x85eb_ca6b);
    z = (z ^ (z >> 13)).wrapping_mul(0xc2b2_ae35);
    #[allow(clippy::cast_possible_truncation)]
    {
        (z ^ (z >> 16)) as u8
    }
}

/// Smooth 1D value noise: input is 24.8 fixed-point position, output 0-255
#[allow(clippy::cast_possible_truncation)]
fn value_noise(position: u32) -> u8 {
    let cell = position >> 8;
    let frac = (position & 0xFF) as u8;
    let v0 = hash(cell);
    let v1 = hash(cell.wrapping_add(1));
    // Smoothstep on the fraction
    let f = u32::from(frac);
    let eased = ((f * f * (3 * 256 - 2 * f)) >> 16) as u8;
    crate::math8::blend8(v0, v1, eased)
}
