//! Effect system with compile-time known effect variants
//!
//! All effects are stored in an enum to avoid heap allocations.
//! Each animated effect implements the `Effect` trait.

mod bpm;
mod palette;
mod rainbow;

use embassy_time::Instant;
pub use bpm::BpmEffect;
pub use palette::{MAX_PALETTE_CHANGES, PaletteEffect, PaletteVariant};
pub use rainbow::RainbowEffect;

use crate::color::Rgb;
use crate::random::Random8;

const EFFECT_NAME_SOLID: &str = "solid";
const EFFECT_NAME_GLOW_WORM: &str = "GlowWorm";
const EFFECT_NAME_GLOW_WORM_WIFI: &str = "GlowWormWifi";
const EFFECT_NAME_BPM: &str = "bpm";
const EFFECT_NAME_RAINBOW: &str = "rainbow";
const EFFECT_NAME_SOLID_RAINBOW: &str = "solid rainbow";
const EFFECT_NAME_MIXED_RAINBOW: &str = "mixed rainbow";

const EFFECT_ID_SOLID: u8 = 0;
const EFFECT_ID_GLOW_WORM: u8 = 1;
const EFFECT_ID_GLOW_WORM_WIFI: u8 = 2;
const EFFECT_ID_BPM: u8 = 3;
const EFFECT_ID_RAINBOW: u8 = 4;
const EFFECT_ID_SOLID_RAINBOW: u8 = 5;
const EFFECT_ID_MIXED_RAINBOW: u8 = 6;

pub trait Effect {
    /// Render a single frame
    fn render(&mut self, now: Instant, leds: &mut [Rgb]);

    /// Reset effect state
    fn reset(&mut self) {}
}

/// Where streamed frames for a mode come from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamSource {
    /// USB / UART link
    Serial,
    /// Message bus stream topic
    Network,
}

/// Known effect modes that can be requested.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum EffectMode {
    #[default]
    Solid = EFFECT_ID_SOLID,
    GlowWorm = EFFECT_ID_GLOW_WORM,
    GlowWormWifi = EFFECT_ID_GLOW_WORM_WIFI,
    Bpm = EFFECT_ID_BPM,
    Rainbow = EFFECT_ID_RAINBOW,
    SolidRainbow = EFFECT_ID_SOLID_RAINBOW,
    MixedRainbow = EFFECT_ID_MIXED_RAINBOW,
}

impl EffectMode {
    pub fn from_raw(value: u8) -> Option<Self> {
        Some(match value {
            EFFECT_ID_SOLID => Self::Solid,
            EFFECT_ID_GLOW_WORM => Self::GlowWorm,
            EFFECT_ID_GLOW_WORM_WIFI => Self::GlowWormWifi,
            EFFECT_ID_BPM => Self::Bpm,
            EFFECT_ID_RAINBOW => Self::Rainbow,
            EFFECT_ID_SOLID_RAINBOW => Self::SolidRainbow,
            EFFECT_ID_MIXED_RAINBOW => Self::MixedRainbow,
            _ => return None,
        })
    }

    pub const fn as_raw(self) -> u8 {
        self as u8
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Solid => EFFECT_NAME_SOLID,
            Self::GlowWorm => EFFECT_NAME_GLOW_WORM,
            Self::GlowWormWifi => EFFECT_NAME_GLOW_WORM_WIFI,
            Self::Bpm => EFFECT_NAME_BPM,
            Self::Rainbow => EFFECT_NAME_RAINBOW,
            Self::SolidRainbow => EFFECT_NAME_SOLID_RAINBOW,
            Self::MixedRainbow => EFFECT_NAME_MIXED_RAINBOW,
        }
    }

    /// Parse a wire name, ignoring case and accepting `_` for spaces
    pub fn parse_from_str(s: &str) -> Option<Self> {
        const ALL: [EffectMode; 7] = [
            EffectMode::Solid,
            EffectMode::GlowWorm,
            EffectMode::GlowWormWifi,
            EffectMode::Bpm,
            EffectMode::Rainbow,
            EffectMode::SolidRainbow,
            EffectMode::MixedRainbow,
        ];
        ALL.into_iter().find(|mode| name_matches(mode.as_str(), s))
    }

    /// Source of pixel data for the streaming modes
    pub const fn stream_source(self) -> Option<StreamSource> {
        match self {
            Self::GlowWorm => Some(StreamSource::Serial),
            Self::GlowWormWifi => Some(StreamSource::Network),
            _ => None,
        }
    }

    pub const fn is_streaming(self) -> bool {
        self.stream_source().is_some()
    }

    /// Build the mode-local state for this mode
    pub fn to_slot(self, seed: u32) -> EffectSlot {
        match self {
            Self::Solid => EffectSlot::Solid,
            Self::GlowWorm | Self::GlowWormWifi => EffectSlot::Stream,
            Self::Bpm => EffectSlot::Bpm(BpmEffect::new()),
            Self::Rainbow => EffectSlot::Rainbow(RainbowEffect::new()),
            Self::SolidRainbow => {
                EffectSlot::Palette(PaletteEffect::new(PaletteVariant::Solid, seed))
            }
            Self::MixedRainbow => {
                EffectSlot::Palette(PaletteEffect::new(PaletteVariant::Mixed, seed))
            }
        }
    }
}

fn name_matches(name: &str, candidate: &str) -> bool {
    name.len() == candidate.len()
        && name.bytes().zip(candidate.bytes()).all(|(a, b)| {
            let b = if b == b'_' { b' ' } else { b };
            a.eq_ignore_ascii_case(&b)
        })
}

/// Effect slot - enum containing the state of every mode
#[derive(Debug, Clone)]
pub enum EffectSlot {
    /// Filled from the color state by the renderer
    Solid,
    /// Filled by stream ingest
    Stream,
    Bpm(BpmEffect),
    Rainbow(RainbowEffect),
    Palette(PaletteEffect),
}

impl EffectSlot {
    /// Render the current effect
    ///
    /// `Solid` fills with `color`; `Stream` leaves the frame untouched.
    pub fn render(&mut self, now: Instant, leds: &mut [Rgb], color: Rgb) {
        match self {
            Self::Solid => leds.fill(color),
            Self::Stream => {}
            Self::Bpm(effect) => effect.render(now, leds),
            Self::Rainbow(effect) => effect.render(now, leds),
            Self::Palette(effect) => effect.render(now, leds),
        }
    }
}

/// Active mode and its state
#[derive(Debug, Clone)]
pub struct EffectEngine {
    mode: EffectMode,
    slot: EffectSlot,
    random: Random8,
}

impl EffectEngine {
    pub fn new(mode: EffectMode, seed: u64) -> Self {
        let mut random = Random8::new(seed);
        let slot = mode.to_slot(random.next_u32());
        Self { mode, slot, random }
    }

    pub const fn mode(&self) -> EffectMode {
        self.mode
    }

    pub const fn slot(&self) -> &EffectSlot {
        &self.slot
    }

    /// Switch to `mode`, rebuilding its state from scratch
    ///
    /// Selecting the active mode again also restarts it.
    pub fn set_mode(&mut self, mode: EffectMode) {
        self.mode = mode;
        self.slot = mode.to_slot(self.random.next_u32());
    }

    /// Compute one frame into the active pixels
    pub fn render(&mut self, now: Instant, leds: &mut [Rgb], color: Rgb) {
        self.slot.render(now, leds, color);
    }
}
