//! 16 entry color palettes
//!
//! Palettes are sampled with an 8-bit index: the high nibble selects the
//! entry and the low nibble blends linearly toward the next one (wrapping).

use crate::color::{BLACK, Rgb, blend_colors, rgb_from_u32, scale_color};

/// Number of entries in a palette
pub const PALETTE_SIZE: usize = 16;

/// Create a palette from a list of hex colors (0xRRGGBB format)
macro_rules! hex_palette {
    ($($color:expr),*) => {
        Palette16::new([
            $(rgb_from_u32($color)),*
        ])
    };
}

/// Deep blues and sea greens
#[allow(clippy::unreadable_literal)]
pub const OCEAN_COLORS: Palette16 = hex_palette![
    0x191970, 0x00008B, 0x191970, 0x000080,
    0x00008B, 0x0000CD, 0x2E8B57, 0x008080,
    0x5F9EA0, 0x0000FF, 0x008B8B, 0x6495ED,
    0x7FFFD4, 0x2E8B57, 0x00FFFF, 0x87CEFA
];

/// Saturated purples, reds and yellows without greens
#[allow(clippy::unreadable_literal)]
pub const PARTY_COLORS: Palette16 = hex_palette![
    0x5500AB, 0x84007C, 0xB5004B, 0xE5001B,
    0xE81700, 0xB84700, 0xAB7700, 0xABAB00,
    0xAB5500, 0xDD2200, 0xF2000E, 0xC2003E,
    0x8F0071, 0x5F00A1, 0x2F00D0, 0x0007F9
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette16 {
    entries: [Rgb; PALETTE_SIZE],
}

impl Default for Palette16 {
    fn default() -> Self {
        Self::solid(BLACK)
    }
}

impl Palette16 {
    pub const fn new(entries: [Rgb; PALETTE_SIZE]) -> Self {
        Self { entries }
    }

    /// Palette with every entry set to `color`
    pub const fn solid(color: Rgb) -> Self {
        Self {
            entries: [color; PALETTE_SIZE],
        }
    }

    /// Palette spread evenly over four anchor colors
    ///
    /// Anchors land on entries 0, 5, 10 and 15, the entries between them are
    /// linear blends.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_anchors(anchors: [Rgb; 4]) -> Self {
        const SPAN: usize = 5;
        let mut entries = [BLACK; PALETTE_SIZE];
        for (i, entry) in entries.iter_mut().enumerate() {
            let segment = (i / SPAN).min(anchors.len() - 2);
            let offset = i - segment * SPAN;
            let amount = ((offset * 255) / SPAN) as u8;
            *entry = blend_colors(anchors[segment], anchors[segment + 1], amount);
        }
        entries[PALETTE_SIZE - 1] = anchors[3];
        Self { entries }
    }

    pub const fn entries(&self) -> &[Rgb; PALETTE_SIZE] {
        &self.entries
    }

    /// Sample the palette with linear blending, then scale by `brightness`
    pub fn color_at(&self, index: u8, brightness: u8) -> Rgb {
        let hi = usize::from(index >> 4);
        let lo = index & 0x0F;
        let entry = self.entries[hi];
        let color = if lo == 0 {
            entry
        } else {
            let next = self.entries[(hi + 1) % PALETTE_SIZE];
            blend_colors(entry, next, lo << 4)
        };
        scale_color(color, brightness)
    }

    /// Move this palette toward `target` by at most `max_changes` channel steps
    ///
    /// Each changed channel moves by one toward the target when rising and by
    /// at most two when falling. Returns the number of channels changed.
    pub fn blend_toward(&mut self, target: &Self, max_changes: usize) -> usize {
        let mut changes = 0;
        'entries: for (current, goal) in self.entries.iter_mut().zip(target.entries.iter()) {
            for (channel, wanted) in [
                (&mut current.r, goal.r),
                (&mut current.g, goal.g),
                (&mut current.b, goal.b),
            ] {
                if changes >= max_changes {
                    break 'entries;
                }
                if *channel == wanted {
                    continue;
                }
                if *channel < wanted {
                    *channel += 1;
                } else {
                    *channel -= 1;
                    if *channel > wanted {
                        *channel -= 1;
                    }
                }
                changes += 1;
            }
        }
        changes
    }
}
